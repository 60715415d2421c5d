use super::category::Category;
use super::error::ComponentError;
use super::model::ModelData;
use super::params::{ComponentInfo, ComponentInit, validate_parameters};
use super::traits::{Component, Model};
use crate::core::simulation::{Entry, Parameters, Simulation};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeclarativeError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid component definition '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarativeFile {
    #[serde(default)]
    available: Vec<String>,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    fragment: Simulation,
}

/// A user component defined by a TOML file: parameter lists plus a fixed fragment.
#[derive(Debug, Clone)]
pub struct DeclarativeComponent {
    category: Category,
    type_name: String,
    available: Vec<String>,
    required: Vec<String>,
    fragment: Simulation,
    source: PathBuf,
}

impl DeclarativeComponent {
    /// Categories whose behaviour a static fragment can express.
    pub fn supports(category: Category) -> bool {
        matches!(
            category,
            Category::System
                | Category::Models
                | Category::ModelExtensions
                | Category::SimulationSteps
        )
    }

    pub fn load(path: &Path, category: Category) -> Result<Self, DeclarativeError> {
        let display = path.to_string_lossy().to_string();
        let invalid = |reason: String| DeclarativeError::Invalid {
            path: display.clone(),
            reason,
        };
        if !Self::supports(category) {
            return Err(invalid(format!(
                "components of category '{category}' cannot be declared in a file"
            )));
        }
        let type_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("file name is not a valid component type".to_string()))?
            .to_string();
        let content = std::fs::read_to_string(path).map_err(|e| DeclarativeError::Io {
            path: display.clone(),
            source: e,
        })?;
        let file: DeclarativeFile = toml::from_str(&content).map_err(|e| DeclarativeError::Toml {
            path: display.clone(),
            source: e,
        })?;

        if let Some(req) = file.required.iter().find(|r| !file.available.contains(r)) {
            return Err(invalid(format!(
                "required parameter '{req}' is not listed as available"
            )));
        }
        if category == Category::Models {
            let f = &file.fragment;
            let foreign = !f.system.is_empty()
                || !f.global.is_empty()
                || !f.integrator.is_empty()
                || !f.simulation_step.is_empty();
            if foreign {
                return Err(invalid(
                    "model fragments may only define state and topology".to_string(),
                ));
            }
            ModelData::from_fragment(f).map_err(invalid)?;
        } else if !file.fragment.state.is_empty() || !file.fragment.topology.structure.is_empty() {
            return Err(invalid(format!(
                "only models may define particles, found them in a '{category}' component"
            )));
        }

        Ok(Self {
            category,
            type_name,
            available: file.available,
            required: file.required,
            fragment: file.fragment,
            source: path.to_path_buf(),
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Validates the instance parameters and returns the fragment carrying them.
    fn instantiate(&self, init: &ComponentInit) -> Result<Simulation, ComponentError> {
        validate_parameters(
            &init.info,
            &self.available,
            &self.required,
            &init.parameters,
        )?;
        let mut fragment = self.fragment.clone();
        if !init.parameters.is_empty() {
            for entry in parameter_entries(&mut fragment) {
                inject(entry, &init.parameters);
            }
        }
        Ok(fragment)
    }

    pub fn build(&self, init: &ComponentInit) -> Result<Box<dyn Component>, ComponentError> {
        Ok(Box::new(DeclarativeInstance {
            info: init.info.clone(),
            fragment: self.instantiate(init)?,
        }))
    }

    pub fn build_model(&self, init: &ComponentInit) -> Result<Box<dyn Model>, ComponentError> {
        let fragment = self.instantiate(init)?;
        let data = ModelData::from_fragment(&fragment)
            .map_err(|reason| ComponentError::invalid(&init.info, reason))?;
        Ok(Box::new(DeclarativeModel {
            info: init.info.clone(),
            data,
        }))
    }
}

fn parameter_entries(fragment: &mut Simulation) -> impl Iterator<Item = &mut Entry> {
    let Simulation {
        system,
        global,
        integrator,
        topology,
        simulation_step,
        ..
    } = fragment;
    system
        .values_mut()
        .chain(global.units.iter_mut())
        .chain(global.types.iter_mut())
        .chain(global.ensemble.iter_mut())
        .chain(integrator.values_mut())
        .chain(topology.force_field.values_mut())
        .chain(simulation_step.values_mut())
}

fn inject(entry: &mut Entry, parameters: &Parameters) {
    for (key, value) in parameters {
        entry.parameters.insert(key.clone(), value.clone());
    }
}

#[derive(Debug)]
struct DeclarativeInstance {
    info: ComponentInfo,
    fragment: Simulation,
}

impl Component for DeclarativeInstance {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        Ok(self.fragment.clone())
    }
}

#[derive(Debug)]
struct DeclarativeModel {
    info: ComponentInfo,
    data: ModelData,
}

impl Component for DeclarativeModel {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        Ok(self.data.fragment())
    }
}

impl Model for DeclarativeModel {
    fn data(&self) -> &ModelData {
        &self.data
    }

    fn data_mut(&mut self) -> &mut ModelData {
        &mut self.data
    }
}
