use super::builtin;
use super::category::Category;
use super::declarative::{DeclarativeComponent, DeclarativeError};
use super::error::ComponentError;
use super::params::ComponentInit;
use super::traits::{
    BuildContext, Component, Ensemble, Integrator, Model, ModelOperation, Types, Units,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub type BuildElement =
    fn(&ComponentInit, &BuildContext<'_>) -> Result<Box<dyn Component>, ComponentError>;
pub type BuildUnits =
    fn(&ComponentInit, &BuildContext<'_>) -> Result<Box<dyn Units>, ComponentError>;
pub type BuildTypes =
    fn(&ComponentInit, &BuildContext<'_>) -> Result<Box<dyn Types>, ComponentError>;
pub type BuildEnsemble =
    fn(&ComponentInit, &BuildContext<'_>) -> Result<Box<dyn Ensemble>, ComponentError>;
pub type BuildModel =
    fn(&ComponentInit, &BuildContext<'_>) -> Result<Box<dyn Model>, ComponentError>;
pub type BuildOperation =
    fn(&ComponentInit, &BuildContext<'_>) -> Result<Box<dyn ModelOperation>, ComponentError>;
pub type BuildIntegrator =
    fn(&ComponentInit, &BuildContext<'_>) -> Result<Box<dyn Integrator>, ComponentError>;

/// How to build one component type. The variant fixes the trait the instance implements.
#[derive(Clone)]
pub enum Constructor {
    Element(BuildElement),
    Units(BuildUnits),
    Types(BuildTypes),
    Ensemble(BuildEnsemble),
    Model(BuildModel),
    Operation(BuildOperation),
    Integrator(BuildIntegrator),
    Declarative(Arc<DeclarativeComponent>),
}

impl Constructor {
    fn kind(&self) -> &'static str {
        match self {
            Constructor::Element(_) => "element",
            Constructor::Units(_) => "units",
            Constructor::Types(_) => "types",
            Constructor::Ensemble(_) => "ensemble",
            Constructor::Model(_) => "model",
            Constructor::Operation(_) => "operation",
            Constructor::Integrator(_) => "integrator",
            Constructor::Declarative(_) => "declarative",
        }
    }

    /// Whether instances built by this constructor can serve the given category.
    pub fn fits(&self, category: Category) -> bool {
        match self {
            Constructor::Element(_) => matches!(
                category,
                Category::System | Category::ModelExtensions | Category::SimulationSteps
            ),
            Constructor::Units(_) => category == Category::Units,
            Constructor::Types(_) => category == Category::Types,
            Constructor::Ensemble(_) => category == Category::Ensemble,
            Constructor::Model(_) => category == Category::Models,
            Constructor::Operation(_) => category == Category::ModelOperations,
            Constructor::Integrator(_) => category == Category::Integrators,
            Constructor::Declarative(d) => d.category() == category,
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructor::Declarative(d) => write!(f, "Declarative({})", d.source().display()),
            other => write!(f, "Constructor::{}", other.kind()),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Component type '{type_name}' not found in category '{category}' (available: {available})")]
    ComponentNotFound {
        category: Category,
        type_name: String,
        available: String,
    },
    #[error("Component type '{type_name}' in category '{category}' is defined both as a base and as an additional component")]
    ComponentAmbiguous {
        category: Category,
        type_name: String,
    },
    #[error("Component type '{type_name}' is registered twice in category '{category}'")]
    Duplicate {
        category: Category,
        type_name: String,
    },
    #[error("A {kind} constructor cannot build components of category '{category}'")]
    CategoryMismatch {
        category: Category,
        kind: &'static str,
    },
    #[error("Failed to prepare components directory '{path}': {source}")]
    Scaffold {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Declarative(#[from] DeclarativeError),
}

type Table = HashMap<Category, BTreeMap<String, Constructor>>;

/// Base (built-in) and additional (user) component tables, per category.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    base: Table,
    additional: Table,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// A registry holding every built-in component and no additional ones.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        builtin::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            base: Table::new(),
            additional: Table::new(),
        }
    }

    pub(crate) fn register_base(
        &mut self,
        category: Category,
        type_name: &str,
        constructor: Constructor,
    ) {
        debug_assert!(constructor.fits(category));
        self.base
            .entry(category)
            .or_default()
            .insert(type_name.to_string(), constructor);
    }

    /// Registers a separately compiled component into the additional table.
    pub fn register_additional(
        &mut self,
        category: Category,
        type_name: &str,
        constructor: Constructor,
    ) -> Result<(), RegistryError> {
        if !constructor.fits(category) {
            return Err(RegistryError::CategoryMismatch {
                category,
                kind: constructor.kind(),
            });
        }
        let table = self.additional.entry(category).or_default();
        if table.contains_key(type_name) {
            return Err(RegistryError::Duplicate {
                category,
                type_name: type_name.to_string(),
            });
        }
        table.insert(type_name.to_string(), constructor);
        Ok(())
    }

    /// Loads `<root>/<category>/*.toml` declarative components into the additional table.
    ///
    /// A missing `root` is created with one empty directory per category. `None`
    /// clears the additional table.
    pub fn load_additional(&mut self, root: Option<&Path>) -> Result<(), RegistryError> {
        self.additional.clear();
        let Some(root) = root else {
            return Ok(());
        };

        if !root.exists() {
            info!(
                "Components directory '{}' does not exist, creating scaffolding",
                root.display()
            );
            for category in Category::ALL {
                let dir = root.join(category.as_str());
                std::fs::create_dir_all(&dir).map_err(|e| RegistryError::Scaffold {
                    path: dir.to_string_lossy().to_string(),
                    source: e,
                })?;
            }
            return Ok(());
        }

        for category in Category::ALL {
            let dir = root.join(category.as_str());
            if !dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(&dir).map_err(|e| RegistryError::Scaffold {
                path: dir.to_string_lossy().to_string(),
                source: e,
            })?;
            let mut files: Vec<_> = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect();
            files.sort();
            for path in files {
                if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                    warn!("Ignoring non-component file '{}'", path.display());
                    continue;
                }
                let component = DeclarativeComponent::load(&path, category)?;
                debug!(
                    "Loaded additional component {}:{} from '{}'",
                    category,
                    component.type_name(),
                    path.display()
                );
                let type_name = component.type_name().to_string();
                self.register_additional(
                    category,
                    &type_name,
                    Constructor::Declarative(Arc::new(component)),
                )?;
            }
        }
        Ok(())
    }

    /// Resolves a type to exactly one constructor across the base and additional tables.
    pub fn resolve(&self, category: Category, type_name: &str) -> Result<&Constructor, RegistryError> {
        let base = self.base.get(&category).and_then(|t| t.get(type_name));
        let additional = self.additional.get(&category).and_then(|t| t.get(type_name));
        match (base, additional) {
            (Some(_), Some(_)) => Err(RegistryError::ComponentAmbiguous {
                category,
                type_name: type_name.to_string(),
            }),
            (Some(c), None) | (None, Some(c)) => Ok(c),
            (None, None) => Err(RegistryError::ComponentNotFound {
                category,
                type_name: type_name.to_string(),
                available: self.available(category).join(", "),
            }),
        }
    }

    /// All type names known for a category, sorted.
    pub fn available(&self, category: Category) -> Vec<&str> {
        let mut names: Vec<&str> = [&self.base, &self.additional]
            .into_iter()
            .filter_map(|table| table.get(&category))
            .flat_map(|t| t.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn builtins_resolve_from_the_base_table() {
        let registry = ComponentRegistry::new();
        assert!(matches!(
            registry.resolve(Category::Models, "WLC"),
            Ok(Constructor::Model(_))
        ));
        assert!(matches!(
            registry.resolve(Category::Units, "KcalMol_A"),
            Ok(Constructor::Units(_))
        ));
    }

    #[test]
    fn unknown_type_lists_available_types() {
        let registry = ComponentRegistry::new();
        let err = registry.resolve(Category::Ensemble, "NPT").unwrap_err();
        assert!(matches!(err, RegistryError::ComponentNotFound { .. }));
        assert!(err.to_string().contains("NVT"));
    }

    #[test]
    fn missing_root_creates_scaffolding() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("components");
        let mut registry = ComponentRegistry::new();
        registry.load_additional(Some(&root)).unwrap();
        for category in Category::ALL {
            assert!(root.join(category.as_str()).is_dir());
        }
    }

    #[test]
    fn additional_components_are_loaded_per_category() {
        let dir = tempdir().unwrap();
        let steps = dir.path().join("simulationSteps");
        fs::create_dir_all(&steps).unwrap();
        fs::write(
            steps.join("pressureMeasurement.toml"),
            "available = [\"intervalStep\"]\n[fragment.simulationStep.pressure]\ntype = [\"MechanicalMeasure\", \"PressureMeasure\"]\n",
        )
        .unwrap();

        let mut registry = ComponentRegistry::new();
        registry.load_additional(Some(dir.path())).unwrap();
        assert!(matches!(
            registry.resolve(Category::SimulationSteps, "pressureMeasurement"),
            Ok(Constructor::Declarative(_))
        ));
        assert!(registry
            .available(Category::SimulationSteps)
            .contains(&"pressureMeasurement"));

        registry.load_additional(None).unwrap();
        assert!(registry
            .resolve(Category::SimulationSteps, "pressureMeasurement")
            .is_err());
    }

    #[test]
    fn type_in_both_tables_is_ambiguous() {
        let dir = tempdir().unwrap();
        let system = dir.path().join("system");
        fs::create_dir_all(&system).unwrap();
        fs::write(system.join("backup.toml"), "").unwrap();

        let mut registry = ComponentRegistry::new();
        registry.load_additional(Some(dir.path())).unwrap();
        assert!(matches!(
            registry.resolve(Category::System, "backup"),
            Err(RegistryError::ComponentAmbiguous { .. })
        ));
    }

    #[test]
    fn constructors_must_fit_their_category() {
        let mut registry = ComponentRegistry::empty();
        let constructor = registry_constructor();
        assert!(matches!(
            registry.register_additional(Category::Units, "fake", constructor),
            Err(RegistryError::CategoryMismatch { .. })
        ));
    }

    fn registry_constructor() -> Constructor {
        ComponentRegistry::new()
            .resolve(Category::Models, "WLC")
            .cloned()
            .unwrap()
    }
}
