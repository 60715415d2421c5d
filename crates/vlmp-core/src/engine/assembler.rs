use crate::core::components::SIMULATION_NAME;
use crate::core::components::category::Category;
use crate::core::components::descriptor::{ComponentDescriptor, PoolEntry};
use crate::core::components::error::ComponentError;
use crate::core::components::model_set::{ModelSet, ModelSetError};
use crate::core::components::params::{ComponentInfo, ComponentInit};
use crate::core::components::registry::{ComponentRegistry, Constructor, RegistryError};
use crate::core::components::traits::{
    BuildContext, Component, Ensemble, Integrator, Types, Units,
};
use crate::core::simulation::{Entry, EntryType, InvalidIdCell, MergeConflict, Simulation};
use serde_json::json;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Key of the integrator schedule entry in the `integrator` section.
pub const SCHEDULE_KEY: &str = "schedule";

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Component name '{name}' is used twice in category '{category}'")]
    DuplicateName { category: Category, name: String },

    #[error("Category '{0}' requires exactly one component, none was given")]
    MissingCategory(Category),

    #[error("Category '{category}' requires exactly one component, {count} were given")]
    TooMany { category: Category, count: usize },

    #[error("The system category must contain a 'simulationName' component")]
    MissingSimulationName,

    #[error("The system category contains {count} 'simulationName' components, exactly one is allowed")]
    MultipleSimulationNames { count: usize },

    #[error("A simulation named '{name}' already exists in the pool")]
    DuplicateSimulation { name: String },

    #[error("Component type '{type_name}' cannot be used in category '{category}'")]
    UnsupportedConstructor { category: Category, type_name: String },

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Models(#[from] ModelSetError),

    #[error("{component}: fragment does not merge: {source}")]
    Merge {
        component: String,
        #[source]
        source: MergeConflict,
    },

    #[error("{component}: {source}")]
    InvalidIds {
        component: String,
        #[source]
        source: InvalidIdCell,
    },

    #[error("State ids must be exactly 0..{count}: {reason}")]
    NonDenseIds { count: usize, reason: String },

    #[error("Force field entry '{entry}' references particle {id}, but the simulation holds {count} particles")]
    IdOutOfRange { entry: String, id: usize, count: usize },
}

/// Builds one simulation from one pool entry, category by category.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'r> {
    registry: &'r ComponentRegistry,
}

impl<'r> Assembler<'r> {
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Assembles `entry` into a validated simulation.
    ///
    /// `name_taken` reports whether a simulation name is already used in the pool.
    pub fn assemble(
        &self,
        entry: &PoolEntry,
        name_taken: impl Fn(&str) -> bool,
    ) -> Result<Simulation, AssemblyError> {
        check_unique_names(entry)?;
        let mut simulation = Simulation::new();

        // system
        let names = entry
            .descriptors(Category::System)
            .iter()
            .filter(|d| d.type_name == SIMULATION_NAME)
            .count();
        match names {
            0 => return Err(AssemblyError::MissingSimulationName),
            1 => {}
            count => return Err(AssemblyError::MultipleSimulationNames { count }),
        }
        for d in entry.descriptors(Category::System) {
            let component = self.element(Category::System, d, &BuildContext::default())?;
            merge_component(&mut simulation, component.as_ref())?;
        }
        let name = simulation
            .name()
            .ok_or(AssemblyError::MissingSimulationName)?
            .to_string();
        if name_taken(&name) {
            return Err(AssemblyError::DuplicateSimulation { name });
        }
        debug!("Assembling simulation '{}'", name);

        // units, types, ensemble
        let units = self.units(exactly_one(entry, Category::Units)?)?;
        let mut types = self.types(exactly_one(entry, Category::Types)?, units.as_ref())?;
        let ensemble = self.ensemble(
            exactly_one(entry, Category::Ensemble)?,
            units.as_ref(),
            types.as_ref(),
        )?;

        // models
        let mut models = ModelSet::new();
        for d in entry.descriptors(Category::Models) {
            let model = {
                let ctx = BuildContext {
                    units: Some(units.as_ref()),
                    types: Some(types.as_ref()),
                    ensemble: Some(ensemble.as_ref()),
                    models: None,
                };
                let (init, constructor) = self.resolve(Category::Models, d)?;
                match constructor {
                    Constructor::Model(build) => build(&init, &ctx)?,
                    Constructor::Declarative(declarative) => declarative.build_model(&init)?,
                    _ => return Err(unsupported(Category::Models, d)),
                }
            };
            for particle_type in model.particle_types() {
                types.add_type(particle_type)?;
            }
            models.insert(model)?;
        }
        let span = models.assign_offsets()?;
        debug!("'{}': {} models span {} ids", name, models.len(), span);

        // model operations
        for d in entry.descriptors(Category::ModelOperations) {
            let operation = {
                let ctx = BuildContext {
                    units: Some(units.as_ref()),
                    types: Some(types.as_ref()),
                    ensemble: Some(ensemble.as_ref()),
                    models: Some(&models),
                };
                let (init, constructor) = self.resolve(Category::ModelOperations, d)?;
                match constructor {
                    Constructor::Operation(build) => build(&init, &ctx)?,
                    _ => return Err(unsupported(Category::ModelOperations, d)),
                }
            };
            debug!("Applying {}", operation.info());
            models = operation.apply(models)?;
            models.assign_offsets()?;
        }

        for model in models.iter() {
            let component = model.model();
            let mut fragment = component.fragment()?;
            fragment
                .shift_ids(model.offset().0)
                .map_err(|source| AssemblyError::InvalidIds {
                    component: component.info().to_string(),
                    source,
                })?;
            merge_fragment(&mut simulation, component.info(), fragment)?;
        }
        merge_component(&mut simulation, units.as_ref())?;
        merge_component(&mut simulation, types.as_ref())?;
        merge_component(&mut simulation, ensemble.as_ref())?;

        let ctx = BuildContext {
            units: Some(units.as_ref()),
            types: Some(types.as_ref()),
            ensemble: Some(ensemble.as_ref()),
            models: Some(&models),
        };

        for d in entry.descriptors(Category::ModelExtensions) {
            let component = self.element(Category::ModelExtensions, d, &ctx)?;
            merge_component(&mut simulation, component.as_ref())?;
        }

        let mut schedule = Entry::new(EntryType::new("Schedule", "Integrator"))
            .with_labels(&["order", "integrator", "steps"]);
        for (order, d) in entry.descriptors(Category::Integrators).iter().enumerate() {
            let integrator = self.integrator(d, &ctx)?;
            merge_component(&mut simulation, integrator.as_ref())?;
            schedule.push_row(vec![
                json!(order + 1),
                json!(integrator.info().name),
                json!(integrator.integration_steps()),
            ]);
        }
        if !schedule.data.is_empty() {
            let mut fragment = Simulation::new();
            fragment.integrator.insert(SCHEDULE_KEY.to_string(), schedule);
            simulation.merge(fragment).map_err(|source| AssemblyError::Merge {
                component: SCHEDULE_KEY.to_string(),
                source,
            })?;
        }

        for d in entry.descriptors(Category::SimulationSteps) {
            let component = self.element(Category::SimulationSteps, d, &ctx)?;
            merge_component(&mut simulation, component.as_ref())?;
        }

        validate_ids(&simulation)?;
        debug!(
            "Assembled '{}' with {} particles",
            name,
            simulation.number_of_particles()
        );
        Ok(simulation)
    }

    fn resolve(
        &self,
        category: Category,
        d: &ComponentDescriptor,
    ) -> Result<(ComponentInit, &'r Constructor), AssemblyError> {
        let constructor = self.registry.resolve(category, &d.type_name)?;
        let init = ComponentInit::new(
            ComponentInfo::new(category, d.instance_name(), d.type_name.as_str()),
            d.parameters.clone(),
        );
        debug!("Building {}", init.info);
        Ok((init, constructor))
    }

    fn element(
        &self,
        category: Category,
        d: &ComponentDescriptor,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn Component>, AssemblyError> {
        let (init, constructor) = self.resolve(category, d)?;
        match constructor {
            Constructor::Element(build) => Ok(build(&init, ctx)?),
            Constructor::Declarative(declarative) => Ok(declarative.build(&init)?),
            _ => Err(unsupported(category, d)),
        }
    }

    fn units(&self, d: &ComponentDescriptor) -> Result<Box<dyn Units>, AssemblyError> {
        match self.resolve(Category::Units, d)? {
            (init, Constructor::Units(build)) => Ok(build(&init, &BuildContext::default())?),
            _ => Err(unsupported(Category::Units, d)),
        }
    }

    fn types(
        &self,
        d: &ComponentDescriptor,
        units: &dyn Units,
    ) -> Result<Box<dyn Types>, AssemblyError> {
        let ctx = BuildContext {
            units: Some(units),
            ..BuildContext::default()
        };
        match self.resolve(Category::Types, d)? {
            (init, Constructor::Types(build)) => Ok(build(&init, &ctx)?),
            _ => Err(unsupported(Category::Types, d)),
        }
    }

    fn ensemble(
        &self,
        d: &ComponentDescriptor,
        units: &dyn Units,
        types: &dyn Types,
    ) -> Result<Box<dyn Ensemble>, AssemblyError> {
        let ctx = BuildContext {
            units: Some(units),
            types: Some(types),
            ..BuildContext::default()
        };
        match self.resolve(Category::Ensemble, d)? {
            (init, Constructor::Ensemble(build)) => Ok(build(&init, &ctx)?),
            _ => Err(unsupported(Category::Ensemble, d)),
        }
    }

    fn integrator(
        &self,
        d: &ComponentDescriptor,
        ctx: &BuildContext<'_>,
    ) -> Result<Box<dyn Integrator>, AssemblyError> {
        match self.resolve(Category::Integrators, d)? {
            (init, Constructor::Integrator(build)) => Ok(build(&init, ctx)?),
            _ => Err(unsupported(Category::Integrators, d)),
        }
    }
}

fn unsupported(category: Category, d: &ComponentDescriptor) -> AssemblyError {
    AssemblyError::UnsupportedConstructor {
        category,
        type_name: d.type_name.clone(),
    }
}

fn check_unique_names(entry: &PoolEntry) -> Result<(), AssemblyError> {
    for category in Category::ALL {
        let mut seen = HashSet::new();
        for d in entry.descriptors(category) {
            if !seen.insert(d.instance_name()) {
                return Err(AssemblyError::DuplicateName {
                    category,
                    name: d.instance_name().to_string(),
                });
            }
        }
    }
    Ok(())
}

fn exactly_one(entry: &PoolEntry, category: Category) -> Result<&ComponentDescriptor, AssemblyError> {
    match entry.descriptors(category) {
        [] => Err(AssemblyError::MissingCategory(category)),
        [single] => Ok(single),
        many => Err(AssemblyError::TooMany {
            category,
            count: many.len(),
        }),
    }
}

fn merge_component<C: Component + ?Sized>(
    simulation: &mut Simulation,
    component: &C,
) -> Result<(), AssemblyError> {
    let fragment = component.fragment()?;
    merge_fragment(simulation, component.info(), fragment)
}

fn merge_fragment(
    simulation: &mut Simulation,
    info: &ComponentInfo,
    fragment: Simulation,
) -> Result<(), AssemblyError> {
    simulation
        .merge(fragment)
        .map_err(|source| AssemblyError::Merge {
            component: info.to_string(),
            source,
        })
}

/// State ids must be exactly `0..N`; every id referenced by the force field must be below `N`.
fn validate_ids(simulation: &Simulation) -> Result<(), AssemblyError> {
    let count = simulation.number_of_particles();
    if count > 0 {
        let ids = simulation
            .state_ids()
            .map_err(|e| AssemblyError::NonDenseIds {
                count,
                reason: e.to_string(),
            })?;
        if let Some((expected, found)) = ids.iter().enumerate().find(|(i, id)| i != *id) {
            return Err(AssemblyError::NonDenseIds {
                count,
                reason: format!("expected id {expected}, found {found}"),
            });
        }
    }
    for (name, entry) in &simulation.topology.force_field {
        for row in &entry.data {
            if let Some(id) = entry.row_ids(row).into_iter().find(|&id| id >= count) {
                return Err(AssemblyError::IdOutOfRange {
                    entry: name.clone(),
                    id,
                    count,
                });
            }
        }
    }
    Ok(())
}
