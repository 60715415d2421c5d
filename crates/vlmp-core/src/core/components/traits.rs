use super::category::Category;
use super::error::ComponentError;
use super::model::{ModelData, ParticleType};
use super::model_set::ModelSet;
use super::params::ComponentInfo;
use crate::core::selection::LocalSelection;
use crate::core::simulation::Simulation;
use nalgebra::Vector3;
use std::fmt;

/// A built component instance that contributes one fragment to a simulation.
pub trait Component: fmt::Debug {
    fn info(&self) -> &ComponentInfo;

    fn fragment(&self) -> Result<Simulation, ComponentError>;
}

pub trait Units: Component {
    /// A named physical constant expressed in this unit system (`KBOLTZ`, `ELECOEF`).
    fn constant(&self, name: &str) -> Option<f64>;
}

pub trait Types: Component {
    /// Registers a particle type; re-registering an identical type is a no-op.
    fn add_type(&mut self, particle_type: ParticleType) -> Result<(), ComponentError>;

    fn get(&self, name: &str) -> Option<&ParticleType>;

    fn names(&self) -> Vec<&str>;
}

pub trait Ensemble: Component {
    fn box_size(&self) -> Vector3<f64>;

    fn temperature(&self) -> f64;
}

/// A particle-owning component. All ids it exposes are local to the model.
pub trait Model: Component {
    fn data(&self) -> &ModelData;

    fn data_mut(&mut self) -> &mut ModelData;

    /// The particle types this model places, registered into the types component.
    fn particle_types(&self) -> Vec<ParticleType> {
        Vec::new()
    }

    /// Selection kinds this model understands beyond the common ones.
    fn defined_selections(&self) -> &[&'static str] {
        &[]
    }

    fn process_selection(&self, kind: &str, options: &[String]) -> Result<LocalSelection, String> {
        let _ = options;
        Err(format!("model does not define the selection kind '{kind}'"))
    }
}

/// A transformation over the whole model set. Operations emit no fragment.
pub trait ModelOperation: fmt::Debug {
    fn info(&self) -> &ComponentInfo;

    fn apply(&self, models: ModelSet) -> Result<ModelSet, ComponentError>;
}

pub trait Integrator: Component {
    fn integration_steps(&self) -> u64;
}

/// The already-built collaborators a component may look at while it is constructed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildContext<'a> {
    pub units: Option<&'a dyn Units>,
    pub types: Option<&'a dyn Types>,
    pub ensemble: Option<&'a dyn Ensemble>,
    pub models: Option<&'a ModelSet>,
}

impl<'a> BuildContext<'a> {
    fn missing(component: &ComponentInfo, category: Category) -> ComponentError {
        ComponentError::MissingCollaborator {
            component: component.clone(),
            category,
        }
    }

    pub fn units(&self, component: &ComponentInfo) -> Result<&'a dyn Units, ComponentError> {
        self.units
            .ok_or_else(|| Self::missing(component, Category::Units))
    }

    pub fn types(&self, component: &ComponentInfo) -> Result<&'a dyn Types, ComponentError> {
        self.types
            .ok_or_else(|| Self::missing(component, Category::Types))
    }

    pub fn ensemble(&self, component: &ComponentInfo) -> Result<&'a dyn Ensemble, ComponentError> {
        self.ensemble
            .ok_or_else(|| Self::missing(component, Category::Ensemble))
    }

    pub fn models(&self, component: &ComponentInfo) -> Result<&'a ModelSet, ComponentError> {
        self.models
            .ok_or_else(|| Self::missing(component, Category::Models))
    }
}
