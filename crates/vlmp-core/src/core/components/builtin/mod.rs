//! Components shipped with the library, registered into the base table.

mod ensemble;
mod extensions;
mod integrators;
mod models;
mod operations;
mod steps;
mod system;
mod types;
mod units;

pub use system::SIMULATION_NAME;

use super::error::ComponentError;
use super::params::ComponentInfo;
use super::registry::ComponentRegistry;
use super::traits::Component;
use crate::core::simulation::{Entry, Simulation};

pub(super) fn register(registry: &mut ComponentRegistry) {
    system::register(registry);
    units::register(registry);
    types::register(registry);
    ensemble::register(registry);
    models::register(registry);
    operations::register(registry);
    extensions::register(registry);
    integrators::register(registry);
    steps::register(registry);
}

/// Where a single-entry component places its entry in the simulation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    System,
    ForceField,
    SimulationStep,
}

/// A component whose whole fragment is one named entry.
#[derive(Debug)]
struct EntryComponent {
    info: ComponentInfo,
    placement: Placement,
    key: String,
    entry: Entry,
}

impl EntryComponent {
    /// Keys the entry by the instance name.
    fn new(info: ComponentInfo, placement: Placement, entry: Entry) -> Self {
        let key = info.name.clone();
        Self {
            info,
            placement,
            key,
            entry,
        }
    }

    fn with_key(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }

    fn boxed(self) -> Box<dyn Component> {
        Box::new(self)
    }
}

impl Component for EntryComponent {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn fragment(&self) -> Result<Simulation, ComponentError> {
        let mut sim = Simulation::new();
        let section = match self.placement {
            Placement::System => &mut sim.system,
            Placement::ForceField => &mut sim.topology.force_field,
            Placement::SimulationStep => &mut sim.simulation_step,
        };
        section.insert(self.key.clone(), self.entry.clone());
        Ok(sim)
    }
}
