use super::assembler::{Assembler, AssemblyError};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::components::descriptor::PoolEntry;
use crate::core::components::registry::ComponentRegistry;
use crate::core::simulation::Simulation;
use indexmap::IndexMap;
use tracing::info;

/// One assembled simulation together with the pool entry it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSimulation {
    pub name: String,
    pub simulation: Simulation,
    pub original: PoolEntry,
}

/// Assembled simulations keyed by name, in pool order.
#[derive(Debug, Clone, Default)]
pub struct SimulationPool {
    simulations: IndexMap<String, AssembledSimulation>,
}

impl SimulationPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles every entry in order; the first failing entry aborts the pool.
    pub fn assemble(
        registry: &ComponentRegistry,
        entries: &[PoolEntry],
        reporter: &ProgressReporter,
    ) -> Result<Self, EngineError> {
        let assembler = Assembler::new(registry);
        let mut pool = Self::new();
        reporter.report(Progress::TaskStart {
            total_steps: entries.len() as u64,
        });
        for (index, entry) in entries.iter().enumerate() {
            let simulation = assembler
                .assemble(entry, |name| pool.contains(name))
                .map_err(|source| EngineError::Assembly { index, source })?;
            pool.push(simulation, entry.clone())
                .map_err(|source| EngineError::Assembly { index, source })?;
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        info!("Assembled {} simulation(s)", pool.len());
        Ok(pool)
    }

    /// Adds an assembled simulation under its own name.
    pub fn push(&mut self, simulation: Simulation, original: PoolEntry) -> Result<(), AssemblyError> {
        let name = simulation
            .name()
            .ok_or(AssemblyError::MissingSimulationName)?
            .to_string();
        if self.simulations.contains_key(&name) {
            return Err(AssemblyError::DuplicateSimulation { name });
        }
        self.simulations.insert(
            name.clone(),
            AssembledSimulation {
                name,
                simulation,
                original,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.simulations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simulations.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.simulations.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AssembledSimulation> {
        self.simulations.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssembledSimulation> {
        self.simulations.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.simulations.keys().map(String::as_str)
    }
}
