use super::session::materialize;
use crate::core::components::registry::ComponentRegistry;
use crate::core::io::pool::load_pool;
use crate::core::io::session::SessionDescriptor;
use crate::engine::config::PrepareConfig;
use crate::engine::distribution::{SimulationSet, distribute};
use crate::engine::error::EngineError;
use crate::engine::pool::SimulationPool;
use crate::engine::progress::ProgressReporter;
use std::path::PathBuf;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct PrepareResult {
    pub session_dir: PathBuf,
    pub sets: Vec<SimulationSet>,
    pub descriptor: SessionDescriptor,
}

/// Runs `load pool -> assemble -> distribute -> materialize` for one session.
#[instrument(skip_all, name = "prepare_workflow")]
pub fn run(config: &PrepareConfig, reporter: &ProgressReporter) -> Result<PrepareResult, EngineError> {
    let registry = reporter.phase("Loading components", || {
        let mut registry = ComponentRegistry::new();
        registry.load_additional(config.components_dir.as_deref())?;
        Ok::<_, EngineError>(registry)
    })?;

    let entries = reporter.phase("Loading pool", || load_pool(&config.pool_path))?;
    info!(
        "Loaded {} pool entr{} from '{}'",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        config.pool_path.display()
    );

    let pool = reporter.phase("Assembling", || {
        SimulationPool::assemble(&registry, &entries, reporter)
    })?;

    let sets = reporter.phase("Distributing", || distribute(&pool, &config.distribution))?;
    info!(
        "Distributed {} simulation(s) into {} set(s) using '{}'",
        pool.len(),
        sets.len(),
        config.distribution
    );

    let session_dir = config.session_dir();
    let descriptor = reporter.phase("Materializing", || {
        materialize(&session_dir, &config.session_name, &pool, &sets, reporter)
    })?;

    Ok(PrepareResult {
        session_dir,
        sets,
        descriptor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::session::DESCRIPTOR_FILE;
    use crate::engine::assembler::AssemblyError;
    use crate::engine::config::PrepareConfigBuilder;
    use crate::engine::distribution::DistributionStrategy;
    use crate::engine::progress::Progress;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn pool_json(names: &[(&str, usize)]) -> String {
        let entries: Vec<_> = names
            .iter()
            .map(|(name, n)| {
                serde_json::json!({
                    "system": [{"type": "simulationName", "parameters": {"simulationName": name}}],
                    "units": [{"type": "none"}],
                    "types": [{"type": "basic"}],
                    "ensemble": [{"type": "NVT", "parameters": {"box": [20.0, 20.0, 20.0], "temperature": 1.0}}],
                    "integrators": [{"type": "BBK", "parameters": {"timeStep": 0.01, "frictionConstant": 1.0, "integrationSteps": 100}}],
                    "models": [{"type": "WLC", "name": "chain", "parameters": {"N": n, "b": 1.0, "Kb": 100.0, "Ka": 10.0}}],
                    "simulationSteps": [{"type": "saveState", "name": "write", "parameters": {"intervalStep": 10, "outputFilePath": "traj", "outputFormat": "sp"}}]
                })
            })
            .collect();
        serde_json::to_string_pretty(&entries).unwrap()
    }

    #[test]
    fn prepare_writes_a_session() {
        let dir = tempdir().unwrap();
        let pool_path = dir.path().join("pool.json");
        fs::write(&pool_path, pool_json(&[("a", 4), ("b", 3), ("c", 2)])).unwrap();

        let config = PrepareConfigBuilder::new()
            .pool_path(pool_path)
            .session_name("session")
            .output_dir(dir.path().to_path_buf())
            .distribution(DistributionStrategy::Size { size: 2 })
            .build()
            .unwrap();
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|e| {
            if let Progress::PhaseStart { name } = e {
                phases.lock().unwrap().push(name);
            }
        }));
        let result = run(&config, &reporter).unwrap();
        drop(reporter);

        assert_eq!(
            phases.into_inner().unwrap(),
            vec!["Loading components", "Loading pool", "Assembling", "Distributing", "Materializing"]
        );
        assert_eq!(result.sets.len(), 2);
        assert_eq!(result.descriptor.simulations.len(), 3);
        assert!(result.session_dir.join(DESCRIPTOR_FILE).is_file());
        assert!(
            result
                .session_dir
                .join("simulationSets/simulationSet_1/simulationSet_1.json")
                .is_file()
        );
    }

    #[test]
    fn failing_entry_stops_before_materialization() {
        let dir = tempdir().unwrap();
        let pool_path = dir.path().join("pool.json");
        fs::write(&pool_path, pool_json(&[("a", 2), ("a", 2)])).unwrap();

        let config = PrepareConfigBuilder::new()
            .pool_path(pool_path)
            .session_name("session")
            .output_dir(dir.path().to_path_buf())
            .build()
            .unwrap();
        let err = run(&config, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Assembly {
                index: 1,
                source: AssemblyError::DuplicateSimulation { .. }
            }
        ));
        assert!(!dir.path().join("session").exists());
    }
}
