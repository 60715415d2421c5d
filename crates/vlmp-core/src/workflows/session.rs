use crate::core::io::session::{
    DESCRIPTOR_FILE, SessionDescriptor, SessionSet, SessionSimulation,
};
use crate::core::simulation::Simulation;
use crate::engine::aggregate::aggregate;
use crate::engine::distribution::SimulationSet;
use crate::engine::error::EngineError;
use crate::engine::paths::rewrite_output_paths;
use crate::engine::pool::SimulationPool;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const SETS_DIR: &str = "simulationSets";
pub const RESULTS_DIR: &str = "results";
pub const SIMULATION_FILE: &str = "simulation.json";

#[derive(Debug, Error)]
pub enum MaterializationError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to serialize '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Link '{link}' already exists and does not point to '{expected}'")]
    SymlinkClash { link: String, expected: String },
    #[error("Simulation set '{set}' references unknown simulation '{simulation}'")]
    UnknownSimulation { set: String, simulation: String },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MaterializationError + '_ {
    move |source| MaterializationError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

/// Writes a distributed pool to `session_dir` and returns the descriptor it saved.
///
/// The directory layout is:
///
/// ```text
/// <session>/
///   VLMPsession.json
///   simulationSets/<set>/<set>.json
///   simulationSets/<set>/<simulation>/simulation.json
///   results/<simulation> -> ../simulationSets/<set>/<simulation>
/// ```
///
/// Output file parameters are relocated under each simulation's folder before
/// anything is written. Re-running over an existing session reuses its
/// directories and rewrites every file.
///
/// # Errors
///
/// Returns [`EngineError::Materialization`] for file system failures or a
/// clashing result link, and [`EngineError::Aggregation`] when a set cannot be
/// folded into one simulation. Sets written before the failure stay on disk.
pub fn materialize(
    session_dir: &Path,
    session_name: &str,
    pool: &SimulationPool,
    sets: &[SimulationSet],
    reporter: &ProgressReporter,
) -> Result<SessionDescriptor, EngineError> {
    let sets_root = session_dir.join(SETS_DIR);
    let results_root = session_dir.join(RESULTS_DIR);
    create_dir(&sets_root)?;
    create_dir(&results_root)?;

    let mut descriptor = SessionDescriptor {
        name: session_name.to_string(),
        simulations: Vec::with_capacity(pool.len()),
        simulation_sets: Vec::with_capacity(sets.len()),
    };

    reporter.report(Progress::TaskStart {
        total_steps: sets.len() as u64,
    });
    for set in sets {
        let set_folder = Path::new(SETS_DIR).join(&set.name);
        create_dir(&session_dir.join(&set_folder))?;

        let mut members: Vec<(&str, Simulation)> = Vec::with_capacity(set.simulations.len());
        for name in &set.simulations {
            let assembled = pool
                .get(name)
                .ok_or_else(|| MaterializationError::UnknownSimulation {
                    set: set.name.clone(),
                    simulation: name.clone(),
                })?;
            let mut simulation = assembled.simulation.clone();
            rewrite_output_paths(&mut simulation, name);

            let simulation_folder = set_folder.join(name);
            let absolute_folder = session_dir.join(&simulation_folder);
            create_dir(&absolute_folder)?;
            write_json(&absolute_folder.join(SIMULATION_FILE), &simulation)?;

            let result_folder = Path::new(RESULTS_DIR).join(name);
            link_result(
                &session_dir.join(&result_folder),
                &Path::new("..").join(&simulation_folder),
            )?;

            descriptor.simulations.push(SessionSimulation {
                name: name.clone(),
                simulation_folder,
                result_folder,
                original_info: assembled.original.clone(),
            });
            members.push((name.as_str(), simulation));
        }

        let refs: Vec<(&str, &Simulation)> = members.iter().map(|(n, s)| (*n, s)).collect();
        let combined = aggregate(&set.name, &refs).map_err(|source| EngineError::Aggregation {
            set: set.name.clone(),
            source,
        })?;
        let aggregate_file = set_folder.join(format!("{}.json", set.name));
        write_json(&session_dir.join(&aggregate_file), &combined)?;
        debug!(
            "Wrote set '{}' with {} simulation(s) and {} particle(s)",
            set.name,
            members.len(),
            combined.number_of_particles()
        );

        descriptor.simulation_sets.push(SessionSet {
            name: set.name.clone(),
            folder: set_folder,
            aggregate_file,
            simulations: set.simulations.clone(),
        });
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    descriptor.save(&session_dir.join(DESCRIPTOR_FILE))?;
    info!(
        "Session '{}' written to '{}'",
        session_name,
        session_dir.display()
    );
    Ok(descriptor)
}

fn create_dir(path: &Path) -> Result<(), MaterializationError> {
    std::fs::create_dir_all(path).map_err(io_error(path))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MaterializationError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| MaterializationError::Json {
        path: path.to_string_lossy().to_string(),
        source,
    })?;
    std::fs::write(path, content).map_err(io_error(path))
}

/// Creates `link -> target`, keeping an existing link that already points there.
fn link_result(link: &Path, target: &Path) -> Result<(), MaterializationError> {
    let clash = || MaterializationError::SymlinkClash {
        link: link.to_string_lossy().to_string(),
        expected: target.to_string_lossy().to_string(),
    };
    match std::fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let current: PathBuf = std::fs::read_link(link).map_err(io_error(link))?;
            if current == target { Ok(()) } else { Err(clash()) }
        }
        Ok(_) => Err(clash()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => create_symlink(target, link),
        Err(e) => Err(io_error(link)(e)),
    }
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<(), MaterializationError> {
    std::os::unix::fs::symlink(target, link).map_err(io_error(link))
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> Result<(), MaterializationError> {
    std::os::windows::fs::symlink_dir(target, link).map_err(io_error(link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::components::descriptor::PoolEntry;
    use crate::core::simulation::{Entry, EntryType, INFORMATION_KEY, SIMULATION_INFORMATION};
    use crate::engine::aggregate::GROUPS_KEY;
    use crate::engine::distribution::{DistributionStrategy, distribute};
    use serde_json::json;
    use tempfile::tempdir;

    fn simulation(name: &str, particles: usize) -> Simulation {
        let mut sim = Simulation::new();
        sim.system.insert(
            INFORMATION_KEY.into(),
            Entry::new(EntryType::new(SIMULATION_INFORMATION.0, SIMULATION_INFORMATION.1))
                .with_parameter("name", name),
        );
        sim.state = Entry::table(&["id", "position"]);
        sim.topology.structure = Entry::table(&["id", "type"]);
        for i in 0..particles {
            sim.state.push_row(vec![json!(i), json!([0.0, 0.0, i as f64])]);
            sim.topology.structure.push_row(vec![json!(i), json!("A")]);
        }
        sim.simulation_step.insert(
            "write".into(),
            Entry::new(EntryType::new("WriteStep", "WriteStep"))
                .with_parameter("intervalStep", 10)
                .with_parameter("outputFilePath", "traj")
                .with_parameter("outputFormat", "sp"),
        );
        sim
    }

    fn pool() -> SimulationPool {
        let mut pool = SimulationPool::new();
        pool.push(simulation("a", 3), PoolEntry::default()).unwrap();
        pool.push(simulation("b", 2), PoolEntry::default()).unwrap();
        pool
    }

    fn one_set() -> Vec<SimulationSet> {
        vec![SimulationSet {
            name: "simulationSet_0".into(),
            simulations: vec!["a".into(), "b".into()],
        }]
    }

    #[test]
    fn layout_and_descriptor_are_written() {
        let dir = tempdir().unwrap();
        let session = dir.path().join("session");
        let descriptor =
            materialize(&session, "session", &pool(), &one_set(), &ProgressReporter::new()).unwrap();

        let set_dir = session.join(SETS_DIR).join("simulationSet_0");
        let member: Simulation = serde_json::from_str(
            &std::fs::read_to_string(set_dir.join("a").join(SIMULATION_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(
            member.simulation_step["write"].parameters["outputFilePath"],
            json!("a/traj")
        );

        let combined: Simulation = serde_json::from_str(
            &std::fs::read_to_string(set_dir.join("simulationSet_0.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(combined.number_of_particles(), 5);
        assert!(combined.simulation_step.contains_key(GROUPS_KEY));
        assert_eq!(
            combined.simulation_step["write_simId_1"].parameters["outputFilePath"],
            json!("b/traj")
        );

        let saved = SessionDescriptor::load(&session.join(DESCRIPTOR_FILE)).unwrap();
        assert_eq!(saved, descriptor);
        let saved_names: Vec<&str> = saved.simulations.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(saved_names, vec!["a", "b"]);
        assert_eq!(saved.simulation_sets[0].simulations, one_set()[0].simulations);
        assert_eq!(
            saved.simulation_sets[0].aggregate_file,
            Path::new(SETS_DIR).join("simulationSet_0").join("simulationSet_0.json")
        );
    }

    #[cfg(unix)]
    #[test]
    fn descriptor_mirrors_pool_and_distribution() {
        let dir = tempdir().unwrap();
        let session = dir.path().join("session");
        let mut pool = pool();
        pool.push(simulation("c", 1), PoolEntry::default()).unwrap();
        let sets = distribute(&pool, &DistributionStrategy::Size { size: 2 }).unwrap();
        assert_eq!(sets.len(), 2);

        let descriptor =
            materialize(&session, "session", &pool, &sets, &ProgressReporter::new()).unwrap();

        let described: Vec<&str> = descriptor.simulations.iter().map(|s| s.name.as_str()).collect();
        let pooled: Vec<&str> = pool.names().collect();
        assert_eq!(described, pooled);

        assert_eq!(descriptor.simulation_sets.len(), sets.len());
        for (written, planned) in descriptor.simulation_sets.iter().zip(&sets) {
            assert_eq!(written.name, planned.name);
            assert_eq!(written.simulations, planned.simulations);
        }

        for set in &descriptor.simulation_sets {
            let set_folder = std::fs::canonicalize(session.join(&set.folder)).unwrap();
            for name in &set.simulations {
                let entry = descriptor
                    .simulations
                    .iter()
                    .find(|s| &s.name == name)
                    .unwrap();
                let resolved = std::fs::canonicalize(session.join(&entry.result_folder)).unwrap();
                assert_eq!(resolved, set_folder.join(name));
                assert_eq!(entry.simulation_folder, set.folder.join(name));
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn rerun_keeps_matching_links() {
        let dir = tempdir().unwrap();
        let session = dir.path().join("session");
        let reporter = ProgressReporter::new();
        materialize(&session, "session", &pool(), &one_set(), &reporter).unwrap();
        materialize(&session, "session", &pool(), &one_set(), &reporter).unwrap();

        let link = session.join(RESULTS_DIR).join("a");
        assert_eq!(
            std::fs::read_link(&link).unwrap(),
            Path::new("..").join(SETS_DIR).join("simulationSet_0").join("a")
        );
        assert!(link.join(SIMULATION_FILE).is_file());
    }

    #[cfg(unix)]
    #[test]
    fn moved_simulation_clashes_with_its_old_link() {
        let dir = tempdir().unwrap();
        let session = dir.path().join("session");
        let reporter = ProgressReporter::new();
        materialize(&session, "session", &pool(), &one_set(), &reporter).unwrap();

        let split = vec![
            SimulationSet {
                name: "simulationSet_0".into(),
                simulations: vec!["a".into()],
            },
            SimulationSet {
                name: "simulationSet_1".into(),
                simulations: vec!["b".into()],
            },
        ];
        let err = materialize(&session, "session", &pool(), &split, &reporter).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Materialization(MaterializationError::SymlinkClash { .. })
        ));
    }

    #[test]
    fn unknown_members_are_reported() {
        let dir = tempdir().unwrap();
        let sets = vec![SimulationSet {
            name: "simulationSet_0".into(),
            simulations: vec!["ghost".into()],
        }];
        let err = materialize(dir.path(), "s", &pool(), &sets, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Materialization(MaterializationError::UnknownSimulation { .. })
        ));
    }
}
