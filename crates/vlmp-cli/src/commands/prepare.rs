use crate::cli::PrepareArgs;
use crate::config::build_prepare_config;
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use tokio::sync::mpsc;
use tracing::info;
use vlmp::core::io::session::DESCRIPTOR_FILE;
use vlmp::engine::progress::ProgressReporter;
use vlmp::workflows;

pub async fn run(args: PrepareArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Building prepare configuration...");
    let config = build_prepare_config(&args)?;
    info!(
        "Preparing session '{}' from pool {:?} with strategy '{}'",
        config.session_name, config.pool_path, config.distribution
    );

    let progress_handler = CliProgressHandler::new(ui_sender);
    let result = tokio::task::spawn_blocking(move || {
        let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
        workflows::prepare::run(&config, &reporter)
    })
    .await
    .map_err(|e| CliError::Other(anyhow::anyhow!("Prepare task failed: {}", e)))??;

    println!(
        "Session '{}' prepared: {} simulation(s) in {} set(s).",
        result.descriptor.name,
        result.descriptor.simulations.len(),
        result.sets.len()
    );
    for set in &result.sets {
        println!("  {} -> {}", set.name, set.simulations.join(", "));
    }
    println!(
        "Run it with: vlmp run -s {} --local",
        result.session_dir.join(DESCRIPTOR_FILE).display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;
    use vlmp::core::io::session::SessionDescriptor;
    use vlmp::engine::error::EngineError;

    fn write_pool(dir: &std::path::Path, names: &[&str]) -> PathBuf {
        let entries: Vec<_> = names
            .iter()
            .map(|name| {
                serde_json::json!({
                    "system": [{"type": "simulationName", "parameters": {"simulationName": name}}],
                    "units": [{"type": "none"}],
                    "types": [{"type": "basic"}],
                    "ensemble": [{"type": "NVT", "parameters": {"box": [20.0, 20.0, 20.0], "temperature": 1.0}}],
                    "integrators": [{"type": "BBK", "parameters": {"timeStep": 0.01, "frictionConstant": 1.0, "integrationSteps": 100}}],
                    "models": [{"type": "WLC", "name": "chain", "parameters": {"N": 3, "b": 1.0, "Kb": 100.0, "Ka": 10.0}}]
                })
            })
            .collect();
        let path = dir.join("pool.json");
        fs::write(&path, serde_json::to_string_pretty(&entries).unwrap()).unwrap();
        path
    }

    fn args(pool: PathBuf, output: PathBuf) -> PrepareArgs {
        PrepareArgs {
            pool,
            config: None,
            session_name: Some("polymers".to_string()),
            output: Some(output),
            distribution: Some("size:2".to_string()),
            components: None,
            set_values: vec![],
        }
    }

    #[tokio::test]
    async fn prepare_command_writes_the_descriptor() {
        let dir = tempdir().unwrap();
        let pool = write_pool(dir.path(), &["a", "b", "c"]);
        let (sender, _receiver) = mpsc::channel(1024);

        run(args(pool, dir.path().to_path_buf()), sender).await.unwrap();

        let descriptor =
            SessionDescriptor::load(&dir.path().join("polymers").join(DESCRIPTOR_FILE)).unwrap();
        assert_eq!(descriptor.name, "polymers");
        assert_eq!(descriptor.simulation_sets.len(), 2);
        assert_eq!(descriptor.simulation_sets[0].simulations, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn engine_errors_are_forwarded() {
        let dir = tempdir().unwrap();
        let pool = write_pool(dir.path(), &["a", "a"]);
        let (sender, _receiver) = mpsc::channel(1024);

        let err = run(args(pool, dir.path().to_path_buf()), sender)
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Vlmp(EngineError::Assembly { index: 1, .. })));
        assert_eq!(err.exit_code(), 1);
    }
}
