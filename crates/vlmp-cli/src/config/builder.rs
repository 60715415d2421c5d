use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileStrategy};
use super::models::LaunchConfig;
use crate::cli::{PrepareArgs, RunArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use std::path::PathBuf;
use vlmp::engine::config::{PrepareConfig, PrepareConfigBuilder};

pub fn build_prepare_config(args: &PrepareArgs) -> Result<PrepareConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::load(args.config.as_deref())?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let session_file = file_config.session.take().unwrap_or_default();
    let session_name = args
        .session_name
        .clone()
        .or(session_file.name)
        .unwrap_or(defaults.session_name);
    let output_dir = args
        .output
        .clone()
        .or(session_file.output_dir)
        .unwrap_or(defaults.output_dir);

    let strategy = match &args.distribution {
        Some(text) => FileStrategy::Text(text.clone()),
        None => file_config
            .distribution
            .take()
            .and_then(|d| d.strategy)
            .unwrap_or(FileStrategy::Text(defaults.strategy)),
    }
    .resolve()?;

    let components_dir = args.components.clone().or_else(|| {
        file_config
            .components
            .take()
            .and_then(|c| c.additional_dir)
    });

    PrepareConfigBuilder::new()
        .pool_path(args.pool.clone())
        .session_name(session_name)
        .output_dir(output_dir)
        .distribution(strategy)
        .components_dir(components_dir)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

pub fn build_launch_config(args: &RunArgs) -> Result<LaunchConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::load(args.config.as_deref())?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let launcher = file_config.launcher.take().unwrap_or_default();
    let simulator = launcher.simulator.unwrap_or(defaults.simulator);
    let queue_command = launcher.queue_command.unwrap_or(defaults.queue_command);
    let gpus = args
        .gpu_list
        .clone()
        .or(launcher.gpus)
        .unwrap_or(defaults.gpus);
    if gpus.is_empty() {
        return Err(CliError::Config(
            "At least one GPU is required to run simulations.".to_string(),
        ));
    }

    Ok(LaunchConfig {
        simulator: parser::split_command(&simulator, "launcher.simulator")
            .map_err(|e| CliError::Config(e.to_string()))?,
        queue_command: parser::split_command(&queue_command, "launcher.queue-command")
            .map_err(|e| CliError::Config(e.to_string()))?,
        gpus,
        session_file: args.simulation_sets_info.clone(),
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value_str) = parser::parse_key_value(kv_pair)
            .map_err(|e| CliError::Config(e.to_string()))?;

        match key {
            "session.name" => {
                config.session.get_or_insert_with(Default::default).name =
                    Some(value_str.to_string());
            }
            "session.output-dir" => {
                config.session.get_or_insert_with(Default::default).output_dir =
                    Some(PathBuf::from(value_str));
            }
            "distribution.strategy" => {
                config
                    .distribution
                    .get_or_insert_with(Default::default)
                    .strategy = Some(FileStrategy::Text(value_str.to_string()));
            }
            "components.additional-dir" => {
                config
                    .components
                    .get_or_insert_with(Default::default)
                    .additional_dir = Some(PathBuf::from(value_str));
            }
            "launcher.simulator" => {
                config.launcher.get_or_insert_with(Default::default).simulator =
                    Some(value_str.to_string());
            }
            "launcher.queue-command" => {
                config
                    .launcher
                    .get_or_insert_with(Default::default)
                    .queue_command = Some(value_str.to_string());
            }
            "launcher.gpus" => {
                let gpus = parser::parse_gpu_list(value_str)
                    .map_err(|e| CliError::Config(e.to_string()))?;
                config.launcher.get_or_insert_with(Default::default).gpus = Some(gpus);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RunMode;
    use std::fs;
    use tempfile::tempdir;
    use vlmp::engine::distribution::DistributionStrategy;

    fn base_prepare_args() -> PrepareArgs {
        PrepareArgs {
            pool: PathBuf::from("pool.json"),
            config: None,
            session_name: None,
            output: None,
            distribution: None,
            components: None,
            set_values: vec![],
        }
    }

    fn base_run_args() -> RunArgs {
        RunArgs {
            simulation_sets_info: PathBuf::from("session/VLMPsession.json"),
            mode: RunMode {
                local: true,
                liquid: false,
            },
            gpu_list: None,
            config: None,
            set_values: vec![],
        }
    }

    #[test]
    fn defaults_fill_everything_but_the_pool() {
        let config = build_prepare_config(&base_prepare_args()).unwrap();
        let defaults = DefaultsConfig::default();
        assert_eq!(config.pool_path, PathBuf::from("pool.json"));
        assert_eq!(config.session_name, defaults.session_name);
        assert_eq!(config.output_dir, defaults.output_dir);
        assert_eq!(config.distribution, DistributionStrategy::None);
        assert_eq!(config.components_dir, None);
    }

    #[test]
    fn precedence_is_flags_then_set_values_then_file() {
        let dir = tempdir().unwrap();
        let cfg_path = dir.path().join("vlmp.toml");
        fs::write(
            &cfg_path,
            r#"
            [session]
            name = "from-file"
            output-dir = "file-out"

            [distribution]
            strategy = "one"
            "#,
        )
        .unwrap();

        let mut args = base_prepare_args();
        args.config = Some(cfg_path);
        args.set_values = vec![
            "session.name=from-set".to_string(),
            "distribution.strategy=size:2".to_string(),
        ];
        args.distribution = Some("size:5".to_string());

        let config = build_prepare_config(&args).unwrap();
        assert_eq!(config.session_name, "from-set");
        assert_eq!(config.output_dir, PathBuf::from("file-out"));
        assert_eq!(config.distribution, DistributionStrategy::Size { size: 5 });
    }

    #[test]
    fn invalid_strategy_is_a_config_error() {
        let mut args = base_prepare_args();
        args.distribution = Some("halves".to_string());
        assert!(matches!(
            build_prepare_config(&args),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn unsupported_set_key_is_rejected() {
        let mut args = base_prepare_args();
        args.set_values = vec!["optimization.num-solutions=3".to_string()];
        let err = build_prepare_config(&args).unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("optimization.num-solutions")));
    }

    #[test]
    fn launcher_defaults_and_overrides() {
        let config = build_launch_config(&base_run_args()).unwrap();
        assert_eq!(config.simulator, vec!["UAMMDlauncher"]);
        assert_eq!(config.queue_command, vec!["sbatch"]);
        assert_eq!(config.gpus, vec![0]);

        let mut args = base_run_args();
        args.set_values = vec![
            "launcher.gpus=1,3".to_string(),
            "launcher.queue-command=sbatch --partition=gpu".to_string(),
        ];
        let config = build_launch_config(&args).unwrap();
        assert_eq!(config.gpus, vec![1, 3]);
        assert_eq!(config.queue_command, vec!["sbatch", "--partition=gpu"]);

        args.gpu_list = Some(vec![2]);
        assert_eq!(build_launch_config(&args).unwrap().gpus, vec![2]);
    }
}
