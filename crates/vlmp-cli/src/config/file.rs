use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use vlmp::engine::distribution::DistributionStrategy;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSessionConfig {
    pub name: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// A strategy written either as `"size:4"` or as a `{ type = "size", size = 4 }` table.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FileStrategy {
    Text(String),
    Table(DistributionStrategy),
}

impl FileStrategy {
    pub fn resolve(self) -> Result<DistributionStrategy> {
        match self {
            FileStrategy::Text(text) => text
                .parse()
                .map_err(|e: vlmp::engine::distribution::DistributionError| {
                    CliError::Config(e.to_string())
                }),
            FileStrategy::Table(strategy) => Ok(strategy),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileDistributionConfig {
    pub strategy: Option<FileStrategy>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileComponentsConfig {
    pub additional_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileLauncherConfig {
    pub simulator: Option<String>,
    pub queue_command: Option<String>,
    pub gpus: Option<Vec<u32>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub session: Option<FileSessionConfig>,
    pub distribution: Option<FileDistributionConfig>,
    pub components: Option<FileComponentsConfig>,
    pub launcher: Option<FileLauncherConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn all_sections_are_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vlmp.toml");
        fs::write(
            &path,
            r#"
            [session]
            name = "polymers"
            output-dir = "runs"

            [distribution]
            strategy = "upperLimit:numberOfParticles:800"

            [components]
            additional-dir = "components"

            [launcher]
            simulator = "UAMMDlauncher"
            queue-command = "sbatch --partition=gpu"
            gpus = [0, 1]
            "#,
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        assert_eq!(config.session.unwrap().name.as_deref(), Some("polymers"));
        let strategy = config.distribution.unwrap().strategy.unwrap().resolve().unwrap();
        assert_eq!(
            strategy,
            DistributionStrategy::UpperLimit {
                property: "numberOfParticles".into(),
                limit: 800.0
            }
        );
        assert_eq!(config.launcher.unwrap().gpus, Some(vec![0, 1]));
    }

    #[test]
    fn strategy_tables_are_accepted() {
        let config: FileConfig = toml::from_str(
            r#"
            [distribution.strategy]
            type = "size"
            size = 3
            "#,
        )
        .unwrap();
        let strategy = config.distribution.unwrap().strategy.unwrap().resolve().unwrap();
        assert_eq!(strategy, DistributionStrategy::Size { size: 3 });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vlmp.toml");
        fs::write(&path, "[session]\nnmae = \"typo\"\n").unwrap();
        assert!(matches!(
            FileConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
