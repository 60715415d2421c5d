use super::distribution::DistributionStrategy;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Everything the prepare workflow needs to turn a pool file into a session.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareConfig {
    pub pool_path: PathBuf,
    pub session_name: String,
    pub output_dir: PathBuf,
    pub distribution: DistributionStrategy,
    pub components_dir: Option<PathBuf>,
}

impl PrepareConfig {
    /// The session directory, `<output_dir>/<session_name>`.
    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }
}

#[derive(Default)]
pub struct PrepareConfigBuilder {
    pool_path: Option<PathBuf>,
    session_name: Option<String>,
    output_dir: Option<PathBuf>,
    distribution: Option<DistributionStrategy>,
    components_dir: Option<PathBuf>,
}

impl PrepareConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pool_path(mut self, path: PathBuf) -> Self {
        self.pool_path = Some(path);
        self
    }
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }
    pub fn distribution(mut self, strategy: DistributionStrategy) -> Self {
        self.distribution = Some(strategy);
        self
    }
    pub fn components_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.components_dir = dir;
        self
    }

    pub fn build(self) -> Result<PrepareConfig, ConfigError> {
        Ok(PrepareConfig {
            pool_path: self
                .pool_path
                .ok_or(ConfigError::MissingParameter("pool_path"))?,
            session_name: self
                .session_name
                .ok_or(ConfigError::MissingParameter("session_name"))?,
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
            distribution: self.distribution.unwrap_or_default(),
            components_dir: self.components_dir,
        })
    }
}
