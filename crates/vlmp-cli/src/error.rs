use std::path::PathBuf;
use thiserror::Error;
use vlmp::core::io::session::SessionFileError;
use vlmp::engine::error::EngineError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Vlmp(#[from] EngineError),

    #[error("Invalid session file: {0}")]
    Session(#[from] SessionFileError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Launch of simulation set '{set}' failed: {reason}")]
    Launch { set: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// `2` for failures of the launched simulator, `1` for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Launch { .. } => 2,
            _ => 1,
        }
    }
}
