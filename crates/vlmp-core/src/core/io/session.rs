use crate::core::components::descriptor::PoolEntry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the session descriptor inside a session directory.
pub const DESCRIPTOR_FILE: &str = "VLMPsession.json";

#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// One simulation of a session. Folders are relative to the session directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSimulation {
    pub name: String,
    pub simulation_folder: PathBuf,
    pub result_folder: PathBuf,
    pub original_info: PoolEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSet {
    pub name: String,
    pub folder: PathBuf,
    pub aggregate_file: PathBuf,
    pub simulations: Vec<String>,
}

/// Contents of `VLMPsession.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    pub name: String,
    pub simulations: Vec<SessionSimulation>,
    pub simulation_sets: Vec<SessionSet>,
}

impl SessionDescriptor {
    pub fn load(path: &Path) -> Result<Self, SessionFileError> {
        let display = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| SessionFileError::Io {
            path: display.clone(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| SessionFileError::Json {
            path: display,
            source: e,
        })
    }

    /// Writes the descriptor as pretty JSON, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<(), SessionFileError> {
        let display = path.to_string_lossy().to_string();
        let content = serde_json::to_string_pretty(self).map_err(|e| SessionFileError::Json {
            path: display.clone(),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| SessionFileError::Io {
            path: display,
            source: e,
        })
    }

    pub fn set(&self, name: &str) -> Option<&SessionSet> {
        self.simulation_sets.iter().find(|s| s.name == name)
    }
}
