use crate::core::components::descriptor::PoolEntry;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Pool file '{path}' contains no simulations")]
    Empty { path: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlPool {
    #[serde(default)]
    simulation: Vec<PoolEntry>,
}

/// Loads a simulation pool description from disk.
///
/// Files ending in `.toml` are read as an array of `[[simulation]]` tables; any
/// other extension is read as a JSON array of pool entries.
///
/// # Arguments
///
/// * `path` - The pool file to read.
///
/// # Return
///
/// Returns the pool entries in file order.
///
/// # Errors
///
/// Returns [`PoolLoadError`] if the file cannot be read, does not parse, uses
/// an unknown category key, or holds no entries.
pub fn load_pool(path: &Path) -> Result<Vec<PoolEntry>, PoolLoadError> {
    let display = path.to_string_lossy().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| PoolLoadError::Io {
        path: display.clone(),
        source: e,
    })?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
    let entries = if is_toml {
        parse_toml_pool(&content).map_err(|e| PoolLoadError::Toml {
            path: display.clone(),
            source: e,
        })?
    } else {
        parse_json_pool(&content).map_err(|e| PoolLoadError::Json {
            path: display.clone(),
            source: e,
        })?
    };
    if entries.is_empty() {
        return Err(PoolLoadError::Empty { path: display });
    }
    Ok(entries)
}

pub fn parse_json_pool(content: &str) -> Result<Vec<PoolEntry>, serde_json::Error> {
    serde_json::from_str(content)
}

pub fn parse_toml_pool(content: &str) -> Result<Vec<PoolEntry>, toml::de::Error> {
    toml::from_str::<TomlPool>(content).map(|pool| pool.simulation)
}
