use thiserror::Error;

use super::aggregate::AggregationError;
use super::assembler::AssemblyError;
use super::config::ConfigError;
use super::distribution::DistributionError;
use crate::core::components::registry::RegistryError;
use crate::core::io::pool::PoolLoadError;
use crate::core::io::session::SessionFileError;
use crate::workflows::session::MaterializationError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    PoolLoad(#[from] PoolLoadError),

    #[error("Component registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Pool entry {index} could not be assembled: {source}")]
    Assembly {
        index: usize,
        #[source]
        source: AssemblyError,
    },

    #[error("Distribution failed: {0}")]
    Distribution(#[from] DistributionError),

    #[error("Aggregation of '{set}' failed: {source}")]
    Aggregation {
        set: String,
        #[source]
        source: AggregationError,
    },

    #[error("Materialization failed: {0}")]
    Materialization(#[from] MaterializationError),

    #[error(transparent)]
    SessionFile(#[from] SessionFileError),
}
