use super::category::Category;
use super::params::ComponentInfo;
use crate::core::selection::SelectionError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("{component}: unknown parameter '{parameter}' (available: {available})")]
    Unknown {
        component: ComponentInfo,
        parameter: String,
        available: String,
    },

    #[error("{component}: missing required parameter '{parameter}'")]
    Missing {
        component: ComponentInfo,
        parameter: String,
    },

    #[error("{component}: required parameter '{parameter}' is not listed as available")]
    RequiredNotAvailable {
        component: ComponentInfo,
        parameter: String,
    },

    #[error("{component}: parameter '{parameter}' must be {expected}, found {found}")]
    TypeMismatch {
        component: ComponentInfo,
        parameter: String,
        expected: &'static str,
        found: String,
    },

    #[error("{component}: invalid value for '{parameter}': {reason}")]
    InvalidValue {
        component: ComponentInfo,
        parameter: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("{component}: requires a '{category}' component to be built first")]
    MissingCollaborator {
        component: ComponentInfo,
        category: Category,
    },

    #[error("{component}: selection failed: {source}")]
    Selection {
        component: ComponentInfo,
        #[source]
        source: SelectionError,
    },

    #[error("{component}: failed to read '{path}': {source}", path = path.display())]
    Io {
        component: ComponentInfo,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{component}: failed to parse '{path}': {source}", path = path.display())]
    Csv {
        component: ComponentInfo,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{component}: conflicting particle type '{name}': {reason}")]
    TypeConflict {
        component: ComponentInfo,
        name: String,
        reason: String,
    },

    #[error("{component}: {message}")]
    Invalid {
        component: ComponentInfo,
        message: String,
    },
}

impl ComponentError {
    pub fn invalid(component: &ComponentInfo, message: impl Into<String>) -> Self {
        ComponentError::Invalid {
            component: component.clone(),
            message: message.into(),
        }
    }

    pub fn selection(component: &ComponentInfo, source: SelectionError) -> Self {
        ComponentError::Selection {
            component: component.clone(),
            source,
        }
    }
}
