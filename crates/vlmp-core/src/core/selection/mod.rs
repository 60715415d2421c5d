//! Symbolic particle selections.
//!
//! A selection such as `"A type X or (B forceField bonds)"` is tokenized, parsed
//! into an [`Expr`] and evaluated against a [`ModelSet`]. Each model resolves its
//! atoms in local ids; the result is shifted into the simulation's global ids by
//! the model's offset.

mod common;
mod error;
mod eval;
mod lexer;
mod parser;

pub use common::{COMMON_KINDS, parse_id_list};
pub use error::SelectionError;
pub use eval::evaluate;
pub use lexer::Span;
pub use parser::{Expr, LogicOp, parse};

use crate::core::components::model_set::ModelSet;
use crate::core::ids::{GlobalId, LocalId};

/// Either a flat id list or a list of id tuples of a fixed arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selected<I> {
    Ids(Vec<I>),
    Tuples { arity: usize, tuples: Vec<Vec<I>> },
}

pub type LocalSelection = Selected<LocalId>;
pub type GlobalSelection = Selected<GlobalId>;

impl<I> Selected<I> {
    pub fn arity(&self) -> usize {
        match self {
            Selected::Ids(_) => 1,
            Selected::Tuples { arity, .. } => *arity,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Selected::Ids(ids) => ids.len(),
            Selected::Tuples { tuples, .. } => tuples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses and evaluates `input` against `models`.
pub fn select(models: &ModelSet, input: &str) -> Result<GlobalSelection, SelectionError> {
    evaluate(&parse(input)?, models)
}

/// Like [`select`], but requires a flat id list.
pub fn select_ids(models: &ModelSet, input: &str) -> Result<Vec<GlobalId>, SelectionError> {
    match select(models, input)? {
        Selected::Ids(ids) => Ok(ids),
        Selected::Tuples { arity, .. } => Err(SelectionError::UnexpectedArity {
            selection: input.to_string(),
            expected: 1,
            found: arity,
        }),
    }
}

/// Like [`select`], but requires tuples of exactly `arity` ids.
pub fn select_tuples(
    models: &ModelSet,
    input: &str,
    arity: usize,
) -> Result<Vec<Vec<GlobalId>>, SelectionError> {
    match select(models, input)? {
        Selected::Tuples { arity: found, tuples } if found == arity => Ok(tuples),
        Selected::Ids(ids) if ids.is_empty() => Ok(Vec::new()),
        Selected::Ids(ids) if arity == 1 => Ok(ids.into_iter().map(|id| vec![id]).collect()),
        other => Err(SelectionError::UnexpectedArity {
            selection: input.to_string(),
            expected: arity,
            found: other.arity(),
        }),
    }
}
