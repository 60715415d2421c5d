use super::common;
use super::error::SelectionError;
use super::lexer::Span;
use super::parser::{Expr, LogicOp};
use super::{GlobalSelection, LocalSelection, Selected};
use crate::core::components::model_set::{ModelEntry, ModelSet};
use crate::core::ids::GlobalId;
use std::collections::BTreeSet;
use tracing::warn;

/// Evaluates a parsed selection against the live models, yielding global ids.
pub fn evaluate(expr: &Expr, models: &ModelSet) -> Result<GlobalSelection, SelectionError> {
    match expr {
        Expr::All => Ok(Selected::Ids(normalize(models.all_global_ids()))),
        Expr::None => Ok(Selected::Ids(Vec::new())),
        Expr::Model {
            model,
            kind,
            options,
            span,
        } => {
            let entry = models
                .get(model)
                .ok_or_else(|| SelectionError::UnknownModel {
                    model: model.clone(),
                    span: *span,
                })?;
            let local = resolve_kind(entry, model, kind, options, *span)?;
            let selected = to_global(local, entry);
            if selected.is_empty() {
                warn!(
                    "Selection '{} {} {}' matched no particles",
                    model,
                    kind,
                    options.join(" ")
                );
            }
            Ok(selected)
        }
        Expr::Not { expr, span } => match evaluate(expr, models)? {
            Selected::Ids(ids) => {
                let excluded: BTreeSet<GlobalId> = ids.into_iter().collect();
                Ok(Selected::Ids(
                    normalize(models.all_global_ids())
                        .into_iter()
                        .filter(|id| !excluded.contains(id))
                        .collect(),
                ))
            }
            Selected::Tuples { arity, .. } => Err(SelectionError::NotOnTuples {
                arity,
                span: *span,
            }),
        },
        Expr::Binary { op, lhs, rhs, span } => {
            let left = evaluate(lhs, models)?;
            let right = evaluate(rhs, models)?;
            combine(*op, left, right, *span)
        }
    }
}

fn resolve_kind(
    entry: &ModelEntry,
    model: &str,
    kind: &str,
    options: &[String],
    span: Span,
) -> Result<LocalSelection, SelectionError> {
    let invalid = |reason: String| SelectionError::InvalidOptions {
        model: model.to_string(),
        kind: kind.to_string(),
        span,
        reason,
    };
    let target = entry.model();
    if common::is_common(kind) {
        common::resolve(target.data(), kind, options).map_err(invalid)
    } else if target.defined_selections().iter().any(|k| *k == kind) {
        target.process_selection(kind, options).map_err(invalid)
    } else {
        Err(SelectionError::UnknownKind {
            model: model.to_string(),
            kind: kind.to_string(),
            span,
        })
    }
}

fn to_global(local: LocalSelection, entry: &ModelEntry) -> GlobalSelection {
    let offset = entry.offset();
    match local {
        Selected::Ids(ids) => {
            Selected::Ids(normalize(ids.into_iter().map(|id| id.to_global(offset)).collect()))
        }
        Selected::Tuples { arity, tuples } => Selected::Tuples {
            arity,
            tuples: dedup_tuples(
                tuples
                    .into_iter()
                    .map(|t| t.into_iter().map(|id| id.to_global(offset)).collect())
                    .collect(),
            ),
        },
    }
}

fn normalize(ids: Vec<GlobalId>) -> Vec<GlobalId> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

fn dedup_tuples(tuples: Vec<Vec<GlobalId>>) -> Vec<Vec<GlobalId>> {
    let mut seen = BTreeSet::new();
    tuples
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn combine(
    op: LogicOp,
    left: GlobalSelection,
    right: GlobalSelection,
    span: Span,
) -> Result<GlobalSelection, SelectionError> {
    match (left, right) {
        (Selected::Ids(a), Selected::Ids(b)) => {
            let a: BTreeSet<_> = a.into_iter().collect();
            let b: BTreeSet<_> = b.into_iter().collect();
            let ids = match op {
                LogicOp::And => a.intersection(&b).copied().collect(),
                LogicOp::Or => a.union(&b).copied().collect(),
            };
            Ok(Selected::Ids(ids))
        }
        (Selected::Ids(empty), tuples @ Selected::Tuples { .. })
        | (tuples @ Selected::Tuples { .. }, Selected::Ids(empty))
            if empty.is_empty() =>
        {
            Ok(match op {
                LogicOp::And => Selected::Tuples {
                    arity: tuples.arity(),
                    tuples: Vec::new(),
                },
                LogicOp::Or => tuples,
            })
        }
        (
            Selected::Tuples {
                arity: left_arity,
                tuples: a,
            },
            Selected::Tuples {
                arity: right_arity,
                tuples: b,
            },
        ) if left_arity == right_arity => {
            let tuples = match op {
                LogicOp::And => {
                    let keep: BTreeSet<_> = b.into_iter().collect();
                    a.into_iter().filter(|t| keep.contains(t)).collect()
                }
                LogicOp::Or => dedup_tuples(a.into_iter().chain(b).collect()),
            };
            Ok(Selected::Tuples {
                arity: left_arity,
                tuples,
            })
        }
        (left, right) => Err(SelectionError::ArityMismatch {
            left: left.arity(),
            right: right.arity(),
            span,
        }),
    }
}
