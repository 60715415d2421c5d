use super::lexer::Span;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Unbalanced parenthesis at {span}")]
    UnbalancedParenthesis { span: Span },

    #[error("Unexpected token '{token}' at {span}")]
    UnexpectedToken { token: String, span: Span },

    #[error("Selection ends unexpectedly after '{after}' at {span}")]
    UnexpectedEnd { after: String, span: Span },

    #[error("Model reference '{model}' at {span} has no selection kind")]
    MissingKind { model: String, span: Span },

    #[error("Unknown model '{model}' at {span}")]
    UnknownModel { model: String, span: Span },

    #[error("Unknown selection kind '{kind}' for model '{model}' at {span}")]
    UnknownKind {
        model: String,
        kind: String,
        span: Span,
    },

    #[error("Invalid options for '{model} {kind}' at {span}: {reason}")]
    InvalidOptions {
        model: String,
        kind: String,
        span: Span,
        reason: String,
    },

    #[error("Mismatched arity at {span}: {left} vs {right}")]
    ArityMismatch {
        left: usize,
        right: usize,
        span: Span,
    },

    #[error("'not' at {span} applied to tuples of arity {arity}")]
    NotOnTuples { arity: usize, span: Span },

    #[error("Selection '{selection}' yields tuples of arity {found}, expected {expected}")]
    UnexpectedArity {
        selection: String,
        expected: usize,
        found: usize,
    },
}
