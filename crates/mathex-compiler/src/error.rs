use mathex_builtins::ValueKind;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning formula text into a [`crate::CompiledExpression`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("parse error at {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("logical validity error: {0}")]
    LogicalValidity(String),

    #[error("no function '{name}' accepting {arity} argument(s)")]
    UnresolvedFunction { name: String, arity: usize },

    #[error("could not resolve symbols {0:?}")]
    UnresolvedSymbols(Vec<String>),

    #[error("lock not acquired within {waited:?}")]
    Contention { waited: Duration },

    #[error("invalid math definition: {0}")]
    InvalidDefinition(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CompileError {
    /// Only lock contention may succeed when the same call is reissued.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CompileError::Contention { .. })
    }

    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        CompileError::Parse {
            message: message.into(),
            position,
        }
    }

    pub(crate) fn validity(message: impl Into<String>) -> Self {
        CompileError::LogicalValidity(message.into())
    }
}

/// Errors raised by a single invocation. The compiled expression stays usable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvokeError {
    #[error("expected {expected} argument(s), got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("argument '{parameter}' expected {expected}, found {found}")]
    TypeMismatch {
        parameter: String,
        expected: ValueKind,
        found: String,
    },

    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

pub type Result<T> = std::result::Result<T, CompileError>;
