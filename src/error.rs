// ABOUTME: Internal evaluator error taxonomy, wrapped into Diagnostics at the façade boundary

use crate::position::Position;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    #[error("{operation}: expected {expected}, got {actual}")]
    TypeMismatch {
        operation: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),

    #[error("value of type {type_name} is not callable")]
    NotCallable { type_name: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,

    #[error("{function}: {message}")]
    HostFailure { function: String, message: String },

    #[error("member or index access on null")]
    NullAccess,
}

impl RuntimeError {
    pub fn type_mismatch(
        operation: impl Into<String>,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        RuntimeError::TypeMismatch {
            operation: operation.into(),
            expected,
            actual,
        }
    }

    pub fn host_failure(function: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::HostFailure {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// A `RuntimeError` paired with the position of the AST node responsible for
/// it: the actual failing operation for most variants, or the calling node's
/// position for a `HostFailure` (the host function itself carries no source
/// position of its own).
#[derive(Debug, Clone)]
pub struct EvalFailure {
    pub error: RuntimeError,
    pub position: Position,
}

impl RuntimeError {
    pub fn at(self, position: Position) -> EvalFailure {
        EvalFailure {
            error: self,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        assert_eq!(
            RuntimeError::DivisionByZero.to_string(),
            "division by zero"
        );
        assert_eq!(
            RuntimeError::UndefinedSymbol("x".into()).to_string(),
            "undefined symbol: x"
        );
    }
}
