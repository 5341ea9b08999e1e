use dynaform_expr::ConditionCompilationError;
use thiserror::Error;

/// Failures reported by whatever executes operations against the store.
///
/// The core never interprets these beyond passing them to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpreterError {
    /// A write condition evaluated to false.
    #[error("conditional check failed on table {table}")]
    ConditionalCheckFailed { table: String },

    /// The table or index does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The store rejected the request as malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Any other service-side failure.
    #[error("service error: {0}")]
    Service(String),
}

impl InterpreterError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Errors produced while running a [`Program`](crate::Program).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error(transparent)]
    Interpreter(#[from] InterpreterError),

    #[error(transparent)]
    Condition(#[from] ConditionCompilationError),

    /// The interpreter answered with a response of the wrong kind.
    #[error("expected a {expected} response, found {found}")]
    UnexpectedResponse {
        expected: &'static str,
        found: &'static str,
    },

    /// A codec wrote a non-map value where a whole item is required.
    #[error("codec wrote a {0} value where an item map is required")]
    NotAnItem(&'static str),

    /// Only scans and queries can back a page stream.
    #[error("{0} cannot be paginated")]
    NotPaginated(&'static str),
}

/// Result alias for interpreter calls.
pub type InterpreterResult<T> = Result<T, InterpreterError>;

/// Result alias for program execution.
pub type ProgramResult<T> = Result<T, ProgramError>;
