use thiserror::Error;

/// Errors produced while constructing wire values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid number: {0:?} is not a decimal literal")]
    InvalidNumber(String),

    #[error("number {0} is not finite")]
    NonFinite(String),

    #[error("{kind} set must not be empty")]
    EmptySet { kind: &'static str },
}

pub type TypeResult<T> = Result<T, TypeError>;
