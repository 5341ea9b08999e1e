use thiserror::Error;

/// Errors raised while turning an expression tree into placeholder text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionCompilationError {
    /// A placeholder was bound to two different attribute names or values.
    #[error("placeholder {placeholder} is bound to both {existing} and {conflicting}")]
    PlaceholderConflict {
        placeholder: String,
        existing: String,
        conflicting: String,
    },

    /// An attribute path had no segments, or a segment with an empty name.
    #[error("attribute path is empty")]
    EmptyPath,

    /// Attribute path text could not be parsed.
    #[error("invalid attribute path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// An `IN` condition with nothing to compare against.
    #[error("membership condition on {0} has no candidate values")]
    EmptyMembership(String),

    /// An update expression with no actions.
    #[error("update expression has no actions")]
    EmptyUpdate,
}

impl ConditionCompilationError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while applying an update expression to an item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The operand types of an action do not fit together.
    #[error("{action} on {path}: {reason}")]
    TypeMismatch {
        action: &'static str,
        path: String,
        reason: String,
    },

    /// A nested path runs through an attribute that does not exist or is
    /// not a container.
    #[error("document path {0} does not exist")]
    MissingPath(String),

    #[error(transparent)]
    Compile(#[from] ConditionCompilationError),
}

impl EvalError {
    pub fn mismatch(action: &'static str, path: impl ToString, reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            action,
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for expression compilation.
pub type ExprResult<T> = Result<T, ConditionCompilationError>;

/// Result alias for expression evaluation.
pub type EvalResult<T> = Result<T, EvalError>;
