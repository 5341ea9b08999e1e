use std::fmt;

use dynaform_types::WireValue;
use thiserror::Error;

/// Why a wire value could not be decoded into the requested type.
///
/// Read errors are data: callers receive them per item and decide what to do.
/// Decoding a structured value never stops at the first bad field; every
/// failure is gathered into one [`ReadError::InvalidCases`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The attribute was present but carried the wrong wire type.
    #[error("expected attribute of type {expected}, found {}", .actual.type_tag())]
    NoPropertyOfType {
        expected: &'static str,
        actual: WireValue,
    },

    /// A required attribute was absent.
    #[error("missing property")]
    MissingProperty,

    /// The wire type matched but the value could not be converted.
    #[error("type coercion failed: {0}")]
    TypeCoercionFailure(String),

    /// One or more named fields, elements, or alternatives failed.
    ///
    /// Never empty. Entries keep the order in which they were checked.
    #[error("invalid cases: {}", render_cases(.0))]
    InvalidCases(Vec<FieldError>),
}

impl ReadError {
    pub fn no_property_of_type(expected: &'static str, actual: &WireValue) -> Self {
        Self::NoPropertyOfType {
            expected,
            actual: actual.clone(),
        }
    }

    pub fn coercion(cause: impl fmt::Display) -> Self {
        Self::TypeCoercionFailure(cause.to_string())
    }

    /// Attribute `error` to a single named field or alternative.
    pub fn invalid_case(name: impl Into<String>, error: ReadError) -> Self {
        Self::InvalidCases(vec![FieldError::new(name, error)])
    }

    /// The per-field errors, if this is an aggregate.
    pub fn cases(&self) -> &[FieldError] {
        match self {
            Self::InvalidCases(cases) => cases,
            _ => &[],
        }
    }

    /// Multi-line rendering of the full error tree, one failing path per line.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, depth: usize) {
        match self {
            Self::InvalidCases(cases) => {
                for case in cases {
                    out.push_str(&"  ".repeat(depth));
                    out.push_str(&case.name);
                    match &case.error {
                        Self::InvalidCases(_) => {
                            out.push_str(":\n");
                            case.error.describe_into(out, depth + 1);
                        }
                        other => {
                            out.push_str(": ");
                            out.push_str(&other.to_string());
                            out.push('\n');
                        }
                    }
                }
            }
            other => {
                out.push_str(&"  ".repeat(depth));
                out.push_str(&other.to_string());
                out.push('\n');
            }
        }
    }
}

fn render_cases(cases: &[FieldError]) -> String {
    let parts: Vec<String> = cases.iter().map(FieldError::to_string).collect();
    format!("[{}]", parts.join(", "))
}

/// A read error attributed to a field name, variant name, or list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub name: String,
    pub error: ReadError,
}

impl FieldError {
    pub fn new(name: impl Into<String>, error: ReadError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Collects field-level read errors while a structured value is decoded.
///
/// Each field result is passed through [`Accumulator::check`], which keeps
/// the value on success and records the error otherwise. Once every field has
/// been checked, [`Accumulator::into_result`] reports all failures at once.
#[derive(Debug, Default)]
pub struct Accumulator {
    errors: Vec<FieldError>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the value of `result`, or record its error under `name`.
    pub fn check<T>(&mut self, name: impl Into<String>, result: Result<T, ReadError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.errors.push(FieldError::new(name, error));
                None
            }
        }
    }

    pub fn push(&mut self, name: impl Into<String>, error: ReadError) {
        self.errors.push(FieldError::new(name, error));
    }

    /// Append every error of `other` after this accumulator's own.
    pub fn combine(mut self, other: Accumulator) -> Self {
        self.errors.extend(other.errors);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(())` when nothing failed, otherwise one `InvalidCases`.
    pub fn into_result(self) -> Result<(), ReadError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ReadError::InvalidCases(self.errors))
        }
    }

    /// The aggregate error. Only meaningful after at least one failed check.
    pub fn into_error(self) -> ReadError {
        debug_assert!(!self.errors.is_empty(), "no read errors were recorded");
        ReadError::InvalidCases(self.errors)
    }
}
