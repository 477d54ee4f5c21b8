//! Dispatch error types

use thiserror::Error;

use super::types::ScalarType;

/// Raw text could not be coerced into the declared type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("expected {expected}, got '{raw}'")]
    Invalid { raw: String, expected: ScalarType },
    #[error("type {0} cannot be coerced from raw text")]
    Unsupported(String),
}

/// Failure anywhere between receiving a request and the handler returning.
/// The dispatcher turns every variant into an error envelope.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Required parameter '{0}' is not present.")]
    MissingParameter(String),

    #[error("Invalid value '{raw}' for parameter '{param}': expected {expected}")]
    Coercion {
        param: String,
        raw: String,
        expected: ScalarType,
    },

    #[error("Invalid request body for parameter '{param}' ({expected}): {reason}")]
    InvalidBody {
        param: String,
        expected: String,
        reason: String,
    },

    #[error("Invalid form data: {0}")]
    InvalidForm(String),

    #[error("Unsupported '{0}' request method.")]
    UnsupportedMethod(String),

    #[error("Parameter '{param}' of type {ty} cannot be bound from query or form data")]
    UnsupportedType { param: String, ty: String },

    #[error("Handler '{handler}' must declare exactly {expected} parameter to bind a request body, found {actual}")]
    PayloadArity {
        handler: String,
        expected: usize,
        actual: usize,
    },

    #[error("Argument mismatch for handler '{handler}': {detail}")]
    ArgumentMismatch { handler: String, detail: String },

    #[error("Argument {index} is out of range ({len} arguments bound)")]
    ArgumentIndex { index: usize, len: usize },

    #[error("Argument {index}: expected {expected}, found {found}")]
    ArgumentType {
        index: usize,
        expected: &'static str,
        found: String,
    },

    /// The handler itself failed; carries its message verbatim
    #[error("{0}")]
    HandlerInvocation(String),
}

impl DispatchError {
    pub fn from_coercion(param: &str, err: CoercionError) -> Self {
        match err {
            CoercionError::Invalid { raw, expected } => Self::Coercion {
                param: param.to_string(),
                raw,
                expected,
            },
            CoercionError::Unsupported(ty) => Self::UnsupportedType {
                param: param.to_string(),
                ty,
            },
        }
    }

    /// Short name of the error kind, for logging
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "MissingParameter",
            Self::Coercion { .. } | Self::InvalidBody { .. } | Self::InvalidForm(_) => "Coercion",
            Self::UnsupportedMethod(_) => "UnsupportedMethod",
            Self::UnsupportedType { .. }
            | Self::PayloadArity { .. }
            | Self::ArgumentMismatch { .. } => "Configuration",
            Self::ArgumentIndex { .. }
            | Self::ArgumentType { .. }
            | Self::HandlerInvocation(_) => "HandlerInvocation",
        }
    }
}

/// Handler declaration rejected when it is bound
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Handler '{handler}' declares a parameter with a blank name")]
    BlankName { handler: String },

    #[error("Handler '{handler}' declares parameter '{param}' more than once")]
    DuplicateParameter { handler: String, param: String },

    #[error("Handler '{handler}' declares payload parameter '{param}' alongside other parameters")]
    PayloadNotSole { handler: String, param: String },

    #[error("Handler '{handler}' declares an unusable default for parameter '{param}': {reason}")]
    InvalidDefault {
        handler: String,
        param: String,
        reason: String,
    },

    #[error("Route '{0}' is already registered")]
    DuplicateRoute(String),
}
