use crate::parameters::expression::ExpressionError;
use thiserror::Error;

/// Error types for the lmparams library.
#[derive(Error, Debug)]
pub enum Error {
    /// Value/min/max lengths disagree, or a flat vector has the wrong length.
    #[error("Length mismatch for {context}: expected {expected}, got {found}")]
    LengthMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// A lower bound exceeds its upper bound.
    #[error("Invalid bounds for parameter '{name}' at index {index}: min ({min}) > max ({max})")]
    InvalidBounds {
        name: String,
        index: usize,
        min: f64,
        max: f64,
    },

    /// A free parameter's value lies outside its bounds.
    #[error("Parameter '{name}' value {value} at index {index} is outside bounds [{min}, {max}]")]
    OutOfBounds {
        name: String,
        index: usize,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A collection key differs from the name stored in its entry.
    #[error("Collection key '{key}' does not match parameter name '{name}'")]
    NameKeyMismatch { key: String, name: String },

    /// Resolution made no progress while entries were still pending.
    #[error("Circular dependency among parameters: {}", names.join(", "))]
    CircularDependency { names: Vec<String> },

    /// Construction was given a kind discriminant that is not recognized.
    #[error("Unknown parameter kind: '{0}'")]
    UnknownParameterKind(String),

    /// Construction options are missing or contradict the selected kind.
    #[error("Invalid configuration for parameter '{name}': {message}")]
    InvalidConfiguration { name: String, message: String },

    /// A formula references a name that is not in the collection.
    #[error("Parameter '{parameter}' references undefined parameter '{reference}'")]
    UndefinedReference { parameter: String, reference: String },

    /// A formula references an entry positioned after it; the collection is not resolved.
    #[error("Parameter '{parameter}' depends on '{dependency}', which is not evaluated before it")]
    UnresolvedDependency {
        parameter: String,
        dependency: String,
    },

    /// Formula parsing or evaluation failed.
    #[error("Expression error in parameter '{name}': {source}")]
    Expression {
        name: String,
        #[source]
        source: ExpressionError,
    },

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn length_mismatch(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Error::LengthMismatch {
            context: context.into(),
            expected,
            found,
        }
    }

    pub(crate) fn expression(name: &str, source: ExpressionError) -> Self {
        Error::Expression {
            name: name.to_string(),
            source,
        }
    }
}

/// Result type alias for lmparams operations.
pub type Result<T> = std::result::Result<T, Error>;
