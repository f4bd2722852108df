use std::fmt;

/// Result type for qgrid operations
pub type Result<T> = std::result::Result<T, QgridError>;

/// Main error type for the qgrid library
#[derive(Debug, Clone, PartialEq)]
pub enum QgridError {
    /// Malformed bounds or options, or agent/environment dimensionality disagreement
    Configuration {
        name: String,
        reason: String,
    },

    /// Arrays that should line up row-for-row (or column-for-column) do not
    DataShape {
        expected: String,
        actual: String,
    },

    /// Operation is not valid in the current lifecycle state
    State(String),

    /// Normalization over a dimension whose bounds are equal
    DivisionByZero {
        dimension: usize,
    },

    /// Registry lookup with an id nobody registered
    UnknownId {
        kind: String,
        id: String,
    },

    /// IO errors (file operations)
    Io(String),

    /// Serialization/deserialization errors
    Serialization(String),

    /// Failure reported by a value function implementation
    ValueFunction(String),
}

impl fmt::Display for QgridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QgridError::Configuration { name, reason } => {
                write!(f, "Invalid configuration '{}': {}", name, reason)
            }
            QgridError::DataShape { expected, actual } => {
                write!(f, "Shape mismatch: expected {}, got {}", expected, actual)
            }
            QgridError::State(msg) => write!(f, "Invalid state: {}", msg),
            QgridError::DivisionByZero { dimension } => {
                write!(f, "Division by zero: max == min for dimension {}", dimension)
            }
            QgridError::UnknownId { kind, id } => write!(f, "Unknown {} id '{}'", kind, id),
            QgridError::Io(msg) => write!(f, "IO error: {}", msg),
            QgridError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            QgridError::ValueFunction(msg) => write!(f, "Value function error: {}", msg),
        }
    }
}

impl std::error::Error for QgridError {}

impl From<std::io::Error> for QgridError {
    fn from(err: std::io::Error) -> Self {
        QgridError::Io(err.to_string())
    }
}

impl From<bincode::Error> for QgridError {
    fn from(err: bincode::Error) -> Self {
        QgridError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for QgridError {
    fn from(err: serde_json::Error) -> Self {
        QgridError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl QgridError {
    pub fn configuration<S: Into<String>>(name: S, reason: S) -> Self {
        QgridError::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn data_shape<S: Into<String>>(expected: S, actual: S) -> Self {
        QgridError::DataShape {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
