use thiserror::Error;

/// Result type for gridmdp operations
pub type Result<T> = std::result::Result<T, MdpError>;

/// Main error type for the gridmdp library
#[derive(Debug, Error)]
pub enum MdpError {
    /// Grid file with a bad header, missing rows or rows of the wrong width
    #[error("Malformed grid (line {line}): {reason}")]
    MalformedGrid {
        line: usize,
        reason: String,
    },

    /// Terrain character outside the known tile set
    #[error("Unknown terrain code '{code}' at ({x}, {y})")]
    UnknownTerrain {
        code: char,
        x: usize,
        y: usize,
    },

    /// Transition-matrix file that cannot be parsed back
    #[error("Malformed transition matrix file (line {line}): {reason}")]
    MalformedMatrixFile {
        line: usize,
        reason: String,
    },

    /// Outcome probabilities that do not form a distribution
    #[error("Invalid distribution for '{action}' in state {state}: {reason}")]
    InvalidDistribution {
        state: usize,
        action: String,
        reason: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The background writer is gone
    #[error("Iteration recorder closed: {0}")]
    RecorderClosed(String),
}

impl From<serde_json::Error> for MdpError {
    fn from(err: serde_json::Error) -> Self {
        MdpError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for MdpError {
    fn from(err: bincode::Error) -> Self {
        MdpError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl MdpError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        MdpError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        MdpError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_grid<S: Into<String>>(line: usize, reason: S) -> Self {
        MdpError::MalformedGrid {
            line,
            reason: reason.into(),
        }
    }

    pub fn malformed_matrix<S: Into<String>>(line: usize, reason: S) -> Self {
        MdpError::MalformedMatrixFile {
            line,
            reason: reason.into(),
        }
    }
}
