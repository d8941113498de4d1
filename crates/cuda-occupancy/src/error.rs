//! Error types for occupancy queries.

use thiserror::Error;

/// Result type for occupancy operations.
pub type Result<T> = std::result::Result<T, OccupancyError>;

/// Errors that can occur while evaluating the occupancy model.
///
/// There are exactly two kinds: caller mistakes (`InvalidInput`), which are
/// recoverable by correcting the arguments, and gaps in the architecture
/// tables (`UnsupportedDevice`), which require extending the tables or
/// rejecting the device. Internal inconsistencies are defects and are caught
/// by debug assertions, not surfaced as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OccupancyError {
    /// Malformed, out-of-range, or internally inconsistent arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The compute capability has no entry in the architecture tables.
    #[error("unsupported device: compute capability {major}.{minor}")]
    UnsupportedDevice {
        /// Compute capability major version.
        major: u32,
        /// Compute capability minor version.
        minor: u32,
    },
}

impl OccupancyError {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unsupported device error for the given compute capability.
    pub fn unsupported(major: u32, minor: u32) -> Self {
        Self::UnsupportedDevice { major, minor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OccupancyError::invalid_input("block size must be positive");
        assert_eq!(
            err.to_string(),
            "invalid input: block size must be positive"
        );

        let err = OccupancyError::unsupported(99, 0);
        assert_eq!(
            err.to_string(),
            "unsupported device: compute capability 99.0"
        );
    }
}
