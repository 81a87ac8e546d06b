//! Error types for actuator and valve construction.

use thiserror::Error;

/// Result type for control component operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised when an actuator or valve is configured with non-physical
/// parameters. Runtime commands never fail; they clamp or report `false`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Position range is empty or inverted.
    #[error("Invalid position range: [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },
}
