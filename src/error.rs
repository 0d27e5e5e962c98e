// src/error.rs
use std::fmt;

/// Custom error types for the stochdiff library
#[derive(Debug, Clone)]
pub enum SdeError {
    /// Time grid is unusable (too short or unequally spaced)
    InvalidTimeGrid { reason: String },

    /// An input's shape disagrees with the dimensions derived from y0 and G
    ShapeMismatch {
        entity: String,
        expected: String,
        actual: String,
    },

    /// Invalid configuration
    InvalidConfiguration { field: String, reason: String },

    /// Unsupported operation
    UnsupportedOperation { operation: String, context: String },

    /// The embedded nonlinear solve failed at some step; the whole
    /// integration is abandoned
    SolverFailure { time: f64, detail: String },
}

impl fmt::Display for SdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdeError::InvalidTimeGrid { reason } => {
                write!(f, "Invalid time grid: {}", reason)
            }
            SdeError::ShapeMismatch {
                entity,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Shape mismatch for '{}': expected {}, got {}",
                    entity, expected, actual
                )
            }
            SdeError::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
            SdeError::UnsupportedOperation { operation, context } => {
                write!(
                    f,
                    "Unsupported operation '{}' in context: {}",
                    operation, context
                )
            }
            SdeError::SolverFailure { time, detail } => {
                write!(f, "Nonlinear solve failed at t_n = {}: {}", time, detail)
            }
        }
    }
}

impl std::error::Error for SdeError {}

/// Result type alias for stochdiff operations
pub type SdeResult<T> = Result<T, SdeError>;

/// Validation utilities
pub mod validation {
    use super::{SdeError, SdeResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> SdeResult<()> {
        if value <= 0.0 {
            Err(SdeError::InvalidConfiguration {
                field: name.to_string(),
                reason: format!("must be positive (> 0), got {}", value),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> SdeResult<()> {
        if !value.is_finite() {
            Err(SdeError::InvalidConfiguration {
                field: name.to_string(),
                reason: format!("must be finite (not NaN or infinite), got {}", value),
            })
        } else {
            Ok(())
        }
    }

    /// Validate a downsampling factor
    pub fn validate_downsample(downsample: usize) -> SdeResult<()> {
        if downsample == 0 {
            Err(SdeError::InvalidConfiguration {
                field: "downsample".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate a list of noise-port indices against the number of channels m
    pub fn validate_ports(ports: &[usize], m: usize) -> SdeResult<()> {
        let mut seen = vec![false; m];
        for &p in ports {
            if p >= m {
                return Err(SdeError::InvalidConfiguration {
                    field: "implicit_ports".to_string(),
                    reason: format!("port index {} out of range for m == {}", p, m),
                });
            }
            if seen[p] {
                return Err(SdeError::InvalidConfiguration {
                    field: "implicit_ports".to_string(),
                    reason: format!("port index {} listed more than once", p),
                });
            }
            seen[p] = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("eps", 1e-6).is_ok());
        assert!(validate_positive("eps", 0.0).is_err());
        assert!(validate_positive("eps", -0.1).is_err());
    }

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite("value", 1.0).is_ok());
        assert!(validate_finite("value", f64::NAN).is_err());
        assert!(validate_finite("value", f64::INFINITY).is_err());
        assert!(validate_finite("value", f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_validate_ports() {
        assert!(validate_ports(&[], 3).is_ok());
        assert!(validate_ports(&[0, 2], 3).is_ok());
        assert!(validate_ports(&[3], 3).is_err());
        assert!(validate_ports(&[1, 1], 3).is_err());
    }

    #[test]
    fn test_shape_mismatch_display() {
        let error = SdeError::ShapeMismatch {
            entity: "dW".to_string(),
            expected: "(99, 2)".to_string(),
            actual: "(99, 3)".to_string(),
        };

        let display = format!("{}", error);
        assert!(display.contains("dW"));
        assert!(display.contains("(99, 2)"));
        assert!(display.contains("(99, 3)"));
    }

    #[test]
    fn test_solver_failure_display() {
        let error = SdeError::SolverFailure {
            time: 0.25,
            detail: "Jacobian is singular".to_string(),
        };

        let display = format!("{}", error);
        assert!(display.contains("0.25"));
        assert!(display.contains("singular"));
    }
}
