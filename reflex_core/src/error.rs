// reflex_core/src/error.rs

use thiserror::Error;

/// Everything that can go wrong while configuring or driving an estimator.
///
/// None of these are transient: they are precondition violations on the
/// caller's (or the plant's) side and retrying the same call cannot succeed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimatorError {
    #[error("{name} dimension must be positive")]
    InvalidDimension { name: &'static str },

    #[error("blend weight must be finite and non-negative, got {0}")]
    InvalidBlendWeight(f64),

    #[error("plant {name} dimension is {found}, but the estimator is configured for {expected}")]
    PlantMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{name} has {found} components, expected {expected}")]
    DimensionMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("update called before init")]
    NotInitialized,

    #[error("plant returned a state with {found} components, expected {expected}")]
    PlantOutput { expected: usize, found: usize },
}

/// Returns `DimensionMismatch` unless `found == expected`.
pub(crate) fn check_len(
    name: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), EstimatorError> {
    if found == expected {
        Ok(())
    } else {
        Err(EstimatorError::DimensionMismatch {
            name,
            expected,
            found,
        })
    }
}

/// Rejected parameters for one of the bundled plant models.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("model parameter `{name}` must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("matrix `{name}` is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    ShapeMismatch {
        name: &'static str,
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
}
