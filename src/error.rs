use serde::Serialize;
use thiserror::Error;

/// Page-level failures surfaced to the caller
#[derive(Error, Debug)]
pub enum DewarpError {
    #[error("Invalid input image: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reason a single text line was dropped from the dewarped page.
///
/// These never abort a page run; the pipeline records them in the
/// line report and moves on to the next candidate.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum LineFitError {
    #[error("Too few baseline samples: {found} (need {required})")]
    InsufficientPoints { found: usize, required: usize },

    #[error("Too few samples left after outlier rejection: {found} (need {required})")]
    InsufficientInliers { found: usize, required: usize },

    #[error("Fit residual {residual:.2}px exceeds tolerance {tolerance:.2}px")]
    ResidualExceeded { residual: f64, tolerance: f64 },

    #[error("Interpolation failed: {detail}")]
    Interpolation { detail: String },

    #[error("Curve is not finite at column {column}")]
    NonFiniteCurve { column: u32 },
}
