//! Line-by-line curvature correction for scanned text pages

pub mod config;
pub mod dewarp;
pub mod error;

pub use config::DewarpConfig;
pub use dewarp::{DewarpResult, Dewarper, LineOutcome, LineReport, StepTiming};
pub use error::{DewarpError, LineFitError};
