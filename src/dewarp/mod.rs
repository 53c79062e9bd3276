//! Page dewarping
//!
//! Straightens curved text lines one at a time: the page is binarized, text
//! lines are located on the horizontal projection profile, and each line's
//! baseline is sampled, fitted with a cubic curve and resampled into a flat
//! strip. The strips are stacked into the output page.

pub mod pipeline;
pub mod smoothing;
pub mod steps;

pub use pipeline::{DewarpResult, Dewarper, LineOutcome, LineReport, StepTiming};
