//! Individual dewarping stages
//!
//! Pipeline order: binarize, lines, baseline, curve, rectify, assemble.

pub mod assemble;
pub mod baseline;
pub mod binarize;
pub mod curve;
pub mod lines;
pub mod rectify;
