use crate::error::DewarpError;
use serde::{Deserialize, Serialize};

/// Numeric parameters for every stage of the dewarping pipeline
///
/// Defaults are tuned for 300 DPI single-column pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DewarpConfig {
    /// CLAHE contrast clip limit (multiple of the uniform bin height)
    pub clahe_clip_limit: f64,
    /// CLAHE tile grid as (columns, rows)
    pub clahe_tiles: (u32, u32),

    /// Half-width of the peak neighbourhood and minimum line spacing, in rows
    pub line_window: usize,
    /// Sigma of the Gaussian applied to the horizontal projection profile
    pub profile_sigma: f64,
    /// Peaks must exceed this fraction of the mean smoothed profile
    pub peak_floor_ratio: f64,

    /// Half-height of the band searched around a line (and of the output strip)
    pub window_height: u32,
    /// Width of each sampling window, in columns
    pub window_width: u32,
    /// Horizontal stride between sampling windows
    pub sample_step: u32,

    /// Minimum number of samples needed to fit a curve
    pub min_curve_points: usize,
    /// Trailing samples used for the reference median
    pub median_window: usize,
    /// Samples deviating from the reference median by this much are dropped
    pub outlier_tolerance: f64,
    /// Largest residual tolerated at any sample
    pub max_residual: f64,

    /// Sigma of the Gaussian applied to the per-column curve rows
    pub rectify_sigma: f64,

    /// Background rows appended after each rectified strip
    pub line_padding: u32,

    /// Render the curve overlay alongside the dewarped page
    pub draw_overlay: bool,
    /// Column stride between overlay polyline vertices
    pub overlay_step: u32,
    /// Overlay stroke thickness, in rows
    pub overlay_thickness: u32,
    /// Overlay stroke color (RGB)
    pub overlay_color: [u8; 3],
}

impl Default for DewarpConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.0,
            clahe_tiles: (8, 8),
            line_window: 80,
            profile_sigma: 2.0,
            peak_floor_ratio: 0.5,
            window_height: 50,
            window_width: 10,
            sample_step: 2,
            min_curve_points: 4,
            median_window: 5,
            outlier_tolerance: 50.0,
            max_residual: 100.0,
            rectify_sigma: 2.0,
            line_padding: 20,
            draw_overlay: true,
            overlay_step: 5,
            overlay_thickness: 2,
            overlay_color: [0, 255, 0],
        }
    }
}

impl DewarpConfig {
    /// Check that every parameter is usable by the pipeline
    pub fn validate(&self) -> Result<(), DewarpError> {
        let positive = [
            ("clahe_clip_limit", self.clahe_clip_limit),
            ("profile_sigma", self.profile_sigma),
            ("rectify_sigma", self.rectify_sigma),
            ("outlier_tolerance", self.outlier_tolerance),
            ("max_residual", self.max_residual),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DewarpError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if !self.peak_floor_ratio.is_finite() || self.peak_floor_ratio < 0.0 {
            return Err(DewarpError::InvalidConfig(format!(
                "peak_floor_ratio must be non-negative, got {}",
                self.peak_floor_ratio
            )));
        }

        let nonzero = [
            ("clahe_tiles.0", self.clahe_tiles.0 as usize),
            ("clahe_tiles.1", self.clahe_tiles.1 as usize),
            ("line_window", self.line_window),
            ("window_height", self.window_height as usize),
            ("window_width", self.window_width as usize),
            ("sample_step", self.sample_step as usize),
            ("median_window", self.median_window),
            ("overlay_step", self.overlay_step as usize),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(DewarpError::InvalidConfig(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        // Strips and their padding are stacked in a u32-tall page
        let pitch = 2 * self.window_height as u64 + self.line_padding as u64;
        if pitch > u32::MAX as u64 {
            return Err(DewarpError::InvalidConfig(format!(
                "window_height {} with line_padding {} exceeds the maximum image height",
                self.window_height, self.line_padding
            )));
        }

        // A cubic spline needs four knots
        if self.min_curve_points < 4 {
            return Err(DewarpError::InvalidConfig(format!(
                "min_curve_points must be at least 4, got {}",
                self.min_curve_points
            )));
        }

        Ok(())
    }

    /// Height of one rectified strip
    pub fn strip_height(&self) -> u32 {
        2 * self.window_height
    }
}
