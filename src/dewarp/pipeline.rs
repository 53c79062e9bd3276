use crate::config::DewarpConfig;
use crate::error::{DewarpError, LineFitError};
use image::{DynamicImage, GrayImage, RgbImage};
use serde::Serialize;
use std::time::Instant;

use super::steps::{self, curve::FittedCurve};

/// Timing information for a single pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// What happened to one candidate text line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineOutcome {
    /// Straightened into the strip at `strip_index` of the output page
    Dewarped { strip_index: usize },
    /// Dropped from the output page
    Skipped { error: LineFitError },
}

/// Per-line diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct LineReport {
    /// Row the line was detected at
    pub center_row: u32,
    /// Number of raw baseline samples
    pub samples: usize,
    pub outcome: LineOutcome,
}

/// Result of dewarping one page
#[derive(Debug, Clone, Serialize)]
pub struct DewarpResult {
    /// Two-valued ink/paper mask (not serialized)
    #[serde(skip)]
    pub mask: GrayImage,
    /// Fitted curves drawn over the mask (not serialized)
    #[serde(skip)]
    pub overlay: Option<RgbImage>,
    /// Dewarped page, or a copy of the mask on fallback (not serialized)
    #[serde(skip)]
    pub page: GrayImage,
    /// True when no line could be dewarped and `page` is the mask
    pub fallback: bool,
    /// One entry per candidate line, top to bottom
    pub lines: Vec<LineReport>,
    /// Total processing time in milliseconds
    pub total_time_ms: u64,
    /// Individual stage timings
    pub steps: Vec<StepTiming>,
}

impl DewarpResult {
    pub fn dewarped_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l.outcome, LineOutcome::Dewarped { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.lines.len() - self.dewarped_count()
    }
}

/// Page dewarping pipeline
///
/// Stages run strictly in order: binarize, locate lines, then sample, fit and
/// rectify each line independently, and finally assemble the page.
pub struct Dewarper {
    config: DewarpConfig,
}

impl Dewarper {
    pub fn new(config: DewarpConfig) -> Result<Self, DewarpError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DewarpConfig {
        &self.config
    }

    /// Convert any decoded image to grayscale and dewarp it
    pub fn process_image(&self, image: &DynamicImage) -> Result<DewarpResult, DewarpError> {
        self.process(&image.to_luma8())
    }

    /// Dewarp a grayscale page
    pub fn process(&self, page: &GrayImage) -> Result<DewarpResult, DewarpError> {
        let start = Instant::now();
        let mut timings = Vec::new();

        let mask = run_step("binarize", &mut timings, || {
            steps::binarize::binarize(page, &self.config)
        })?;

        let candidates = run_step("locate_lines", &mut timings, || {
            Ok(steps::lines::locate_lines(&mask, &self.config))
        })?;

        let (reports, strips, curves) = run_step("dewarp_lines", &mut timings, || {
            Ok(self.dewarp_lines(&mask, &candidates))
        })?;

        let (page, overlay) = run_step("assemble", &mut timings, || {
            let page = steps::assemble::assemble_page(&mask, &strips, &self.config);
            let overlay = self.config.draw_overlay.then(|| {
                let curves: Vec<&FittedCurve> = curves.iter().collect();
                steps::assemble::draw_overlay(&mask, &curves, &self.config)
            });
            Ok((page, overlay))
        })?;

        let fallback = strips.is_empty();
        if fallback {
            tracing::warn!(
                candidates = candidates.len(),
                "No text line could be dewarped, returning the binary mask"
            );
        } else {
            tracing::info!(
                dewarped = strips.len(),
                skipped = candidates.len() - strips.len(),
                height = page.height(),
                "Page dewarped"
            );
        }

        Ok(DewarpResult {
            mask,
            overlay,
            page,
            fallback,
            lines: reports,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        })
    }

    /// Sample, fit and rectify every candidate line; failures only skip the line
    fn dewarp_lines(
        &self,
        mask: &GrayImage,
        candidates: &[u32],
    ) -> (Vec<LineReport>, Vec<GrayImage>, Vec<FittedCurve>) {
        let mut reports = Vec::with_capacity(candidates.len());
        let mut strips = Vec::new();
        let mut curves = Vec::new();

        for &center_row in candidates {
            let points = steps::baseline::sample_baseline(mask, center_row, &self.config);
            let samples = points.len();

            let rectified = steps::curve::fit_curve(&points, &self.config).and_then(|curve| {
                let strip = steps::rectify::rectify_line(mask, &curve, &self.config)?;
                Ok((curve, strip))
            });

            let outcome = match rectified {
                Ok((curve, strip)) => {
                    tracing::debug!(center_row, samples, "Line dewarped");
                    strips.push(strip);
                    curves.push(curve);
                    LineOutcome::Dewarped {
                        strip_index: strips.len() - 1,
                    }
                }
                Err(error) => {
                    tracing::debug!(center_row, samples, %error, "Line skipped");
                    LineOutcome::Skipped { error }
                }
            };

            reports.push(LineReport {
                center_row,
                samples,
                outcome,
            });
        }

        (reports, strips, curves)
    }
}

fn run_step<T, F>(name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> Result<T, DewarpError>
where
    F: FnOnce() -> Result<T, DewarpError>,
{
    let step_start = Instant::now();
    let result = step_fn()?;
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_rejects_invalid_config() {
        let config = DewarpConfig {
            sample_step: 0,
            ..Default::default()
        };
        assert!(matches!(
            Dewarper::new(config),
            Err(DewarpError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_blank_page_falls_back_to_mask() {
        let dewarper = Dewarper::new(DewarpConfig::default()).unwrap();
        let page = GrayImage::from_pixel(200, 300, Luma([255]));

        let result = dewarper.process(&page).unwrap();

        assert!(result.fallback);
        assert!(result.lines.is_empty());
        assert_eq!(result.page, result.mask);
        assert_eq!(result.dewarped_count(), 0);
    }

    #[test]
    fn test_records_every_stage() {
        let dewarper = Dewarper::new(DewarpConfig::default()).unwrap();
        let page = GrayImage::from_pixel(50, 50, Luma([255]));

        let result = dewarper.process(&page).unwrap();
        let names: Vec<&str> = result.steps.iter().map(|s| s.name.as_str()).collect();

        assert_eq!(
            names,
            ["binarize", "locate_lines", "dewarp_lines", "assemble"]
        );
    }

    #[test]
    fn test_overlay_can_be_disabled() {
        let config = DewarpConfig {
            draw_overlay: false,
            ..Default::default()
        };
        let dewarper = Dewarper::new(config).unwrap();
        let page = GrayImage::from_pixel(50, 50, Luma([255]));

        let result = dewarper.process(&page).unwrap();
        assert!(result.overlay.is_none());
    }

    #[test]
    fn test_empty_page_is_rejected() {
        let dewarper = Dewarper::new(DewarpConfig::default()).unwrap();
        let result = dewarper.process(&GrayImage::new(0, 0));
        assert!(matches!(result, Err(DewarpError::InvalidInput(_))));
    }

    #[test]
    fn test_report_serializes_without_images() {
        let dewarper = Dewarper::new(DewarpConfig::default()).unwrap();
        let result = dewarper
            .process(&GrayImage::from_pixel(50, 50, Luma([255])))
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["fallback"], true);
        assert!(json.get("mask").is_none());
        assert!(json.get("page").is_none());
    }
}
