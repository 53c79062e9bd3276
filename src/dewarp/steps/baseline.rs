use super::binarize::FOREGROUND;
use crate::config::DewarpConfig;
use image::GrayImage;
use serde::Serialize;

/// Estimated vertical ink centroid at one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointSample {
    pub x: f64,
    pub y: f64,
}

impl PointSample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Sample the vertical centerline of the text line around `center_row`
///
/// A `window_width` wide strip, `2 * window_height` rows tall, slides across
/// the page in `sample_step` increments. Windows with fewer than
/// `window_width` ink pixels are skipped; the rest emit one point at the
/// Gaussian-weighted mean of their ink row offsets. Points come out ordered
/// by x.
pub fn sample_baseline(
    mask: &GrayImage,
    center_row: u32,
    config: &DewarpConfig,
) -> Vec<PointSample> {
    let (width, height) = mask.dimensions();
    let window_width = config.window_width;

    let y_start = center_row.saturating_sub(config.window_height);
    let y_end = center_row.saturating_add(config.window_height).min(height);
    if y_start >= y_end || width <= window_width {
        return Vec::new();
    }

    let mut points = Vec::new();
    let mut offsets = Vec::new();
    for x in (0..width - window_width).step_by(config.sample_step as usize) {
        // Row-major scan keeps the offsets sorted
        offsets.clear();
        for y in y_start..y_end {
            for dx in 0..window_width {
                if mask.get_pixel(x + dx, y).0[0] == FOREGROUND {
                    offsets.push((y - y_start) as f64);
                }
            }
        }

        if offsets.len() < window_width as usize {
            continue;
        }

        if let Some(mean) = weighted_offset(&offsets) {
            points.push(PointSample::new(
                (x + window_width / 2) as f64,
                y_start as f64 + mean,
            ));
        }
    }

    points
}

/// Gaussian-weighted mean of sorted ink row offsets
///
/// The weight is centered on the middle index of the list (`n / 2`) with a
/// spread of `n / 4`, not on the middle of the search window. Returns `None`
/// when every weight underflows to zero.
fn weighted_offset(offsets: &[f64]) -> Option<f64> {
    let n = offsets.len() as f64;
    let center = n / 2.0;
    let spread = n / 4.0;

    let (weighted, total) = offsets.iter().fold((0.0, 0.0), |(acc, sum), &offset| {
        let weight = (-0.5 * ((offset - center) / spread).powi(2)).exp();
        (acc + weight * offset, sum + weight)
    });

    if total > 0.0 && total.is_finite() {
        Some(weighted / total)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dewarp::steps::binarize::BACKGROUND;
    use image::Luma;

    fn band_mask(width: u32, height: u32, center: u32, half_thickness: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |_, y| {
            if y + half_thickness >= center && y <= center + half_thickness {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        })
    }

    #[test]
    fn test_straight_band_samples_track_center() {
        let mask = band_mask(400, 300, 150, 1);
        let points = sample_baseline(&mask, 150, &DewarpConfig::default());

        assert!(points.len() >= 4, "Expected samples, got {}", points.len());
        for p in &points {
            assert!(
                (p.y - 150.0).abs() <= 1.0,
                "Sample at x={} drifted to y={}",
                p.x,
                p.y
            );
        }
    }

    #[test]
    fn test_samples_are_ordered_and_centered_in_window() {
        let mask = band_mask(100, 200, 100, 1);
        let points = sample_baseline(&mask, 100, &DewarpConfig::default());

        // x = 0, 2, ..., 88 shifted by half the window width
        assert_eq!(points.len(), 45);
        assert_eq!(points[0].x, 5.0);
        assert!(points.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn test_sparse_windows_emit_nothing() {
        // One ink pixel every 12 columns never fills a 10-wide window
        let mask = GrayImage::from_fn(200, 200, |x, y| {
            if y == 100 && x % 12 == 0 {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        });
        let config = DewarpConfig::default();

        assert!(sample_baseline(&mask, 100, &config).is_empty());
    }

    #[test]
    fn test_window_is_clamped_at_page_top() {
        let mask = band_mask(120, 200, 10, 1);
        let points = sample_baseline(&mask, 20, &DewarpConfig::default());

        assert!(!points.is_empty());
        for p in &points {
            assert!((p.y - 10.0).abs() <= 1.0, "Got y={}", p.y);
        }
    }

    #[test]
    fn test_page_narrower_than_window() {
        let mask = band_mask(8, 200, 100, 1);
        let config = DewarpConfig::default();
        assert!(sample_baseline(&mask, 100, &config).is_empty());
    }

    #[test]
    fn test_weighted_offset_of_single_value() {
        assert_eq!(weighted_offset(&[4.0; 12]), Some(4.0));
    }
}
