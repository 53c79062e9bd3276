use super::binarize::BACKGROUND;
use super::curve::FittedCurve;
use crate::config::DewarpConfig;
use crate::dewarp::smoothing::gaussian_filter1d;
use crate::error::LineFitError;
use image::{GrayImage, Luma};

/// Straighten one text line into a strip `2 * window_height` rows tall
///
/// Every column is shifted vertically so the baseline lands on row
/// `window_height` of the strip. Rows with no source pixel stay background.
pub fn rectify_line(
    mask: &GrayImage,
    curve: &FittedCurve,
    config: &DewarpConfig,
) -> Result<GrayImage, LineFitError> {
    let (width, height) = mask.dimensions();
    let half = config.window_height as i64;
    let strip_height = config.strip_height();

    let rows = baseline_rows(curve, width, height, config)?;

    let mut strip = GrayImage::from_pixel(width, strip_height, Luma([BACKGROUND]));
    for (x, &row) in rows.iter().enumerate() {
        let x = x as u32;
        let src_y = row as i64;
        let src_start = (src_y - half).max(0);
        let src_end = (src_y + half).min(height as i64);
        if src_start >= src_end {
            continue;
        }

        let dst_start = (half - (src_y - src_start)).clamp(0, strip_height as i64);
        let dst_end = (dst_start + (src_end - src_start)).min(strip_height as i64);
        for (offset, dst_y) in (dst_start..dst_end).enumerate() {
            let src = mask.get_pixel(x, (src_start + offset as i64) as u32);
            strip.put_pixel(x, dst_y as u32, *src);
        }
    }

    Ok(strip)
}

/// Per-column source row of the baseline, clipped and smoothed
fn baseline_rows(
    curve: &FittedCurve,
    width: u32,
    height: u32,
    config: &DewarpConfig,
) -> Result<Vec<f64>, LineFitError> {
    let low = config.window_height as f64;
    let high = height as f64 - config.window_height as f64;

    let mut rows = Vec::with_capacity(width as usize);
    for x in 0..width {
        let y = curve.eval(x as f64);
        if !y.is_finite() {
            return Err(LineFitError::NonFiniteCurve { column: x });
        }
        // A page shorter than the strip collapses the range onto `high`
        rows.push(y.max(low).min(high));
    }

    Ok(gaussian_filter1d(&rows, config.rectify_sigma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dewarp::steps::baseline::PointSample;
    use crate::dewarp::steps::binarize::FOREGROUND;
    use crate::dewarp::steps::curve::fit_curve;

    fn flat_curve(y: f64, width: u32) -> FittedCurve {
        let points: Vec<PointSample> = (0..width / 10)
            .map(|i| PointSample::new(i as f64 * 10.0, y))
            .collect();
        fit_curve(&points, &DewarpConfig::default()).unwrap()
    }

    fn ink_rows(img: &GrayImage, x: u32) -> Vec<u32> {
        (0..img.height())
            .filter(|&y| img.get_pixel(x, y).0[0] == FOREGROUND)
            .collect()
    }

    #[test]
    fn test_strip_has_fixed_geometry() {
        let mask = GrayImage::from_pixel(120, 300, Luma([BACKGROUND]));
        let config = DewarpConfig::default();

        let strip = rectify_line(&mask, &flat_curve(150.0, 120), &config).unwrap();

        assert_eq!(strip.dimensions(), (120, 100));
        assert!(strip.pixels().all(|p| p.0[0] == BACKGROUND));
    }

    #[test]
    fn test_horizontal_line_stays_on_center_row() {
        let config = DewarpConfig::default();
        let mask = GrayImage::from_fn(200, 300, |_, y| {
            if (139..=141).contains(&y) {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        });

        let strip = rectify_line(&mask, &flat_curve(140.0, 200), &config).unwrap();

        for x in 0..200 {
            let rows = ink_rows(&strip, x);
            assert_eq!(rows.len(), 3, "Column {} lost ink", x);
            for row in rows {
                assert!(
                    (row as i64 - config.window_height as i64).abs() <= 2,
                    "Column {} ink at row {}",
                    x,
                    row
                );
            }
        }
    }

    #[test]
    fn test_curve_point_lands_on_center_row() {
        // A single ink pixel per column exactly on a tilted line
        let config = DewarpConfig::default();
        let line = |x: u32| 120 + x / 10;
        let mask = GrayImage::from_fn(200, 300, |x, y| {
            if y == line(x) {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        });
        let points: Vec<PointSample> = (0..40)
            .map(|i| PointSample::new(i as f64 * 5.0, 120.0 + i as f64 * 0.5))
            .collect();
        let curve = fit_curve(&points, &config).unwrap();

        let strip = rectify_line(&mask, &curve, &config).unwrap();

        for x in 20..180 {
            let rows = ink_rows(&strip, x);
            assert_eq!(rows.len(), 1);
            assert!(
                (rows[0] as i64 - 50).abs() <= 1,
                "Column {} at row {}",
                x,
                rows[0]
            );
        }
    }

    #[test]
    fn test_curve_is_clipped_away_from_edges() {
        let config = DewarpConfig::default();
        let rows = baseline_rows(&flat_curve(5.0, 100), 100, 300, &config).unwrap();
        assert!(rows.iter().all(|&y| (y - 50.0).abs() < 1e-9));

        let rows = baseline_rows(&flat_curve(290.0, 100), 100, 300, &config).unwrap();
        assert!(rows.iter().all(|&y| (y - 250.0).abs() < 1e-9));
    }

    #[test]
    fn test_extrapolated_curve_stays_in_clip_range() {
        // Samples cover a fifth of the page; past them the cubic runs off-page
        let config = DewarpConfig::default();
        let f = |x: f64| 150.0 + 2e-5 * (x - 500.0).powi(3);
        let points: Vec<PointSample> = (400..600)
            .step_by(4)
            .map(|x| PointSample::new(x as f64, f(x as f64)))
            .collect();
        let curve = fit_curve(&points, &config).unwrap();

        let rows = baseline_rows(&curve, 1000, 300, &config).unwrap();

        assert!(rows.iter().all(|&y| y >= 50.0 - 1e-9 && y <= 250.0 + 1e-9));
        assert!((rows[0] - 50.0).abs() < 1e-9);
        assert!((rows[999] - 250.0).abs() < 1e-9);
        assert!((rows[500] - 150.0).abs() < 1.0);
    }

    #[test]
    fn test_short_page_copies_what_exists() {
        // Page shorter than one strip: everything is copied, rest stays background
        let config = DewarpConfig::default();
        let mask = GrayImage::from_pixel(60, 40, Luma([FOREGROUND]));

        let strip = rectify_line(&mask, &flat_curve(20.0, 60), &config).unwrap();

        assert_eq!(strip.dimensions(), (60, 100));
        for x in 0..60 {
            assert_eq!(ink_rows(&strip, x).len(), 40);
        }
    }
}
