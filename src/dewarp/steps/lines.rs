use super::binarize::FOREGROUND;
use crate::config::DewarpConfig;
use crate::dewarp::smoothing::gaussian_filter1d;
use image::GrayImage;

/// Find the center rows of text lines, top to bottom
///
/// Uses the horizontal projection profile (ink pixels per row), smoothed
/// to suppress single-row noise, and keeps rows that dominate their
/// `line_window` neighbourhood and rise above an adaptive floor.
pub fn locate_lines(mask: &GrayImage, config: &DewarpConfig) -> Vec<u32> {
    let profile = projection_profile(mask);
    let smoothed = gaussian_filter1d(&profile, config.profile_sigma);
    let peaks = detect_peaks(&smoothed, config.line_window, config.peak_floor_ratio);

    tracing::debug!(candidates = peaks.len(), "Text line candidates located");
    peaks.into_iter().map(|row| row as u32).collect()
}

/// Number of ink pixels in each row
pub fn projection_profile(mask: &GrayImage) -> Vec<f64> {
    mask.rows()
        .map(|row| row.filter(|p| p.0[0] == FOREGROUND).count() as f64)
        .collect()
}

/// Greedy peak picking over a smoothed profile
///
/// Row `i` is a peak when it is strictly above every value in the
/// preceding `window` rows, no lower than every value in the following
/// `window` rows, and above `floor_ratio * mean`. Ties therefore resolve
/// to the earliest row. Rows closer than `window` to either end are never
/// evaluated, and a peak closer than `window` rows to the previously
/// accepted one is dropped.
pub fn detect_peaks(smoothed: &[f64], window: usize, floor_ratio: f64) -> Vec<usize> {
    let len = smoothed.len();
    if window == 0 || len <= 2 * window {
        return Vec::new();
    }

    let mean = smoothed.iter().sum::<f64>() / len as f64;
    let floor = mean * floor_ratio;

    let mut peaks: Vec<usize> = Vec::new();
    for i in window..len - window {
        let value = smoothed[i];
        if value <= floor {
            continue;
        }

        let before = max_of(&smoothed[i - window..i]);
        let after = max_of(&smoothed[i + 1..=i + window]);
        if value <= before || value < after {
            continue;
        }

        match peaks.last() {
            Some(&last) if i - last < window => continue,
            _ => peaks.push(i),
        }
    }

    peaks
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
