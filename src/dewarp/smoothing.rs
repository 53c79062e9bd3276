/// Kernel extent in standard deviations
const TRUNCATE: f64 = 4.0;

/// Normalized 1-D Gaussian kernel of radius `round(TRUNCATE * sigma)`
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Mirror an out-of-range index back into `0..len` (d c b a | a b c d | d c b a)
fn reflect(index: i64, len: usize) -> usize {
    let period = 2 * len as i64;
    let m = index.rem_euclid(period);
    if m >= len as i64 {
        (period - 1 - m) as usize
    } else {
        m as usize
    }
}

/// Smooth a 1-D signal with a Gaussian kernel
///
/// Edges are handled by half-sample symmetric reflection, so a constant
/// signal comes back unchanged.
pub fn gaussian_filter1d(signal: &[f64], sigma: f64) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;

    let len = signal.len();
    (0..len as i64)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * signal[reflect(i + k as i64 - radius, len)])
                .sum()
        })
        .collect()
}
