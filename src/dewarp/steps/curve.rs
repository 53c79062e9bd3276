use super::baseline::PointSample;
use crate::config::DewarpConfig;
use crate::error::LineFitError;

/// Smooth baseline model for one text line
#[derive(Debug, Clone)]
pub struct FittedCurve {
    spline: CubicSpline,
}

impl FittedCurve {
    /// Row of the baseline at column `x`; extrapolates outside the domain
    pub fn eval(&self, x: f64) -> f64 {
        self.spline.eval(x)
    }

    /// Range of x covered by the samples the curve was fitted through
    pub fn domain(&self) -> (f64, f64) {
        self.spline.domain()
    }

    /// Largest absolute difference between the curve and the given samples
    pub fn max_residual(&self, points: &[PointSample]) -> f64 {
        points
            .iter()
            .map(|p| (self.eval(p.x) - p.y).abs())
            .fold(0.0, f64::max)
    }
}

/// Fit a cubic curve through the baseline samples of one line
///
/// Samples far from the median of the trailing `median_window` samples are
/// rejected before fitting, and the fit is refused if it strays more than
/// `max_residual` from any surviving sample.
pub fn fit_curve(
    points: &[PointSample],
    config: &DewarpConfig,
) -> Result<FittedCurve, LineFitError> {
    let required = config.min_curve_points;
    if points.len() < required {
        return Err(LineFitError::InsufficientPoints {
            found: points.len(),
            required,
        });
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));

    let tail_start = sorted.len().saturating_sub(config.median_window);
    let tail: Vec<f64> = sorted[tail_start..].iter().map(|p| p.y).collect();
    let reference = median(&tail);

    let inliers: Vec<PointSample> = sorted
        .into_iter()
        .filter(|p| (p.y - reference).abs() < config.outlier_tolerance)
        .collect();
    if inliers.len() < required {
        return Err(LineFitError::InsufficientInliers {
            found: inliers.len(),
            required,
        });
    }

    let xs: Vec<f64> = inliers.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = inliers.iter().map(|p| p.y).collect();
    let curve = FittedCurve {
        spline: CubicSpline::not_a_knot(&xs, &ys)?,
    };

    let residual = curve.max_residual(&inliers);
    if !residual.is_finite() || residual > config.max_residual {
        return Err(LineFitError::ResidualExceeded {
            residual,
            tolerance: config.max_residual,
        });
    }

    Ok(curve)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Interpolating cubic spline with not-a-knot end conditions
///
/// Stored as knot positions, values, and second derivatives (moments).
#[derive(Debug, Clone)]
struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    moments: Vec<f64>,
}

impl CubicSpline {
    fn not_a_knot(xs: &[f64], ys: &[f64]) -> Result<Self, LineFitError> {
        let n = xs.len();
        if n < 4 || ys.len() != n {
            return Err(LineFitError::Interpolation {
                detail: format!("need 4+ matching knots, got {} x / {} y", n, ys.len()),
            });
        }

        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        if let Some(i) = h.iter().position(|&step| step.is_nan() || step <= 0.0) {
            return Err(LineFitError::Interpolation {
                detail: format!("knots must increase (x[{}] = {})", i + 1, xs[i + 1]),
            });
        }

        // Tridiagonal system for the interior moments M[1..n-1]. The two end
        // moments are eliminated with the not-a-knot conditions, which only
        // alters the first and last rows.
        let m = n - 2;
        let mut lower = vec![0.0; m];
        let mut diag = vec![0.0; m];
        let mut upper = vec![0.0; m];
        let mut rhs = vec![0.0; m];

        for row in 0..m {
            let i = row + 1;
            lower[row] = h[i - 1];
            diag[row] = 2.0 * (h[i - 1] + h[i]);
            upper[row] = h[i];
            rhs[row] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }

        let (h0, h1) = (h[0], h[1]);
        diag[0] = (h0 + h1) * (h0 + 2.0 * h1) / h1;
        upper[0] = (h1 * h1 - h0 * h0) / h1;
        lower[0] = 0.0;

        let (ha, hb) = (h[n - 3], h[n - 2]);
        lower[m - 1] = (ha * ha - hb * hb) / ha;
        diag[m - 1] = (ha + hb) * (2.0 * ha + hb) / ha;
        upper[m - 1] = 0.0;

        let interior = solve_tridiagonal(&lower, &diag, &upper, &rhs)?;

        let mut moments = Vec::with_capacity(n);
        moments.push(((h0 + h1) * interior[0] - h0 * interior[1]) / h1);
        moments.extend_from_slice(&interior);
        moments.push(((ha + hb) * interior[m - 1] - hb * interior[m - 2]) / ha);

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            moments,
        })
    }

    fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    fn eval(&self, x: f64) -> f64 {
        let last = self.xs.len() - 2;
        // Segment whose polynomial covers x; end segments extend outward
        let i = self.xs.partition_point(|&k| k <= x);
        let i = i.saturating_sub(1).min(last);

        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.moments[i], self.moments[i + 1]);
        let h = x1 - x0;
        let a = x1 - x;
        let b = x - x0;

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Thomas algorithm; fails on a vanishing pivot
fn solve_tridiagonal(
    lower: &[f64],
    diag: &[f64],
    upper: &[f64],
    rhs: &[f64],
) -> Result<Vec<f64>, LineFitError> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    for i in 0..n {
        let pivot = if i == 0 {
            diag[0]
        } else {
            diag[i] - lower[i] * c[i - 1]
        };
        if !pivot.is_finite() || pivot.abs() < 1e-12 {
            return Err(LineFitError::Interpolation {
                detail: format!("singular spline system at row {}", i),
            });
        }
        c[i] = upper[i] / pivot;
        d[i] = if i == 0 {
            rhs[0] / pivot
        } else {
            (rhs[i] - lower[i] * d[i - 1]) / pivot
        };
    }

    let mut solution = d;
    for i in (0..n.saturating_sub(1)).rev() {
        solution[i] -= c[i] * solution[i + 1];
    }
    Ok(solution)
}
