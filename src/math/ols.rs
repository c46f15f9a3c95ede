//! Ordinary least squares for a single regressor with intercept.
//!
//! We solve
//!
//! ```text
//! minimize Σ (y_i - a - b x_i)^2
//! ```
//!
//! by building the `n × 2` design matrix `[1, x]` and solving it with SVD.
//! SVD keeps the solve stable for tall matrices, and the sums of squares we
//! need for R² and the slope standard error fall out of the residuals.

use nalgebra::{DMatrix, DVector};

/// Relative tolerance under which the regressor is treated as constant.
const VARIANCE_EPS: f64 = 1e-12;

/// Coefficients and sums of squares of a fitted line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub n: usize,
    pub intercept: f64,
    pub slope: f64,
    /// Residual sum of squares.
    pub ss_res: f64,
    /// Total sum of squares of `y` around its mean.
    pub ss_tot: f64,
    /// Σ (x_i - x̄)^2.
    pub sxx: f64,
}

impl LineFit {
    /// Residual degrees of freedom (`n - 2`).
    pub fn df_resid(&self) -> usize {
        self.n.saturating_sub(2)
    }
}

/// Why a line could not be fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFitError {
    /// Fewer than two points.
    TooFewPoints,
    /// All `x` values equal; the slope is not identified.
    ConstantRegressor,
    /// Non-finite input or solver output.
    NonFinite,
}

/// Fit `y = intercept + slope * x`.
pub fn fit_line(x: &[f64], y: &[f64]) -> Result<LineFit, LineFitError> {
    let n = x.len().min(y.len());
    if n < 2 {
        return Err(LineFitError::TooFewPoints);
    }
    let (x, y) = (&x[..n], &y[..n]);
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(LineFitError::NonFinite);
    }

    let x_mean = mean(x);
    let y_mean = mean(y);
    let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
    let scale = x.iter().map(|v| v * v).sum::<f64>().max(1.0);
    if sxx <= VARIANCE_EPS * scale {
        return Err(LineFitError::ConstantRegressor);
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let target = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &target).ok_or(LineFitError::NonFinite)?;
    let (intercept, slope) = (beta[0], beta[1]);

    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - intercept - slope * xi).powi(2))
        .sum();
    let ss_tot: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();

    Ok(LineFit {
        n,
        intercept,
        slope,
        ss_res,
        ss_tot,
        sxx,
    })
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}
