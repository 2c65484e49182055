//! Goodness-of-fit metrics.

/// Variance below which R² is reported as undefined.
pub const MIN_TOTAL_VARIANCE: f64 = 1e-12;

/// Fit quality of a set of predictions against measured labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitMetrics {
    /// `1 - ss_res / ss_tot`, or `None` when the labels have no variance.
    pub r_squared: Option<f64>,
    /// `sqrt(ss_res / n)`.
    pub rmse: f64,
}

/// Computes R² and RMSE of `predictions` against `labels`.
///
/// Returns `None` when there are no labels or the two slices differ in
/// length.
#[must_use]
pub fn fit_metrics(labels: &[f64], predictions: &[f64]) -> Option<FitMetrics> {
    if labels.is_empty() || labels.len() != predictions.len() {
        return None;
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "sample counts stay far below 2^52"
    )]
    let n = labels.len() as f64;
    let mean = labels.iter().sum::<f64>() / n;

    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for (&y, &y_hat) in labels.iter().zip(predictions) {
        ss_tot += (y - mean).powi(2);
        ss_res += (y - y_hat).powi(2);
    }

    let r_squared =
        (ss_tot > MIN_TOTAL_VARIANCE).then(|| 1.0 - ss_res / ss_tot);
    Some(FitMetrics {
        r_squared,
        rmse: (ss_res / n).sqrt(),
    })
}
