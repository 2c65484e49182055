//! Ordinary least squares with an intercept.

use std::collections::HashSet;

use canopy_schemas::{FittedModel, Sample, TrainingSet};
use tracing::{debug, debug_span, info, warn};

use crate::apply::predict_row;
use crate::error::{RegressError, RegressErrorKind};
use crate::linalg::{invert, mat_vec, normal_equations};
use crate::metrics::fit_metrics;

/// Raw solver output: intercept plus coefficients in feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    /// Prediction when every feature is zero.
    pub intercept: f64,
    /// One coefficient per feature, in the samples' feature order.
    pub coefficients: Vec<f64>,
}

impl LinearFit {
    /// Evaluates the fit on one positional feature vector.
    #[must_use]
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(features)
            .fold(self.intercept, |acc, (c, x)| acc + c * x)
    }
}

/// Fits `label = intercept + Σ beta_i × feature_i` by solving the normal
/// equations `(AᵗA) β = Aᵗy`.
///
/// Every sample must have exactly `feature_count` values. Fails on an
/// empty sample set and when `AᵗA` is singular, which happens whenever
/// there are fewer distinct points than parameters or two features are
/// collinear.
pub fn fit(
    samples: &[Sample],
    feature_count: usize,
) -> Result<LinearFit, RegressError> {
    let _span =
        debug_span!("fit", samples = samples.len(), features = feature_count)
            .entered();

    if samples.is_empty() {
        return Err(RegressError::new(RegressErrorKind::EmptySampleSet));
    }

    let equations = normal_equations(samples, feature_count)?;
    let inverse = invert(&equations.ata, equations.dim)?;
    let beta = mat_vec(&inverse, &equations.aty);

    let coefficients = beta[1..].to_vec();
    debug!(intercept = beta[0], ?coefficients, "solved");
    Ok(LinearFit {
        intercept: beta[0],
        coefficients,
    })
}

/// Fits a model and packages it with its training-set metrics.
///
/// Training predictions go through [`predict_row`], the same arithmetic
/// used when the model is applied later, so the reported R² and RMSE
/// describe exactly what consumers will compute.
pub fn fit_model(
    feature_names: Vec<String>,
    samples: &[Sample],
) -> Result<FittedModel, RegressError> {
    let mut seen = HashSet::new();
    if let Some(duplicate) =
        feature_names.iter().find(|n| !seen.insert(n.as_str()))
    {
        return Err(RegressError::new(RegressErrorKind::DuplicateFeature {
            name: duplicate.clone(),
        }));
    }

    let linear = fit(samples, feature_names.len())?;
    let mut model = FittedModel::from_positional(
        feature_names,
        linear.intercept,
        &linear.coefficients,
    )
    .ok_or_else(|| {
        RegressError::dimension_mismatch(
            "coefficient vector",
            0,
            samples.first().map_or(0, |s| s.features.len()),
            linear.coefficients.len(),
        )
    })?;

    let predictions = samples
        .iter()
        .map(|sample| predict_row(&model, &sample.features))
        .collect::<Result<Vec<f64>, _>>()?;
    let labels: Vec<f64> = samples.iter().map(|s| s.label).collect();
    let metrics = fit_metrics(&labels, &predictions)
        .ok_or_else(|| RegressError::new(RegressErrorKind::EmptySampleSet))?;

    if metrics.r_squared.is_none() {
        warn!(
            samples = samples.len(),
            "training labels have no variance; R² is undefined"
        );
    }

    model.r_squared = metrics.r_squared;
    model.rmse = metrics.rmse;
    model.training_points = samples.len();

    info!(
        points = model.training_points,
        intercept = model.intercept,
        r_squared = ?model.r_squared,
        rmse = model.rmse,
        "fitted linear model"
    );
    Ok(model)
}

/// [`fit_model`] over an assembled training set.
pub fn fit_training_set(
    set: &TrainingSet,
) -> Result<FittedModel, RegressError> {
    fit_model(set.feature_names.clone(), &set.samples)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::apply::predict;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn recovers_exact_line() {
        let samples: Vec<Sample> = [0.0, 1.0, 2.0, 5.0]
            .iter()
            .map(|&x| Sample::new(vec![x], 3.0 + 2.0 * x))
            .collect();
        let model = fit_model(names(&["ndvi"]), &samples).unwrap();

        assert!((model.intercept - 3.0).abs() < 1e-9);
        assert!((model.coefficient("ndvi").unwrap() - 2.0).abs() < 1e-9);
        assert!((model.r_squared.unwrap() - 1.0).abs() < 1e-9);
        assert!(model.rmse < 1e-9);
        assert_eq!(model.training_points, 4);
    }

    #[test]
    fn recovers_plane_with_two_features() {
        let samples = vec![
            Sample::new(vec![1.0, 2.0], 1.0 + 3.0 * 1.0 - 0.5 * 2.0),
            Sample::new(vec![2.0, 1.0], 1.0 + 3.0 * 2.0 - 0.5 * 1.0),
            Sample::new(vec![3.0, 4.0], 1.0 + 3.0 * 3.0 - 0.5 * 4.0),
            Sample::new(vec![0.0, 7.0], 1.0 + 3.0 * 0.0 - 0.5 * 7.0),
        ];
        let fit = fit(&samples, 2).unwrap();
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.coefficients[0] - 3.0).abs() < 1e-9);
        assert!((fit.coefficients[1] + 0.5).abs() < 1e-9);
        assert!((fit.predict(&[1.0, 1.0]) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn duplicated_column_is_singular() {
        let samples: Vec<Sample> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|&x| Sample::new(vec![x, x], x * 10.0))
            .collect();
        let err = fit_model(names(&["ndvi", "evi"]), &samples).unwrap_err();
        assert!(err.is_singular_matrix());
    }

    #[test]
    fn too_few_points_is_singular() {
        let samples = vec![Sample::new(vec![1.0, 2.0], 3.0)];
        assert!(fit(&samples, 2).unwrap_err().is_singular_matrix());
    }

    #[test]
    fn empty_sample_set() {
        assert!(fit(&[], 1).unwrap_err().is_empty_sample_set());
        assert!(
            fit_model(names(&["ndvi"]), &[])
                .unwrap_err()
                .is_empty_sample_set()
        );
    }

    #[test]
    fn dimension_mismatch() {
        let samples =
            vec![Sample::new(vec![1.0], 1.0), Sample::new(vec![2.0, 3.0], 2.0)];
        assert!(fit(&samples, 1).unwrap_err().is_dimension_mismatch());
    }

    #[test]
    fn duplicate_feature_names() {
        let samples = vec![Sample::new(vec![1.0, 2.0], 1.0)];
        let err = fit_model(names(&["b4", "b4"]), &samples).unwrap_err();
        assert!(err.is_duplicate_feature());
    }

    #[test]
    fn constant_labels_have_undefined_r_squared() {
        let samples: Vec<Sample> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&x| Sample::new(vec![x], 5.0))
            .collect();
        let model = fit_model(names(&["ndvi"]), &samples).unwrap();

        assert_eq!(model.r_squared, None);
        let expected = (samples
            .iter()
            .map(|s| (5.0 - predict_row(&model, &s.features).unwrap()).powi(2))
            .sum::<f64>()
            / 3.0)
            .sqrt();
        assert!((model.rmse - expected).abs() < 1e-12);
        assert!(model.rmse < 1e-9);
    }

    #[test]
    fn fit_training_set_uses_declared_names() {
        let set = TrainingSet {
            feature_names: names(&["b8"]),
            samples: vec![
                Sample::new(vec![1.0], 2.0),
                Sample::new(vec![2.0], 4.0),
                Sample::new(vec![3.0], 6.0),
            ],
        };
        let model = fit_training_set(&set).unwrap();
        assert_eq!(model.feature_names, names(&["b8"]));
        assert!((model.coefficient("b8").unwrap() - 2.0).abs() < 1e-9);
    }

    prop_compose! {
        fn arb_samples()(
            rows in prop::collection::vec(
                (-10.0f64..10.0, -10.0f64..10.0, -5.0f64..5.0),
                5..30,
            )
        ) -> Vec<Sample> {
            rows.into_iter()
                .map(|(a, b, noise)| {
                    Sample::new(vec![a, b], 2.0 + 0.5 * a - 1.5 * b + noise)
                })
                .collect()
        }
    }

    proptest! {
        /// Training-set predictions reported by the metrics are exactly
        /// what named prediction returns for each sample.
        #[test]
        fn training_predictions_match_predict(samples in arb_samples()) {
            let Ok(model) = fit_model(names(&["ndvi", "evi"]), &samples) else {
                // Degenerate random draws can be singular.
                return Ok(());
            };
            for sample in &samples {
                let by_row = predict_row(&model, &sample.features).unwrap();
                let by_name = predict(
                    &model,
                    &[("ndvi".to_string(), sample.features[0]),
                      ("evi".to_string(), sample.features[1])]
                        .into_iter()
                        .collect(),
                ).unwrap();
                prop_assert_eq!(by_row.to_bits(), by_name.to_bits());
            }
            prop_assert!(model.rmse >= 0.0);
            prop_assert_eq!(model.training_points, samples.len());
        }

        /// Residuals of an OLS fit with intercept sum to (nearly) zero.
        #[test]
        fn residuals_sum_to_zero(samples in arb_samples()) {
            if let Ok(fit) = fit(&samples, 2) {
                let residual_sum: f64 = samples
                    .iter()
                    .map(|s| s.label - fit.predict(&s.features))
                    .sum();
                prop_assert!(
                    residual_sum.abs() < 1e-6,
                    "sum = {}",
                    residual_sum
                );
            }
        }
    }
}
