//! Fitted model schema for predicting above-ground biomass from spectral
//! features.
//!
//! The `FittedModel` stores the intercept and per-feature coefficients of
//! an ordinary-least-squares fit and is serialized to JSON for persistence
//! by the service layer and for per-pixel application by the external
//! raster engine.
//!
//! Why: the trainer and every consumer of its output need one stable
//! definition of the coefficients, otherwise the raster engine and local
//! diagnostics drift apart.

use std::path::Path;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The family of model stored in a [`FittedModel`].
///
/// Only linear regression is produced today; the tag is persisted so a
/// consumer can refuse models it does not know how to apply.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// `agb = intercept + Σ coefficient_i × feature_i`.
    #[default]
    LinearRegression,
}

/// Serializable regression model mapping spectral features to AGB.
///
/// ```text
/// agb = intercept + Σ coefficients[name_i] × features[name_i]
///       for name_i in feature_names
/// ```
///
/// `feature_names` is the single source of truth for ordering. The
/// coefficient map is keyed by name so that applying the model never
/// depends on the column layout used during training.
///
/// Why: the raster engine receives only this structure, so it must be
/// self-contained and order-independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FittedModel {
    /// Model family tag.
    #[serde(default)]
    pub model_type: ModelType,

    /// Feature names in training order.
    pub feature_names: Vec<String>,

    /// Constant term of the linear combination.
    pub intercept: f64,

    /// Coefficient per feature name, in `feature_names` order.
    pub coefficients: IndexMap<String, f64>,

    /// Coefficient of determination on the training set. `None` when the
    /// training labels had no variance, which makes R² meaningless.
    pub r_squared: Option<f64>,

    /// Root-mean-square error on the training set.
    pub rmse: f64,

    /// Number of samples the model was fitted on.
    #[serde(default)]
    pub training_points: usize,
}

impl FittedModel {
    /// Builds a model from positional coefficients aligned with
    /// `feature_names`.
    ///
    /// Returns `None` when the two sequences have different lengths or a
    /// feature name is repeated. Fit quality fields start empty; the
    /// trainer fills them in before handing the model out.
    ///
    /// Why: this is the only place the positional solver output becomes a
    /// name-keyed map, which rules out order mismatches between training
    /// and prediction.
    pub fn from_positional(
        feature_names: Vec<String>,
        intercept: f64,
        coefficients: &[f64],
    ) -> Option<Self> {
        if feature_names.len() != coefficients.len() {
            return None;
        }

        let map: IndexMap<String, f64> = feature_names
            .iter()
            .cloned()
            .zip(coefficients.iter().copied())
            .collect();
        if map.len() != feature_names.len() {
            return None;
        }

        Some(Self {
            model_type: ModelType::LinearRegression,
            feature_names,
            intercept,
            coefficients: map,
            r_squared: None,
            rmse: 0.0,
            training_points: 0,
        })
    }

    /// Returns the coefficient for `feature`, if the model uses it.
    pub fn coefficient(&self, feature: &str) -> Option<f64> {
        self.coefficients.get(feature).copied()
    }

    /// Number of features the model expects.
    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Checks the structural invariant between `feature_names` and
    /// `coefficients`.
    ///
    /// Deserialized models bypass [`FittedModel::from_positional`], so
    /// consumers call this before trusting a persisted model.
    pub fn is_consistent(&self) -> bool {
        self.feature_names.len() == self.coefficients.len()
            && self
                .feature_names
                .iter()
                .all(|name| self.coefficients.contains_key(name))
    }
}

/// Loads a `FittedModel` from a JSON file.
///
/// Why: downstream tools need a simple, standard way to rehydrate the model
/// from the persisted schema without custom parsing logic.
pub fn load_fitted_model(path: &Path) -> std::io::Result<FittedModel> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use proptest::collection::hash_set;
    use proptest::prelude::*;

    use super::*;
    use crate::testutil::{arb_finite, arb_name};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn from_positional_keys_by_name_in_order() {
        let model = FittedModel::from_positional(
            names(&["ndvi", "evi", "b4"]),
            1.5,
            &[2.0, -3.0, 0.25],
        )
        .expect("lengths match");

        assert_eq!(model.coefficient("ndvi"), Some(2.0));
        assert_eq!(model.coefficient("evi"), Some(-3.0));
        assert_eq!(model.coefficient("b4"), Some(0.25));
        assert_eq!(model.coefficient("b8"), None);
        let keys: Vec<&str> =
            model.coefficients.keys().map(String::as_str).collect();
        assert_eq!(keys, ["ndvi", "evi", "b4"]);
        assert!(model.is_consistent());
    }

    #[test]
    fn from_positional_rejects_length_mismatch() {
        assert!(
            FittedModel::from_positional(names(&["ndvi"]), 0.0, &[1.0, 2.0])
                .is_none()
        );
    }

    #[test]
    fn from_positional_rejects_duplicate_names() {
        assert!(
            FittedModel::from_positional(
                names(&["ndvi", "ndvi"]),
                0.0,
                &[1.0, 2.0]
            )
            .is_none()
        );
    }

    #[test]
    fn undefined_r_squared_serializes_as_null() {
        let model =
            FittedModel::from_positional(names(&["ndvi"]), 0.0, &[1.0])
                .unwrap();
        let json = serde_json::to_value(&model).unwrap();
        assert!(json["r_squared"].is_null());
        assert_eq!(json["model_type"], "linear_regression");
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let json = r#"{
            "feature_names": ["ndvi"],
            "intercept": 2.0,
            "coefficients": {"ndvi": 4.0},
            "r_squared": 0.8,
            "rmse": 0.1
        }"#;
        let model: FittedModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.model_type, ModelType::LinearRegression);
        assert_eq!(model.training_points, 0);
        assert_eq!(model.r_squared, Some(0.8));
    }

    #[test]
    fn inconsistent_model_is_detected() {
        let json = r#"{
            "feature_names": ["ndvi", "evi"],
            "intercept": 2.0,
            "coefficients": {"ndvi": 4.0, "b4": 1.0},
            "r_squared": null,
            "rmse": 0.1
        }"#;
        let model: FittedModel = serde_json::from_str(json).unwrap();
        assert!(!model.is_consistent());
    }

    #[test]
    fn json_schema_names_required_fields() {
        let schema = schemars::schema_for!(FittedModel);
        let json = serde_json::to_value(&schema).unwrap();
        let required = json["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "feature_names"));
        assert!(required.iter().any(|v| v == "coefficients"));
    }

    prop_compose! {
        /// Strategy for generating arbitrary FittedModel values with
        /// distinct feature names.
        fn arb_fitted_model()
            (feature_names in hash_set(arb_name(), 0..6))
            (
                coefficients in proptest::collection::vec(
                    arb_finite(),
                    feature_names.len(),
                ),
                feature_names in Just(feature_names),
                intercept in arb_finite(),
                r_squared in proptest::option::of(arb_finite()),
                rmse in arb_finite().prop_map(f64::abs),
                training_points in 0usize..10_000,
            )
        -> FittedModel {
            let feature_names: Vec<String> =
                feature_names.into_iter().collect();
            let model = FittedModel::from_positional(
                feature_names,
                intercept,
                &coefficients,
            )
            .expect("distinct names with matching lengths");
            FittedModel { r_squared, rmse, training_points, ..model }
        }
    }

    proptest! {
        /// Persisted models must survive a JSON round trip unchanged.
        #[test]
        fn test_fitted_model_roundtrip(model in arb_fitted_model()) {
            let json = serde_json::to_string(&model).expect("serialize");
            let parsed: FittedModel =
                serde_json::from_str(&json).expect("deserialize");
            prop_assert!(parsed.is_consistent());
            prop_assert_eq!(parsed, model);
        }
    }
}
