use std::io::Write;

use canopy_calibrate::spectral::{evi, ndvi};
use canopy_calibrate::{
    CalibrationConfig, run_biomass, run_predict, run_raster_plan, run_train,
};
use canopy_schemas::{FittedModel, Prediction, RasterPlan, TreeBiomass};
use serde_json::{Value, json};

/// Raw reflectances for plot `i`, spread so no feature is collinear.
fn bands(i: u32) -> (f64, f64, f64) {
    let b2 = 0.02 + 0.003 * f64::from(i);
    let b4 = 0.05 + 0.011 * f64::from((i * 7) % 13);
    let b8 = 0.30 + 0.017 * f64::from((i * 5) % 11);
    (b2, b4, b8)
}

fn true_agb(b2: f64, b4: f64, b8: f64) -> f64 {
    let n = ndvi(b4, b8).unwrap();
    let e = evi(b2, b4, b8).unwrap();
    5.0 + 20.0 * n + 3.0 * e - 2.0 * b4 + 1.0 * b8
}

/// Rows carrying only raw bands; indices are derived during training.
fn training_rows(count: u32) -> Value {
    let mut rows: Vec<Value> = (0..count)
        .map(|i| {
            let (b2, b4, b8) = bands(i);
            json!({
                "id": format!("p-{i}"),
                "features": {"b2": b2, "b4": b4, "b8": b8},
                "agb_kg_per_m2": true_agb(b2, b4, b8),
            })
        })
        .collect();
    // A plot that was never surveyed.
    rows.push(json!({"id": "unsurveyed", "features": {"b4": 0.1}}));
    Value::Array(rows)
}

fn train(rows: &Value, config: &CalibrationConfig) -> FittedModel {
    let input = serde_json::to_vec(rows).unwrap();
    let mut output = Vec::new();
    let report = run_train(input.as_slice(), &mut output, config).unwrap();
    let model: FittedModel = serde_json::from_slice(&output).unwrap();
    assert_eq!(model, report.model);
    assert_eq!(report.unlabeled, 1);
    model
}

#[test]
fn train_predict_and_plan_agree() {
    let model = train(&training_rows(15), &CalibrationConfig::default());

    assert_eq!(model.feature_names, ["ndvi", "evi", "b4", "b8"]);
    assert_eq!(model.training_points, 15);
    assert!((model.intercept - 5.0).abs() < 1e-6, "{model:?}");
    assert!((model.coefficient("ndvi").unwrap() - 20.0).abs() < 1e-6);
    assert!((model.coefficient("evi").unwrap() - 3.0).abs() < 1e-6);
    assert!((model.r_squared.unwrap() - 1.0).abs() < 1e-9);
    assert!(model.rmse < 1e-6);

    // Predicting on fresh raw bands reproduces the generating relation.
    let rows: Vec<Value> = (20..25)
        .map(|i| {
            let (b2, b4, b8) = bands(i);
            json!({
                "id": format!("q-{i}"),
                "features": {"b2": b2, "b4": b4, "b8": b8},
            })
        })
        .collect();
    let input = serde_json::to_vec(&rows).unwrap();
    let mut output = Vec::new();
    run_predict(input.as_slice(), &mut output, &model).unwrap();
    let predictions: Vec<Prediction> = serde_json::from_slice(&output).unwrap();
    assert_eq!(predictions.len(), 5);
    for (i, prediction) in (20..25).zip(&predictions) {
        let (b2, b4, b8) = bands(i);
        assert_eq!(
            prediction.id.as_deref(),
            Some(format!("q-{i}").as_str())
        );
        let expected = true_agb(b2, b4, b8);
        assert!((prediction.agb_kg_per_m2 - expected).abs() < 1e-6);
    }

    let input = serde_json::to_vec(&model).unwrap();
    let mut output = Vec::new();
    run_raster_plan(input.as_slice(), &mut output).unwrap();
    let plan: RasterPlan = serde_json::from_slice(&output).unwrap();
    assert_eq!(plan.intercept, model.intercept);
    assert_eq!(plan.output_band, "AGB_kg_m2");
    let features: Vec<&str> =
        plan.terms.iter().map(|t| t.feature.as_str()).collect();
    assert_eq!(features, model.feature_names);
    for term in &plan.terms {
        assert_eq!(Some(term.coefficient), model.coefficient(&term.feature));
    }
}

#[test]
fn prediction_without_required_feature_fails() {
    let model = train(&training_rows(12), &CalibrationConfig::default());
    let rows = json!([{
        "id": "x",
        "features": {"ndvi": 0.5, "evi": 0.3, "b4": 0.1},
    }]);
    let input = serde_json::to_vec(&rows).unwrap();
    let err = run_predict(input.as_slice(), Vec::new(), &model).unwrap_err();
    assert!(err.is_regress());
    assert!(err.regress_error().unwrap().is_unknown_feature());
}

#[test]
fn config_file_controls_minimum_samples() {
    let mut file =
        tempfile::NamedTempFile::new().expect("failed to create temp file");
    writeln!(file, r#"{{"features": ["ndvi", "b8"], "min_samples": 20}}"#)
        .unwrap();
    let config = CalibrationConfig::load(file.path()).unwrap();
    assert_eq!(config.features, ["ndvi", "b8"]);

    let input = serde_json::to_vec(&training_rows(15)).unwrap();
    let err = run_train(input.as_slice(), Vec::new(), &config).unwrap_err();
    assert!(err.is_insufficient_samples());

    let relaxed = CalibrationConfig {
        min_samples: 3,
        ..config
    };
    let model = train(&training_rows(15), &relaxed);
    assert_eq!(model.feature_names, ["ndvi", "b8"]);
}

#[test]
fn config_load_failures_are_classified() {
    let mut file =
        tempfile::NamedTempFile::new().expect("failed to create temp file");
    write!(file, "{{not json").unwrap();
    assert!(
        CalibrationConfig::load(file.path())
            .unwrap_err()
            .is_deserialization()
    );

    let dir = tempfile::tempdir().unwrap();
    assert!(
        CalibrationConfig::load(&dir.path().join("missing.json"))
            .unwrap_err()
            .is_io()
    );

    let mut file =
        tempfile::NamedTempFile::new().expect("failed to create temp file");
    write!(file, r#"{{"features": []}}"#).unwrap();
    assert!(
        CalibrationConfig::load(file.path())
            .unwrap_err()
            .is_invalid_config()
    );
}

#[test]
fn missing_index_without_bands_fails_training() {
    let mut rows = training_rows(12);
    rows[0] = json!({
        "id": "cloudy",
        "features": {"ndvi": 0.5, "b4": 0.1, "b8": 0.4},
        "agb_kg_per_m2": 3.0,
    });
    let input = serde_json::to_vec(&rows).unwrap();
    let config = CalibrationConfig::default();
    let err = run_train(input.as_slice(), Vec::new(), &config).unwrap_err();
    assert!(err.is_missing_feature());
    assert!(err.to_string().contains("`evi`"));
    assert!(err.to_string().contains("`cloudy`"));
}

#[test]
fn collinear_features_report_singular_matrix() {
    let rows: Vec<Value> = (0..12)
        .map(|i| {
            let x = f64::from(i) / 10.0;
            json!({"features": {"b4": x, "b8": x}, "agb": 1.0 + x})
        })
        .collect();
    let config = CalibrationConfig {
        features: vec!["b4".into(), "b8".into()],
        ..CalibrationConfig::default()
    };
    let input = serde_json::to_vec(&rows).unwrap();
    let err = run_train(input.as_slice(), Vec::new(), &config).unwrap_err();
    assert!(err.is_regress());
    assert!(err.regress_error().unwrap().is_singular_matrix());
}

#[test]
fn survey_biomass_end_to_end() {
    let survey = json!({
        "species": {
            "name": "Shorea leprosula",
            "wood_density": 0.6,
            "biomass_formula": concat!(
                "EXP(-1.803 - 0.976*LN(wood_density) + 2.673*ln(dbh)",
                " - 0.0299*(log(dbh)^2))",
            ),
        },
        "trees": [
            {"id": "t1", "dbh_cm": 20.0, "height_m": 15.0},
            {"id": "t2", "dbh_cm": 35.5},
        ],
    });
    let input = serde_json::to_vec(&survey).unwrap();
    let mut output = Vec::new();
    run_biomass(input.as_slice(), &mut output).unwrap();
    let results: Vec<TreeBiomass> = serde_json::from_slice(&output).unwrap();

    let chave = |d: f64| {
        let ln_d = d.ln();
        (-1.803 - 0.976 * 0.6f64.ln() + 2.673 * ln_d - 0.0299 * ln_d.powi(2))
            .exp()
    };
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id.as_deref(), Some("t1"));
    for (result, dbh) in results.iter().zip([20.0, 35.5]) {
        let expected = chave(dbh);
        assert!((result.biomass - expected).abs() / expected < 1e-9);
    }
}

#[test]
fn survey_formula_error_names_tree() {
    let survey = json!({
        "species": {"biomass_formula": "0.5 * log(height_m) * dbh_cm"},
        "trees": [
            {"id": "ok", "dbh_cm": 10.0, "height_m": 4.0},
            {"id": "no-height", "dbh_cm": 12.0},
        ],
    });
    let input = serde_json::to_vec(&survey).unwrap();
    let err = run_biomass(input.as_slice(), Vec::new()).unwrap_err();
    assert!(err.is_formula());
    assert!(err.formula_error().unwrap().is_domain());
    assert!(err.to_string().contains("`no-height`"));
}

#[test]
fn persisted_model_with_stray_coefficient_is_rejected() {
    let mut model = train(&training_rows(12), &CalibrationConfig::default());
    model.coefficients.insert("b2".to_string(), 5.0);
    let json = serde_json::to_vec(&model).unwrap();

    let err = run_raster_plan(json.as_slice(), Vec::new()).unwrap_err();
    assert!(err.is_invalid_model());

    let rows = json!([{"features": {"b2": 0.1, "b4": 0.1, "b8": 0.4}}]);
    let input = serde_json::to_vec(&rows).unwrap();
    let err = run_predict(input.as_slice(), Vec::new(), &model).unwrap_err();
    assert!(err.is_invalid_model());
}
