//! Turning raw sample-store rows into a regression training set.

use canopy_schemas::{Sample, TrainingRow, TrainingSet};
use tracing::{debug, warn};

use crate::error::{CalibrateError, CalibrateErrorKind};

/// A training set plus what was left out while assembling it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTrainingSet {
    /// Labeled rows, with features in configured order.
    pub training_set: TrainingSet,
    /// Rows skipped because they carry no AGB label.
    pub unlabeled: usize,
}

/// Builds a [`TrainingSet`] over `features` from raw rows.
///
/// Rows without a label are skipped. Fewer than `min_samples` labeled rows
/// is an error, as is a labeled row lacking any of `features`. Feature
/// values are never defaulted.
pub fn assemble_training_set(
    rows: &[TrainingRow],
    features: &[String],
    min_samples: usize,
) -> Result<AssembledTrainingSet, CalibrateError> {
    let labeled: Vec<(usize, &TrainingRow, f64)> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| row.agb.map(|agb| (index, row, agb)))
        .collect();
    let unlabeled = rows.len() - labeled.len();
    if unlabeled > 0 {
        debug!(unlabeled, "skipping rows without an AGB label");
    }

    if labeled.len() < min_samples {
        warn!(
            found = labeled.len(),
            required = min_samples,
            "not enough labeled samples"
        );
        return Err(CalibrateError::new(
            CalibrateErrorKind::InsufficientSamples {
                found: labeled.len(),
                required: min_samples,
            },
        ));
    }

    let samples = labeled
        .into_iter()
        .map(|(index, row, agb)| -> Result<Sample, CalibrateError> {
            let values = features
                .iter()
                .map(|feature| {
                    row.feature(feature).ok_or_else(|| {
                        CalibrateError::new(CalibrateErrorKind::MissingFeature {
                            row: index,
                            id: row.id.clone(),
                            feature: feature.clone(),
                        })
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            Ok(Sample::new(values, agb))
        })
        .collect::<Result<Vec<Sample>, CalibrateError>>()?;

    Ok(AssembledTrainingSet {
        training_set: TrainingSet {
            feature_names: features.to_vec(),
            samples,
        },
        unlabeled,
    })
}
