//! Human-readable training summary.

use std::io::Write;

use canopy_schemas::FittedModel;
use itertools::Itertools;

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// The fitted model, as written to the output.
    pub model: FittedModel,
    /// Rows skipped because they carry no AGB label.
    pub unlabeled: usize,
}

impl TrainingReport {
    /// Writes a human-readable report to the given writer.
    pub fn write_report(&self, mut w: impl Write) -> std::io::Result<()> {
        let model = &self.model;
        writeln!(w, "Training points:   {}", model.training_points)?;
        writeln!(w, "Skipped unlabeled: {}", self.unlabeled)?;
        let features = model.feature_names.iter().join(", ");
        writeln!(w, "Features:          {features}")?;
        writeln!(w, "Intercept:         {:.6}", model.intercept)?;
        match model.r_squared {
            Some(r2) => writeln!(w, "R²:                {r2:.4}")?,
            None => writeln!(
                w,
                "R²:                undefined (labels have no variance)"
            )?,
        }
        writeln!(w, "RMSE:              {:.4}", model.rmse)?;

        if !model.coefficients.is_empty() {
            writeln!(w, "\n{:<12}  {:>14}", "Feature", "Coefficient")?;
            writeln!(w, "{}", "-".repeat(28))?;
            for (feature, coefficient) in &model.coefficients {
                writeln!(w, "{feature:<12}  {coefficient:>14.6}")?;
            }
        }
        Ok(())
    }
}
