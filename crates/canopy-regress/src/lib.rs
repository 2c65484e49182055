//! Linear calibration of above-ground biomass against spectral features.
//!
//! The solver fits `agb = intercept + Σ beta_i × feature_i` by ordinary
//! least squares: it accumulates the normal equations `AᵗA β = Aᵗy` for
//! the design matrix `A = [1 | X]`, inverts `AᵗA` by Gauss-Jordan
//! elimination with partial pivoting, and multiplies out `β`.
//!
//! Feature counts are small (a handful of spectral bands and indices), so
//! the dense `(k+1)²` normal matrix is cheap and numerically adequate.
//! Collinear features or too few distinct points leave the matrix
//! singular; that is reported as an error rather than papered over.
//!
//! The solver is purely positional. [`fit_model`] is the only place its
//! output becomes a name-keyed [`FittedModel`], and the [`apply`]
//! functions evaluate that model with one shared arithmetic path.

pub mod apply;
mod error;
mod linalg;
pub mod metrics;
mod trainer;

#[doc(inline)]
pub use apply::{predict, predict_columns, predict_row};
#[doc(inline)]
pub use error::RegressError;
#[doc(inline)]
pub use linalg::PIVOT_EPSILON;
#[doc(inline)]
pub use metrics::{FitMetrics, fit_metrics};
#[doc(inline)]
pub use trainer::{LinearFit, fit, fit_model, fit_training_set};
