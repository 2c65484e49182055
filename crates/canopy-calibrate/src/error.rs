//! Error types for the canopy-calibrate crate.

use std::backtrace::Backtrace;
use std::fmt;

use canopy_formula::FormulaError;
use canopy_regress::RegressError;

/// Error type for the calibration services.
///
/// Uses the canonical struct pattern with backtrace capture and `is_xxx()`
/// helper methods. Errors from the formula and regression crates are kept
/// as sources rather than flattened into strings.
///
/// Why: the service layer maps each class to a different response (bad
/// species formula, not enough approved plots, malformed upload), so the
/// class must survive the trip through this crate.
#[derive(Debug)]
pub struct CalibrateError {
    kind: CalibrateErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
pub(crate) enum CalibrateErrorKind {
    /// A species formula failed to compile or evaluate for a tree.
    Formula {
        tree: Option<String>,
        source: FormulaError,
    },
    /// Fitting or applying the regression model failed.
    Regress(RegressError),
    /// Fewer usable training rows than the configured minimum.
    InsufficientSamples { found: usize, required: usize },
    /// A labeled training row lacks a configured feature.
    MissingFeature {
        row: usize,
        id: Option<String>,
        feature: String,
    },
    /// A model feature has no composite band.
    UnknownBand { feature: String },
    /// A persisted model whose coefficients do not match its declared
    /// feature names.
    InvalidModel,
    /// The configuration is unusable.
    InvalidConfig(String),
    /// Failed to deserialize input JSON.
    Deserialization(serde_json::Error),
    /// Failed to serialize output to JSON.
    Serialization(serde_json::Error),
    /// I/O error when reading input or writing output.
    Io(std::io::Error),
}

impl CalibrateError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: CalibrateErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn formula(tree: Option<&str>, source: FormulaError) -> Self {
        Self::new(CalibrateErrorKind::Formula {
            tree: tree.map(ToString::to_string),
            source,
        })
    }

    pub(crate) fn invalid_model() -> Self {
        Self::new(CalibrateErrorKind::InvalidModel)
    }

    pub(crate) fn deserialization(err: serde_json::Error) -> Self {
        Self::new(CalibrateErrorKind::Deserialization(err))
    }

    pub(crate) fn serialization(err: serde_json::Error) -> Self {
        Self::new(CalibrateErrorKind::Serialization(err))
    }

    /// Returns true if a species formula could not be compiled or
    /// evaluated.
    pub fn is_formula(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::Formula { .. })
    }

    /// Returns true if model fitting or application failed.
    pub fn is_regress(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::Regress(_))
    }

    /// Returns true if there were too few labeled rows to train.
    pub fn is_insufficient_samples(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::InsufficientSamples { .. })
    }

    /// Returns true if a labeled row lacked a configured feature.
    pub fn is_missing_feature(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::MissingFeature { .. })
    }

    /// Returns true if a model feature has no raster band.
    pub fn is_unknown_band(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::UnknownBand { .. })
    }

    /// Returns true if a model's coefficients and feature names disagree.
    pub fn is_invalid_model(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::InvalidModel)
    }

    /// Returns true if the configuration was rejected.
    pub fn is_invalid_config(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::InvalidConfig(_))
    }

    /// Returns true if this error is due to deserialization failure.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::Deserialization(_))
    }

    /// Returns true if this error is due to serialization failure.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::Serialization(_))
    }

    /// Returns true if this error is due to I/O failure.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, CalibrateErrorKind::Io(_))
    }

    /// Returns the underlying formula error, if this is a formula failure.
    pub fn formula_error(&self) -> Option<&FormulaError> {
        match &self.kind {
            CalibrateErrorKind::Formula { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the underlying regression error, if any.
    pub fn regress_error(&self) -> Option<&RegressError> {
        match &self.kind {
            CalibrateErrorKind::Regress(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the backtrace captured when this error was created.
    ///
    /// Why: preserves context when errors are surfaced to the CLI or logs.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for CalibrateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrateErrorKind::Formula {
                tree: Some(tree),
                source,
            } => {
                write!(f, "biomass formula error for tree `{tree}`: {source}")
            }
            CalibrateErrorKind::Formula { tree: None, source } => {
                write!(f, "biomass formula error: {source}")
            }
            CalibrateErrorKind::Regress(err) => {
                write!(f, "training failed: {err}")
            }
            CalibrateErrorKind::InsufficientSamples { found, required } => {
                write!(
                    f,
                    "too few labeled samples to train: found {found}, \
                     need at least {required}"
                )
            }
            CalibrateErrorKind::MissingFeature { row, id, feature } => {
                match id {
                    Some(id) => write!(
                        f,
                        "feature `{feature}` is missing for sample `{id}`"
                    ),
                    None => write!(
                        f,
                        "feature `{feature}` is missing for sample row {row}"
                    ),
                }
            }
            CalibrateErrorKind::UnknownBand { feature } => {
                write!(f, "feature `{feature}` has no raster band")
            }
            CalibrateErrorKind::InvalidModel => {
                write!(
                    f,
                    "invalid model: coefficients do not match feature_names"
                )
            }
            CalibrateErrorKind::InvalidConfig(message) => {
                write!(f, "invalid configuration: {message}")
            }
            CalibrateErrorKind::Deserialization(err) => {
                write!(f, "failed to deserialize input: {err}")
            }
            CalibrateErrorKind::Serialization(err) => {
                write!(f, "failed to serialize output: {err}")
            }
            CalibrateErrorKind::Io(err) => {
                write!(f, "I/O error: {err}")
            }
        }
    }
}

impl fmt::Display for CalibrateError {
    /// Formats the error with a summary and captured backtrace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;

        // Backtrace (will be empty unless RUST_BACKTRACE is set).
        write!(f, "{}", self.backtrace)
    }
}

impl std::error::Error for CalibrateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            CalibrateErrorKind::Formula { source, .. } => Some(source),
            CalibrateErrorKind::Regress(err) => Some(err),
            CalibrateErrorKind::Deserialization(err)
            | CalibrateErrorKind::Serialization(err) => Some(err),
            CalibrateErrorKind::Io(err) => Some(err),
            CalibrateErrorKind::InsufficientSamples { .. }
            | CalibrateErrorKind::MissingFeature { .. }
            | CalibrateErrorKind::UnknownBand { .. }
            | CalibrateErrorKind::InvalidModel
            | CalibrateErrorKind::InvalidConfig(_) => None,
        }
    }
}

impl From<std::io::Error> for CalibrateError {
    fn from(err: std::io::Error) -> Self {
        Self::new(CalibrateErrorKind::Io(err))
    }
}

impl From<RegressError> for CalibrateError {
    fn from(err: RegressError) -> Self {
        Self::new(CalibrateErrorKind::Regress(err))
    }
}
