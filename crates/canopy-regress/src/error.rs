//! Error types for the canopy-regress crate.

use std::backtrace::Backtrace;
use std::fmt;

/// Error type for fitting and applying regression models.
///
/// Uses the canonical struct pattern with backtrace capture and `is_xxx()`
/// helper methods.
///
/// Why: a failed fit must surface as an error with its cause intact; it is
/// never replaced by a default model with zero coefficients.
#[derive(Debug)]
pub struct RegressError {
    kind: RegressErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
pub(crate) enum RegressErrorKind {
    /// No samples were supplied.
    EmptySampleSet,
    /// The normal-equation matrix has no usable pivot in `column`.
    SingularMatrix { column: usize, pivot: f64 },
    /// An input has the wrong number of values.
    DimensionMismatch {
        what: &'static str,
        index: usize,
        expected: usize,
        found: usize,
    },
    /// A feature the model needs was not supplied, or the model itself has
    /// no coefficient for one of its declared features.
    UnknownFeature { name: String },
    /// The same feature name was declared twice.
    DuplicateFeature { name: String },
}

impl RegressError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: RegressErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn unknown_feature(name: impl Into<String>) -> Self {
        Self::new(RegressErrorKind::UnknownFeature { name: name.into() })
    }

    pub(crate) fn dimension_mismatch(
        what: &'static str,
        index: usize,
        expected: usize,
        found: usize,
    ) -> Self {
        Self::new(RegressErrorKind::DimensionMismatch {
            what,
            index,
            expected,
            found,
        })
    }

    /// Returns true if fitting was attempted without samples.
    pub fn is_empty_sample_set(&self) -> bool {
        matches!(self.kind, RegressErrorKind::EmptySampleSet)
    }

    /// Returns true if the samples do not determine a unique fit.
    ///
    /// Why: this is the "collect more varied field plots" case, distinct
    /// from malformed input.
    pub fn is_singular_matrix(&self) -> bool {
        matches!(self.kind, RegressErrorKind::SingularMatrix { .. })
    }

    /// Returns true if an input had the wrong number of values.
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self.kind, RegressErrorKind::DimensionMismatch { .. })
    }

    /// Returns true if a required feature was missing.
    pub fn is_unknown_feature(&self) -> bool {
        matches!(self.kind, RegressErrorKind::UnknownFeature { .. })
    }

    /// Returns true if a feature name was declared more than once.
    pub fn is_duplicate_feature(&self) -> bool {
        matches!(self.kind, RegressErrorKind::DuplicateFeature { .. })
    }

    /// Returns the feature name the error is about, if any.
    pub fn feature(&self) -> Option<&str> {
        match &self.kind {
            RegressErrorKind::UnknownFeature { name }
            | RegressErrorKind::DuplicateFeature { name } => Some(name),
            _ => None,
        }
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for RegressErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegressErrorKind::EmptySampleSet => {
                write!(f, "cannot fit a model without samples")
            }
            RegressErrorKind::SingularMatrix { column, pivot } => {
                write!(
                    f,
                    "singular matrix (not enough variation / too few points): \
                     pivot {pivot:e} in column {column}"
                )
            }
            RegressErrorKind::DimensionMismatch {
                what,
                index,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{what} {index} has {found} value(s), expected {expected}"
                )
            }
            RegressErrorKind::UnknownFeature { name } => {
                write!(f, "missing value for feature `{name}`")
            }
            RegressErrorKind::DuplicateFeature { name } => {
                write!(f, "feature `{name}` is declared more than once")
            }
        }
    }
}

impl fmt::Display for RegressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for RegressError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular_matrix() {
        let err = RegressError::new(RegressErrorKind::SingularMatrix {
            column: 2,
            pivot: 0.0,
        });

        assert!(err.is_singular_matrix());
        assert!(!err.is_empty_sample_set());
        assert!(!err.is_dimension_mismatch());
        assert!(!err.is_unknown_feature());
        assert!(err.to_string().contains("singular matrix"));
        assert!(err.to_string().contains("column 2"));
    }

    #[test]
    fn test_unknown_feature() {
        let err = RegressError::unknown_feature("evi");

        assert!(err.is_unknown_feature());
        assert!(!err.is_singular_matrix());
        assert_eq!(err.feature(), Some("evi"));
        assert!(err.to_string().contains("`evi`"));
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = RegressError::dimension_mismatch("sample", 4, 3, 2);

        assert!(err.is_dimension_mismatch());
        assert_eq!(err.feature(), None);
        assert_eq!(err.to_string(), "sample 4 has 2 value(s), expected 3");
    }

    #[test]
    fn test_empty_and_duplicate() {
        assert!(
            RegressError::new(RegressErrorKind::EmptySampleSet)
                .is_empty_sample_set()
        );
        let dup = RegressError::new(RegressErrorKind::DuplicateFeature {
            name: "b4".into(),
        });
        assert!(dup.is_duplicate_feature());
        assert_eq!(dup.feature(), Some("b4"));
    }

    #[test]
    fn test_debug_impl() {
        let err = RegressError::new(RegressErrorKind::EmptySampleSet);
        let _ = err.backtrace();
        assert!(format!("{err:?}").contains("RegressError"));
    }
}
