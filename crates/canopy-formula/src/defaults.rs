//! Built-in fallback biomass equations.
//!
//! Two defaults exist and are used at different call sites:
//!
//! - [`CHAVE_DEFAULT_FORMULA`] is stored on a species that was created
//!   without a formula of its own (via [`crate::Normalizer`]).
//! - [`simple_allometric_biomass`] applies when a tree is measured against
//!   a species whose stored formula is blank.
//!
//! They do not agree numerically. Both are kept as named defaults until a
//! domain owner decides on one.

/// Chave-style pantropical equation without height, in canonical syntax.
///
/// Variables: `wood_density` (g/cm³) and `dbh` (cm).
pub const CHAVE_DEFAULT_FORMULA: &str =
    "exp(-1.803 - 0.976 * log(wood_density) + 2.673 * log(dbh) - \
     0.0299 * (log(dbh)**2))";

/// Coefficient of the simple `c × ρ × D² × H` fallback.
pub const SIMPLE_ALLOMETRIC_COEFFICIENT: f64 = 0.11;

/// Simple fallback equation `0.11 × ρ × D² × H`.
///
/// Height and wood density are dropped from the product when missing or
/// zero: both present gives `0.11 ρ D² H`, only density gives `0.11 ρ D²`,
/// otherwise `0.11 D²`. Height without density also falls back to
/// `0.11 D²`.
pub fn simple_allometric_biomass(
    dbh_cm: f64,
    height_m: Option<f64>,
    wood_density: Option<f64>,
) -> f64 {
    let present = |v: Option<f64>| v.filter(|&x| x != 0.0);
    let base = SIMPLE_ALLOMETRIC_COEFFICIENT * dbh_cm.powi(2);
    match (present(height_m), present(wood_density)) {
        (Some(h), Some(wd)) => base * wd * h,
        (None, Some(wd)) => base * wd,
        (_, None) => base,
    }
}
