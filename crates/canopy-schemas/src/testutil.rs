//! Shared proptest strategies for schema tests.

use proptest::prelude::*;

/// Strategy for generating arbitrary identifier-like names.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,11}"
}

/// Strategy for finite floats in a range typical of reflectances,
/// coefficients and biomass values.
pub fn arb_finite() -> impl Strategy<Value = f64> {
    -1.0e6..1.0e6
}
