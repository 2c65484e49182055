//! Spectral indices and the feature-to-band vocabulary.
//!
//! Features are lowercase names (`ndvi`, `b4`), composite bands are the
//! uppercase names the raster engine uses (`NDVI`, `B4`). Reflectance
//! bands follow Sentinel-2 numbering: `B2` blue, `B4` red, `B8` NIR.

use std::collections::BTreeMap;

use canopy_schemas::TrainingRow;

/// `(B8 - B4) / (B8 + B4)`, or `None` when the denominator is zero.
pub fn ndvi(b4: f64, b8: f64) -> Option<f64> {
    ratio(b8 - b4, b8 + b4)
}

/// `2.5 (B8 - B4) / (B8 + 6 B4 - 7.5 B2 + 1)`, or `None` when the
/// denominator is zero.
pub fn evi(b2: f64, b4: f64, b8: f64) -> Option<f64> {
    ratio(2.5 * (b8 - b4), b8 + 6.0 * b4 - 7.5 * b2 + 1.0)
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    let value = numerator / denominator;
    (denominator != 0.0 && value.is_finite()).then_some(value)
}

/// Composite band a model feature is read from.
pub fn band_for_feature(feature: &str) -> Option<&'static str> {
    match feature {
        "ndvi" => Some("NDVI"),
        "evi" => Some("EVI"),
        "b2" => Some("B2"),
        "b4" => Some("B4"),
        "b8" => Some("B8"),
        _ => None,
    }
}

/// Reflectance bands a composite band is derived from.
pub fn source_bands(band: &str) -> &'static [&'static str] {
    match band {
        "NDVI" => &["B4", "B8"],
        "EVI" => &["B2", "B4", "B8"],
        "B2" => &["B2"],
        "B4" => &["B4"],
        "B8" => &["B8"],
        _ => &[],
    }
}

/// Indices computable from the bands `lookup` returns.
fn derived_indices(
    lookup: impl Fn(&str) -> Option<f64>,
) -> [(&'static str, Option<f64>); 2] {
    let (b2, b4, b8) = (lookup("b2"), lookup("b4"), lookup("b8"));
    [
        ("ndvi", b4.zip(b8).and_then(|(b4, b8)| ndvi(b4, b8))),
        (
            "evi",
            b2.zip(b4)
                .zip(b8)
                .and_then(|((b2, b4), b8)| evi(b2, b4, b8)),
        ),
    ]
}

/// Adds `ndvi` and `evi` to a feature map that carries raw bands but not
/// the indices. Values already present are kept.
pub fn derive_indices(features: &mut BTreeMap<String, f64>) {
    let derived = derived_indices(|name| features.get(name).copied());
    for (name, value) in derived {
        if let Some(value) = value {
            features.entry(name.to_string()).or_insert(value);
        }
    }
}

/// [`derive_indices`] for a training row, whose features may be `null`.
pub fn derive_row_indices(row: &mut TrainingRow) {
    let derived = derived_indices(|name| row.feature(name));
    for (name, value) in derived {
        if let Some(value) = value {
            let slot = row.features.entry(name.to_string()).or_insert(None);
            slot.get_or_insert(value);
        }
    }
}
