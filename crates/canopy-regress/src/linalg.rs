//! Normal equations and their solution by Gauss-Jordan elimination.
//!
//! Matrices are dense, row-major `Vec<f64>` of side `dim = k + 1`, where
//! the extra leading dimension is the intercept column of ones. `dim` is
//! the number of spectral features plus one, so it stays tiny and dense
//! storage is the simplest representation.

use canopy_schemas::Sample;

use crate::error::{RegressError, RegressErrorKind};

/// Pivots with a smaller magnitude are treated as zero.
pub const PIVOT_EPSILON: f64 = 1e-12;

/// `AᵗA` and `Aᵗy` for the design matrix `A = [1 | X]`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NormalEquations {
    pub dim: usize,
    pub ata: Vec<f64>,
    pub aty: Vec<f64>,
}

/// Accumulates the normal equations by direct summation over samples.
///
/// The design row for each sample is `[1, x_1, ..., x_k]`; rows are never
/// materialized as a matrix.
pub(crate) fn normal_equations(
    samples: &[Sample],
    feature_count: usize,
) -> Result<NormalEquations, RegressError> {
    let dim = feature_count + 1;
    let mut ata = vec![0.0; dim * dim];
    let mut aty = vec![0.0; dim];
    let mut row = vec![0.0; dim];
    row[0] = 1.0;

    for (index, sample) in samples.iter().enumerate() {
        if sample.features.len() != feature_count {
            return Err(RegressError::dimension_mismatch(
                "sample",
                index,
                feature_count,
                sample.features.len(),
            ));
        }
        row[1..].copy_from_slice(&sample.features);

        for (i, &ri) in row.iter().enumerate() {
            aty[i] += ri * sample.label;
            for (j, &rj) in row.iter().enumerate() {
                ata[i * dim + j] += ri * rj;
            }
        }
    }

    Ok(NormalEquations { dim, ata, aty })
}

/// Inverts a `dim × dim` row-major matrix by Gauss-Jordan elimination on
/// the augmented matrix `[M | I]` with partial pivoting.
///
/// The pivot for column `c` is the entry of largest magnitude in rows
/// `c..dim`; on ties the lowest row wins. A pivot below [`PIVOT_EPSILON`]
/// means the matrix is singular.
pub(crate) fn invert(
    matrix: &[f64],
    dim: usize,
) -> Result<Vec<f64>, RegressError> {
    debug_assert_eq!(matrix.len(), dim * dim);
    let width = 2 * dim;

    let mut aug = vec![0.0; dim * width];
    for r in 0..dim {
        aug[r * width..r * width + dim]
            .copy_from_slice(&matrix[r * dim..(r + 1) * dim]);
        aug[r * width + dim + r] = 1.0;
    }

    for col in 0..dim {
        let (pivot_row, pivot_abs) = select_pivot(&aug, width, dim, col);
        if pivot_abs.is_nan() || pivot_abs < PIVOT_EPSILON {
            return Err(RegressError::new(RegressErrorKind::SingularMatrix {
                column: col,
                pivot: pivot_abs,
            }));
        }

        if pivot_row != col {
            swap_rows(&mut aug, width, pivot_row, col);
        }

        let pivot = aug[col * width + col];
        for value in &mut aug[col * width..(col + 1) * width] {
            *value /= pivot;
        }

        for r in 0..dim {
            if r == col {
                continue;
            }
            let factor = aug[r * width + col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..width {
                aug[r * width + c] -= factor * aug[col * width + c];
            }
        }
    }

    let mut inverse = vec![0.0; dim * dim];
    for r in 0..dim {
        inverse[r * dim..(r + 1) * dim]
            .copy_from_slice(&aug[r * width + dim..(r + 1) * width]);
    }
    Ok(inverse)
}

/// Row and magnitude of the pivot for column `col`: the largest absolute
/// value in rows `col..dim`, the lowest such row on ties.
fn select_pivot(
    aug: &[f64],
    width: usize,
    dim: usize,
    col: usize,
) -> (usize, f64) {
    let mut pivot_row = col;
    let mut pivot_abs = aug[col * width + col].abs();
    for r in col + 1..dim {
        let candidate = aug[r * width + col].abs();
        if candidate > pivot_abs {
            pivot_row = r;
            pivot_abs = candidate;
        }
    }
    (pivot_row, pivot_abs)
}

/// Computes `matrix · vector` for a `dim × dim` row-major matrix.
pub(crate) fn mat_vec(matrix: &[f64], vector: &[f64]) -> Vec<f64> {
    let dim = vector.len();
    matrix
        .chunks_exact(dim)
        .map(|row| row.iter().zip(vector).map(|(a, b)| a * b).sum())
        .collect()
}

fn swap_rows(aug: &mut [f64], width: usize, a: usize, b: usize) {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let (head, tail) = aug.split_at_mut(hi * width);
    head[lo * width..(lo + 1) * width].swap_with_slice(&mut tail[..width]);
}
