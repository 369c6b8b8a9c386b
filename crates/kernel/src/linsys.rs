//! Small dense linear systems with several right-hand sides.
//!
//! Solves `A X = B` through a fully pivoted LU decomposition. A system whose
//! smallest pivot is negligible against the largest is reported as singular
//! rather than returning non-finite coefficients.

use nalgebra::DMatrix;
use thiserror::Error;

/// Relative pivot size below which a system counts as singular.
pub const SINGULARITY_TOLERANCE: f64 = 1.0e-10;

/// Linear solve failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    /// `A` is not square or `B` has the wrong row count.
    #[error("cannot solve {a_rows}x{a_cols} system with {b_rows} right-hand side rows")]
    DimensionMismatch {
        /// Rows of A
        a_rows: usize,
        /// Columns of A
        a_cols: usize,
        /// Rows of B
        b_rows: usize,
    },
    /// `A` is rank deficient.
    #[error("matrix is singular (pivot ratio {pivot_ratio:.3e})")]
    Singular {
        /// Smallest over largest pivot magnitude
        pivot_ratio: f64,
    },
}

/// Solve `a * x = b` for all columns of `b` at once.
pub fn solve(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<DMatrix<f64>, SolveError> {
    let n = a.nrows();
    if n == 0 || a.ncols() != n || b.nrows() != n {
        return Err(SolveError::DimensionMismatch {
            a_rows: a.nrows(),
            a_cols: a.ncols(),
            b_rows: b.nrows(),
        });
    }

    let lu = a.clone().full_piv_lu();
    let pivots = lu.u().diagonal();
    let largest = pivots.amax();
    let smallest = pivots.iter().fold(f64::INFINITY, |m, p| m.min(p.abs()));
    let pivot_ratio = if largest > 0.0 { smallest / largest } else { 0.0 };
    if !(pivot_ratio > SINGULARITY_TOLERANCE) {
        return Err(SolveError::Singular { pivot_ratio });
    }

    lu.solve(b)
        .filter(|x| x.iter().all(|v| v.is_finite()))
        .ok_or(SolveError::Singular { pivot_ratio })
}
