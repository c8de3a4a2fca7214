// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Unregularised least squares via the SVD.

use nalgebra::{DMatrix, DVector};
use ndarray::prelude::*;

use super::SolveError;

/// Singular values below this fraction of the largest are treated as zero.
const SVD_RCOND: f64 = 1e-10;

pub(super) fn to_dmatrix(a: ArrayView2<f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    DMatrix::from_row_iterator(rows, cols, a.iter().copied())
}

pub(super) fn to_dvector(y: ArrayView1<f64>) -> DVector<f64> {
    DVector::from_iterator(y.len(), y.iter().copied())
}

/// The singular values of `a`, biggest first.
pub fn singular_values(a: ArrayView2<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = to_dmatrix(a).singular_values().iter().copied().collect();
    values.sort_unstable_by(|a, b| b.total_cmp(a));
    values
}

pub(super) fn solve(a: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<Array1<f64>, SolveError> {
    let svd = to_dmatrix(a).svd(true, true);
    let eps = svd.singular_values.max() * SVD_RCOND;
    let x = svd
        .solve(&to_dvector(y), eps)
        .map_err(|e| SolveError::Svd(e.to_string()))?;
    Ok(x.iter().copied().collect())
}
