// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tikhonov-regularised least squares, `(AᵀA + αI) x = Aᵀy`.

use nalgebra::DMatrix;
use ndarray::prelude::*;

use super::{
    direct::{to_dmatrix, to_dvector},
    SolveError,
};

pub(super) fn solve(
    a: ArrayView2<f64>,
    y: ArrayView1<f64>,
    alpha: f64,
) -> Result<Array1<f64>, SolveError> {
    let m = to_dmatrix(a);
    let cols = m.ncols();
    let normal = m.tr_mul(&m) + DMatrix::identity(cols, cols) * alpha;
    let rhs = m.tr_mul(&to_dvector(y));
    let cholesky = normal
        .cholesky()
        .ok_or(SolveError::NotPositiveDefinite { alpha })?;
    Ok(cholesky.solve(&rhs).iter().copied().collect())
}
