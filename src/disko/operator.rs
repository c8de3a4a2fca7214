// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The telescope operator, mapping sky pixels to visibilities.
//!
//! Complex visibilities are stacked as real vectors `[Re v; Im v]`, so the
//! operator for `n` visibilities and `p` pixels has `2n` rows and `p` columns.
//! The element for visibility `k` and pixel `j` is
//! `exp(-2πi (u_k l_j + v_k m_j + w_k (n_j - 1)))`.

use ndarray::prelude::*;
use rayon::prelude::*;

use crate::constants::TAU;

/// Something that can be applied like a real matrix (and its transpose).
pub trait LinearOperator: Sync {
    /// The `(rows, columns)` of the operator.
    fn shape(&self) -> (usize, usize);

    /// `A x`
    fn apply(&self, x: ArrayView1<f64>) -> Array1<f64>;

    /// `Aᵀ y`
    fn apply_adjoint(&self, y: ArrayView1<f64>) -> Array1<f64>;
}

#[inline]
fn phase(uvw: ArrayView1<f64>, lmn: ArrayView1<f64>) -> f64 {
    TAU * (uvw[0] * lmn[0] + uvw[1] * lmn[1] + uvw[2] * (lmn[2] - 1.0))
}

fn fill_row(
    uvw: ArrayView1<f64>,
    lmn: ArrayView2<f64>,
    mut re: ArrayViewMut1<f64>,
    mut im: ArrayViewMut1<f64>,
) {
    re.iter_mut()
        .zip(im.iter_mut())
        .zip(lmn.outer_iter())
        .for_each(|((re, im), lmn)| {
            let (s, c) = phase(uvw, lmn).sin_cos();
            *re = c;
            *im = -s;
        });
}

/// The operator with every element computed up front.
#[derive(Debug, Clone)]
pub struct DenseOperator {
    pub matrix: Array2<f64>,
}

impl DenseOperator {
    /// `uvw` has shape `(num_vis, 3)` \[wavelengths\], `lmn` has shape
    /// `(npix, 3)`.
    pub fn new(uvw: ArrayView2<f64>, lmn: ArrayView2<f64>, parallel: bool) -> DenseOperator {
        let num_vis = uvw.len_of(Axis(0));
        let npix = lmn.len_of(Axis(0));
        let mut matrix = Array2::zeros((2 * num_vis, npix));

        let (mut re, mut im) = matrix.view_mut().split_at(Axis(0), num_vis);
        if parallel {
            uvw.axis_iter(Axis(0))
                .into_par_iter()
                .zip(
                    re.axis_iter_mut(Axis(0))
                        .into_par_iter()
                        .zip(im.axis_iter_mut(Axis(0)).into_par_iter()),
                )
                .for_each(|(uvw, (re, im))| fill_row(uvw, lmn, re, im));
        } else {
            uvw.outer_iter()
                .zip(re.outer_iter_mut().zip(im.outer_iter_mut()))
                .for_each(|(uvw, (re, im))| fill_row(uvw, lmn, re, im));
        }

        DenseOperator { matrix }
    }
}

impl LinearOperator for DenseOperator {
    fn shape(&self) -> (usize, usize) {
        self.matrix.dim()
    }

    fn apply(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.matrix.dot(&x)
    }

    fn apply_adjoint(&self, y: ArrayView1<f64>) -> Array1<f64> {
        self.matrix.t().dot(&y)
    }
}

/// The operator computed on the fly, each time it's applied. Memory use is
/// proportional to the number of visibilities plus the number of pixels.
#[derive(Debug, Clone)]
pub struct MatrixFreeOperator {
    uvw: Array2<f64>,
    lmn: Array2<f64>,
    parallel: bool,
}

impl MatrixFreeOperator {
    pub fn new(uvw: ArrayView2<f64>, lmn: ArrayView2<f64>, parallel: bool) -> MatrixFreeOperator {
        MatrixFreeOperator {
            uvw: uvw.to_owned(),
            lmn: lmn.to_owned(),
            parallel,
        }
    }

    fn num_vis(&self) -> usize {
        self.uvw.len_of(Axis(0))
    }
}

impl LinearOperator for MatrixFreeOperator {
    fn shape(&self) -> (usize, usize) {
        (2 * self.num_vis(), self.lmn.len_of(Axis(0)))
    }

    fn apply(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let row = |uvw: ArrayView1<f64>| -> (f64, f64) {
            self.lmn
                .outer_iter()
                .zip(x.iter())
                .fold((0.0, 0.0), |(re, im), (lmn, &x)| {
                    let (s, c) = phase(uvw, lmn).sin_cos();
                    (re + c * x, im - s * x)
                })
        };
        let rows: Vec<(f64, f64)> = if self.parallel {
            self.uvw.axis_iter(Axis(0)).into_par_iter().map(row).collect()
        } else {
            self.uvw.outer_iter().map(row).collect()
        };

        let n = rows.len();
        let mut out = Array1::zeros(2 * n);
        for (k, (re, im)) in rows.into_iter().enumerate() {
            out[k] = re;
            out[n + k] = im;
        }
        out
    }

    fn apply_adjoint(&self, y: ArrayView1<f64>) -> Array1<f64> {
        let n = self.num_vis();
        let (y_re, y_im) = y.split_at(Axis(0), n);
        let column = |lmn: ArrayView1<f64>| -> f64 {
            self.uvw
                .outer_iter()
                .zip(y_re.iter().zip(y_im.iter()))
                .map(|(uvw, (re, im))| {
                    let (s, c) = phase(uvw, lmn).sin_cos();
                    c * re - s * im
                })
                .sum()
        };
        if self.parallel {
            let v: Vec<f64> = self.lmn.axis_iter(Axis(0)).into_par_iter().map(column).collect();
            Array1::from(v)
        } else {
            self.lmn.outer_iter().map(column).collect()
        }
    }
}
