// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Solvers for the sky pixels given visibilities.

mod cv;
mod direct;
mod error;
mod fista;
mod lasso;
mod lsmr;
mod lsqr;
mod tikhonov;

pub use direct::singular_values;
pub use error::SolveError;

use ndarray::prelude::*;
use serde::Serialize;
use strum_macros::{Display, EnumString};

use super::{DenseOperator, LinearOperator};
use crate::constants::{CV_ALPHAS, CV_NUM_FOLDS};

/// The iterative solvers that never materialise the telescope operator.
#[derive(Debug, Display, EnumString, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatrixFreeMethod {
    #[strum(serialize = "lsqr")]
    Lsqr,
    #[strum(serialize = "lsmr")]
    Lsmr,
    #[strum(serialize = "fista")]
    Fista,
}

impl MatrixFreeMethod {
    /// Pick a method from CLI switches. LSQR is preferred over LSMR, which is
    /// preferred over FISTA; LSQR is the default.
    pub fn from_flags(lsqr: bool, lsmr: bool, fista: bool) -> MatrixFreeMethod {
        match (lsqr, lsmr, fista) {
            (true, _, _) => MatrixFreeMethod::Lsqr,
            (false, true, _) => MatrixFreeMethod::Lsmr,
            (false, false, true) => MatrixFreeMethod::Fista,
            (false, false, false) => MatrixFreeMethod::Lsqr,
        }
    }
}

/// How the sky is solved for. This is chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverMethod {
    /// Least squares via the SVD.
    Direct,
    Tikhonov,
    /// Non-negative L1 regularisation.
    Lasso,
    MatrixFree(MatrixFreeMethod),
}

impl SolverMethod {
    /// Choose a solver from CLI switches, in priority order lasso,
    /// matrix-free, tikhonov then direct.
    pub fn from_flags(
        lasso: bool,
        matrix_free: bool,
        tikhonov: bool,
        lsqr: bool,
        lsmr: bool,
        fista: bool,
    ) -> SolverMethod {
        if lasso {
            SolverMethod::Lasso
        } else if matrix_free {
            SolverMethod::MatrixFree(MatrixFreeMethod::from_flags(lsqr, lsmr, fista))
        } else if tikhonov {
            SolverMethod::Tikhonov
        } else {
            SolverMethod::Direct
        }
    }
}

impl std::fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverMethod::Direct => write!(f, "direct"),
            SolverMethod::Tikhonov => write!(f, "tikhonov"),
            SolverMethod::Lasso => write!(f, "lasso"),
            SolverMethod::MatrixFree(m) => write!(f, "matrix-free {m}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolveOptions {
    /// Regularisation strength.
    pub alpha: f64,

    /// Multiply the solved pixels by `sqrt(npix) / num_vis`.
    pub scale: bool,

    /// Choose `alpha` by cross-validation (dense regularised methods only).
    pub cv: bool,

    /// Build and apply the operator with the rayon thread pool.
    pub parallel: bool,
}

/// What a solve did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveSummary {
    pub method: SolverMethod,

    /// The `alpha` used, which may have come from cross-validation. Not set
    /// for unregularised solves.
    pub alpha: Option<f64>,

    /// Iterations (or coordinate-descent sweeps) taken by iterative methods.
    pub iterations: Option<usize>,

    /// `||y - Ax||` of the solution, before any scaling.
    pub residual_norm: f64,

    pub npix: usize,
    pub num_vis: usize,
}

/// The pixels found by a solver.
pub(super) struct Solution {
    pub(super) x: Array1<f64>,
    pub(super) iterations: Option<usize>,
}

pub(super) fn norm<S: ndarray::Data<Elem = f64>>(v: &ArrayBase<S, Ix1>) -> f64 {
    v.dot(v).sqrt()
}

/// Solve with a dense operator. Returns the solution and the `alpha` used.
pub(super) fn solve_dense(
    method: SolverMethod,
    op: &DenseOperator,
    y: ArrayView1<f64>,
    opts: &SolveOptions,
) -> Result<(Solution, Option<f64>), SolveError> {
    let a = op.matrix.view();
    match method {
        SolverMethod::Direct => Ok((
            Solution {
                x: direct::solve(a, y)?,
                iterations: None,
            },
            None,
        )),

        SolverMethod::Tikhonov => {
            let alpha = if opts.cv {
                cv::select_alpha(a, y, &CV_ALPHAS, CV_NUM_FOLDS, tikhonov::solve)?
            } else {
                opts.alpha
            };
            let x = tikhonov::solve(a, y, alpha)?;
            Ok((
                Solution {
                    x,
                    iterations: None,
                },
                Some(alpha),
            ))
        }

        SolverMethod::Lasso => {
            let alpha = if opts.cv {
                cv::select_alpha(a, y, &CV_ALPHAS, CV_NUM_FOLDS, |a, y, alpha| {
                    Ok(lasso::solve(a, y, alpha).x)
                })?
            } else {
                opts.alpha
            };
            Ok((lasso::solve(a, y, alpha), Some(alpha)))
        }

        // Dense operators can be used matrix-free too.
        SolverMethod::MatrixFree(m) => Ok((solve_iterative(m, op, y, opts.alpha), Some(opts.alpha))),
    }
}

pub(super) fn solve_iterative(
    method: MatrixFreeMethod,
    op: &dyn LinearOperator,
    y: ArrayView1<f64>,
    alpha: f64,
) -> Solution {
    match method {
        MatrixFreeMethod::Lsqr => lsqr::solve(op, y, alpha),
        MatrixFreeMethod::Lsmr => lsmr::solve(op, y, alpha),
        MatrixFreeMethod::Fista => fista::solve(op, y, alpha),
    }
}
