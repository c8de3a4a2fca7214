// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The Discrete Sky Operator (DiSkO) imager.
//!
//! Visibilities are a linear function of the sky, `v = A s`, where `A` is the
//! telescope operator for a particular pixelisation of the sky. Imaging is
//! the (regularised) inversion of this system.

mod operator;
pub mod solve;

pub use operator::{DenseOperator, LinearOperator, MatrixFreeOperator};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use ndarray::prelude::*;
use num_complex::Complex64;

use crate::{sphere::Sphere, telescope::CalibratedVis};
use solve::{solve_dense, solve_iterative, SolveError, SolveOptions, SolveSummary, SolverMethod};

/// Calibrated visibilities ready for imaging.
#[derive(Debug, Clone)]
pub struct DiSkO {
    /// Baselines \[wavelengths\], with shape `(num_vis, 3)`.
    uvw: Array2<f64>,
    vis: Array1<Complex64>,
    pub frequency_hz: f64,
    pub timestamp: DateTime<Utc>,
}

impl DiSkO {
    pub fn from_cal_vis(cal_vis: &CalibratedVis) -> Result<DiSkO, SolveError> {
        if cal_vis.num_vis() == 0 {
            return Err(SolveError::NoVisibilities);
        }
        debug!(
            "DiSkO: {} visibilities at {:.3} MHz, longest baseline {:.1} wavelengths",
            cal_vis.num_vis(),
            cal_vis.frequency_hz / 1e6,
            cal_vis.max_baseline()
        );
        Ok(DiSkO {
            uvw: cal_vis.uvw.clone(),
            vis: cal_vis.vis.clone(),
            frequency_hz: cal_vis.frequency_hz,
            timestamp: cal_vis.timestamp,
        })
    }

    pub fn num_vis(&self) -> usize {
        self.vis.len()
    }

    pub fn uvw(&self) -> ArrayView2<f64> {
        self.uvw.view()
    }

    /// The visibilities as `[Re v; Im v]`.
    pub fn vis_stacked(&self) -> Array1<f64> {
        self.vis
            .iter()
            .map(|v| v.re)
            .chain(self.vis.iter().map(|v| v.im))
            .collect()
    }

    pub fn dense_operator(&self, sphere: &dyn Sphere, parallel: bool) -> DenseOperator {
        DenseOperator::new(self.uvw.view(), sphere.lmn().view(), parallel)
    }

    pub fn matrix_free_operator(&self, sphere: &dyn Sphere, parallel: bool) -> MatrixFreeOperator {
        MatrixFreeOperator::new(self.uvw.view(), sphere.lmn().view(), parallel)
    }

    /// The singular values of the telescope operator for `sphere`, biggest
    /// first. Their fall-off shows how many sky modes the array can measure.
    pub fn singular_spectrum(&self, sphere: &dyn Sphere, parallel: bool) -> Vec<f64> {
        let op = self.dense_operator(sphere, parallel);
        let values = solve::singular_values(op.matrix.view());
        let smallest = values.iter().rev().find(|&&s| s > 0.0);
        if let (Some(largest), Some(smallest)) = (values.first(), smallest) {
            debug!("Operator singular values from {largest:e} to {smallest:e}");
        }
        values
    }

    /// Solve for the sky, writing the result into the sphere's pixels.
    pub fn solve(
        &self,
        sphere: &mut dyn Sphere,
        method: SolverMethod,
        opts: &SolveOptions,
    ) -> Result<SolveSummary, SolveError> {
        if !(opts.alpha >= 0.0 && opts.alpha.is_finite()) {
            return Err(SolveError::BadAlpha(opts.alpha));
        }
        let npix = sphere.npix();
        if npix == 0 {
            return Err(SolveError::NoPixels);
        }
        let y = self.vis_stacked();
        info!(
            "Solving for {npix} pixels from {} visibilities ({method})",
            self.num_vis()
        );

        let (solution, alpha, residual) = match method {
            SolverMethod::MatrixFree(m) => {
                if opts.cv {
                    warn!(
                        "Cross-validation isn't available for matrix-free solves; using alpha = {}",
                        opts.alpha
                    );
                }
                let op = self.matrix_free_operator(sphere, opts.parallel);
                let solution = solve_iterative(m, &op, y.view(), opts.alpha);
                let residual = op.apply(solution.x.view()) - &y;
                (solution, Some(opts.alpha), residual)
            }
            _ => {
                let op = self.dense_operator(sphere, opts.parallel);
                let (solution, alpha) = solve_dense(method, &op, y.view(), opts)?;
                let residual = op.apply(solution.x.view()) - &y;
                (solution, alpha, residual)
            }
        };
        let residual_norm = solve::norm(&residual);

        let mut x = solution.x;
        if opts.scale {
            x *= (npix as f64).sqrt() / self.num_vis() as f64;
        }
        sphere.set_pixels(x.view())?;
        debug!("Residual norm {residual_norm:e}, total flux {:e}", sphere.total_flux());

        Ok(SolveSummary {
            method,
            alpha,
            iterations: solution.iterations,
            residual_norm,
            npix,
            num_vis: self.num_vis(),
        })
    }
}
