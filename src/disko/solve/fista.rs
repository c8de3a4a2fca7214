// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! FISTA (Beck & Teboulle 2009) for the non-negative L1-regularised problem
//! `min ½ ||Ax - y||² + α ||x||₁`, `x >= 0`.

use log::debug;
use ndarray::prelude::*;

use super::{norm, Solution};
use crate::{
    constants::{MAX_SOLVER_ITERATIONS, SOLVER_TOLERANCE},
    disko::LinearOperator,
};

const POWER_ITERATIONS: usize = 100;

/// Estimate `||A||²` (the largest eigenvalue of `AᵀA`).
pub(super) fn operator_norm_squared(op: &dyn LinearOperator) -> f64 {
    let (_, p) = op.shape();
    if p == 0 {
        return 0.0;
    }
    let mut v = Array1::from_elem(p, 1.0 / (p as f64).sqrt());
    let mut lambda = 0.0;
    for _ in 0..POWER_ITERATIONS {
        let w = op.apply_adjoint(op.apply(v.view()).view());
        let new_lambda = norm(&w);
        if new_lambda == 0.0 {
            return 0.0;
        }
        v = w / new_lambda;
        let change = (new_lambda - lambda).abs();
        lambda = new_lambda;
        if change <= 1e-6 * lambda {
            break;
        }
    }
    lambda
}

pub(super) fn solve(op: &dyn LinearOperator, y: ArrayView1<f64>, alpha: f64) -> Solution {
    let (_, p) = op.shape();
    let lipschitz = operator_norm_squared(op);
    let mut x = Array1::zeros(p);
    if lipschitz == 0.0 {
        return Solution {
            x,
            iterations: Some(0),
        };
    }
    let step = 1.0 / lipschitz;
    let threshold = alpha * step;

    let mut z = x.clone();
    let mut t: f64 = 1.0;
    let mut iterations = 0;
    while iterations < MAX_SOLVER_ITERATIONS {
        iterations += 1;

        let residual = op.apply(z.view()) - y;
        let gradient = op.apply_adjoint(residual.view());
        let mut x_new = z - step * gradient;
        x_new.mapv_inplace(|v| (v - threshold).max(0.0));

        let t_new = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
        let delta = &x_new - &x;
        z = &x_new + ((t - 1.0) / t_new) * &delta;

        let change = norm(&delta);
        let size = norm(&x_new);
        x = x_new;
        t = t_new;
        if change <= SOLVER_TOLERANCE * size.max(f64::MIN_POSITIVE) {
            break;
        }
    }
    debug!("FISTA: {iterations} iterations, step {step:e}");

    Solution {
        x,
        iterations: Some(iterations),
    }
}
