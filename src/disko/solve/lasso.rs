// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Non-negative Lasso by cyclic coordinate descent, minimising
//! `1/(2n) ||y - Ax||² + α ||x||₁` subject to `x >= 0`.

use log::debug;
use ndarray::prelude::*;

use super::Solution;
use crate::constants::{MAX_SOLVER_ITERATIONS, SOLVER_TOLERANCE};

pub(super) fn solve(a: ArrayView2<f64>, y: ArrayView1<f64>, alpha: f64) -> Solution {
    let (n, p) = a.dim();
    let threshold = n as f64 * alpha;
    let col_norms: Vec<f64> = a.axis_iter(Axis(1)).map(|c| c.dot(&c)).collect();

    let mut x: Array1<f64> = Array1::zeros(p);
    let mut residual = y.to_owned();
    let mut iterations = 0;
    let mut converged = false;
    while iterations < MAX_SOLVER_ITERATIONS && !converged {
        iterations += 1;
        let mut max_change: f64 = 0.0;
        let mut max_x: f64 = 0.0;
        for (j, &norm) in col_norms.iter().enumerate() {
            if norm == 0.0 {
                continue;
            }
            let col = a.column(j);
            let x_old = x[j];
            let rho = col.dot(&residual) + norm * x_old;
            let x_new = ((rho - threshold) / norm).max(0.0);
            if x_new != x_old {
                residual.scaled_add(x_old - x_new, &col);
                x[j] = x_new;
                max_change = max_change.max((x_new - x_old).abs());
            }
            max_x = max_x.max(x_new);
        }
        converged = max_x == 0.0 || max_change <= SOLVER_TOLERANCE * max_x;
    }
    debug!("Lasso: {iterations} sweeps, converged: {converged}");

    Solution {
        x,
        iterations: Some(iterations),
    }
}
