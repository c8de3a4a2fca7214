// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! LSQR (Paige & Saunders 1982) for damped least squares,
//! `min ||Ax - y||² + damp² ||x||²`.

use log::debug;
use ndarray::prelude::*;

use super::{norm, Solution};
use crate::{
    constants::{MAX_SOLVER_ITERATIONS, SOLVER_TOLERANCE},
    disko::LinearOperator,
};

pub(super) fn solve(op: &dyn LinearOperator, y: ArrayView1<f64>, damp: f64) -> Solution {
    let (_, p) = op.shape();
    let mut x = Array1::zeros(p);

    // Golub-Kahan bidiagonalisation.
    let mut u = y.to_owned();
    let mut beta = norm(&u);
    let y_norm = beta;
    if beta == 0.0 {
        return Solution {
            x,
            iterations: Some(0),
        };
    }
    u /= beta;
    let mut v = op.apply_adjoint(u.view());
    let mut alpha = norm(&v);
    if alpha == 0.0 {
        return Solution {
            x,
            iterations: Some(0),
        };
    }
    v /= alpha;
    let mut w = v.clone();

    let mut rhobar = alpha;
    let mut phibar = beta;
    let mut a_norm2: f64 = 0.0;
    let mut res2 = 0.0;
    let mut iterations = 0;

    while iterations < MAX_SOLVER_ITERATIONS {
        iterations += 1;

        u = op.apply(v.view()) - alpha * &u;
        beta = norm(&u);
        if beta > 0.0 {
            u /= beta;
            a_norm2 += alpha * alpha + beta * beta + damp * damp;
            v = op.apply_adjoint(u.view()) - beta * &v;
            alpha = norm(&v);
            if alpha > 0.0 {
                v /= alpha;
            }
        }

        // Eliminate the damping parameter.
        let (rhobar1, psi) = if damp > 0.0 {
            let rhobar1 = rhobar.hypot(damp);
            let cs1 = rhobar / rhobar1;
            let sn1 = damp / rhobar1;
            let psi = sn1 * phibar;
            phibar *= cs1;
            (rhobar1, psi)
        } else {
            (rhobar, 0.0)
        };

        // Eliminate the subdiagonal element.
        let rho = rhobar1.hypot(beta);
        let cs = rhobar1 / rho;
        let sn = beta / rho;
        let theta = sn * alpha;
        rhobar = -cs * alpha;
        let phi = cs * phibar;
        phibar *= sn;

        x.scaled_add(phi / rho, &w);
        w = &v - (theta / rho) * &w;

        res2 += psi * psi;
        let r_norm = (phibar * phibar + res2).sqrt();
        let ar_norm = alpha * (sn * phi).abs();
        let a_norm = a_norm2.sqrt();
        if beta == 0.0
            || alpha == 0.0
            || r_norm <= SOLVER_TOLERANCE * y_norm
            || ar_norm <= SOLVER_TOLERANCE * a_norm * r_norm
        {
            break;
        }
    }
    debug!("LSQR: {iterations} iterations");

    Solution {
        x,
        iterations: Some(iterations),
    }
}
