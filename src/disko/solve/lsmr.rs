// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! LSMR (Fong & Saunders 2011) for damped least squares,
//! `min ||Ax - y||² + damp² ||x||²`. Unlike LSQR, `||Aᵀr||` decreases
//! monotonically.

use log::debug;
use ndarray::prelude::*;

use super::{norm, Solution};
use crate::{
    constants::{MAX_SOLVER_ITERATIONS, SOLVER_TOLERANCE},
    disko::LinearOperator,
};

fn sign(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x.signum()
    }
}

/// A stable Givens rotation, returning `(c, s, r)` with `c a + s b = r`.
fn sym_ortho(a: f64, b: f64) -> (f64, f64, f64) {
    if b == 0.0 {
        (sign(a), 0.0, a.abs())
    } else if a == 0.0 {
        (0.0, sign(b), b.abs())
    } else if b.abs() > a.abs() {
        let tau = a / b;
        let s = sign(b) / (1.0 + tau * tau).sqrt();
        let c = s * tau;
        (c, s, b / s)
    } else {
        let tau = b / a;
        let c = sign(a) / (1.0 + tau * tau).sqrt();
        let s = c * tau;
        (c, s, a / c)
    }
}

pub(super) fn solve(op: &dyn LinearOperator, y: ArrayView1<f64>, damp: f64) -> Solution {
    let (_, p) = op.shape();
    let mut x = Array1::zeros(p);

    let mut u = y.to_owned();
    let y_norm = norm(&u);
    let mut beta = y_norm;
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

    let mut zetabar = alpha * beta;
    let mut alphabar = alpha;
    let mut rho = 1.0;
    let mut rhobar = 1.0;
    let mut cbar = 1.0;
    let mut sbar = 0.0;

    let mut h = v.clone();
    let mut hbar: Array1<f64> = Array1::zeros(p);

    // For estimating ||r||.
    let mut betadd = beta;
    let mut betad = 0.0;
    let mut rhodold = 1.0;
    let mut tautildeold = 0.0;
    let mut thetatilde = 0.0;
    let mut zeta = 0.0;
    let mut d = 0.0;

    // For estimating ||A||.
    let mut a_norm2 = alpha * alpha;

    let mut iterations = 0;
    while iterations < MAX_SOLVER_ITERATIONS {
        iterations += 1;

        u = op.apply(v.view()) - alpha * &u;
        beta = norm(&u);
        if beta > 0.0 {
            u /= beta;
            v = op.apply_adjoint(u.view()) - beta * &v;
            alpha = norm(&v);
            if alpha > 0.0 {
                v /= alpha;
            }
        }

        let (chat, shat, alphahat) = sym_ortho(alphabar, damp);

        let rhoold = rho;
        let (c, s, rho_new) = sym_ortho(alphahat, beta);
        rho = rho_new;
        let thetanew = s * alpha;
        alphabar = c * alpha;

        let rhobarold = rhobar;
        let zetaold = zeta;
        let thetabar = sbar * rho;
        let (cbar_new, sbar_new, rhobar_new) = sym_ortho(cbar * rho, thetanew);
        cbar = cbar_new;
        sbar = sbar_new;
        rhobar = rhobar_new;
        zeta = cbar * zetabar;
        zetabar *= -sbar;

        hbar = &h - (thetabar * rho / (rhoold * rhobarold)) * &hbar;
        x.scaled_add(zeta / (rho * rhobar), &hbar);
        h = &v - (thetanew / rho) * &h;

        // Estimate ||r||.
        let betaacute = chat * betadd;
        let betacheck = -shat * betadd;
        let betahat = c * betaacute;
        betadd = -s * betaacute;

        let thetatildeold = thetatilde;
        let (ctildeold, stildeold, rhotildeold) = sym_ortho(rhodold, thetabar);
        thetatilde = stildeold * rhobar;
        rhodold = ctildeold * rhobar;
        betad = -stildeold * betad + ctildeold * betahat;

        tautildeold = (zetaold - thetatildeold * tautildeold) / rhotildeold;
        let taud = (zeta - thetatilde * tautildeold) / rhodold;
        d += betacheck * betacheck;
        let r_norm = (d + (betad - taud).powi(2) + betadd * betadd).sqrt();

        // Estimate ||A||.
        a_norm2 += beta * beta;
        let a_norm = a_norm2.sqrt();
        a_norm2 += alpha * alpha;

        let ar_norm = zetabar.abs();
        let x_norm = norm(&x);

        let consistent = r_norm <= SOLVER_TOLERANCE * (y_norm + a_norm * x_norm);
        let least_squares = a_norm * r_norm > 0.0 && ar_norm <= SOLVER_TOLERANCE * a_norm * r_norm;
        if consistent || least_squares || ar_norm == 0.0 {
            break;
        }
    }
    debug!("LSMR: {iterations} iterations");

    Solution {
        x,
        iterations: Some(iterations),
    }
}
