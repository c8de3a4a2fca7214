// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! K-fold cross-validation of the regularisation parameter.

use log::{debug, info};
use ndarray::prelude::*;

use super::SolveError;

/// Pick the `alpha` in `alphas` with the smallest held-out prediction error.
///
/// `a` and `y` are real-stacked, so rows `k` and `k + num_vis` belong to the
/// same visibility. Visibilities are assigned to folds by their index modulo
/// `num_folds`, keeping real and imaginary parts in the same fold. Ties go to
/// the earlier `alpha`.
pub(super) fn select_alpha<F>(
    a: ArrayView2<f64>,
    y: ArrayView1<f64>,
    alphas: &[f64],
    num_folds: usize,
    fit: F,
) -> Result<f64, SolveError>
where
    F: Fn(ArrayView2<f64>, ArrayView1<f64>, f64) -> Result<Array1<f64>, SolveError>,
{
    let num_vis = a.len_of(Axis(0)) / 2;
    if num_folds < 2 || num_vis < num_folds {
        return Err(SolveError::TooFewVisibilitiesForCv { num_vis, num_folds });
    }

    let folds: Vec<(Vec<usize>, Vec<usize>)> = (0..num_folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..2 * num_vis).partition(|row| (row % num_vis) % num_folds == fold);
            (train, test)
        })
        .collect();

    let mut best: Option<(f64, f64)> = None;
    for &alpha in alphas {
        let mut squared_error = 0.0;
        for (train, test) in &folds {
            let x = fit(
                a.select(Axis(0), train).view(),
                y.select(Axis(0), train).view(),
                alpha,
            )?;
            let predicted = a.select(Axis(0), test).dot(&x);
            squared_error += predicted
                .iter()
                .zip(test.iter())
                .map(|(p, &row)| (p - y[row]).powi(2))
                .sum::<f64>();
        }
        let mse = squared_error / (2 * num_vis) as f64;
        debug!("Cross-validation: alpha {alpha:e} has mean squared error {mse:e}");
        if best.map_or(true, |(_, best_mse)| mse < best_mse) {
            best = Some((alpha, mse));
        }
    }

    match best {
        Some((alpha, mse)) => {
            info!("Cross-validation chose alpha = {alpha:e} (mean squared error {mse:e})");
            Ok(alpha)
        }
        None => Err(SolveError::BadAlpha(f64::NAN)),
    }
}
