// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::sphere::SphereError;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("There are no visibilities to image")]
    NoVisibilities,

    #[error("The sky has no pixels to solve for")]
    NoPixels,

    #[error("The regularisation parameter alpha must be a non-negative number, but got {0}")]
    BadAlpha(f64),

    #[error("The SVD least-squares solve failed: {0}")]
    Svd(String),

    #[error("The regularised normal equations are not positive definite (alpha = {alpha}); try a larger alpha")]
    NotPositiveDefinite { alpha: f64 },

    #[error("Cross-validation with {num_folds} folds needs at least {num_folds} visibilities, but only {num_vis} are available")]
    TooFewVisibilitiesForCv { num_vis: usize, num_folds: usize },

    #[error(transparent)]
    Sphere(#[from] SphereError),
}
