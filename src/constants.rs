// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision.
 */

pub use marlu::constants::VEL_C;
pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// The default TART telescope API.
pub const DEFAULT_API_URL: &str = "https://tart.elec.ac.nz/signal";

/// The default source catalogue API.
pub const DEFAULT_CATALOG_URL: &str = "https://tart.elec.ac.nz/catalog";

/// The default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// The default regularisation strength.
pub const DEFAULT_ALPHA: f64 = 0.001;

/// The default maximum number of visibilities read from a measurement set.
pub const DEFAULT_NVIS: usize = 1000;

/// The default field of view \[degrees\].
pub const DEFAULT_FOV_DEG: f64 = 180.0;

/// Catalogue sources below this elevation are not drawn \[degrees\].
pub const DEFAULT_ELEVATION_DEG: f64 = 20.0;

/// The default prefix of output files.
pub const DEFAULT_TITLE: &str = "disko";

/// The log file appended to in the working directory.
pub const LOG_FILE_NAME: &str = "disko.log";

/// The number of folds used when cross-validating the regularisation
/// strength.
pub const CV_NUM_FOLDS: usize = 5;

/// The regularisation strengths tried when cross-validating.
pub const CV_ALPHAS: [f64; 9] = [1e-4, 3e-4, 1e-3, 3e-3, 1e-2, 3e-2, 1e-1, 3e-1, 1.0];

/// Iterative solvers give up after this many iterations.
pub const MAX_SOLVER_ITERATIONS: usize = 1000;

/// Iterative solvers stop when their relative change drops below this.
pub const SOLVER_TOLERANCE: f64 = 1e-8;
