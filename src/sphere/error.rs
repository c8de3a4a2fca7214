// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SphereError {
    #[error("HEALPix nside must be positive")]
    ZeroNside,

    #[error("Resolution must be a positive number of arcminutes, but got {0}")]
    BadResolution(f64),

    #[error("The minimum resolution ({res_arcmin} arcmin) is coarser than the maximum resolution ({res_arcmax} arcmin)")]
    ResolutionOrder { res_arcmin: f64, res_arcmax: f64 },

    #[error("The sky radius must be between 0 and 180 degrees, but got {0} degrees")]
    BadRadius(f64),

    #[error("No HEALPix pixels (nside {nside}) are within {radius_deg} degrees of the centre")]
    NoPixels { nside: u32, radius_deg: f64 },

    #[error("Expected {expected} pixel values, but got {got}")]
    WrongNumPixels { expected: usize, got: usize },
}
