// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pixelisations of the sky.
//!
//! All coordinates are local: `theta` is the angle from the zenith (i.e. the
//! co-elevation) and `phi` is the azimuth, measured from north through east.
//! Direction cosines are `l` (east), `m` (north) and `n` (up).

mod error;
mod healpix;
mod mesh;
mod raster;
#[cfg(test)]
mod tests;

pub use error::SphereError;
pub use healpix::HealpixSubSphere;
pub use mesh::{area, AdaptiveMeshSphere};
pub use raster::{rasterise, Raster};

use ndarray::prelude::*;

use crate::constants::{FRAC_PI_2, TAU};

/// A direction on the local sky.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCoord {
    /// Angle from the zenith \[radians\]
    pub theta: f64,
    /// Azimuth \[radians\]
    pub phi: f64,
}

impl SkyCoord {
    pub fn new(theta: f64, phi: f64) -> SkyCoord {
        SkyCoord { theta, phi }
    }

    pub fn from_el_az(el: f64, az: f64) -> SkyCoord {
        SkyCoord {
            theta: FRAC_PI_2 - el,
            phi: az,
        }
    }

    /// Get the coordinate of a unit direction vector.
    pub fn from_lmn([l, m, n]: [f64; 3]) -> SkyCoord {
        SkyCoord {
            theta: l.hypot(m).atan2(n),
            phi: l.atan2(m).rem_euclid(TAU),
        }
    }

    /// Elevation \[radians\]
    pub fn el(&self) -> f64 {
        FRAC_PI_2 - self.theta
    }

    /// Azimuth in the range `[0, 2π)` \[radians\]
    pub fn az(&self) -> f64 {
        self.phi.rem_euclid(TAU)
    }

    pub fn lmn(&self) -> [f64; 3] {
        let (s_theta, c_theta) = self.theta.sin_cos();
        let (s_phi, c_phi) = self.phi.sin_cos();
        [s_theta * s_phi, s_theta * c_phi, c_theta]
    }

    /// The great-circle distance to another direction \[radians\].
    pub fn distance(&self, other: &SkyCoord) -> f64 {
        let [l1, m1, n1] = self.lmn();
        let [l2, m2, n2] = other.lmn();
        let dot = l1 * l2 + m1 * m2 + n1 * n2;
        let cross = [m1 * n2 - n1 * m2, n1 * l2 - l1 * n2, l1 * m2 - m1 * l2];
        (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2])
            .sqrt()
            .atan2(dot)
    }

    /// The direction at the azimuthal-equidistant offset `(x, y)` from this
    /// one \[radians\]. `x` points east and `y` north when this direction is the
    /// zenith.
    pub fn offset(&self, x: f64, y: f64) -> SkyCoord {
        let rho = x.hypot(y);
        let bearing = x.atan2(y);
        let local = SkyCoord::new(rho, bearing).lmn();

        // Tilt the zenith down to `theta`, then spin it around to `phi`.
        let (s_t, c_t) = self.theta.sin_cos();
        let (s_p, c_p) = self.phi.sin_cos();
        let l = local[0];
        let m = local[1] * c_t + local[2] * s_t;
        let n = -local[1] * s_t + local[2] * c_t;
        SkyCoord::from_lmn([l * c_p + m * s_p, -l * s_p + m * c_p, n])
    }

    /// The orthographic (SIN) projection of this direction about `centre`, or
    /// `None` if it is behind `centre`'s horizon. This undoes the rotation of
    /// [`SkyCoord::offset`].
    pub fn orthographic(&self, centre: &SkyCoord) -> Option<(f64, f64)> {
        let [big_l, big_m, big_n] = self.lmn();
        let (s_t, c_t) = centre.theta.sin_cos();
        let (s_p, c_p) = centre.phi.sin_cos();
        let l = big_l * c_p - big_m * s_p;
        let m = big_l * s_p + big_m * c_p;
        let y = m * c_t - big_n * s_t;
        let n = m * s_t + big_n * c_t;
        (n >= 0.0).then_some((l, y))
    }
}

/// A pixelisation of (part of) the sky. Pixel values are what the imaging
/// solvers produce.
pub trait Sphere {
    fn npix(&self) -> usize;

    /// The centre of the region of interest.
    fn centre(&self) -> SkyCoord;

    /// The angular radius of the region of interest \[radians\].
    fn radius(&self) -> f64;

    fn pixel_coords(&self) -> &[SkyCoord];

    /// Pixel solid angles \[steradians\].
    fn pixel_areas(&self) -> ArrayView1<f64>;

    fn pixels(&self) -> ArrayView1<f64>;

    fn pixels_mut(&mut self) -> ArrayViewMut1<f64>;

    /// The outline of each pixel, in pixel order.
    fn pixel_polygons(&self) -> Vec<Vec<SkyCoord>>;

    /// A short human-readable summary.
    fn description(&self) -> String;

    fn set_pixels(&mut self, values: ArrayView1<f64>) -> Result<(), SphereError> {
        let npix = self.npix();
        if values.len() != npix {
            return Err(SphereError::WrongNumPixels {
                expected: npix,
                got: values.len(),
            });
        }
        self.pixels_mut().assign(&values);
        Ok(())
    }

    /// The direction cosines of all pixels, with shape `(npix, 3)`.
    fn lmn(&self) -> Array2<f64> {
        let mut lmn = Array2::zeros((self.npix(), 3));
        lmn.outer_iter_mut()
            .zip(self.pixel_coords())
            .for_each(|(mut row, c)| row.assign(&ArrayView1::from(&c.lmn())));
        lmn
    }

    /// The sum of pixel values weighted by their areas.
    fn total_flux(&self) -> f64 {
        self.pixels().dot(&self.pixel_areas())
    }
}
