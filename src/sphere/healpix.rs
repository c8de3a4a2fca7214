// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A region of a HEALPix (RING scheme) pixelisation.
//!
//! The HEALPix pole is put at the zenith, so rings are circles of constant
//! elevation.

use log::{debug, warn};
use ndarray::prelude::*;

use super::{Sphere, SkyCoord, SphereError};
use crate::constants::{FRAC_PI_2, PI};

/// The biggest nside that [`HealpixSubSphere::from_resolution`] will pick.
pub(super) const MAX_NSIDE: u32 = 1 << 13;

#[derive(Debug, Clone)]
pub struct HealpixSubSphere {
    nside: u32,
    centre: SkyCoord,
    radius: f64,

    /// The RING-scheme indices of the pixels in this sub-sphere.
    pixel_indices: Vec<usize>,

    coords: Vec<SkyCoord>,

    /// The number of pixels in each pixel's ring. Used for pixel outlines.
    ring_lengths: Vec<usize>,

    areas: Array1<f64>,
    pixels: Array1<f64>,
}

impl HealpixSubSphere {
    /// All pixels of a HEALPix sphere with `nside` within `radius` of the
    /// direction `(theta, phi)`. All angles are in radians.
    pub fn new(nside: u32, theta: f64, phi: f64, radius: f64) -> Result<Self, SphereError> {
        if nside == 0 {
            return Err(SphereError::ZeroNside);
        }
        if !(radius > 0.0 && radius <= PI) {
            return Err(SphereError::BadRadius(radius.to_degrees()));
        }
        let centre = SkyCoord::new(theta, phi);
        let npix_total = 12 * nside as usize * nside as usize;

        let mut pixel_indices = vec![];
        let mut coords = vec![];
        let mut ring_lengths = vec![];
        for ipix in 0..npix_total {
            let (pix_theta, pix_phi, ring_length) = pix2ang_ring(nside, ipix);
            // Rings are ordered by theta.
            if pix_theta > theta + radius + 1e-12 {
                break;
            }
            let c = SkyCoord::new(pix_theta, pix_phi);
            if centre.distance(&c) <= radius {
                pixel_indices.push(ipix);
                coords.push(c);
                ring_lengths.push(ring_length);
            }
        }
        if pixel_indices.is_empty() {
            return Err(SphereError::NoPixels {
                nside,
                radius_deg: radius.to_degrees(),
            });
        }

        let npix = pixel_indices.len();
        debug!(
            "HEALPix sub-sphere: nside {nside}, {npix} of {npix_total} pixels, resolution {:.2} arcmin",
            Self::resolution_arcmin(nside)
        );
        Ok(HealpixSubSphere {
            nside,
            centre,
            radius,
            pixel_indices,
            coords,
            ring_lengths,
            areas: Array1::from_elem(npix, 4.0 * PI / npix_total as f64),
            pixels: Array1::zeros(npix),
        })
    }

    /// Like [`HealpixSubSphere::new`], but with the smallest power-of-two nside
    /// whose pixels are no bigger than `res_arcmin`.
    pub fn from_resolution(
        res_arcmin: f64,
        theta: f64,
        phi: f64,
        radius: f64,
    ) -> Result<Self, SphereError> {
        let nside = Self::nside_for_resolution(res_arcmin)?;
        Self::new(nside, theta, phi, radius)
    }

    pub fn nside_for_resolution(res_arcmin: f64) -> Result<u32, SphereError> {
        if !(res_arcmin > 0.0 && res_arcmin.is_finite()) {
            return Err(SphereError::BadResolution(res_arcmin));
        }
        let mut nside = 1;
        while Self::resolution_arcmin(nside) > res_arcmin && nside < MAX_NSIDE {
            nside *= 2;
        }
        let achieved = Self::resolution_arcmin(nside);
        if achieved > res_arcmin {
            warn!(
                "A resolution of {res_arcmin} arcmin needs an nside above {MAX_NSIDE}; using nside {nside} ({achieved:.3} arcmin)"
            );
        }
        Ok(nside)
    }

    /// The characteristic pixel size of a HEALPix sphere \[arcminutes\].
    pub fn resolution_arcmin(nside: u32) -> f64 {
        (PI / 3.0).sqrt().to_degrees() * 60.0 / nside as f64
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    pub fn pixel_indices(&self) -> &[usize] {
        &self.pixel_indices
    }
}

impl Sphere for HealpixSubSphere {
    fn npix(&self) -> usize {
        self.pixel_indices.len()
    }

    fn centre(&self) -> SkyCoord {
        self.centre
    }

    fn radius(&self) -> f64 {
        self.radius
    }

    fn pixel_coords(&self) -> &[SkyCoord] {
        &self.coords
    }

    fn pixel_areas(&self) -> ArrayView1<f64> {
        self.areas.view()
    }

    fn pixels(&self) -> ArrayView1<f64> {
        self.pixels.view()
    }

    fn pixels_mut(&mut self) -> ArrayViewMut1<f64> {
        self.pixels.view_mut()
    }

    /// HEALPix pixels are (curved) diamonds. The outlines here are diamonds
    /// with the pixel's area, with corners north, east, south and west of the
    /// centre.
    fn pixel_polygons(&self) -> Vec<Vec<SkyCoord>> {
        self.coords
            .iter()
            .zip(self.ring_lengths.iter())
            .zip(self.areas.iter())
            .map(|((c, &ring_length), &area)| {
                let d_phi = PI / ring_length as f64;
                let d_theta = (area / (2.0 * d_phi * c.theta.sin().max(1e-6))).min(FRAC_PI_2);
                vec![
                    SkyCoord::new((c.theta - d_theta).max(0.0), c.phi),
                    SkyCoord::new(c.theta, c.phi + d_phi),
                    SkyCoord::new((c.theta + d_theta).min(PI), c.phi),
                    SkyCoord::new(c.theta, c.phi - d_phi),
                ]
            })
            .collect()
    }

    fn description(&self) -> String {
        format!(
            "HEALPix nside {} ({} pixels, {:.1} arcmin)",
            self.nside,
            self.npix(),
            Self::resolution_arcmin(self.nside)
        )
    }
}

fn isqrt(v: usize) -> usize {
    let mut r = (v as f64).sqrt() as usize;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

/// Get the `(theta, phi)` of a RING-scheme pixel, as well as the number of
/// pixels in its ring.
pub(super) fn pix2ang_ring(nside: u32, ipix: usize) -> (f64, f64, usize) {
    let nside = nside as usize;
    let npix = 12 * nside * nside;
    let ncap = 2 * nside * (nside - 1);
    let fact2 = 4.0 / npix as f64;

    if ipix < ncap {
        // North polar cap.
        let iring = (1 + isqrt(1 + 2 * ipix)) >> 1;
        let iphi = ipix + 1 - 2 * iring * (iring - 1);
        let z = 1.0 - (iring * iring) as f64 * fact2;
        let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
        (z.acos(), phi, 4 * iring)
    } else if ipix < npix - ncap {
        // Equatorial region.
        let ip = ipix - ncap;
        let tmp = ip / (4 * nside);
        let iring = tmp + nside;
        let iphi = ip - tmp * 4 * nside + 1;
        let fodd = if (iring + nside) & 1 == 1 { 1.0 } else { 0.5 };
        let fact1 = 2.0 / (3.0 * nside as f64);
        let z = (2 * nside) as f64 * fact1 - iring as f64 * fact1;
        let phi = (iphi as f64 - fodd) * PI / (2 * nside) as f64;
        (z.acos(), phi, 4 * nside)
    } else {
        // South polar cap.
        let ip = npix - ipix;
        let iring = (1 + isqrt(2 * ip - 1)) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let z = -1.0 + (iring * iring) as f64 * fact2;
        let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
        (z.acos(), phi, 4 * iring)
    }
}
