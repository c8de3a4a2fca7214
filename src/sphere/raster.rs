// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Resample a sphere onto a regular orthographic (SIN) grid.

use std::collections::HashMap;

use ndarray::prelude::*;

use super::{Sphere, SkyCoord};
use crate::constants::FRAC_PI_2;

/// Image sizes are kept within these bounds by [`Raster::default_size`].
const MIN_RASTER_SIZE: usize = 64;
const MAX_RASTER_SIZE: usize = 2048;

/// A square orthographic image centred on a sphere's centre. Element
/// `[iy, ix]` is at direction cosines `(l, m)` relative to the centre, with
/// `l` increasing with `ix` and `m` increasing with `iy`. Pixels outside the
/// field of view are NaN.
#[derive(Debug, Clone)]
pub struct Raster {
    pub data: Array2<f64>,

    /// The half-width of the image in direction cosines.
    pub extent: f64,
}

impl Raster {
    pub fn size(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// The width of a pixel in direction cosines.
    pub fn cell_size(&self) -> f64 {
        2.0 * self.extent / self.size() as f64
    }

    /// A raster size with roughly two image pixels per sphere pixel across.
    pub fn default_size(npix: usize) -> usize {
        ((4.0 * npix as f64).sqrt().ceil() as usize).clamp(MIN_RASTER_SIZE, MAX_RASTER_SIZE)
    }
}

/// Look up the sphere pixel closest to each image pixel.
pub fn rasterise(sphere: &dyn Sphere, fov_deg: f64, size: usize) -> Raster {
    let half_fov = (fov_deg.to_radians() / 2.0).clamp(0.0, FRAC_PI_2);
    let extent = half_fov.sin();
    let mut raster = Raster {
        data: Array2::from_elem((size, size), f64::NAN),
        extent,
    };
    if size == 0 || sphere.npix() == 0 || extent <= 0.0 {
        return raster;
    }

    let lookup = NearestPixel::new(sphere);
    let centre = sphere.centre();
    let radius = sphere.radius();
    let cell = raster.cell_size();
    let pixels = sphere.pixels();

    for ((iy, ix), out) in raster.data.indexed_iter_mut() {
        let l = -extent + (ix as f64 + 0.5) * cell;
        let m = -extent + (iy as f64 + 0.5) * cell;
        let r = l.hypot(m);
        if r > extent {
            continue;
        }
        let rho = r.asin();
        if rho > radius {
            continue;
        }
        let c = if r > 0.0 {
            centre.offset(l * rho / r, m * rho / r)
        } else {
            centre
        };
        if let Some(i) = lookup.nearest(&c) {
            *out = pixels[i];
        }
    }
    raster
}

/// A bucketed lookup of sphere pixels by their unit vectors.
struct NearestPixel {
    bucket_size: f64,
    buckets: HashMap<[i64; 3], Vec<usize>>,
    lmn: Vec<[f64; 3]>,
}

impl NearestPixel {
    fn new(sphere: &dyn Sphere) -> NearestPixel {
        let npix = sphere.npix();
        let mean_area = sphere.pixel_areas().sum() / npix as f64;
        let bucket_size = (2.0 * mean_area.sqrt()).clamp(1e-6, 2.0);
        let lmn: Vec<[f64; 3]> = sphere.pixel_coords().iter().map(SkyCoord::lmn).collect();
        let mut buckets: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
        for (i, v) in lmn.iter().enumerate() {
            buckets
                .entry(bucket_key(v, bucket_size))
                .or_default()
                .push(i);
        }
        NearestPixel {
            bucket_size,
            buckets,
            lmn,
        }
    }

    fn nearest(&self, c: &SkyCoord) -> Option<usize> {
        let v = c.lmn();
        let key = bucket_key(&v, self.bucket_size);
        let max_reach = (2.0 / self.bucket_size).ceil() as i64 + 1;

        let mut best: Option<(usize, f64)> = None;
        let mut reach = 1;
        loop {
            for dx in -reach..=reach {
                for dy in -reach..=reach {
                    for dz in -reach..=reach {
                        let k = [key[0] + dx, key[1] + dy, key[2] + dz];
                        for &i in self.buckets.get(&k).into_iter().flatten() {
                            let p = self.lmn[i];
                            let d2 = (p[0] - v[0]).powi(2)
                                + (p[1] - v[1]).powi(2)
                                + (p[2] - v[2]).powi(2);
                            if best.map_or(true, |(_, b)| d2 < b) {
                                best = Some((i, d2));
                            }
                        }
                    }
                }
            }
            // Anything found within one bucket of the search cube's faces
            // can't be beaten by a pixel outside of the cube.
            if let Some((i, d2)) = best {
                if d2.sqrt() <= (reach - 1) as f64 * self.bucket_size || reach >= max_reach {
                    return Some(i);
                }
            } else if reach >= max_reach {
                return None;
            }
            reach += 1;
        }
    }
}

fn bucket_key(v: &[f64; 3], size: f64) -> [i64; 3] {
    v.map(|x| (x / size).floor() as i64)
}
