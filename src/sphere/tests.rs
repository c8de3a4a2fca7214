// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;

use super::{
    healpix::{pix2ang_ring, MAX_NSIDE},
    *,
};
use crate::constants::{FRAC_PI_2, PI};

#[test]
fn test_sky_coord_conversions() {
    let c = SkyCoord::from_el_az(30_f64.to_radians(), 100_f64.to_radians());
    assert_abs_diff_eq!(c.el(), 30_f64.to_radians(), epsilon = 1e-12);
    assert_abs_diff_eq!(c.az(), 100_f64.to_radians(), epsilon = 1e-12);

    let [l, m, n] = c.lmn();
    assert_abs_diff_eq!(l * l + m * m + n * n, 1.0, epsilon = 1e-12);
    let back = SkyCoord::from_lmn([l, m, n]);
    assert_abs_diff_eq!(back.theta, c.theta, epsilon = 1e-12);
    assert_abs_diff_eq!(back.phi, c.phi, epsilon = 1e-12);

    // East on the horizon.
    let [l, m, n] = SkyCoord::from_el_az(0.0, FRAC_PI_2).lmn();
    assert_abs_diff_eq!(l, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(m, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(n, 0.0, epsilon = 1e-12);
}

#[test]
fn test_distance_and_offset() {
    let zenith = SkyCoord::new(0.0, 0.0);
    let c = SkyCoord::new(0.3, 1.2);
    assert_abs_diff_eq!(zenith.distance(&c), 0.3, epsilon = 1e-12);

    // Offsets from the zenith are plain polar coordinates.
    let east = zenith.offset(0.2, 0.0);
    assert_abs_diff_eq!(east.theta, 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(east.az(), FRAC_PI_2, epsilon = 1e-12);

    // Away from the zenith, offsets keep their length.
    let centre = SkyCoord::new(0.5, 2.0);
    for (x, y) in [(0.1, 0.0), (0.0, -0.2), (0.05, 0.07)] {
        let o = centre.offset(x, y);
        assert_abs_diff_eq!(centre.distance(&o), f64::hypot(x, y), epsilon = 1e-12);
    }
}

#[test]
fn test_orthographic() {
    let centre = SkyCoord::new(0.5, 2.0);
    let (x, y) = centre.offset(0.3, -0.4).orthographic(&centre).unwrap();
    // 0.5 radians away along the same bearing, scaled by sin.
    assert_abs_diff_eq!(x, 0.5f64.sin() * 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(y, -(0.5f64.sin()) * 0.8, epsilon = 1e-12);

    let zenith = SkyCoord::new(0.0, 0.0);
    let (x, y) = SkyCoord::from_el_az(0.0, FRAC_PI_2)
        .orthographic(&zenith)
        .unwrap();
    assert_abs_diff_eq!(x, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(y, 0.0, epsilon = 1e-12);
    assert!(SkyCoord::new(2.0, 0.0).orthographic(&zenith).is_none());
}

#[test]
fn test_pix2ang_ring() {
    // nside 1: 4 pixels in each polar ring and 4 on the equator.
    let (theta, phi, ring) = pix2ang_ring(1, 0);
    assert_abs_diff_eq!(theta.cos(), 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(phi, PI / 4.0, epsilon = 1e-12);
    assert_eq!(ring, 4);

    let (theta, phi, _) = pix2ang_ring(1, 4);
    assert_abs_diff_eq!(theta, FRAC_PI_2, epsilon = 1e-12);
    assert_abs_diff_eq!(phi, 0.0, epsilon = 1e-12);

    let (theta, _, _) = pix2ang_ring(1, 11);
    assert_abs_diff_eq!(theta.cos(), -2.0 / 3.0, epsilon = 1e-12);

    // Rings never go backwards.
    let nside = 8;
    let mut last = 0.0;
    for ipix in 0..12 * 64 {
        let (theta, phi, _) = pix2ang_ring(nside, ipix);
        assert!(theta >= last - 1e-12);
        assert!((0.0..2.0 * PI).contains(&phi));
        last = theta;
    }
}

#[test]
fn test_healpix_full_sphere() {
    let sphere = HealpixSubSphere::new(4, 0.0, 0.0, PI).unwrap();
    assert_eq!(sphere.npix(), 12 * 16);
    assert_abs_diff_eq!(sphere.pixel_areas().sum(), 4.0 * PI, epsilon = 1e-10);
    assert_eq!(sphere.pixel_indices()[5], 5);
}

#[test]
fn test_healpix_hemisphere() {
    let sphere = HealpixSubSphere::new(8, 0.0, 0.0, FRAC_PI_2).unwrap();
    // Everything above the horizon, plus the equatorial ring itself.
    let upper = 12 * 64 / 2;
    assert!(sphere.npix() >= upper);
    assert!(sphere.npix() <= upper + 4 * 8);
    assert!(sphere.pixel_coords().iter().all(|c| c.el() >= -1e-12));
    assert_eq!(sphere.pixels().len(), sphere.npix());
    assert_eq!(sphere.pixel_polygons().len(), sphere.npix());
}

#[test]
fn test_healpix_resolution() {
    // nside 1 pixels are ~58.6 degrees across.
    assert_eq!(HealpixSubSphere::nside_for_resolution(3600.0).unwrap(), 1);
    assert_eq!(HealpixSubSphere::nside_for_resolution(60.0).unwrap(), 64);
    assert!(HealpixSubSphere::resolution_arcmin(64) <= 60.0);
    assert!(HealpixSubSphere::resolution_arcmin(32) > 60.0);

    let sphere = HealpixSubSphere::from_resolution(120.0, 0.0, 0.0, 0.5).unwrap();
    assert_eq!(sphere.nside(), 32);

    // Resolutions beyond the finest nside are capped (with a warning).
    let nside = HealpixSubSphere::nside_for_resolution(1e-3).unwrap();
    assert_eq!(nside, MAX_NSIDE);
    assert!(HealpixSubSphere::resolution_arcmin(nside) > 1e-3);

    assert!(matches!(
        HealpixSubSphere::nside_for_resolution(0.0),
        Err(SphereError::BadResolution(_))
    ));
    assert!(matches!(
        HealpixSubSphere::new(0, 0.0, 0.0, 1.0),
        Err(SphereError::ZeroNside)
    ));
    assert!(matches!(
        HealpixSubSphere::new(1, 0.0, 0.0, 0.01),
        Err(SphereError::NoPixels { .. })
    ));
}

#[test]
fn test_set_pixels() {
    let mut sphere = HealpixSubSphere::new(2, 0.0, 0.0, FRAC_PI_2).unwrap();
    let n = sphere.npix();
    sphere.set_pixels(Array1::ones(n).view()).unwrap();
    assert_abs_diff_eq!(sphere.total_flux(), sphere.pixel_areas().sum());
    assert!(matches!(
        sphere.set_pixels(Array1::ones(n + 1).view()),
        Err(SphereError::WrongNumPixels { .. })
    ));

    let lmn = sphere.lmn();
    assert_eq!(lmn.dim(), (n, 3));
    for row in lmn.outer_iter() {
        assert_abs_diff_eq!(row.dot(&row), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_triangle_area() {
    let points = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
    assert_abs_diff_eq!(area(&[0, 1, 2], &points), 0.5);
    // Winding doesn't matter.
    assert_abs_diff_eq!(area(&[0, 2, 1], &points), 0.5);
}

fn small_mesh() -> AdaptiveMeshSphere {
    AdaptiveMeshSphere::from_resolution(20.0, 180.0, 20_f64.to_radians(), 0.0, 10_f64.to_radians())
        .unwrap()
}

#[test]
fn test_mesh_construction() {
    let sphere = small_mesh();
    // 10 degree hexagon edges need three subdivisions to get below 3
    // degrees, as boundary midpoints are pushed outwards.
    assert_eq!(sphere.npix(), 6 * 64);
    assert_eq!(sphere.pixel_coords().len(), sphere.npix());
    assert_eq!(sphere.pixel_areas().len(), sphere.npix());

    let radius = 10_f64.to_radians();
    for c in sphere.pixel_coords() {
        assert!(sphere.centre().distance(c) < radius);
    }
    // Boundary points are on the circle.
    let r_max = sphere
        .points()
        .iter()
        .map(|p| p[0].hypot(p[1]))
        .fold(0.0, f64::max);
    assert_abs_diff_eq!(r_max, radius, epsilon = 1e-12);

    // A 10 degree cap is ~0.0955 sr; the mesh is inscribed in it.
    let cap = 2.0 * PI * (1.0 - radius.cos());
    let total = sphere.pixel_areas().sum();
    assert!(total < cap);
    assert!(total > 0.95 * cap);

    assert_eq!(sphere.points_3d().len(), sphere.points().len());
}

#[test]
fn test_mesh_bad_resolutions() {
    assert!(matches!(
        AdaptiveMeshSphere::from_resolution(200.0, 100.0, 0.0, 0.0, 0.5),
        Err(SphereError::ResolutionOrder { .. })
    ));
    assert!(matches!(
        AdaptiveMeshSphere::from_resolution(-1.0, 100.0, 0.0, 0.0, 0.5),
        Err(SphereError::BadResolution(_))
    ));
    assert!(matches!(
        AdaptiveMeshSphere::from_resolution(10.0, 100.0, 0.0, 0.0, 0.0),
        Err(SphereError::BadRadius(_))
    ));
}

#[test]
fn test_mesh_refine_splits_structure() {
    let mut sphere = small_mesh();
    let n = sphere.npix();
    let area_before = sphere.pixel_areas().sum();

    // One bright cell; only it and its neighbours differ from their
    // neighbourhoods.
    let mut values = Array1::zeros(n);
    values[0] = 10.0;
    sphere.set_pixels(values.view()).unwrap();
    let flux_before = sphere.total_flux();

    let num_split = sphere.refine();
    assert!(num_split > 0);
    assert!(num_split < n);
    assert_eq!(sphere.npix(), n + 3 * num_split);
    assert_eq!(sphere.pixels().len(), sphere.npix());

    assert_abs_diff_eq!(sphere.pixel_areas().sum(), area_before, epsilon = 1e-4 * area_before);
    // Children inherit their parent's value.
    assert_abs_diff_eq!(sphere.total_flux(), flux_before, epsilon = 1e-3 * flux_before);
}

#[test]
fn test_mesh_refines_share_points() {
    let mut sphere =
        AdaptiveMeshSphere::from_resolution(10.0, 300.0, 0.0, 0.0, 30_f64.to_radians()).unwrap();
    for round in 0..3 {
        // A checkerboard-ish pattern so that neighbouring cells are split in
        // different rounds, leaving hanging midpoints behind.
        let values = Array1::from_iter((0..sphere.npix()).map(|i| ((i * 7 + round) % 5) as f64));
        sphere.set_pixels(values.view()).unwrap();
        assert!(sphere.refine() > 0);

        let mut points = sphere.points().to_vec();
        points.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
        for pair in points.windows(2) {
            let d = (pair[0][0] - pair[1][0]).hypot(pair[0][1] - pair[1][1]);
            assert!(d > 1e-12, "round {round}: coincident points at {:?}", pair[0]);
        }
        // Every point is used by some cell.
        let mut used = vec![false; sphere.points().len()];
        for cell in sphere.cells() {
            for &v in cell {
                used[v] = true;
            }
        }
        assert!(used.into_iter().all(|u| u));
    }
}

#[test]
fn test_mesh_refine_respects_min_resolution() {
    // Cells can't be split once their edges are near the minimum resolution.
    let mut sphere =
        AdaptiveMeshSphere::from_resolution(600.0, 600.0, 0.0, 0.0, 10_f64.to_radians()).unwrap();
    let n = sphere.npix();
    let mut values = Array1::zeros(n);
    values[0] = 1.0;
    sphere.set_pixels(values.view()).unwrap();
    assert_eq!(sphere.refine(), 0);
    assert_eq!(sphere.npix(), n);
}

#[test]
fn test_rasterise() {
    let mut sphere = HealpixSubSphere::new(8, 0.0, 0.0, FRAC_PI_2).unwrap();
    let values = Array1::from_iter((0..sphere.npix()).map(|i| i as f64));
    sphere.set_pixels(values.view()).unwrap();

    let raster = rasterise(&sphere, 180.0, 64);
    assert_eq!(raster.size(), 64);
    assert_abs_diff_eq!(raster.extent, 1.0, epsilon = 1e-12);
    // Corners are beyond the horizon.
    assert!(raster.data[(0, 0)].is_nan());
    assert!(raster.data[(63, 63)].is_nan());
    // The middle is near the zenith, which is in the first ring.
    assert!(raster.data[(32, 32)] < 4.0);
    let num_finite = raster.data.iter().filter(|v| v.is_finite()).count();
    // A circle fills ~π/4 of the square.
    assert!(num_finite > 3000 && num_finite < 3300);
}

#[test]
fn test_rasterise_mesh_off_zenith() {
    let mut sphere = small_mesh();
    sphere.set_pixels(Array1::ones(sphere.npix()).view()).unwrap();
    let raster = rasterise(&sphere, 30.0, 32);
    // Only the 10 degree disc is covered.
    let covered = raster.data.iter().filter(|v| v.is_finite()).count();
    assert!(covered > 0);
    assert!(covered < 32 * 32);
    assert!(raster.data.iter().filter(|v| v.is_finite()).all(|&v| v == 1.0));
}

#[test]
fn test_default_raster_size() {
    assert_eq!(Raster::default_size(1), 64);
    assert_eq!(Raster::default_size(10_000), 200);
    assert_eq!(Raster::default_size(100_000_000), 2048);
}
