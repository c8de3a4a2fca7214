// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::Array1;
use tempfile::TempDir;

use super::*;
use crate::{
    constants::FRAC_PI_2,
    tests::{get_cal_vis, snapshot_path},
};

fn solve_opts() -> SolveOptions {
    SolveOptions {
        alpha: 0.001,
        scale: false,
        cv: false,
        parallel: false,
    }
}

fn get_params(dir: &TempDir, sphere: SphereParams, method: SolverMethod) -> ImageParams {
    ImageParams {
        input: InputSource::File(snapshot_path()),
        show_sources: false,
        elevation_deg: 20.0,
        fov_deg: 180.0,
        sphere,
        method,
        solve_opts: solve_opts(),
        output: OutputParams {
            dir: dir.path().to_path_buf(),
            title: "test".to_string(),
            svg: false,
            png: false,
            pdf: false,
            display: false,
            uv: false,
            spectrum: false,
        },
    }
}

fn small_mesh(rounds: usize) -> SphereParams {
    SphereParams::Adaptive {
        res_arcmin: 600.0,
        res_arcmax: 1800.0,
        rounds,
    }
}

fn file_names(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
        .collect()
}

#[test]
fn test_normalise_by_area_preserves_flux() {
    let mut sky = small_mesh(1).make(FRAC_PI_2).unwrap();
    let sphere = sky.as_sphere_mut();
    let npix = sphere.npix();
    let values = Array1::linspace(1.0, 2.0, npix);
    sphere.set_pixels(values.view()).unwrap();
    let solved_sum = values.sum();

    normalise_by_area(sphere);
    assert_abs_diff_eq!(sphere.total_flux(), solved_sum, epsilon = 1e-10);
    let areas = sphere.pixel_areas().to_owned();
    assert_abs_diff_eq!(sphere.pixels()[0], 1.0 / areas[0], epsilon = 1e-10);
}

#[test]
fn test_sphere_params_make() {
    let radius = FRAC_PI_2;
    match (SphereParams::Healpix { nside: 4 }).make(radius).unwrap() {
        SkySphere::Healpix(s) => assert_eq!(s.nside(), 4),
        SkySphere::Mesh(_) => panic!("expected a HEALPix sphere"),
    }

    let expected = HealpixSubSphere::nside_for_resolution(300.0).unwrap();
    match (SphereParams::HealpixResolution { res_arcmin: 300.0 })
        .make(radius)
        .unwrap()
    {
        SkySphere::Healpix(s) => assert_eq!(s.nside(), expected),
        SkySphere::Mesh(_) => panic!("expected a HEALPix sphere"),
    }

    assert!(matches!(small_mesh(2).make(radius), Ok(SkySphere::Mesh(_))));
    assert_eq!(small_mesh(2).adaptive_rounds(), 2);
    assert_eq!((SphereParams::Healpix { nside: 4 }).adaptive_rounds(), 0);

    let result = (SphereParams::Adaptive {
        res_arcmin: 60.0,
        res_arcmax: 30.0,
        rounds: 1,
    })
    .make(radius);
    assert!(matches!(result, Err(SphereError::ResolutionOrder { .. })));
}

#[test]
fn test_default_solve_is_repeatable() {
    let vis = get_cal_vis();
    let disko = DiSkO::from_cal_vis(&vis).unwrap();
    let sphere_params = SphereParams::Healpix { nside: 4 };

    let mut first = sphere_params.make(FRAC_PI_2).unwrap();
    disko
        .solve(first.as_sphere_mut(), SolverMethod::Direct, &solve_opts())
        .unwrap();
    let mut second = sphere_params.make(FRAC_PI_2).unwrap();
    disko
        .solve(second.as_sphere_mut(), SolverMethod::Direct, &solve_opts())
        .unwrap();
    assert_eq!(first.as_sphere().pixels(), second.as_sphere().pixels());
}

#[test]
fn test_adaptive_tikhonov_run() {
    let dir = TempDir::new().unwrap();
    let params = get_params(&dir, small_mesh(2), SolverMethod::Tikhonov);
    let artifacts = params.run().unwrap();

    assert_eq!(artifacts.num_solves, 3);
    let names = file_names(&artifacts.files);
    assert_eq!(names.len(), 4);
    assert_eq!(names[0], "round_0.vtk");
    assert_eq!(names[1], "round_1.vtk");
    assert!(names[2].starts_with("test_") && names[2].ends_with(".fits"));
    assert!(names[3].starts_with("test_") && names[3].ends_with(".vtk"));
    for file in &artifacts.files {
        assert!(file.exists(), "{} wasn't written", file.display());
    }
    assert!(!dir.path().join("round_2.vtk").exists());
    assert_eq!(artifacts.summary.method, SolverMethod::Tikhonov);
    assert_eq!(artifacts.summary.alpha, Some(0.001));
}

#[test]
fn test_adaptive_without_tikhonov_solves_once() {
    let dir = TempDir::new().unwrap();
    let params = get_params(&dir, small_mesh(3), SolverMethod::Direct);
    let artifacts = params.run().unwrap();

    assert_eq!(artifacts.num_solves, 1);
    let names = file_names(&artifacts.files);
    assert_eq!(names.len(), 2);
    assert!(names[0].ends_with(".fits"));
    assert!(names[1].ends_with(".vtk"));
    assert!(!dir.path().join("round_0.vtk").exists());
}

#[test]
fn test_healpix_run_writes_only_fits() {
    let dir = TempDir::new().unwrap();
    let params = get_params(
        &dir,
        SphereParams::Healpix { nside: 4 },
        SolverMethod::Direct,
    );
    let artifacts = params.run().unwrap();

    assert_eq!(artifacts.num_solves, 1);
    assert_eq!(artifacts.files.len(), 1);
    assert_eq!(
        artifacts.files[0].extension().and_then(|e| e.to_str()),
        Some("fits")
    );
    assert_eq!(artifacts.summary.alpha, None);
}

#[test]
#[cfg(feature = "plotting")]
fn test_all_outputs_share_a_timestamp() {
    let dir = TempDir::new().unwrap();
    let mut params = get_params(&dir, small_mesh(1), SolverMethod::Tikhonov);
    params.show_sources = true;
    params.output.svg = true;
    params.output.png = true;
    params.output.pdf = true;

    let vis = get_cal_vis();
    let stamp = OutputFiles::new(dir.path(), "test", vis.timestamp)
        .stamp()
        .to_string();
    let artifacts = params.run().unwrap();

    // round_0.vtk, then FITS, VTK, SVG, PNG and PDF.
    let names = file_names(&artifacts.files);
    assert_eq!(names.len(), 6);
    for (name, ext) in names[1..].iter().zip(["fits", "vtk", "svg", "png", "pdf"]) {
        assert_eq!(name, &format!("test_{stamp}.{ext}"));
    }
}

#[test]
#[cfg(feature = "plotting")]
fn test_diagnostic_plots() {
    let dir = TempDir::new().unwrap();
    let mut params = get_params(
        &dir,
        SphereParams::Healpix { nside: 2 },
        SolverMethod::Direct,
    );
    params.output.uv = true;
    params.output.spectrum = true;

    let vis = get_cal_vis();
    let stamp = OutputFiles::new(dir.path(), "test", vis.timestamp)
        .stamp()
        .to_string();
    let artifacts = params.run().unwrap();
    let names = file_names(&artifacts.files);
    assert_eq!(
        names,
        vec![
            format!("test_{stamp}.fits"),
            format!("test_{stamp}_uv.svg"),
            format!("test_{stamp}_spectrum.svg"),
        ]
    );
    for file in &artifacts.files[1..] {
        assert!(std::fs::read_to_string(file).unwrap().contains("<svg"));
    }
}

#[test]
#[cfg(not(feature = "plotting"))]
fn test_diagnostic_plots_need_plotting() {
    let dir = TempDir::new().unwrap();
    let mut params = get_params(
        &dir,
        SphereParams::Healpix { nside: 2 },
        SolverMethod::Direct,
    );
    params.output.uv = true;
    assert!(matches!(
        params.run(),
        Err(ImageError::FileWrite(
            crate::io::write::FileWriteError::NoPlottingFeature
        ))
    ));
}

#[test]
fn test_read_inputs() {
    let data = InputSource::File(snapshot_path()).read(false, 20.0).unwrap();
    assert_eq!(data.vis.num_vis(), get_cal_vis().num_vis());

    let result = InputSource::Ms {
        path: PathBuf::from("/does/not/exist.ms"),
        nvis: 10,
        channel: 0,
        res_arcmin: None,
    }
    .read(false, 20.0);
    assert!(matches!(result, Err(ReadError::Ms(_))));
}

#[test]
fn test_unwritable_output_dir() {
    let dir = TempDir::new().unwrap();
    let not_a_dir = dir.path().join("file");
    std::fs::write(&not_a_dir, "").unwrap();

    let mut params = get_params(
        &dir,
        SphereParams::Healpix { nside: 2 },
        SolverMethod::Direct,
    );
    params.output.dir = not_a_dir;
    let result = params.run();
    assert!(matches!(result, Err(ImageError::FileWrite(_))));
}
