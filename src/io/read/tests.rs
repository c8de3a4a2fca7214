// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    io::{BufRead, BufReader, Write},
    net::TcpListener,
    thread,
};

use approx::assert_abs_diff_eq;
use chrono::{TimeZone, Timelike, Utc};
use hifitime::{Duration as HifiDuration, Epoch, Unit};
use marlu::{
    c32,
    rubbl_casatables::{Table, TableOpenMode},
    Jones, LatLngHeight, MeasurementSetWriter, ObsContext as MarluObsContext, RADec, VisContext,
    VisWrite, XyzGeodetic, ENH,
};
use ndarray::prelude::*;
use num_complex::Complex64;
use serial_test::serial; // casacore isn't thread safe.
use tempfile::{tempdir, NamedTempFile};

use super::*;
use crate::{
    constants::VEL_C,
    tests::{read_snapshot_json, snapshot_path, test_file},
};

#[test]
fn test_read_snapshot() {
    let data = read_snapshot(&snapshot_path()).unwrap();
    assert_eq!(data.vis.num_vis(), 28);
    // Only the last set of visibilities is kept.
    assert_eq!(data.vis.timestamp.minute(), 43);
    assert_abs_diff_eq!(data.vis.frequency_hz, 1.57542e9);
    assert_eq!(data.vis.telescope.as_deref(), Some("Test Array"));

    let sources = data.sources.unwrap();
    assert_eq!(sources.len(), 3);
    let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["SAT B", "SAT C", "SAT D"]);
}

#[test]
fn test_read_snapshot_without_sources() {
    let mut json = read_snapshot_json();
    json["data"][1][1] = serde_json::Value::Null;
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{json}").unwrap();
    let data = read_snapshot(file.path()).unwrap();
    assert!(data.sources.is_none());
    assert_eq!(data.vis.num_vis(), 28);
}

#[test]
fn test_read_empty_snapshot() {
    let mut json = read_snapshot_json();
    json["data"] = serde_json::json!([]);
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{json}").unwrap();
    let result = read_snapshot(file.path());
    assert!(matches!(result, Err(ReadError::EmptySnapshot(_))));
}

#[test]
fn test_read_bad_snapshots() {
    let result = read_snapshot(&test_file("does_not_exist.json"));
    assert!(matches!(result, Err(ReadError::Io { .. })));

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{\"info\": 3}}").unwrap();
    let result = read_snapshot(file.path());
    assert!(matches!(result, Err(ReadError::Json { .. })));
}

#[test]
fn test_read_ms_bad_file() {
    let result = read_ms(&test_file("does_not_exist.ms"), 1000, 0, None);
    assert!(matches!(result, Err(MsReadError::BadFile(_))));
}

#[test]
fn test_stokes_i() {
    let v = array![
        c32::new(1.0, 2.0),
        c32::new(9.0, 9.0),
        c32::new(9.0, 9.0),
        c32::new(3.0, -2.0)
    ];
    assert_eq!(ms::stokes_i(v.view()), Some(Complex64::new(2.0, 0.0)));
    let v = array![c32::new(1.0, 1.0), c32::new(3.0, 1.0)];
    assert_eq!(ms::stokes_i(v.view()), Some(Complex64::new(2.0, 1.0)));
    let v = array![c32::new(1.0, 1.0), c32::new(3.0, 1.0), c32::new(0.0, 0.0)];
    assert_eq!(ms::stokes_i(v.view()), None);
}

#[test]
fn test_casacore_time() {
    // 2019-10-26T21:43:03Z
    let mjd_seconds = 58782.0 * 86400.0 + 21.0 * 3600.0 + 43.0 * 60.0 + 3.0;
    let t = ms::casacore_time_to_utc(mjd_seconds).unwrap();
    assert_abs_diff_eq!(t.timestamp() as f64, 1572126183.0, epsilon = 1.0);

    for bad in [f64::NAN, f64::INFINITY, 1e300] {
        assert!(matches!(
            ms::casacore_time_to_utc(bad),
            Err(MsReadError::BadTime(_))
        ));
    }
}

const MS_BASELINES: [(usize, usize); 6] = [(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)];
const MS_START_FREQ_HZ: f64 = 150e6;
const MS_FREQ_RES_HZ: f64 = 1e6;

/// The Stokes I value written for each timestep, channel and baseline of the
/// test measurement set.
fn ms_value(timestep: usize, chan: usize, (ant1, ant2): (usize, usize)) -> f32 {
    (100 * timestep + 10 * ant1 + ant2) as f32 + chan as f32 / 10.0
}

/// Write a measurement set with 3 antennas, 2 timesteps and 3 channels. Every
/// baseline (autos included) is written, and baseline (0, 2) is flagged on
/// channel 1 of the first timestep.
fn write_test_ms(path: &Path) {
    let start = Epoch::from_gregorian_utc_at_midnight(2021, 6, 1);
    let vis_ctx = VisContext {
        num_sel_timesteps: 2,
        start_timestamp: start,
        int_time: HifiDuration::from_f64(1.0, Unit::Second),
        num_sel_chans: 3,
        start_freq_hz: MS_START_FREQ_HZ,
        freq_resolution_hz: MS_FREQ_RES_HZ,
        sel_baselines: MS_BASELINES.to_vec(),
        avg_time: 1,
        avg_freq: 1,
        num_vis_pols: 4,
    };
    let shape = vis_ctx.sel_dims();
    let vis = Array3::from_shape_fn(shape, |(t, c, b)| {
        let v = ms_value(t, c, MS_BASELINES[b]);
        // XX and YY have opposite imaginary parts, so Stokes I is real.
        Jones::from([v, 1.0, 0.0, 0.0, 0.0, 0.0, v, -1.0])
    });
    let weights = Array3::from_shape_fn(shape, |(t, c, b)| {
        if t == 0 && c == 1 && MS_BASELINES[b] == (0, 2) {
            -1.0
        } else {
            1.0
        }
    });

    let phase_centre = RADec::from_degrees(0.0, -45.0);
    let array_pos = LatLngHeight::mwa();
    let ant_positions_enh = vec![
        ENH { e: 0.0, n: 0.0, h: 0.0 },
        ENH { e: 3.0, n: 0.0, h: 0.0 },
        ENH { e: 0.0, n: 4.0, h: 0.0 },
    ];
    let ant_positions_xyz: Vec<XyzGeodetic> = ant_positions_enh
        .iter()
        .map(|enh| enh.to_xyz(array_pos.latitude_rad))
        .collect();
    let obs_ctx = MarluObsContext {
        sched_start_timestamp: start,
        sched_duration: 3.0 * vis_ctx.int_time,
        name: Some("disko test".to_string()),
        field_name: None,
        project_id: None,
        observer: None,
        phase_centre,
        pointing_centre: Some(phase_centre),
        array_pos,
        ant_positions_enh,
        ant_names: vec!["ant0".into(), "ant1".into(), "ant2".into()],
    };

    let mut writer = MeasurementSetWriter::new(
        path,
        phase_centre,
        array_pos,
        ant_positions_xyz,
        HifiDuration::default(),
        false,
    );
    writer.initialize(&vis_ctx, &obs_ctx, None).unwrap();
    writer
        .write_vis(vis.view(), weights.view(), &vis_ctx)
        .unwrap();
}

#[test]
#[serial]
fn test_read_ms_skips_autos_and_flags() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.ms");
    write_test_ms(&path);

    let cal_vis = read_ms(&path, 1000, 1, None).unwrap();
    // 2 timesteps of 3 cross-correlations, less the flagged one.
    assert_eq!(cal_vis.num_vis(), 5);
    let expected = [
        ms_value(0, 1, (0, 1)),
        ms_value(0, 1, (1, 2)),
        ms_value(1, 1, (0, 1)),
        ms_value(1, 1, (0, 2)),
        ms_value(1, 1, (1, 2)),
    ];
    for (v, e) in cal_vis.vis.iter().zip(expected) {
        assert_abs_diff_eq!(v.re, e as f64, epsilon = 1e-5);
        assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-6);
    }
    assert_abs_diff_eq!(cal_vis.frequency_hz, MS_START_FREQ_HZ + MS_FREQ_RES_HZ);
    assert!(cal_vis.location.is_none());

    // The flag is only on channel 1.
    let cal_vis = read_ms(&path, 1000, 0, None).unwrap();
    assert_eq!(cal_vis.num_vis(), 6);
    assert_abs_diff_eq!(cal_vis.vis[1].re, ms_value(0, 0, (0, 2)) as f64, epsilon = 1e-5);
}

#[test]
#[serial]
fn test_read_ms_nvis_and_channel() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.ms");
    write_test_ms(&path);

    let cal_vis = read_ms(&path, 2, 2, None).unwrap();
    assert_eq!(cal_vis.num_vis(), 2);
    assert_abs_diff_eq!(cal_vis.vis[0].re, ms_value(0, 2, (0, 1)) as f64, epsilon = 1e-5);
    assert_abs_diff_eq!(cal_vis.vis[1].re, ms_value(0, 2, (0, 2)) as f64, epsilon = 1e-5);

    let result = read_ms(&path, 1000, 3, None);
    assert!(matches!(
        result,
        Err(MsReadError::ChannelOutOfRange {
            channel: 3,
            num_chans: 3
        })
    ));
}

#[test]
#[serial]
fn test_read_ms_uvw_and_time() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.ms");
    write_test_ms(&path);

    let channel = 1;
    let cal_vis = read_ms(&path, 1000, channel, Some(1.0)).unwrap();
    let wavelength = VEL_C / (MS_START_FREQ_HZ + MS_FREQ_RES_HZ);

    // Rows 1, 4, 7, 8 and 10 of the main table were used.
    let mut main_table = Table::open(&path, TableOpenMode::Read).unwrap();
    for (uvw, row) in cal_vis.uvw.outer_iter().zip([1, 4, 7, 8, 10]) {
        let uvw_metres: Vec<f64> = main_table.get_cell_as_vec("UVW", row).unwrap();
        for (&wavelengths, metres) in uvw.iter().zip(uvw_metres) {
            assert_abs_diff_eq!(wavelengths * wavelength, metres, epsilon = 1e-9);
        }
    }
    // The (0, 1) baseline is 3 m long.
    let (u, v, w) = (cal_vis.uvw[(0, 0)], cal_vis.uvw[(0, 1)], cal_vis.uvw[(0, 2)]);
    assert_abs_diff_eq!((u * u + v * v + w * w).sqrt(), 3.0 / wavelength, epsilon = 1e-6);

    // The first row is at the centroid of the first timestep.
    let expected = Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap();
    let diff = (cal_vis.timestamp - expected).num_milliseconds();
    assert!((0..=1500).contains(&diff), "{diff}");
    assert_eq!(cal_vis.timestamp.date_naive(), expected.date_naive());
}

/// Serve canned JSON for `num_requests` requests, with responses chosen by the
/// request path. Returns the base URL of the server.
fn serve(num_requests: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let snapshot = read_snapshot_json();
    let vis = std::fs::read_to_string(test_file("vis.json")).unwrap();

    thread::spawn(move || {
        for stream in listener.incoming().take(num_requests) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            // Drain the headers.
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.trim().is_empty() {
                    break;
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or("");
            let (status, body) = if path == "/api/v1/info" {
                ("200 OK", snapshot["info"].to_string())
            } else if path == "/api/v1/imaging/antenna_positions" {
                ("200 OK", snapshot["ant_pos"].to_string())
            } else if path == "/api/v1/calibration/gain" {
                ("200 OK", snapshot["gains"].to_string())
            } else if path == "/api/v1/imaging/vis" {
                ("200 OK", vis.clone())
            } else if path.starts_with("/catalog?") && path.contains("lat=-45.8514") {
                ("200 OK", snapshot["data"][0][1].to_string())
            } else {
                ("404 Not Found", "{}".to_string())
            };
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
        }
    });
    format!("http://{addr}")
}

fn test_client(url: &str) -> ApiClient {
    let client = reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .unwrap();
    ApiClient::with_client(url, client)
}

#[test]
fn test_read_api() {
    let url = serve(4);
    let client = test_client(&url);
    let data = read_api(&client, &format!("{url}/nowhere"), None, false, 20.0).unwrap();
    assert_eq!(data.vis.num_vis(), 28);
    assert!(data.sources.is_none());
    assert_eq!(data.vis.timestamp.minute(), 43);
}

#[test]
fn test_read_api_with_vis_file_and_sources() {
    // No request for visibilities; one for the catalogue.
    let url = serve(4);
    let client = test_client(&url);
    let data = read_api(&client, &url, Some(&test_file("vis.json")), true, 20.0).unwrap();
    assert_eq!(data.vis.num_vis(), 28);
    // SAT A is at 30 degrees elevation.
    assert_eq!(data.sources.unwrap().len(), 1);
}

#[test]
fn test_api_errors() {
    let url = serve(1);
    let client = test_client(&url);
    let result = client.catalog(
        &format!("{url}/elsewhere"),
        chrono::Utc::now(),
        &crate::telescope::Location {
            lon: 0.0,
            lat: 0.0,
            alt: 0.0,
        },
        0.0,
    );
    assert!(matches!(result, Err(ReadError::Http { .. })));
}
