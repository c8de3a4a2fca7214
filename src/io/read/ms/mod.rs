// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read visibilities from CASA measurement sets.
//!
//! More info: https://casa.nrao.edu/Memos/229.html#SECTION00060000000000000000

mod error;

pub use error::MsReadError;

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use hifitime::Epoch;
use log::{debug, info, trace, warn};
use marlu::{c32, rubbl_casatables};
use ndarray::prelude::*;
use num_complex::Complex64;
use rubbl_casatables::{Table, TableOpenMode};

use crate::{constants::VEL_C, telescope::CalibratedVis};

/// Open a measurement set table read only. If `table` is `None`, then open the
/// base table.
fn read_table(ms: &Path, table: Option<&str>) -> Result<Table, MsReadError> {
    let t = Table::open(
        format!("{}/{}", ms.display(), table.unwrap_or("")),
        TableOpenMode::Read,
    )?;
    Ok(t)
}

/// casacore stores times as UTC seconds since MJD 0.
pub(super) fn casacore_time_to_utc(time: f64) -> Result<DateTime<Utc>, MsReadError> {
    // Anything beyond a few thousand years of MJD 0 isn't a real observation.
    if !(time.is_finite() && time.abs() < 1e11) {
        return Err(MsReadError::BadTime(time));
    }
    let e = Epoch::from_utc_seconds(time - hifitime::J1900_OFFSET * hifitime::SECONDS_PER_DAY);
    let unix = e.to_unix_seconds();
    let secs = unix.floor();
    let nanos = ((unix - secs) * 1e9).round() as u32;
    Utc.timestamp_opt(secs as i64, nanos.min(999_999_999))
        .single()
        .ok_or(MsReadError::BadTime(time))
}

/// Collapse the polarisations of a visibility into Stokes I.
pub(super) fn stokes_i(pols: ArrayView1<c32>) -> Option<Complex64> {
    let c = |v: c32| Complex64::new(v.re.into(), v.im.into());
    match pols.len() {
        // XX XY YX YY
        4 => Some((c(pols[0]) + c(pols[3])) / 2.0),
        2 => Some((c(pols[0]) + c(pols[1])) / 2.0),
        1 => Some(c(pols[0])),
        _ => None,
    }
}

/// Read at most `nvis` unflagged cross-correlation visibilities on `channel`
/// of the measurement set `ms`. If `res_arcmin` is given, a warning is issued
/// when it is finer than the longest baseline can resolve.
pub fn read_ms(
    ms: &Path,
    nvis: usize,
    channel: usize,
    res_arcmin: Option<f64>,
) -> Result<CalibratedVis, MsReadError> {
    debug!("Using measurement set: {}", ms.display());
    if !ms.exists() {
        return Err(MsReadError::BadFile(ms.to_path_buf()));
    }

    let mut spectral_window_table = read_table(ms, Some("SPECTRAL_WINDOW"))?;
    let chan_freqs: Vec<f64> = spectral_window_table.get_cell_as_vec("CHAN_FREQ", 0)?;
    if chan_freqs.is_empty() {
        return Err(MsReadError::NoChannelFreqs);
    }
    let frequency_hz = *chan_freqs
        .get(channel)
        .ok_or(MsReadError::ChannelOutOfRange {
            channel,
            num_chans: chan_freqs.len(),
        })?;
    let wavelength = VEL_C / frequency_hz;
    debug!("Channel {channel} is at {frequency_hz} Hz");

    let telescope = match read_table(ms, Some("OBSERVATION")) {
        Ok(mut t) => t.get_cell::<String>("TELESCOPE_NAME", 0).ok(),
        Err(_) => None,
    };

    let mut main_table = read_table(ms, None)?;
    let num_rows = main_table.n_rows();
    if num_rows == 0 {
        return Err(MsReadError::MainTableEmpty);
    }
    let antenna1: Vec<i32> = main_table.get_col_as_vec("ANTENNA1")?;
    let antenna2: Vec<i32> = main_table.get_col_as_vec("ANTENNA2")?;

    let mut vis = Vec::with_capacity(nvis);
    let mut uvw = Vec::with_capacity(nvis * 3);
    let mut first_time = None;
    for row in 0..num_rows {
        if vis.len() >= nvis {
            break;
        }
        if antenna1[row as usize] == antenna2[row as usize] {
            continue;
        }

        // The data and flag arrays are arranged [frequency][instrumental_pol].
        let flags: Array2<bool> = main_table.get_cell("FLAG", row)?;
        if channel >= flags.len_of(Axis(0)) {
            return Err(MsReadError::ChannelOutOfRange {
                channel,
                num_chans: flags.len_of(Axis(0)),
            });
        }
        if flags.row(channel).iter().any(|&f| f) {
            trace!("Row {row} is flagged on channel {channel}");
            continue;
        }
        let data: Array2<c32> = main_table.get_cell("DATA", row)?;
        let v = stokes_i(data.row(channel)).ok_or(MsReadError::BadNumPols {
            row,
            got: data.len_of(Axis(1)),
        })?;
        let row_uvw: Vec<f64> = main_table.get_cell_as_vec("UVW", row)?;

        if first_time.is_none() {
            first_time = Some(main_table.get_cell::<f64>("TIME", row)?);
        }
        vis.push(v);
        uvw.extend(row_uvw.iter().take(3).map(|c| c / wavelength));
    }
    let Some(first_time) = first_time else {
        return Err(MsReadError::NoUnflaggedVis(channel));
    };
    let num_vis = vis.len();
    info!("Read {num_vis} visibilities from {}", ms.display());

    let timestamp = casacore_time_to_utc(first_time)?;
    let cal_vis = CalibratedVis {
        vis: Array1::from(vis),
        uvw: Array2::from_shape_vec((num_vis, 3), uvw)
            .expect("three uvw components are pushed per visibility"),
        frequency_hz,
        timestamp,
        location: None,
        telescope,
    };

    if let Some(res_arcmin) = res_arcmin {
        let max_baseline = cal_vis.max_baseline();
        if max_baseline > 0.0 {
            let supported_arcmin = (1.0 / max_baseline).to_degrees() * 60.0;
            if res_arcmin < supported_arcmin {
                warn!(
                    "The requested resolution ({res_arcmin} arcmin) is finer than the longest baseline supports ({supported_arcmin:.2} arcmin)"
                );
            }
        }
    }
    Ok(cal_vis)
}
