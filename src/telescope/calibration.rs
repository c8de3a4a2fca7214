// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Applying antenna gains to raw visibilities.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use ndarray::prelude::*;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::{parse_timestamp, Location, TelescopeConfig, TelescopeError};

/// Per-antenna gain amplitudes and phase offsets \[radians\].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gains {
    pub gain: Vec<f64>,
    pub phase_offset: Vec<f64>,
}

/// A single uncalibrated visibility for the antenna pair `(i, j)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawVisSample {
    pub i: usize,
    pub j: usize,
    pub re: f64,
    pub im: f64,
}

/// The visibilities of one correlator dump, as served by `api/v1/imaging/vis`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawVis {
    pub timestamp: String,
    pub data: Vec<RawVisSample>,
}

/// Calibrated visibilities and the baselines they were measured on.
#[derive(Debug, Clone)]
pub struct CalibratedVis {
    /// The calibrated visibilities.
    pub vis: Array1<Complex64>,

    /// The baseline of each visibility in wavelengths. The shape is
    /// `(num_vis, 3)`.
    pub uvw: Array2<f64>,

    /// The observing frequency \[Hz\].
    pub frequency_hz: f64,

    /// When the visibilities were measured.
    pub timestamp: DateTime<Utc>,

    /// Where the array is, if known.
    pub location: Option<Location>,

    /// The name of the telescope, if known.
    pub telescope: Option<String>,
}

impl CalibratedVis {
    pub fn num_vis(&self) -> usize {
        self.vis.len()
    }

    /// The length of the longest baseline in wavelengths.
    pub fn max_baseline(&self) -> f64 {
        self.uvw
            .outer_iter()
            .map(|uvw| uvw.dot(&uvw).sqrt())
            .fold(0.0, f64::max)
    }
}

/// Apply `gains` to `raw` and attach baselines from `config`. Any baseline that
/// involves an antenna in `flag_list` is dropped.
pub fn calibrate(
    raw: &RawVis,
    config: &TelescopeConfig,
    gains: &Gains,
    flag_list: &[usize],
) -> Result<CalibratedVis, TelescopeError> {
    let num_ants = config.num_antennas();
    if gains.gain.len() != num_ants || gains.phase_offset.len() != num_ants {
        return Err(TelescopeError::GainsMismatch {
            num_ants,
            num_gains: gains.gain.len(),
            num_phases: gains.phase_offset.len(),
        });
    }
    let timestamp = parse_timestamp(&raw.timestamp)?;
    let flagged: HashSet<usize> = flag_list.iter().copied().collect();

    let mut vis = Vec::with_capacity(raw.data.len());
    let mut uvw = Vec::with_capacity(raw.data.len() * 3);
    for sample in &raw.data {
        let RawVisSample { i, j, re, im } = *sample;
        if flagged.contains(&i) || flagged.contains(&j) {
            trace!("Skipping flagged baseline ({i}, {j})");
            continue;
        }
        let bl = config.baseline_uvw(i, j)?;
        let g = gains.gain[i] * gains.gain[j];
        let phase = gains.phase_offset[i] - gains.phase_offset[j];
        vis.push(Complex64::new(re, im) * g * Complex64::from_polar(1.0, -phase));
        uvw.extend_from_slice(&bl);
    }
    if vis.is_empty() {
        return Err(TelescopeError::NoVisibilities);
    }
    debug!(
        "Calibrated {} of {} visibilities ({} flagged antennas)",
        vis.len(),
        raw.data.len(),
        flagged.len()
    );

    let num_vis = vis.len();
    Ok(CalibratedVis {
        vis: Array1::from(vis),
        // The length always matches the shape.
        uvw: Array2::from_shape_vec((num_vis, 3), uvw)
            .expect("three uvw components are pushed per visibility"),
        frequency_hz: config.frequency_hz,
        timestamp,
        location: config.location,
        telescope: Some(config.name.clone()),
    })
}
