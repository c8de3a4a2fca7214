// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Telescope metadata and visibility calibration.
//!
//! The JSON layouts here are those served by the TART telescope API; snapshot
//! files embed exactly the same structures.

mod calibration;
mod error;

pub use calibration::{calibrate, CalibratedVis, Gains, RawVis, RawVisSample};
pub use error::TelescopeError;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants::VEL_C;

/// The Earth location of an array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Longitude \[degrees\]
    pub lon: f64,
    /// Latitude \[degrees\]
    pub lat: f64,
    /// Altitude \[metres\]
    #[serde(default)]
    pub alt: f64,
}

/// The telescope description served by `api/v1/info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelescopeInfo {
    #[serde(default)]
    pub name: String,

    /// The frequency the telescope observes at \[Hz\].
    #[serde(default)]
    pub operating_frequency: Option<f64>,

    /// The local-oscillator frequency; used when `operating_frequency` is
    /// missing \[Hz\].
    #[serde(rename = "L0_frequency", default)]
    pub l0_frequency: Option<f64>,

    #[serde(default)]
    pub num_antenna: Option<usize>,

    #[serde(default)]
    pub location: Option<Location>,
}

/// `api/v1/info` wraps the telescope description in an "info" object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub info: TelescopeInfo,
}

/// Antenna-array metadata needed to turn antenna pairs into baselines.
#[derive(Debug, Clone)]
pub struct TelescopeConfig {
    pub name: String,

    /// The observing frequency \[Hz\].
    pub frequency_hz: f64,

    /// East, north, up antenna positions \[metres\].
    pub ant_pos: Vec<[f64; 3]>,

    pub location: Option<Location>,
}

impl TelescopeConfig {
    pub fn new(info: TelescopeInfo, ant_pos: Vec<[f64; 3]>) -> Result<Self, TelescopeError> {
        if ant_pos.is_empty() {
            return Err(TelescopeError::NoAntennas);
        }
        let frequency_hz = info
            .operating_frequency
            .or(info.l0_frequency)
            .ok_or(TelescopeError::NoFrequency)?;
        if frequency_hz <= 0.0 || !frequency_hz.is_finite() {
            return Err(TelescopeError::BadFrequency(frequency_hz));
        }
        if let Some(n) = info.num_antenna {
            if n != ant_pos.len() {
                warn!(
                    "Telescope info says there are {n} antennas, but {} positions were supplied",
                    ant_pos.len()
                );
            }
        }
        debug!(
            "Telescope '{}': {} antennas at {} Hz",
            info.name,
            ant_pos.len(),
            frequency_hz
        );

        Ok(TelescopeConfig {
            name: info.name,
            frequency_hz,
            ant_pos,
            location: info.location,
        })
    }

    pub fn num_antennas(&self) -> usize {
        self.ant_pos.len()
    }

    /// The observing wavelength \[metres\].
    pub fn wavelength(&self) -> f64 {
        VEL_C / self.frequency_hz
    }

    /// The baseline between antennas `i` and `j` in wavelengths.
    pub fn baseline_uvw(&self, i: usize, j: usize) -> Result<[f64; 3], TelescopeError> {
        let num_ants = self.num_antennas();
        let (pi, pj) = match (self.ant_pos.get(i), self.ant_pos.get(j)) {
            (Some(pi), Some(pj)) => (pi, pj),
            _ => return Err(TelescopeError::AntennaOutOfRange { i, j, num_ants }),
        };
        let lambda = self.wavelength();
        Ok([
            (pi[0] - pj[0]) / lambda,
            (pi[1] - pj[1]) / lambda,
            (pi[2] - pj[2]) / lambda,
        ])
    }
}

/// Parse a TART timestamp. These are ISO 8601, sometimes without a time zone,
/// in which case they are UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TelescopeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(TelescopeError::BadTimestamp(s.to_string()))
}
