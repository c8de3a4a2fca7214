// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Snapshot files: a JSON capture of everything the telescope API serves.

use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

use super::{read_json_file, InputData, ReadError};
use crate::{
    srclist::SourceList,
    telescope::{calibrate, Gains, InfoResponse, RawVis, TelescopeConfig},
};

#[derive(Debug, Deserialize)]
struct Snapshot {
    info: InfoResponse,
    ant_pos: Vec<[f64; 3]>,
    gains: Gains,

    /// Pairs of visibilities and the catalogue sources at the time.
    data: Vec<(RawVis, serde_json::Value)>,
}

/// Read a snapshot file. Every set of visibilities in the file is calibrated,
/// but only the last is kept.
pub fn read_snapshot(path: &Path) -> Result<InputData, ReadError> {
    let snapshot: Snapshot = read_json_file(path)?;
    let config = TelescopeConfig::new(snapshot.info.info, snapshot.ant_pos)?;

    let num_pairs = snapshot.data.len();
    if num_pairs > 1 {
        warn!("The snapshot has {num_pairs} sets of visibilities; only the last will be imaged");
    }
    let mut last = None;
    for (raw, sources) in &snapshot.data {
        let vis = calibrate(raw, &config, &snapshot.gains, &[])?;
        debug!("Snapshot visibilities at {}", vis.timestamp);
        last = Some((vis, sources));
    }
    let (vis, sources) = last.ok_or_else(|| ReadError::EmptySnapshot(path.to_path_buf()))?;

    let sources = match sources {
        serde_json::Value::Null => None,
        v => Some(SourceList::from_json(v.clone(), f64::NEG_INFINITY)?),
    };
    Ok(InputData { vis, sources })
}
