// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to get calibrated visibilities from snapshot files, measurement sets
//! and the telescope API.

mod api;
mod error;
mod ms;
mod snapshot;
#[cfg(test)]
mod tests;

pub use api::{read_api, ApiClient};
pub use error::ReadError;
pub use ms::{read_ms, MsReadError};
pub use snapshot::read_snapshot;

use std::path::Path;

use log::trace;
use serde::de::DeserializeOwned;

use crate::{srclist::SourceList, telescope::CalibratedVis};

/// Everything an input source provides.
#[derive(Debug, Clone)]
pub struct InputData {
    pub vis: CalibratedVis,

    /// Catalogue sources to overlay on plots, if any were available.
    pub sources: Option<SourceList>,
}

pub(super) fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, ReadError> {
    trace!("Reading JSON from {}", path.display());
    let contents = std::fs::read_to_string(path).map_err(|err| ReadError::Io {
        file: path.to_path_buf(),
        err,
    })?;
    serde_json::from_str(&contents).map_err(|err| ReadError::Json {
        what: path.display().to_string(),
        err,
    })
}
