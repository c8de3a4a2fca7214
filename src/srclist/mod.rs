// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Catalogue sources, used to annotate images.


use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sphere::SkyCoord;

/// A known source (e.g. a GNSS satellite or the Sun) at a local elevation and
/// azimuth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSource {
    #[serde(default)]
    pub name: String,

    /// Elevation \[degrees\]
    pub el: f64,

    /// Azimuth \[degrees\]
    pub az: f64,

    /// Flux density \[Jy\]
    #[serde(default)]
    pub jy: f64,
}

impl CatalogSource {
    pub fn sky_coord(&self) -> SkyCoord {
        SkyCoord::from_el_az(self.el.to_radians(), self.az.to_radians())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceList(Vec<CatalogSource>);

impl SourceList {
    /// Parse a catalogue response, keeping only sources above
    /// `el_limit_deg`.
    pub fn from_json(json: serde_json::Value, el_limit_deg: f64) -> Result<Self, SourceListError> {
        let sources: Vec<CatalogSource> = serde_json::from_value(json)?;
        let num_catalogued = sources.len();
        let list = SourceList(
            sources
                .into_iter()
                .filter(|s| s.el > el_limit_deg)
                .collect(),
        );
        debug!(
            "Kept {} of {num_catalogued} catalogue sources above {el_limit_deg}°",
            list.len()
        );
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogSource> {
        self.0.iter()
    }

    /// The sources that should be drawn given a display cutoff.
    pub fn above_elevation(&self, el_limit_deg: f64) -> impl Iterator<Item = &CatalogSource> {
        self.0.iter().filter(move |s| s.el > el_limit_deg)
    }
}

impl From<Vec<CatalogSource>> for SourceList {
    fn from(v: Vec<CatalogSource>) -> Self {
        SourceList(v)
    }
}

#[derive(Error, Debug)]
pub enum SourceListError {
    #[error("Couldn't decode the source catalogue: {0}")]
    Json(#[from] serde_json::Error),
}
