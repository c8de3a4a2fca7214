// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A client for the TART telescope API and its source catalogue.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

use super::{read_json_file, InputData, ReadError};
use crate::{
    srclist::SourceList,
    telescope::{calibrate, Gains, InfoResponse, Location, RawVis, TelescopeConfig, TelescopeInfo},
};

pub struct ApiClient {
    client: Client,
    api: String,
}

impl ApiClient {
    pub fn new(api: &str) -> Result<ApiClient, ReadError> {
        let client = Client::builder()
            .user_agent(concat!("disko/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ReadError::HttpClient)?;
        Ok(ApiClient::with_client(api, client))
    }

    pub fn with_client(api: &str, client: Client) -> ApiClient {
        ApiClient {
            client,
            api: api.trim_end_matches('/').to_string(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, ReadError> {
        debug!("GET {url} {query:?}");
        let http_err = |err| ReadError::Http {
            url: url.to_string(),
            err,
        };
        self.client
            .get(url)
            .query(query)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?
            .json()
            .map_err(http_err)
    }

    fn get_api<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ReadError> {
        self.get_json(&format!("{}/api/v1/{endpoint}", self.api), &[])
    }

    pub fn info(&self) -> Result<TelescopeInfo, ReadError> {
        let response: InfoResponse = self.get_api("info")?;
        Ok(response.info)
    }

    pub fn antenna_positions(&self) -> Result<Vec<[f64; 3]>, ReadError> {
        self.get_api("imaging/antenna_positions")
    }

    pub fn gains(&self) -> Result<Gains, ReadError> {
        self.get_api("calibration/gain")
    }

    pub fn vis(&self) -> Result<RawVis, ReadError> {
        self.get_api("imaging/vis")
    }

    /// Get the catalogue sources above `el_limit_deg` at `timestamp` as seen
    /// from `location`.
    pub fn catalog(
        &self,
        catalog_url: &str,
        timestamp: DateTime<Utc>,
        location: &Location,
        el_limit_deg: f64,
    ) -> Result<SourceList, ReadError> {
        let url = format!("{}/catalog", catalog_url.trim_end_matches('/'));
        let query = [
            (
                "date",
                timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
            ),
            ("lat", location.lat.to_string()),
            ("lon", location.lon.to_string()),
        ];
        let json: serde_json::Value = self.get_json(&url, &query)?;
        let sources = SourceList::from_json(json, el_limit_deg)?;
        info!("Got {} catalogue sources", sources.len());
        Ok(sources)
    }
}

/// Get calibrated visibilities from a live telescope. The raw visibilities come
/// from `vis_file` if it is given.
pub fn read_api(
    client: &ApiClient,
    catalog_url: &str,
    vis_file: Option<&Path>,
    show_sources: bool,
    el_limit_deg: f64,
) -> Result<InputData, ReadError> {
    info!("Getting telescope data from {}", client.api);
    let config = TelescopeConfig::new(client.info()?, client.antenna_positions()?)?;
    let gains = client.gains()?;
    let raw: RawVis = match vis_file {
        Some(f) => read_json_file(f)?,
        None => client.vis()?,
    };
    let vis = calibrate(&raw, &config, &gains, &[])?;

    let sources = if show_sources {
        match config.location.as_ref() {
            Some(location) => Some(client.catalog(catalog_url, vis.timestamp, location, el_limit_deg)?),
            None => {
                warn!("The telescope didn't report its location; not getting catalogue sources");
                None
            }
        }
    } else {
        None
    };
    Ok(InputData { vis, sources })
}
