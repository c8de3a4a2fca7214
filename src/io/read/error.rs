// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading visibilities.

use std::path::PathBuf;

use thiserror::Error;

use super::ms::MsReadError;
use crate::{srclist::SourceListError, telescope::TelescopeError};

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Couldn't read {file}: {err}")]
    Io {
        file: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("Couldn't decode {what}: {err}")]
    Json {
        what: String,
        #[source]
        err: serde_json::Error,
    },

    #[error("The snapshot file {0} contains no visibilities")]
    EmptySnapshot(PathBuf),

    #[error("Couldn't set up an HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("Request to {url} failed: {err}")]
    Http {
        url: String,
        #[source]
        err: reqwest::Error,
    },

    #[error(transparent)]
    Telescope(#[from] TelescopeError),

    #[error(transparent)]
    SourceList(#[from] SourceListError),

    #[error(transparent)]
    Ms(#[from] MsReadError),
}
