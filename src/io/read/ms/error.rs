// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading CASA measurement sets.

use std::path::PathBuf;

use marlu::rubbl_casatables;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MsReadError {
    #[error("Supplied file path {0} does not exist or is not readable!")]
    BadFile(PathBuf),

    #[error("The main table of the measurement set contains no rows!")]
    MainTableEmpty,

    #[error("The SPECTRAL_WINDOW table contained no channel frequencies")]
    NoChannelFreqs,

    #[error("Channel {channel} was requested, but the measurement set only has {num_chans} channels")]
    ChannelOutOfRange { channel: usize, num_chans: usize },

    #[error("Main table row {row} has {got} polarisations; expected 1, 2 or 4")]
    BadNumPols { row: u64, got: usize },

    #[error("The TIME {0} in the main table isn't a valid casacore time")]
    BadTime(f64),

    #[error("There are no unflagged cross-correlation visibilities on channel {0}")]
    NoUnflaggedVis(usize),

    #[error("Error when trying to interface with measurement set: {0}")]
    Table(#[from] rubbl_casatables::TableError),

    #[error("Error from casacore: {0}")]
    Casacore(#[from] rubbl_casatables::CasacoreError),
}
