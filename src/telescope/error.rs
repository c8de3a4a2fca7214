// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelescopeError {
    #[error("No antenna positions were supplied")]
    NoAntennas,

    #[error("The telescope info has neither an 'operating_frequency' nor an 'L0_frequency'")]
    NoFrequency,

    #[error("The telescope frequency ({0} Hz) is not a positive number")]
    BadFrequency(f64),

    #[error("Visibility for antennas ({i}, {j}) refers to an antenna that doesn't exist; there are {num_ants} antennas")]
    AntennaOutOfRange { i: usize, j: usize, num_ants: usize },

    #[error("There are {num_ants} antenna positions, but {num_gains} gains and {num_phases} phase offsets")]
    GainsMismatch {
        num_ants: usize,
        num_gains: usize,
        num_phases: usize,
    },

    #[error("Every visibility was flagged; there is nothing to image")]
    NoVisibilities,

    #[error("Couldn't parse '{0}' as an ISO 8601 timestamp")]
    BadTimestamp(String),
}
