// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests.

use std::path::PathBuf;

use crate::{io::read::read_snapshot, telescope::CalibratedVis};

pub(crate) fn test_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_files")
        .join(name)
}

/// The snapshot has 8 antennas and two sets of visibilities.
pub(crate) fn snapshot_path() -> PathBuf {
    test_file("snapshot.json")
}

pub(crate) fn read_snapshot_json() -> serde_json::Value {
    let contents = std::fs::read_to_string(snapshot_path()).unwrap();
    serde_json::from_str(&contents).unwrap()
}

/// The calibrated visibilities of the last snapshot in the test file.
pub(crate) fn get_cal_vis() -> CalibratedVis {
    read_snapshot(&snapshot_path()).unwrap().vis
}
