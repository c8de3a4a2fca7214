// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to write out images of the sky.

mod error;
mod fits;
pub mod plot;
mod vtk;

pub use error::FileWriteError;
pub use fits::{write_fits, FitsMetadata};
pub use vtk::write_vtk;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::{trace, warn};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq)]
/// All image formats that can be written.
pub enum ImageOutputType {
    #[strum(serialize = "fits")]
    Fits,
    #[strum(serialize = "vtk")]
    Vtk,
    #[strum(serialize = "svg")]
    Svg,
    #[strum(serialize = "png")]
    Png,
    #[strum(serialize = "pdf")]
    Pdf,
}

lazy_static::lazy_static! {
    pub(crate) static ref IMAGE_OUTPUT_EXTENSIONS: String = ImageOutputType::iter().join(", ");
}

/// The names of every file written in a run. All of them share one timestamp
/// string.
#[derive(Debug, Clone)]
pub struct OutputFiles {
    dir: PathBuf,
    title: String,
    stamp: String,
}

impl OutputFiles {
    pub fn new(dir: &Path, title: &str, timestamp: DateTime<Utc>) -> OutputFiles {
        OutputFiles {
            dir: dir.to_path_buf(),
            title: title.to_string(),
            stamp: timestamp.format("%Y_%m_%d_%H_%M_%S_%Z").to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// `{dir}/{title}_{stamp}.{ext}`
    pub fn image(&self, output_type: ImageOutputType) -> PathBuf {
        self.dir
            .join(format!("{}_{}.{output_type}", self.title, self.stamp))
    }

    /// `{dir}/{title}_{stamp}_{name}.svg`, for plots that aren't of the sky.
    pub fn diagnostic(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}_{name}.svg", self.title, self.stamp))
    }

    /// The mesh snapshot written before adaptive refinement round `round`.
    pub fn round_vtk(&self, round: usize) -> PathBuf {
        self.dir.join(format!("round_{round}.vtk"))
    }
}

/// Create `dir` if it doesn't exist, and check that files can be written in
/// it.
pub fn can_write_to_dir(dir: &Path) -> Result<(), FileWriteError> {
    trace!("Testing whether we can write to {}", dir.display());

    if !dir.exists() {
        match std::fs::DirBuilder::new()
            .recursive(true)
            .create(dir)
            .map_err(|e| e.kind())
        {
            Ok(()) => (),
            Err(std::io::ErrorKind::PermissionDenied) => {
                return Err(FileWriteError::NewDirectory(dir.to_path_buf()))
            }
            Err(e) => return Err(FileWriteError::IO(e.into())),
        }
    }

    let metadata = std::fs::metadata(dir)?;
    if !metadata.is_dir() || metadata.permissions().readonly() {
        return Err(FileWriteError::FileNotWritable {
            file: dir.display().to_string(),
        });
    }
    Ok(())
}

/// Remove `file` if it exists; cfitsio won't overwrite files.
fn remove_existing(file: &Path) -> Result<(), FileWriteError> {
    if file.exists() {
        warn!("Will overwrite the existing file '{}'", file.display());
        std::fs::remove_file(file)?;
    }
    Ok(())
}
