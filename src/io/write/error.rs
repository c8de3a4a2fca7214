// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileWriteError {
    #[error("Cannot write to the specified file '{file}'. Do you have write permissions set?")]
    FileNotWritable { file: String },

    #[error(
        "Couldn't create directory '{0}' for output files. Do you have write permissions set?"
    )]
    NewDirectory(PathBuf),

    #[error("cfitsio error when writing {file}: {err}")]
    Fitsio {
        file: PathBuf,
        #[source]
        err: fitsio::errors::Error,
    },

    #[cfg(not(feature = "plotting"))]
    #[error("disko was not compiled with the \"plotting\" feature.\nYou need to compile disko with this feature to write SVG, PNG or PDF files or to display images.")]
    NoPlottingFeature,

    #[cfg(feature = "plotting")]
    #[error(transparent)]
    Draw(#[from] super::plot::DrawError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
