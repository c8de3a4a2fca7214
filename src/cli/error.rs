// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all disko-related errors. This should be the *only* error
//! enum that is publicly visible.

use thiserror::Error;

use super::image::ImageArgsError;
use crate::{
    disko::solve::SolveError,
    io::{
        read::{MsReadError, ReadError},
        write::FileWriteError,
    },
    params::ImageError,
    sphere::SphereError,
};

const URL: &str = "https://github.com/tmolteno/disko";

/// The *only* publicly visible error from disko. Variants group errors by what
/// they concern.
#[derive(Error, Debug)]
pub enum DiskoError {
    /// An error related to getting visibilities.
    #[error("{0}")]
    Input(String),

    /// An error related to pixelising the sky.
    #[error("{0}")]
    Sphere(String),

    /// An error related to solving for the sky.
    #[error("{0}")]
    Solve(String),

    /// An error related to writing images.
    #[error("{0}")]
    Output(String),

    /// An error related to argument files.
    #[error("{0}\n\nSee for more info: {URL}#argument-files")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<ImageArgsError> for DiskoError {
    fn from(e: ImageArgsError) -> Self {
        let s = e.to_string();
        match e {
            ImageArgsError::NvisZero => Self::Input(s),
            ImageArgsError::NoResolution
            | ImageArgsError::AdaptiveNeedsResolution
            | ImageArgsError::BadFov(_) => Self::Sphere(s),
            ImageArgsError::BadAlpha(_) => Self::Solve(s),
        }
    }
}

impl From<ImageError> for DiskoError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::Read(e) => Self::from(e),
            ImageError::Sphere(e) => Self::from(e),
            ImageError::Solve(e) => Self::from(e),
            ImageError::FileWrite(e) => Self::from(e),
        }
    }
}

impl From<ReadError> for DiskoError {
    fn from(e: ReadError) -> Self {
        let s = e.to_string();
        match e {
            ReadError::Ms(e) => Self::from(e),
            ReadError::Io { .. }
            | ReadError::Json { .. }
            | ReadError::EmptySnapshot(_)
            | ReadError::HttpClient(_)
            | ReadError::Http { .. }
            | ReadError::Telescope(_)
            | ReadError::SourceList(_) => Self::Input(s),
        }
    }
}

impl From<MsReadError> for DiskoError {
    fn from(e: MsReadError) -> Self {
        Self::Input(e.to_string())
    }
}

impl From<SphereError> for DiskoError {
    fn from(e: SphereError) -> Self {
        Self::Sphere(e.to_string())
    }
}

impl From<SolveError> for DiskoError {
    fn from(e: SolveError) -> Self {
        let s = e.to_string();
        match e {
            SolveError::Sphere(e) => Self::from(e),
            SolveError::NoVisibilities => Self::Input(s),
            SolveError::NoPixels
            | SolveError::BadAlpha(_)
            | SolveError::Svd(_)
            | SolveError::NotPositiveDefinite { .. }
            | SolveError::TooFewVisibilitiesForCv { .. } => Self::Solve(s),
        }
    }
}

impl From<FileWriteError> for DiskoError {
    fn from(e: FileWriteError) -> Self {
        let s = e.to_string();
        match e {
            FileWriteError::IO(e) => Self::from(e),
            _ => Self::Output(s),
        }
    }
}

impl From<std::io::Error> for DiskoError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
