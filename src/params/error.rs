// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::{
    disko::solve::SolveError,
    io::{read::ReadError, write::FileWriteError},
    sphere::SphereError,
};

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Sphere(#[from] SphereError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error(transparent)]
    FileWrite(#[from] FileWriteError),
}
