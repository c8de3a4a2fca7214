// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Discrete Sky Operator (DiSkO) imaging of radio-interferometer visibilities.

The `disko` binary is a thin layer over this library: [`cli`] turns the
command line into [`params`], which loads visibilities via [`io::read`], makes
a [`sphere`] pixelisation, solves for the sky with [`disko`] and writes the
results with [`io::write`].
 */

mod cli;
pub mod constants;
pub mod disko;
pub mod io;
pub(crate) mod params;
pub mod sphere;
pub mod srclist;
pub mod telescope;

#[cfg(test)]
mod tests;

// Re-exports.
pub use cli::{Disko, DiskoError};
pub use disko::{
    solve::{MatrixFreeMethod, SolveOptions, SolverMethod},
    DiSkO,
};
pub use sphere::{AdaptiveMeshSphere, HealpixSubSphere, SkyCoord, Sphere};
pub use srclist::SourceList;
pub use telescope::{CalibratedVis, TelescopeConfig};

use crossbeam_utils::atomic::AtomicCell;

lazy_static::lazy_static! {
    /// Are progress bars being drawn? This should only ever be enabled by CLI
    /// code.
    static ref PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
}
