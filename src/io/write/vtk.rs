// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Legacy-format VTK files of adaptive meshes, with one scalar per cell.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::debug;

use super::FileWriteError;
use crate::sphere::{AdaptiveMeshSphere, Sphere};

/// The VTK cell type of a triangle.
const VTK_TRIANGLE: u8 = 5;

pub fn write_vtk(mesh: &AdaptiveMeshSphere, file: &Path) -> Result<(), FileWriteError> {
    debug!(
        "Writing a mesh with {} cells to {}",
        mesh.npix(),
        file.display()
    );
    let mut out = BufWriter::new(File::create(file)?);
    let points = mesh.points_3d();
    let cells = mesh.cells();

    writeln!(out, "# vtk DataFile Version 2.0")?;
    writeln!(out, "{}", mesh.description())?;
    writeln!(out, "ASCII")?;
    writeln!(out, "DATASET UNSTRUCTURED_GRID")?;
    writeln!(out, "POINTS {} double", points.len())?;
    for [x, y, z] in &points {
        writeln!(out, "{x} {y} {z}")?;
    }
    writeln!(out, "CELLS {} {}", cells.len(), cells.len() * 4)?;
    for [a, b, c] in cells {
        writeln!(out, "3 {a} {b} {c}")?;
    }
    writeln!(out, "CELL_TYPES {}", cells.len())?;
    for _ in cells {
        writeln!(out, "{VTK_TRIANGLE}")?;
    }
    writeln!(out, "CELL_DATA {}", cells.len())?;
    writeln!(out, "SCALARS pixels double 1")?;
    writeln!(out, "LOOKUP_TABLE default")?;
    for v in mesh.pixels() {
        writeln!(out, "{v}")?;
    }
    out.flush()?;
    Ok(())
}
