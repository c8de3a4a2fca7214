// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A triangular mesh over a circular region of the sky, which can be refined
//! where the image has structure.
//!
//! Mesh points live on the azimuthal-equidistant tangent plane of the centre
//! of the region, in radians. Each triangle is one pixel.

use std::collections::HashMap;

use log::{debug, warn};
use ndarray::prelude::*;

use super::{Sphere, SkyCoord, SphereError};
use crate::constants::{PI, TAU};

/// The most uniform subdivisions that will be done when building a mesh.
const MAX_UNIFORM_SUBDIVISIONS: usize = 10;

/// The area of a triangle on the plane.
pub fn area(cell: &[usize; 3], points: &[[f64; 2]]) -> f64 {
    let [a, b, c] = cell.map(|i| points[i]);
    0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs()
}

fn edge_length(points: &[[f64; 2]], i: usize, j: usize) -> f64 {
    let (a, b) = (points[i], points[j]);
    (b[0] - a[0]).hypot(b[1] - a[1])
}

fn edge_key(i: usize, j: usize) -> (usize, usize) {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveMeshSphere {
    centre: SkyCoord,
    radius: f64,

    /// The finest allowed edge length \[radians\]
    res_min: f64,

    points: Vec<[f64; 2]>,
    cells: Vec<[usize; 3]>,

    /// Points made by [`AdaptiveMeshSphere::refine`], keyed by the edge they
    /// split. An edge of an unsplit cell may already have a midpoint.
    midpoints: HashMap<(usize, usize), usize>,

    coords: Vec<SkyCoord>,
    areas: Array1<f64>,
    pixels: Array1<f64>,
}

impl AdaptiveMeshSphere {
    /// Make a mesh covering everything within `radius` of `(theta, phi)`.
    /// The mesh is uniformly subdivided until no edge is longer than
    /// `res_arcmax`; [`AdaptiveMeshSphere::refine`] never makes edges shorter
    /// than `res_arcmin`. `theta`, `phi` and `radius` are in radians.
    pub fn from_resolution(
        res_arcmin: f64,
        res_arcmax: f64,
        theta: f64,
        phi: f64,
        radius: f64,
    ) -> Result<Self, SphereError> {
        for res in [res_arcmin, res_arcmax] {
            if !(res > 0.0 && res.is_finite()) {
                return Err(SphereError::BadResolution(res));
            }
        }
        if res_arcmin > res_arcmax {
            return Err(SphereError::ResolutionOrder {
                res_arcmin,
                res_arcmax,
            });
        }
        if !(radius > 0.0 && radius <= PI) {
            return Err(SphereError::BadRadius(radius.to_degrees()));
        }
        let res_min = (res_arcmin / 60.0).to_radians();
        let res_max = (res_arcmax / 60.0).to_radians();

        // Start with a hexagon fanned around the centre.
        let mut points = vec![[0.0, 0.0]];
        for k in 0..6 {
            let (s, c) = (k as f64 * TAU / 6.0).sin_cos();
            points.push([radius * s, radius * c]);
        }
        let mut cells: Vec<[usize; 3]> = (0..6).map(|k| [0, k + 1, (k + 1) % 6 + 1]).collect();

        let mut num_subdivisions = 0;
        while max_edge_length(&points, &cells) > res_max {
            if num_subdivisions == MAX_UNIFORM_SUBDIVISIONS {
                warn!(
                    "Stopped subdividing the mesh after {MAX_UNIFORM_SUBDIVISIONS} rounds ({} cells)",
                    cells.len()
                );
                break;
            }
            cells = subdivide_all(&mut points, &cells, radius);
            num_subdivisions += 1;
        }

        let mut sphere = AdaptiveMeshSphere {
            centre: SkyCoord::new(theta, phi),
            radius,
            res_min,
            points,
            cells,
            midpoints: HashMap::new(),
            coords: vec![],
            areas: Array1::zeros(0),
            pixels: Array1::zeros(0),
        };
        sphere.update_geometry();
        sphere.pixels = Array1::zeros(sphere.cells.len());
        debug!("{}", sphere.description());
        Ok(sphere)
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn cells(&self) -> &[[usize; 3]] {
        &self.cells
    }

    /// The direction cosines of all mesh points.
    pub fn points_3d(&self) -> Vec<[f64; 3]> {
        self.points
            .iter()
            .map(|&[x, y]| self.centre.offset(x, y).lmn())
            .collect()
    }

    /// Split the cells whose values differ most from those of their
    /// neighbours. Each split cell becomes four, each with the value of the
    /// parent. Returns the number of cells that were split.
    pub fn refine(&mut self) -> usize {
        let diffs = self.neighbour_differences();
        if diffs.is_empty() {
            return 0;
        }
        let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;

        let mut new_cells = Vec::with_capacity(self.cells.len());
        let mut new_pixels = Vec::with_capacity(self.cells.len());
        let mut num_split = 0;
        for ((&cell, &diff), &value) in self.cells.iter().zip(diffs.iter()).zip(self.pixels.iter())
        {
            let longest = cell_max_edge(&self.points, &cell);
            if diff > mean && longest / 2.0 >= self.res_min {
                for child in split_cell(&mut self.points, &mut self.midpoints, cell, None) {
                    new_cells.push(child);
                    new_pixels.push(value);
                }
                num_split += 1;
            } else {
                new_cells.push(cell);
                new_pixels.push(value);
            }
        }
        self.cells = new_cells;
        self.pixels = Array1::from(new_pixels);
        self.update_geometry();
        debug!("Refined {num_split} cells; now {}", self.description());
        num_split
    }

    /// For each cell, the biggest absolute difference between its value and
    /// that of any cell sharing a vertex with it.
    fn neighbour_differences(&self) -> Vec<f64> {
        let mut vertex_cells: Vec<Vec<usize>> = vec![vec![]; self.points.len()];
        for (i_cell, cell) in self.cells.iter().enumerate() {
            for &v in cell {
                vertex_cells[v].push(i_cell);
            }
        }
        self.cells
            .iter()
            .enumerate()
            .map(|(i_cell, cell)| {
                let value = self.pixels[i_cell];
                cell.iter()
                    .flat_map(|&v| vertex_cells[v].iter())
                    .filter(|&&j| j != i_cell)
                    .map(|&j| (self.pixels[j] - value).abs())
                    .fold(0.0, f64::max)
            })
            .collect()
    }

    /// Recompute pixel directions and solid angles from the mesh.
    fn update_geometry(&mut self) {
        self.coords = self
            .cells
            .iter()
            .map(|cell| {
                let [x, y] = centroid(&self.points, cell);
                self.centre.offset(x, y)
            })
            .collect();
        self.areas = self
            .cells
            .iter()
            .map(|cell| {
                // Correct for the areal distortion of the projection.
                let [x, y] = centroid(&self.points, cell);
                let rho = x.hypot(y);
                let distortion = if rho > 1e-12 { rho.sin() / rho } else { 1.0 };
                area(cell, &self.points) * distortion
            })
            .collect();
    }
}

fn centroid(points: &[[f64; 2]], cell: &[usize; 3]) -> [f64; 2] {
    let [a, b, c] = cell.map(|i| points[i]);
    [(a[0] + b[0] + c[0]) / 3.0, (a[1] + b[1] + c[1]) / 3.0]
}

fn cell_max_edge(points: &[[f64; 2]], &[a, b, c]: &[usize; 3]) -> f64 {
    edge_length(points, a, b)
        .max(edge_length(points, b, c))
        .max(edge_length(points, c, a))
}

fn max_edge_length(points: &[[f64; 2]], cells: &[[usize; 3]]) -> f64 {
    cells
        .iter()
        .map(|cell| cell_max_edge(points, cell))
        .fold(0.0, f64::max)
}

/// Split every cell into four. Midpoints of edges on the boundary of the mesh
/// are pushed out onto the circle of `radius`.
fn subdivide_all(points: &mut Vec<[f64; 2]>, cells: &[[usize; 3]], radius: f64) -> Vec<[usize; 3]> {
    let mut edge_counts: HashMap<(usize, usize), usize> = HashMap::new();
    for &[a, b, c] in cells {
        for key in [edge_key(a, b), edge_key(b, c), edge_key(c, a)] {
            *edge_counts.entry(key).or_default() += 1;
        }
    }

    let mut midpoints = HashMap::new();
    let mut new_cells = Vec::with_capacity(cells.len() * 4);
    for &cell in cells {
        new_cells.extend(split_cell(
            points,
            &mut midpoints,
            cell,
            Some((&edge_counts, radius)),
        ));
    }
    new_cells
}

/// Split a cell into four by joining its edge midpoints. Midpoints are shared
/// between cells through `midpoints`. If `boundary` is given, midpoints of
/// edges belonging to only one cell are projected onto the boundary circle.
fn split_cell(
    points: &mut Vec<[f64; 2]>,
    midpoints: &mut HashMap<(usize, usize), usize>,
    [a, b, c]: [usize; 3],
    boundary: Option<(&HashMap<(usize, usize), usize>, f64)>,
) -> [[usize; 3]; 4] {
    let mut midpoint = |i: usize, j: usize| -> usize {
        let key = edge_key(i, j);
        if let Some(&m) = midpoints.get(&key) {
            return m;
        }
        let (p, q) = (points[i], points[j]);
        let mut mid = [(p[0] + q[0]) / 2.0, (p[1] + q[1]) / 2.0];
        if let Some((edge_counts, radius)) = boundary {
            if edge_counts.get(&key) == Some(&1) {
                let r = mid[0].hypot(mid[1]);
                if r > 0.0 {
                    mid = [mid[0] * radius / r, mid[1] * radius / r];
                }
            }
        }
        points.push(mid);
        let m = points.len() - 1;
        midpoints.insert(key, m);
        m
    };
    let ab = midpoint(a, b);
    let bc = midpoint(b, c);
    let ca = midpoint(c, a);
    [[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]]
}

impl Sphere for AdaptiveMeshSphere {
    fn npix(&self) -> usize {
        self.cells.len()
    }

    fn centre(&self) -> SkyCoord {
        self.centre
    }

    fn radius(&self) -> f64 {
        self.radius
    }

    fn pixel_coords(&self) -> &[SkyCoord] {
        &self.coords
    }

    fn pixel_areas(&self) -> ArrayView1<f64> {
        self.areas.view()
    }

    fn pixels(&self) -> ArrayView1<f64> {
        self.pixels.view()
    }

    fn pixels_mut(&mut self) -> ArrayViewMut1<f64> {
        self.pixels.view_mut()
    }

    fn pixel_polygons(&self) -> Vec<Vec<SkyCoord>> {
        self.cells
            .iter()
            .map(|cell| {
                cell.iter()
                    .map(|&i| {
                        let [x, y] = self.points[i];
                        self.centre.offset(x, y)
                    })
                    .collect()
            })
            .collect()
    }

    fn description(&self) -> String {
        format!(
            "adaptive mesh ({} cells, {} points, edges {:.1} to {:.1} arcmin)",
            self.cells.len(),
            self.points.len(),
            min_edge_length(&self.points, &self.cells).to_degrees() * 60.0,
            max_edge_length(&self.points, &self.cells).to_degrees() * 60.0,
        )
    }
}

fn min_edge_length(points: &[[f64; 2]], cells: &[[usize; 3]]) -> f64 {
    cells
        .iter()
        .flat_map(|&[a, b, c]| {
            [
                edge_length(points, a, b),
                edge_length(points, b, c),
                edge_length(points, c, a),
            ]
        })
        .fold(f64::INFINITY, f64::min)
}
