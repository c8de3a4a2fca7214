// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters for an imaging run.
//!
//! The code here is kind of "mirroring" the code within the `cli` module; the
//! idea is that `cli` is unparsed, user-facing code, whereas parameters have
//! been parsed and are ready to be used directly.

mod error;
#[cfg(test)]
mod tests;

pub(crate) use error::ImageError;

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};

use crate::{
    disko::{
        solve::{SolveOptions, SolveSummary, SolverMethod},
        DiSkO,
    },
    io::{
        read::{read_api, read_ms, read_snapshot, ApiClient, InputData, ReadError},
        write::{
            can_write_to_dir,
            plot::{self, PlotOptions},
            write_fits, write_vtk, FitsMetadata, ImageOutputType, OutputFiles,
        },
    },
    sphere::{AdaptiveMeshSphere, HealpixSubSphere, Sphere, SphereError},
    srclist::SourceList,
    telescope::CalibratedVis,
    PROGRESS_BARS,
};

/// Where the visibilities come from. Only one source is used per run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InputSource {
    /// A JSON snapshot of the telescope API.
    File(PathBuf),

    Ms {
        path: PathBuf,
        nvis: usize,
        channel: usize,
        res_arcmin: Option<f64>,
    },

    /// The live telescope. The raw visibilities come from `vis` if it's set.
    Api {
        url: String,
        catalog: String,
        vis: Option<PathBuf>,
    },
}

impl InputSource {
    pub(crate) fn read(&self, show_sources: bool, elevation_deg: f64) -> Result<InputData, ReadError> {
        match self {
            InputSource::File(path) => {
                info!("Reading snapshot {}", path.display());
                read_snapshot(path)
            }

            InputSource::Ms {
                path,
                nvis,
                channel,
                res_arcmin,
            } => {
                info!("Reading measurement set {}", path.display());
                let vis = read_ms(path, *nvis, *channel, *res_arcmin)?;
                Ok(InputData { vis, sources: None })
            }

            InputSource::Api { url, catalog, vis } => {
                let client = ApiClient::new(url)?;
                read_api(&client, catalog, vis.as_deref(), show_sources, elevation_deg)
            }
        }
    }
}

/// How the sky is pixelised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SphereParams {
    Healpix {
        nside: u32,
    },

    /// HEALPix with the coarsest nside that is at least this fine.
    HealpixResolution {
        res_arcmin: f64,
    },

    Adaptive {
        res_arcmin: f64,
        res_arcmax: f64,

        /// The number of refine-and-solve rounds after the first solve.
        rounds: usize,
    },
}

impl SphereParams {
    /// Make a sphere centred on the zenith, extending `radius` radians from
    /// it.
    pub(crate) fn make(&self, radius: f64) -> Result<SkySphere, SphereError> {
        let sphere = match *self {
            SphereParams::Healpix { nside } => {
                SkySphere::Healpix(HealpixSubSphere::new(nside, 0.0, 0.0, radius)?)
            }

            SphereParams::HealpixResolution { res_arcmin } => SkySphere::Healpix(
                HealpixSubSphere::from_resolution(res_arcmin, 0.0f64.to_radians(), 0.0, radius)?,
            ),

            SphereParams::Adaptive {
                res_arcmin,
                res_arcmax,
                rounds: _,
            } => SkySphere::Mesh(AdaptiveMeshSphere::from_resolution(
                res_arcmin, res_arcmax, 0.0, 0.0, radius,
            )?),
        };
        info!("Sky: {}", sphere.as_sphere().description());
        Ok(sphere)
    }

    pub(crate) fn adaptive_rounds(&self) -> usize {
        match self {
            SphereParams::Adaptive { rounds, .. } => *rounds,
            _ => 0,
        }
    }
}

pub(crate) enum SkySphere {
    Healpix(HealpixSubSphere),
    Mesh(AdaptiveMeshSphere),
}

impl SkySphere {
    pub(crate) fn as_sphere(&self) -> &dyn Sphere {
        match self {
            SkySphere::Healpix(s) => s,
            SkySphere::Mesh(s) => s,
        }
    }

    pub(crate) fn as_sphere_mut(&mut self) -> &mut dyn Sphere {
        match self {
            SkySphere::Healpix(s) => s,
            SkySphere::Mesh(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OutputParams {
    pub(crate) dir: PathBuf,
    pub(crate) title: String,
    pub(crate) svg: bool,
    pub(crate) png: bool,
    pub(crate) pdf: bool,
    pub(crate) display: bool,

    /// Plot the uv coverage.
    pub(crate) uv: bool,

    /// Plot the singular values of the telescope operator.
    pub(crate) spectrum: bool,
}

#[derive(Debug)]
pub(crate) struct ImageParams {
    pub(crate) input: InputSource,

    /// Overlay catalogue sources on plots.
    pub(crate) show_sources: bool,

    /// Sources below this elevation aren't drawn \[degrees\].
    pub(crate) elevation_deg: f64,

    /// The full field of view \[degrees\].
    pub(crate) fov_deg: f64,

    pub(crate) sphere: SphereParams,
    pub(crate) method: SolverMethod,
    pub(crate) solve_opts: SolveOptions,
    pub(crate) output: OutputParams,
}

/// What a run produced.
#[derive(Debug)]
pub(crate) struct RunArtifacts {
    /// Every file written, in the order they were written.
    pub(crate) files: Vec<PathBuf>,

    pub(crate) num_solves: usize,

    /// The summary of the last solve.
    pub(crate) summary: SolveSummary,
}

impl ImageParams {
    pub(crate) fn run(&self) -> Result<RunArtifacts, ImageError> {
        let InputData { vis, sources } = self.input.read(self.show_sources, self.elevation_deg)?;
        self.image(&vis, sources.as_ref())
    }

    /// Solve for the sky seen by `vis` and write out all requested images.
    pub(crate) fn image(
        &self,
        vis: &CalibratedVis,
        sources: Option<&SourceList>,
    ) -> Result<RunArtifacts, ImageError> {
        let output_files = OutputFiles::new(&self.output.dir, &self.output.title, vis.timestamp);
        can_write_to_dir(output_files.dir())?;
        let mut files = vec![];

        let disko = DiSkO::from_cal_vis(vis)?;
        let mut sky = self.sphere.make((self.fov_deg / 2.0).to_radians())?;
        let mut summary = disko.solve(sky.as_sphere_mut(), self.method, &self.solve_opts)?;
        let mut num_solves = 1;

        if let SkySphere::Mesh(mesh) = &mut sky {
            let rounds = self.sphere.adaptive_rounds();
            if self.method == SolverMethod::Tikhonov {
                let pb = ProgressBar::with_draw_target(
                    Some(rounds as _),
                    if PROGRESS_BARS.load() {
                        ProgressDrawTarget::stdout()
                    } else {
                        ProgressDrawTarget::hidden()
                    },
                )
                .with_style(
                    ProgressStyle::default_bar()
                        .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} rounds ({elapsed_precise}<{eta_precise})").unwrap()
                        .progress_chars("=> "),
                )
                .with_position(0)
                .with_message("Refining the sky");

                for round in 0..rounds {
                    let file = output_files.round_vtk(round);
                    write_vtk(mesh, &file)?;
                    files.push(file);

                    mesh.refine();
                    summary = disko.solve(mesh, self.method, &self.solve_opts)?;
                    num_solves += 1;
                    normalise_by_area(mesh);
                    debug!("Round {round}: {}", mesh.description());
                    pb.inc(1);
                }
                pb.finish_and_clear();
            } else if rounds > 0 {
                debug!("Adaptive refinement only iterates with Tikhonov; solved once");
            }
        }

        let sphere = sky.as_sphere();
        let fits = output_files.image(ImageOutputType::Fits);
        write_fits(
            sphere,
            &FitsMetadata {
                fov_deg: self.fov_deg,
                method: self.method.to_string(),
                alpha: summary.alpha,
                timestamp: vis.timestamp,
                frequency_hz: vis.frequency_hz,
                location: vis.location,
                telescope: vis.telescope.clone(),
            },
            &fits,
        )?;
        files.push(fits);

        if let SkySphere::Mesh(mesh) = &sky {
            let file = output_files.image(ImageOutputType::Vtk);
            write_vtk(mesh, &file)?;
            files.push(file);
        }

        let plot_opts = PlotOptions {
            title: &self.output.title,
            sources: if self.show_sources { sources } else { None },
            elevation_deg: self.elevation_deg,
            show_grid: true,
        };
        if self.output.svg {
            let file = output_files.image(ImageOutputType::Svg);
            plot::write_svg(sphere, &plot_opts, &file)?;
            files.push(file);
        }
        if self.output.png {
            let file = output_files.image(ImageOutputType::Png);
            plot::write_png(sphere, &plot_opts, &file)?;
            files.push(file);
        }
        if self.output.pdf {
            let file = output_files.image(ImageOutputType::Pdf);
            plot::write_pdf(sphere, &plot_opts, &file)?;
            files.push(file);
        }
        if self.output.display {
            let file = plot::display(sphere, &plot_opts)?;
            debug!("Displayed {}", file.display());
        }
        if self.output.uv {
            let file = output_files.diagnostic("uv");
            plot::write_uv(disko.uvw(), &self.output.title, &file)?;
            files.push(file);
        }
        if self.output.spectrum {
            let file = output_files.diagnostic("spectrum");
            let spectrum = disko.singular_spectrum(sphere, self.solve_opts.parallel);
            plot::write_spectrum(&spectrum, &self.output.title, &file)?;
            files.push(file);
        }

        for file in &files {
            info!("Wrote {}", file.display());
        }
        Ok(RunArtifacts {
            files,
            num_solves,
            summary,
        })
    }
}

/// Turn each pixel's value into a brightness per steradian.
fn normalise_by_area(sphere: &mut dyn Sphere) {
    let areas = sphere.pixel_areas().to_owned();
    sphere
        .pixels_mut()
        .zip_mut_with(&areas, |pixel, &area| *pixel /= area);
}
