// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments for making an image of the sky.


use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::{
    common::{display_warnings, InfoPrinter, Warn, ARG_FILE_HELP},
    DiskoError, LogContext,
};
use crate::{
    constants::*,
    disko::solve::{SolveOptions, SolverMethod},
    io::write::IMAGE_OUTPUT_EXTENSIONS,
    params::{ImageParams, InputSource, OutputParams, SphereParams},
};

lazy_static::lazy_static! {
    static ref API_HELP: String =
        format!("The URL of the telescope API, used when no file or measurement set is given. Default: {DEFAULT_API_URL}");

    static ref CATALOG_HELP: String =
        format!("The URL of the source catalogue API. Default: {DEFAULT_CATALOG_URL}");

    static ref NVIS_HELP: String =
        format!("The maximum number of visibilities to read from a measurement set. Default: {DEFAULT_NVIS}");

    static ref FOV_HELP: String =
        format!("The full field of view of the image [degrees]. Default: {DEFAULT_FOV_DEG}");

    static ref ALPHA_HELP: String =
        format!("The regularisation strength. Default: {DEFAULT_ALPHA}");

    static ref DIR_HELP: String =
        format!("The directory to write images into. A FITS image is always written. Supported formats: {}. Default: {DEFAULT_OUTPUT_DIR}", *IMAGE_OUTPUT_EXTENSIONS);

    static ref TITLE_HELP: String =
        format!("The prefix of output file names, and the title of plots. Default: {DEFAULT_TITLE}");

    static ref ELEVATION_HELP: String =
        format!("Catalogue sources below this elevation aren't drawn [degrees]. Default: {DEFAULT_ELEVATION_DEG}");
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct ImageArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(long, help = API_HELP.as_str(), help_heading = "INPUT")]
    pub(super) api: Option<String>,

    #[clap(long, help = CATALOG_HELP.as_str(), help_heading = "INPUT")]
    pub(super) catalog: Option<String>,

    /// A JSON snapshot of the telescope API to image. Takes priority over all
    /// other inputs.
    #[clap(long, parse(from_os_str), help_heading = "INPUT")]
    pub(super) file: Option<PathBuf>,

    /// A measurement set to image. Takes priority over the API.
    #[clap(long, parse(from_os_str), help_heading = "INPUT")]
    pub(super) ms: Option<PathBuf>,

    /// Use the raw visibilities in this JSON file instead of getting them from
    /// the API. The rest of the telescope's data still come from the API.
    #[clap(long, parse(from_os_str), help_heading = "INPUT")]
    pub(super) vis: Option<PathBuf>,

    #[clap(long, help = NVIS_HELP.as_str(), help_heading = "INPUT")]
    pub(super) nvis: Option<usize>,

    /// The measurement set channel to image. Default: 0
    #[clap(long, help_heading = "INPUT")]
    pub(super) channel: Option<usize>,

    /// Use a HEALPix sphere with this nside. Overrides --arcmin.
    #[clap(long, help_heading = "SKY")]
    pub(super) nside: Option<u32>,

    /// The finest pixel size [arcminutes]. Picks the HEALPix nside if --nside
    /// isn't given, and limits adaptive refinement.
    #[clap(long, help_heading = "SKY")]
    pub(super) arcmin: Option<f64>,

    /// The coarsest pixel size of an adaptive mesh [arcminutes].
    #[clap(long, help_heading = "SKY")]
    pub(super) arcmax: Option<f64>,

    #[clap(long, help = FOV_HELP.as_str(), help_heading = "SKY")]
    pub(super) fov: Option<f64>,

    /// Image onto an adaptive mesh, refining it this many times. Refinement
    /// needs --tikhonov; other solvers solve once. Default: 0
    #[clap(long, help_heading = "SKY")]
    pub(super) adaptive: Option<usize>,

    #[clap(long, help = ALPHA_HELP.as_str(), help_heading = "SOLVER")]
    pub(super) alpha: Option<f64>,

    /// Solve with non-negative L1 regularisation. Takes priority over other
    /// solvers.
    #[clap(long, help_heading = "SOLVER")]
    #[serde(default)]
    pub(super) lasso: bool,

    /// Solve without forming the telescope operator.
    #[clap(long, help_heading = "SOLVER")]
    #[serde(default)]
    pub(super) matrix_free: bool,

    /// Solve with L2 regularisation.
    #[clap(long, help_heading = "SOLVER")]
    #[serde(default)]
    pub(super) tikhonov: bool,

    /// Use LSQR for matrix-free solves. This is the default.
    #[clap(long, help_heading = "SOLVER")]
    #[serde(default)]
    pub(super) lsqr: bool,

    /// Use LSMR for matrix-free solves.
    #[clap(long, help_heading = "SOLVER")]
    #[serde(default)]
    pub(super) lsmr: bool,

    /// Use FISTA for matrix-free solves.
    #[clap(long, help_heading = "SOLVER")]
    #[serde(default)]
    pub(super) fista: bool,

    /// Choose alpha by cross-validation (lasso and tikhonov only).
    #[clap(long, help_heading = "SOLVER")]
    #[serde(default)]
    pub(super) cv: bool,

    /// Build and apply the telescope operator in parallel.
    #[clap(long, help_heading = "SOLVER")]
    #[serde(default)]
    pub(super) dask: bool,

    #[clap(long, parse(from_os_str), help = DIR_HELP.as_str(), help_heading = "OUTPUT")]
    pub(super) dir: Option<PathBuf>,

    #[clap(long, help = TITLE_HELP.as_str(), help_heading = "OUTPUT")]
    pub(super) title: Option<String>,

    /// Write an SVG image.
    #[clap(long = "SVG", help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) svg: bool,

    /// Write a PNG image.
    #[clap(long = "PNG", help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) png: bool,

    /// Write a PDF image.
    #[clap(long = "PDF", help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) pdf: bool,

    /// Show the image in the system's image viewer.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) display: bool,

    /// Plot the uv coverage of the visibilities as an SVG.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) plot_uv: bool,

    /// Plot the singular values of the telescope operator as an SVG. This
    /// needs the dense operator, even for matrix-free solves.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) plot_spectrum: bool,

    /// Draw catalogue sources on plots.
    #[clap(long, help_heading = "OUTPUT")]
    #[serde(default)]
    pub(super) show_sources: bool,

    #[clap(long, help = ELEVATION_HELP.as_str(), help_heading = "OUTPUT")]
    pub(super) elevation: Option<f64>,
}

impl ImageArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<ImageArgs, DiskoError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let ImageArgs {
                args_file: _,
                api,
                catalog,
                file,
                ms,
                vis,
                nvis,
                channel,
                nside,
                arcmin,
                arcmax,
                fov,
                adaptive,
                alpha,
                lasso,
                matrix_free,
                tikhonov,
                lsqr,
                lsmr,
                fista,
                cv,
                dask,
                dir,
                title,
                svg,
                png,
                pdf,
                display,
                plot_uv,
                plot_spectrum,
                show_sources,
                elevation,
            } = unpack_arg_file!(arg_file);

            Ok(ImageArgs {
                args_file: None,
                api: cli_args.api.or(api),
                catalog: cli_args.catalog.or(catalog),
                file: cli_args.file.or(file),
                ms: cli_args.ms.or(ms),
                vis: cli_args.vis.or(vis),
                nvis: cli_args.nvis.or(nvis),
                channel: cli_args.channel.or(channel),
                nside: cli_args.nside.or(nside),
                arcmin: cli_args.arcmin.or(arcmin),
                arcmax: cli_args.arcmax.or(arcmax),
                fov: cli_args.fov.or(fov),
                adaptive: cli_args.adaptive.or(adaptive),
                alpha: cli_args.alpha.or(alpha),
                lasso: cli_args.lasso || lasso,
                matrix_free: cli_args.matrix_free || matrix_free,
                tikhonov: cli_args.tikhonov || tikhonov,
                lsqr: cli_args.lsqr || lsqr,
                lsmr: cli_args.lsmr || lsmr,
                fista: cli_args.fista || fista,
                cv: cli_args.cv || cv,
                dask: cli_args.dask || dask,
                dir: cli_args.dir.or(dir),
                title: cli_args.title.or(title),
                svg: cli_args.svg || svg,
                png: cli_args.png || png,
                pdf: cli_args.pdf || pdf,
                display: cli_args.display || display,
                plot_uv: cli_args.plot_uv || plot_uv,
                plot_spectrum: cli_args.plot_spectrum || plot_spectrum,
                show_sources: cli_args.show_sources || show_sources,
                elevation: cli_args.elevation.or(elevation),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ImageParams, DiskoError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            api,
            catalog,
            file,
            ms,
            vis,
            nvis,
            channel,
            nside,
            arcmin,
            arcmax,
            fov,
            adaptive,
            alpha,
            lasso,
            matrix_free,
            tikhonov,
            lsqr,
            lsmr,
            fista,
            cv,
            dask,
            dir,
            title,
            svg,
            png,
            pdf,
            display,
            plot_uv,
            plot_spectrum,
            show_sources,
            elevation,
        } = self;

        let mut printer = InfoPrinter::new("Imaging".into());

        let nvis = nvis.unwrap_or(DEFAULT_NVIS);
        if nvis == 0 {
            return Err(ImageArgsError::NvisZero.into());
        }
        let input = match (file, ms) {
            (Some(file), ms) => {
                if ms.is_some() || api.is_some() {
                    "Multiple inputs were given; only --file is used".warn();
                }
                InputSource::File(file)
            }
            (None, Some(path)) => {
                if api.is_some() {
                    "Both --ms and --api were given; only --ms is used".warn();
                }
                InputSource::Ms {
                    path,
                    nvis,
                    channel: channel.unwrap_or(0),
                    res_arcmin: arcmin,
                }
            }
            (None, None) => InputSource::Api {
                url: api.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                catalog: catalog.unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
                vis: vis.clone(),
            },
        };
        if vis.is_some() && !matches!(input, InputSource::Api { .. }) {
            "--vis is only used with the telescope API; ignoring it".warn();
        }
        printer.push_line(
            match &input {
                InputSource::File(f) => format!("Input snapshot: {}", f.display()),
                InputSource::Ms {
                    path,
                    nvis,
                    channel,
                    ..
                } => format!(
                    "Input measurement set: {} (channel {channel}, up to {nvis} visibilities)",
                    path.display()
                ),
                InputSource::Api { url, vis, .. } => match vis {
                    Some(vis) => format!("Input API: {url} with visibilities from {}", vis.display()),
                    None => format!("Input API: {url}"),
                },
            }
            .into(),
        );

        let fov_deg = fov.unwrap_or(DEFAULT_FOV_DEG);
        if !(fov_deg > 0.0 && fov_deg <= 360.0) {
            return Err(ImageArgsError::BadFov(fov_deg).into());
        }
        let rounds = adaptive.unwrap_or(0);
        let sphere = if rounds > 0 {
            if nside.is_some() {
                "--nside isn't used with an adaptive mesh; ignoring it".warn();
            }
            match (arcmin, arcmax) {
                (Some(res_arcmin), Some(res_arcmax)) => SphereParams::Adaptive {
                    res_arcmin,
                    res_arcmax,
                    rounds,
                },
                _ => return Err(ImageArgsError::AdaptiveNeedsResolution.into()),
            }
        } else {
            match (nside, arcmin) {
                (Some(nside), _) => SphereParams::Healpix { nside },
                (None, Some(res_arcmin)) => SphereParams::HealpixResolution { res_arcmin },
                (None, None) => return Err(ImageArgsError::NoResolution.into()),
            }
        };
        let sphere_desc = match sphere {
            SphereParams::Healpix { nside } => format!("HEALPix sky with nside {nside}"),
            SphereParams::HealpixResolution { res_arcmin } => {
                format!("HEALPix sky with pixels no bigger than {res_arcmin}'")
            }
            SphereParams::Adaptive {
                res_arcmin,
                res_arcmax,
                rounds,
            } => format!(
                "Adaptive sky from {res_arcmax}' to {res_arcmin}', {rounds} refinement rounds"
            ),
        };
        printer.push_line(format!("{sphere_desc}, field of view {fov_deg}°").into());

        let alpha = alpha.unwrap_or(DEFAULT_ALPHA);
        if !(alpha >= 0.0 && alpha.is_finite()) {
            return Err(ImageArgsError::BadAlpha(alpha).into());
        }
        let method = SolverMethod::from_flags(lasso, matrix_free, tikhonov, lsqr, lsmr, fista);
        if [lasso, matrix_free, tikhonov].iter().filter(|&&b| b).count() > 1 {
            format!("Multiple solvers were requested; using {method}").warn();
        }
        if !matrix_free && (lsqr || lsmr || fista) {
            "--lsqr, --lsmr and --fista only apply to --matrix-free solves; ignoring them".warn();
        }
        if rounds > 0 && method != SolverMethod::Tikhonov {
            format!("Adaptive refinement needs --tikhonov; the {method} solver will solve only once")
                .warn();
        }
        let mut block = vec![format!("Solver: {method}").into()];
        if method != SolverMethod::Direct {
            block.push(if cv {
                "alpha chosen by cross-validation".into()
            } else {
                format!("alpha: {alpha}").into()
            });
        }
        if dask {
            block.push("Operator is built in parallel".into());
        }
        printer.push_block(block);

        let output = OutputParams {
            dir: dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            svg,
            png,
            pdf,
            display,
            uv: plot_uv,
            spectrum: plot_spectrum,
        };
        let mut formats = vec!["fits"];
        if rounds > 0 {
            formats.push("vtk");
        }
        for (requested, format) in [(svg, "svg"), (png, "png"), (pdf, "pdf")] {
            if requested {
                formats.push(format);
            }
        }
        printer.push_line(
            format!(
                "Writing {} to {}",
                formats.iter().join(", "),
                output.dir.display()
            )
            .into(),
        );
        let plots: Vec<&str> = [(plot_uv, "uv coverage"), (plot_spectrum, "singular values")]
            .into_iter()
            .filter_map(|(requested, plot)| requested.then_some(plot))
            .collect();
        if !plots.is_empty() {
            printer.push_line(format!("Plotting {}", plots.join(" and ")).into());
        }
        let elevation_deg = elevation.unwrap_or(DEFAULT_ELEVATION_DEG);
        if show_sources {
            printer.push_line(format!("Showing sources above {elevation_deg}°").into());
        }

        printer.display();
        display_warnings();

        Ok(ImageParams {
            input,
            show_sources,
            elevation_deg,
            fov_deg,
            sphere,
            method,
            solve_opts: SolveOptions {
                alpha,
                scale: false,
                cv,
                parallel: dask,
            },
            output,
        })
    }

    pub(super) fn run(self, dry_run: bool, log_context: &LogContext) -> Result<(), DiskoError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        debug!(
            "Logging to {} (verbosity {})",
            log_context.log_file.display(),
            log_context.verbosity
        );
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let artifacts = params.run()?;
        let summary = &artifacts.summary;
        let mut printer = InfoPrinter::new("Finished imaging".into());
        let mut block = vec![format!(
            "{} solve(s) of {} pixels from {} visibilities",
            artifacts.num_solves, summary.npix, summary.num_vis
        )
        .into()];
        if let Some(alpha) = summary.alpha {
            block.push(format!("alpha: {alpha}").into());
        }
        if let Some(iterations) = summary.iterations {
            block.push(format!("iterations: {iterations}").into());
        }
        block.push(format!("residual norm: {:e}", summary.residual_norm).into());
        printer.push_block(block);
        printer.push_block(
            artifacts
                .files
                .iter()
                .map(|f| f.display().to_string().into())
                .collect(),
        );
        printer.display();
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum ImageArgsError {
    #[error("No sky resolution was given; use --nside or --arcmin")]
    NoResolution,

    #[error("An adaptive mesh needs both --arcmin and --arcmax")]
    AdaptiveNeedsResolution,

    #[error("The field of view must be more than 0 and at most 360 degrees, but got {0}")]
    BadFov(f64),

    #[error("alpha must be a non-negative number, but got {0}")]
    BadAlpha(f64),

    #[error("--nvis must be at least 1")]
    NvisZero,
}
