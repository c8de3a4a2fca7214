// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Plots of a sphere's pixels, with an optional overlay of catalogue sources.
//!
//! Every writer renders from scratch; nothing is cached between them.

#[cfg(feature = "plotting")]
mod pdf;

use std::path::{Path, PathBuf};

use ndarray::ArrayView2;

use super::FileWriteError;
use crate::{sphere::Sphere, srclist::SourceList};

#[cfg(feature = "plotting")]
pub use plotting::DrawError;

/// What to draw on top of the pixels.
#[derive(Debug, Clone, Copy)]
pub struct PlotOptions<'a> {
    pub title: &'a str,

    /// Sources to mark, if any.
    pub sources: Option<&'a SourceList>,

    /// Only sources above this elevation are marked \[degrees\].
    pub elevation_deg: f64,

    /// Draw lines of constant elevation and azimuth.
    pub show_grid: bool,
}

#[cfg(feature = "plotting")]
pub fn write_svg(
    sphere: &dyn Sphere,
    opts: &PlotOptions,
    file: &Path,
) -> Result<(), FileWriteError> {
    plotting::svg(sphere, opts, file)
}

#[cfg(feature = "plotting")]
pub fn write_png(
    sphere: &dyn Sphere,
    opts: &PlotOptions,
    file: &Path,
) -> Result<(), FileWriteError> {
    plotting::png(sphere, opts, file)
}

#[cfg(feature = "plotting")]
pub fn write_pdf(
    sphere: &dyn Sphere,
    opts: &PlotOptions,
    file: &Path,
) -> Result<(), FileWriteError> {
    plotting::pdf(sphere, opts, file)
}

/// Render to a temporary PNG and open it with the platform's image viewer.
/// The path of the PNG is returned; it is not cleaned up.
#[cfg(feature = "plotting")]
pub fn display(sphere: &dyn Sphere, opts: &PlotOptions) -> Result<PathBuf, FileWriteError> {
    plotting::display(sphere, opts)
}

/// Plot the (u, v) coverage of baselines given in wavelengths, with shape
/// `(num_vis, 3)`. Each baseline is drawn with its conjugate.
#[cfg(feature = "plotting")]
pub fn write_uv(uvw: ArrayView2<f64>, title: &str, file: &Path) -> Result<(), FileWriteError> {
    plotting::uv(uvw, title, file)
}

/// Plot singular values against their index on a log scale.
#[cfg(feature = "plotting")]
pub fn write_spectrum(
    singular_values: &[f64],
    title: &str,
    file: &Path,
) -> Result<(), FileWriteError> {
    plotting::spectrum(singular_values, title, file)
}

#[cfg(not(feature = "plotting"))]
pub fn write_svg(_: &dyn Sphere, _: &PlotOptions, _: &Path) -> Result<(), FileWriteError> {
    Err(FileWriteError::NoPlottingFeature)
}

#[cfg(not(feature = "plotting"))]
pub fn write_png(_: &dyn Sphere, _: &PlotOptions, _: &Path) -> Result<(), FileWriteError> {
    Err(FileWriteError::NoPlottingFeature)
}

#[cfg(not(feature = "plotting"))]
pub fn write_pdf(_: &dyn Sphere, _: &PlotOptions, _: &Path) -> Result<(), FileWriteError> {
    Err(FileWriteError::NoPlottingFeature)
}

#[cfg(not(feature = "plotting"))]
pub fn display(_: &dyn Sphere, _: &PlotOptions) -> Result<PathBuf, FileWriteError> {
    Err(FileWriteError::NoPlottingFeature)
}

#[cfg(not(feature = "plotting"))]
pub fn write_uv(_: ArrayView2<f64>, _: &str, _: &Path) -> Result<(), FileWriteError> {
    Err(FileWriteError::NoPlottingFeature)
}

#[cfg(not(feature = "plotting"))]
pub fn write_spectrum(_: &[f64], _: &str, _: &Path) -> Result<(), FileWriteError> {
    Err(FileWriteError::NoPlottingFeature)
}

#[cfg(feature = "plotting")]
mod plotting {
    use log::{debug, trace, warn};
    use plotters::{coord::Shift, prelude::*};
    use thiserror::Error;

    use super::*;
    use crate::sphere::SkyCoord;

    /// The number of pixels on each side of the plots.
    const SVG_PIXELS: u32 = 800;
    const PNG_PIXELS: u32 = 1200;
    const PDF_PIXELS: u32 = 2400;

    /// Viridis, sampled at 0, 1/4, 1/2, 3/4 and 1.
    const COLOUR_STOPS: [(u8, u8, u8); 5] = [
        (68, 1, 84),
        (59, 82, 139),
        (33, 145, 140),
        (94, 201, 98),
        (253, 231, 37),
    ];

    pub(super) fn svg(
        sphere: &dyn Sphere,
        opts: &PlotOptions,
        file: &Path,
    ) -> Result<(), FileWriteError> {
        debug!("Plotting to {}", file.display());
        let root = SVGBackend::new(file, (SVG_PIXELS, SVG_PIXELS)).into_drawing_area();
        draw_sky(&root, sphere, opts)?;
        root.present()
            .map_err(|e| DrawError::Plotters(Box::new(e)))?;
        Ok(())
    }

    pub(super) fn png(
        sphere: &dyn Sphere,
        opts: &PlotOptions,
        file: &Path,
    ) -> Result<(), FileWriteError> {
        debug!("Plotting to {}", file.display());
        let root = BitMapBackend::new(file, (PNG_PIXELS, PNG_PIXELS)).into_drawing_area();
        draw_sky(&root, sphere, opts)?;
        root.present()
            .map_err(|e| DrawError::Plotters(Box::new(e)))?;
        Ok(())
    }

    pub(super) fn pdf(
        sphere: &dyn Sphere,
        opts: &PlotOptions,
        file: &Path,
    ) -> Result<(), FileWriteError> {
        debug!("Plotting to {}", file.display());
        let mut rgb = vec![0; (PDF_PIXELS * PDF_PIXELS * 3) as usize];
        {
            let root =
                BitMapBackend::with_buffer(&mut rgb, (PDF_PIXELS, PDF_PIXELS)).into_drawing_area();
            draw_sky(&root, sphere, opts)?;
            root.present()
                .map_err(|e| DrawError::Plotters(Box::new(e)))?;
        }
        super::pdf::write_rgb_pdf(file, &rgb, PDF_PIXELS, PDF_PIXELS)?;
        Ok(())
    }

    pub(super) fn display(
        sphere: &dyn Sphere,
        opts: &PlotOptions,
    ) -> Result<PathBuf, FileWriteError> {
        let viewer = if cfg!(target_os = "macos") {
            "open"
        } else if cfg!(target_os = "windows") {
            "explorer"
        } else {
            "xdg-open"
        };
        display_with(sphere, opts, viewer)
    }

    /// Render a fresh temporary PNG and hand it to `viewer`. A viewer that
    /// can't be run only gets a warning.
    pub(super) fn display_with(
        sphere: &dyn Sphere,
        opts: &PlotOptions,
        viewer: &str,
    ) -> Result<PathBuf, FileWriteError> {
        let file = tempfile::Builder::new()
            .prefix("disko_")
            .suffix(".png")
            .tempfile()?
            .into_temp_path();
        png(sphere, opts, &file)?;
        let file = file.keep().map_err(|e| e.error)?;

        trace!("Opening {} with {viewer}", file.display());
        if let Err(e) = std::process::Command::new(viewer).arg(&file).spawn() {
            warn!("Couldn't run '{viewer}' to display {}: {e}", file.display());
        }
        Ok(file)
    }

    pub(super) fn uv(uvw: ArrayView2<f64>, title: &str, file: &Path) -> Result<(), FileWriteError> {
        debug!("Plotting the uv coverage to {}", file.display());
        let root = SVGBackend::new(file, (SVG_PIXELS, SVG_PIXELS)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| DrawError::Uv(e.to_string()))?;

        let max = uvw
            .outer_iter()
            .map(|b| b[0].hypot(b[1]))
            .filter(|r| r.is_finite())
            .fold(0.0, f64::max);
        let extent = if max > 0.0 { 1.1 * max } else { 1.0 };
        let mut chart = ChartBuilder::on(&root)
            .margin(40)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(-extent..extent, -extent..extent)
            .map_err(|e| DrawError::Uv(e.to_string()))?;
        if let Err(e) = chart
            .configure_mesh()
            .x_desc("u [wavelengths]")
            .y_desc("v [wavelengths]")
            .draw()
        {
            warn!("Couldn't draw the uv axes: {e}");
        }

        let points = uvw
            .outer_iter()
            .flat_map(|b| [(b[0], b[1]), (-b[0], -b[1])])
            .filter(|(u, v)| u.is_finite() && v.is_finite())
            .collect::<Vec<_>>();
        trace!("Drawing {} uv points", points.len());
        chart
            .draw_series(
                points
                    .into_iter()
                    .map(|p| Circle::new(p, 2, BLUE.filled())),
            )
            .map_err(|e| DrawError::Uv(e.to_string()))?;

        draw_label(&root, title, 24, (10, 10));
        root.present()
            .map_err(|e| DrawError::Plotters(Box::new(e)))?;
        Ok(())
    }

    pub(super) fn spectrum(
        singular_values: &[f64],
        title: &str,
        file: &Path,
    ) -> Result<(), FileWriteError> {
        debug!("Plotting the singular value spectrum to {}", file.display());
        let root = SVGBackend::new(file, (SVG_PIXELS, SVG_PIXELS)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| DrawError::Spectrum(e.to_string()))?;

        // Zeros have no place on a log axis.
        let points: Vec<(usize, f64)> = singular_values
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, s)| *s > 0.0 && s.is_finite())
            .collect();
        let (lo, hi) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, s)| {
                (lo.min(s), hi.max(s))
            });
        let (lo, hi) = if points.is_empty() {
            (0.1, 1.0)
        } else {
            (lo / 2.0, hi * 2.0)
        };

        let mut chart = ChartBuilder::on(&root)
            .margin(40)
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(0..singular_values.len().max(1), (lo..hi).log_scale())
            .map_err(|e| DrawError::Spectrum(e.to_string()))?;
        if let Err(e) = chart
            .configure_mesh()
            .x_desc("index")
            .y_desc("singular value")
            .draw()
        {
            warn!("Couldn't draw the spectrum axes: {e}");
        }

        chart
            .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
            .map_err(|e| DrawError::Spectrum(e.to_string()))?;
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 2, BLUE.filled())))
            .map_err(|e| DrawError::Spectrum(e.to_string()))?;

        draw_label(&root, title, 24, (10, 10));
        root.present()
            .map_err(|e| DrawError::Plotters(Box::new(e)))?;
        Ok(())
    }

    /// Linearly interpolate between the colour stops. `t` is clamped to [0, 1].
    pub(super) fn colour(t: f64) -> RGBColor {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let x = t * (COLOUR_STOPS.len() - 1) as f64;
        let i = (x.floor() as usize).min(COLOUR_STOPS.len() - 2);
        let f = x - i as f64;
        let lerp = |a: u8, b: u8| (a as f64 + f * (b as f64 - a as f64)).round() as u8;
        let (r0, g0, b0) = COLOUR_STOPS[i];
        let (r1, g1, b1) = COLOUR_STOPS[i + 1];
        RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
    }

    /// Text needs fonts, which may not be available; a missing label isn't
    /// worth failing over.
    fn draw_label<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        text: &str,
        size: u32,
        pos: (i32, i32),
    ) {
        if let Err(e) = area.draw_text(
            text,
            &("sans-serif", size).into_font().color(&BLACK),
            pos,
        ) {
            warn!("Couldn't draw the label '{text}': {e}");
        }
    }

    fn draw_sky<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        sphere: &dyn Sphere,
        opts: &PlotOptions,
    ) -> Result<(), DrawError> {
        root.fill(&WHITE)
            .map_err(|e| DrawError::Sky(e.to_string()))?;
        let (width, height) = root.dim_in_pixel();

        let centre = sphere.centre();
        let extent = 1.05 * sphere.radius().min(std::f64::consts::FRAC_PI_2).sin();
        let margin = (width.min(height) / 16) as i32;
        let mut chart = ChartBuilder::on(root)
            .margin(margin)
            .build_cartesian_2d(-extent..extent, -extent..extent)
            .map_err(|e| DrawError::Sky(e.to_string()))?;

        let (min, max) = sphere
            .pixels()
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = if max > min { max - min } else { 1.0 };

        let polygons: Vec<Polygon<(f64, f64)>> = sphere
            .pixel_polygons()
            .iter()
            .zip(sphere.pixels())
            .filter_map(|(polygon, &v)| {
                let points = polygon
                    .iter()
                    .map(|c| c.orthographic(&centre))
                    .collect::<Option<Vec<_>>>()?;
                Some(Polygon::new(points, colour((v - min) / range).filled()))
            })
            .collect();
        trace!("Drawing {} pixel polygons", polygons.len());
        chart
            .draw_series(polygons)
            .map_err(|e| DrawError::Sky(e.to_string()))?;

        if opts.show_grid {
            let style = BLACK.mix(0.3);
            for el in [0.0, 30.0, 60.0f64] {
                let circle = (0..=180)
                    .map(|i| SkyCoord::from_el_az(el.to_radians(), (2.0 * i as f64).to_radians()))
                    .filter_map(|c| c.orthographic(&centre));
                chart
                    .draw_series(std::iter::once(PathElement::new(circle.collect::<Vec<_>>(), style)))
                    .map_err(|e| DrawError::Sky(e.to_string()))?;
            }
            for az in (0..360).step_by(45) {
                let spoke = (0..=90)
                    .map(|el| SkyCoord::from_el_az((el as f64).to_radians(), (az as f64).to_radians()))
                    .filter_map(|c| c.orthographic(&centre));
                chart
                    .draw_series(std::iter::once(PathElement::new(spoke.collect::<Vec<_>>(), style)))
                    .map_err(|e| DrawError::Sky(e.to_string()))?;
            }
        }

        if let Some(sources) = opts.sources {
            let mut labels = vec![];
            for source in sources.above_elevation(opts.elevation_deg) {
                if let Some((x, y)) = source.sky_coord().orthographic(&centre) {
                    chart
                        .draw_series(std::iter::once(Circle::new(
                            (x, y),
                            (width / 80).max(4),
                            RED.stroke_width(2),
                        )))
                        .map_err(|e| DrawError::Sky(e.to_string()))?;
                    labels.push((source.name.as_str(), chart.backend_coord(&(x, y))));
                }
            }
            for (name, (px, py)) in labels {
                draw_label(root, name, height / 60 + 8, (px + 10, py - 10));
            }
        }

        draw_label(root, opts.title, height / 30 + 8, (10, 10));
        draw_label(
            root,
            &format!("{} pixels, {min:.3e} to {max:.3e}", sphere.npix()),
            height / 60 + 8,
            (10, height as i32 - margin + 4),
        );
        Ok(())
    }

    #[derive(Error, Debug)]
    pub enum DrawError {
        #[error("While plotting the sky: {0}")]
        Sky(String),

        #[error("While plotting the uv coverage: {0}")]
        Uv(String),

        #[error("While plotting the singular value spectrum: {0}")]
        Spectrum(String),

        #[error("Error from the plotters library: {0}")]
        Plotters(Box<dyn std::error::Error>),
    }
}
