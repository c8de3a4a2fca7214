// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! FITS images of a sphere.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use fitsio::{
    images::{ImageDescription, ImageType},
    FitsFile,
};
use hifitime::{Duration, Epoch};
use log::debug;
use marlu::precession::get_lmst;

use super::{remove_existing, FileWriteError};
use crate::{
    sphere::{rasterise, Raster, Sphere},
    telescope::Location,
};

/// Things about an image that go into a FITS header.
#[derive(Debug, Clone)]
pub struct FitsMetadata {
    /// The full field of view \[degrees\].
    pub fov_deg: f64,
    pub method: String,
    pub alpha: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub frequency_hz: f64,
    pub location: Option<Location>,
    pub telescope: Option<String>,
}

/// Rasterise `sphere` onto an orthographic grid and write it to `file`.
pub fn write_fits(
    sphere: &dyn Sphere,
    meta: &FitsMetadata,
    file: &Path,
) -> Result<(), FileWriteError> {
    let size = Raster::default_size(sphere.npix());
    let raster = rasterise(sphere, meta.fov_deg, size);
    debug!(
        "Writing a {size}x{size} FITS image to {}",
        file.display()
    );
    remove_existing(file)?;
    write_raster(&raster, sphere.npix(), meta, file).map_err(|err| FileWriteError::Fitsio {
        file: file.to_path_buf(),
        err,
    })
}

fn write_raster(
    raster: &Raster,
    npix: usize,
    meta: &FitsMetadata,
    file: &Path,
) -> Result<(), fitsio::errors::Error> {
    let size = raster.size();
    let image_description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[size, size],
    };
    let mut fptr = FitsFile::create(file)
        .with_custom_primary(&image_description)
        .open()?;
    let hdu = fptr.primary_hdu()?;

    // The image is centred on the zenith, so its RA is the local sidereal time
    // and its Dec is the array latitude.
    let (ra_deg, dec_deg) = match meta.location {
        Some(loc) => {
            let epoch = Epoch::from_unix_seconds(meta.timestamp.timestamp() as f64);
            let lst = get_lmst(loc.lon.to_radians(), epoch, Duration::from_seconds(0.0));
            (lst.to_degrees(), loc.lat)
        }
        None => (0.0, 0.0),
    };
    let cell_deg = raster.cell_size().to_degrees();
    let crpix = size as f64 / 2.0 + 0.5;
    hdu.write_key(&mut fptr, "BUNIT", "JY/SR")?;
    hdu.write_key(&mut fptr, "CTYPE1", "RA---SIN")?;
    hdu.write_key(&mut fptr, "CRPIX1", crpix)?;
    hdu.write_key(&mut fptr, "CRVAL1", ra_deg)?;
    hdu.write_key(&mut fptr, "CDELT1", cell_deg)?;
    hdu.write_key(&mut fptr, "CUNIT1", "deg")?;
    hdu.write_key(&mut fptr, "CTYPE2", "DEC--SIN")?;
    hdu.write_key(&mut fptr, "CRPIX2", crpix)?;
    hdu.write_key(&mut fptr, "CRVAL2", dec_deg)?;
    hdu.write_key(&mut fptr, "CDELT2", cell_deg)?;
    hdu.write_key(&mut fptr, "CUNIT2", "deg")?;
    hdu.write_key(&mut fptr, "CTYPE3", "FREQ")?;
    hdu.write_key(&mut fptr, "CRVAL3", meta.frequency_hz)?;
    hdu.write_key(&mut fptr, "FOV", meta.fov_deg)?;
    hdu.write_key(&mut fptr, "NPIX", npix as i64)?;
    hdu.write_key(&mut fptr, "METHOD", meta.method.as_str())?;
    if let Some(alpha) = meta.alpha {
        hdu.write_key(&mut fptr, "ALPHA", alpha)?;
    }
    hdu.write_key(
        &mut fptr,
        "DATE-OBS",
        meta.timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .trim_end_matches('Z'),
    )?;
    if let Some(telescope) = &meta.telescope {
        hdu.write_key(&mut fptr, "TELESCOP", telescope.as_str())?;
    }
    if let Some(loc) = meta.location {
        hdu.write_key(&mut fptr, "OBSGEO-L", loc.lon)?;
        hdu.write_key(&mut fptr, "OBSGEO-B", loc.lat)?;
        hdu.write_key(&mut fptr, "OBSGEO-H", loc.alt)?;
    }
    hdu.write_key(
        &mut fptr,
        "SOFTWARE",
        format!(
            "Created by {} v{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ),
    )?;

    let data: Vec<f64> = raster.data.iter().copied().collect();
    hdu.write_image(&mut fptr, &data)?;
    Ok(())
}
