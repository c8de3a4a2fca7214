// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A minimal single-page PDF writer for an RGB raster.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use flate2::{write::ZlibEncoder, Compression};

/// The page is laid out at this many raster pixels per inch.
const DPI: f64 = 300.0;

/// Write `rgb` (8 bits per channel, row major, top row first) as the only
/// image on a single PDF page.
pub(super) fn write_rgb_pdf(
    file: &Path,
    rgb: &[u8],
    width: u32,
    height: u32,
) -> Result<(), std::io::Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(rgb)?;
    let image = encoder.finish()?;

    // PDF units are points (1/72 inch).
    let page_width = width as f64 * 72.0 / DPI;
    let page_height = height as f64 * 72.0 / DPI;
    let contents = format!("q {page_width:.2} 0 0 {page_height:.2} 0 0 cm /Im0 Do Q");

    let mut pdf: Vec<u8> = Vec::with_capacity(image.len() + 1024);
    let mut offsets = Vec::with_capacity(5);
    pdf.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");

    offsets.push(pdf.len());
    pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    offsets.push(pdf.len());
    pdf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");

    offsets.push(pdf.len());
    write!(
        pdf,
        "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {page_width:.2} {page_height:.2}] /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>\nendobj\n"
    )?;

    offsets.push(pdf.len());
    write!(
        pdf,
        "4 0 obj\n<< /Type /XObject /Subtype /Image /Width {width} /Height {height} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
        image.len()
    )?;
    pdf.extend_from_slice(&image);
    pdf.extend_from_slice(b"\nendstream\nendobj\n");

    offsets.push(pdf.len());
    write!(
        pdf,
        "5 0 obj\n<< /Length {} >>\nstream\n{contents}\nendstream\nendobj\n",
        contents.len()
    )?;

    let xref = pdf.len();
    write!(pdf, "xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1)?;
    for offset in &offsets {
        write!(pdf, "{offset:010} 00000 n \n")?;
    }
    write!(
        pdf,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        offsets.len() + 1
    )?;

    let mut out = BufWriter::new(File::create(file)?);
    out.write_all(&pdf)?;
    out.flush()
}
