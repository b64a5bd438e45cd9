//! PNG carrier adapter. The codec itself never touches files; this module
//! plays the collaborator role of loading a carrier into an RGBA buffer and
//! writing the mutated buffer back out. PNG only: a lossy format would
//! destroy the LSB plane.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::{err_to_io_error, CompressPayload};
use std::io::{BufRead, Read, Seek, Write};

pub fn hide<R, W>(
    cover_image: R,
    message: &str,
    key: Option<&str>,
    compress: CompressPayload,
    output: &mut W,
) -> Result<(), std::io::Error>
where
    R: BufRead + Read + Seek,
    W: Write,
{
    let img = image::load(cover_image, image::ImageFormat::Png).map_err(err_to_io_error)?;
    let rgba8 = img.to_rgba8();
    let (width, height) = (rgba8.width(), rgba8.height());
    let mut pixels = rgba8.into_raw();

    Encoder::new(compress)
        .embed(&mut pixels, message, key)
        .map_err(err_to_io_error)?;

    let out_buffer = match image::RgbaImage::from_raw(width, height, pixels) {
        Some(b) => Ok(b),
        None => Err(err_to_io_error(
            "could not create output image buffer from raw parts",
        )),
    }?;

    image::DynamicImage::ImageRgba8(out_buffer)
        .write_to(output, image::ImageFormat::Png)
        .map_err(err_to_io_error)
}

pub fn reveal<R>(
    input_image: &mut R,
    key: Option<&str>,
    compress: CompressPayload,
) -> Result<String, std::io::Error>
where
    R: BufRead + Read + Seek,
{
    let img = image::load(input_image, image::ImageFormat::Png).map_err(err_to_io_error)?;
    let pixels = img.to_rgba8().into_raw();

    Decoder::new(compress)
        .extract(&pixels, key)
        .map_err(err_to_io_error)
}
