//! PNG and GIF decoding, delegated to the `image` crate.
//!
//! These two formats are the only ones not decoded in-core; indexed
//! PNGs with a transparency palette entry and transparent GIF frames
//! come back as full RGBA, which is all the TXD import path needs.

use image::ImageFormat;

use super::{IndexedImage, SourceFormat};
use crate::error::RwError;

pub fn decode_png(data: &[u8]) -> Result<IndexedImage, RwError> {
    decode_with(data, ImageFormat::Png, SourceFormat::Png)
}

pub fn decode_gif(data: &[u8]) -> Result<IndexedImage, RwError> {
    decode_with(data, ImageFormat::Gif, SourceFormat::Gif)
}

fn decode_with(
    data: &[u8],
    format: ImageFormat,
    source: SourceFormat,
) -> Result<IndexedImage, RwError> {
    let decoded = image::load_from_memory_with_format(data, format)?;

    let rgba_image = decoded.to_rgba8();
    let (width, height) = rgba_image.dimensions();
    let rgba = rgba_image.into_raw();
    let has_alpha = rgba.chunks_exact(4).any(|px| px[3] != 255);

    Ok(IndexedImage {
        width,
        height,
        rgba,
        has_alpha,
        source,
    })
}
