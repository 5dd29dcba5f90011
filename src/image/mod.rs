//! Decoders for the 8-bit indexed interchange formats used to move
//! textures in and out of TXD dictionaries.
//!
//! Every codec normalizes to top-down RGBA8888 with alpha forced to 255
//! when the source has no alpha. BMP, PCX, TGA and IFF ILBM are decoded
//! in-core; PNG and GIF are delegated to the `image` crate.

use crate::error::RwError;

pub mod bmp;
pub mod ilbm;
pub mod native;
pub mod pcx;
pub mod tga;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceFormat {
    Bmp,
    Pcx,
    Gif,
    Png,
    Tga,
    Ilbm,
}

/// A decoded image, always top-down RGBA8888.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub has_alpha: bool,
    pub source: SourceFormat,
}

/// Decodes a buffer by sniffing its signature. TGA has no magic, so it
/// is the fallback once everything else is ruled out.
pub fn decode_auto(data: &[u8]) -> Result<IndexedImage, RwError> {
    if data.starts_with(b"BM") {
        return bmp::decode(data);
    }
    if data.first() == Some(&0x0A) {
        return pcx::decode(data);
    }
    if data.starts_with(b"GIF8") {
        return native::decode_gif(data);
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        return native::decode_png(data);
    }
    if data.starts_with(b"FORM") {
        return ilbm::decode(data);
    }
    if tga::looks_like_tga(data) {
        return tga::decode(data);
    }
    Err(RwError::FormatSignature {
        expected: "indexed image",
        found: u32::from_le_bytes([
            *data.first().unwrap_or(&0),
            *data.get(1).unwrap_or(&0),
            *data.get(2).unwrap_or(&0),
            *data.get(3).unwrap_or(&0),
        ]),
        offset: 0,
    })
}

/// Shorthand for the truncation error of the image codecs, which have
/// no section ids to report.
pub(crate) fn truncated(offset: usize, declared: usize, available: usize) -> RwError {
    RwError::TruncatedData {
        section_type: 0,
        offset: offset as u64,
        declared: declared as u64,
        available: available as u64,
    }
}

pub(crate) fn bad_signature(expected: &'static str, data: &[u8]) -> RwError {
    RwError::FormatSignature {
        expected,
        found: u32::from_le_bytes([
            *data.first().unwrap_or(&0),
            *data.get(1).unwrap_or(&0),
            *data.get(2).unwrap_or(&0),
            *data.get(3).unwrap_or(&0),
        ]),
        offset: 0,
    }
}
