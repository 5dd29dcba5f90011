//! 8-bit indexed BMP decoding.

use byteorder::{ByteOrder, LittleEndian};

use super::{bad_signature, truncated, IndexedImage, SourceFormat};
use crate::error::RwError;

const HEADER_SIZE: usize = 54;
const PALETTE_SIZE: usize = 256 * 4;

/// Decodes an uncompressed 8-bit BMP. Rows are stored bottom-up and
/// 4-byte padded; the output is flipped so row 0 is the top of the
/// image.
pub fn decode(data: &[u8]) -> Result<IndexedImage, RwError> {
    if !data.starts_with(b"BM") {
        return Err(bad_signature("BMP", data));
    }
    if data.len() < HEADER_SIZE + PALETTE_SIZE {
        return Err(truncated(0, HEADER_SIZE + PALETTE_SIZE, data.len()));
    }

    let pixel_offset = LittleEndian::read_u32(&data[10..14]) as usize;
    let width = LittleEndian::read_i32(&data[18..22]);
    let height = LittleEndian::read_i32(&data[22..26]);
    let bpp = LittleEndian::read_u16(&data[28..30]);
    let compression = LittleEndian::read_u32(&data[30..34]);

    if bpp != 8 || compression != 0 || width <= 0 || height == 0 {
        return Err(bad_signature("8-bit uncompressed BMP", data));
    }

    // A negative height is the rare top-down variant.
    let top_down = height < 0;
    let width = width as usize;
    let height = height.unsigned_abs() as usize;

    // Palette entries are BGRA (the fourth byte is reserved).
    let palette = &data[HEADER_SIZE..HEADER_SIZE + PALETTE_SIZE];

    let row_stride = (width + 3) & !3;
    let needed = pixel_offset + row_stride * height;
    if pixel_offset > data.len() || data.len() < needed {
        return Err(truncated(
            pixel_offset,
            row_stride * height,
            data.len().saturating_sub(pixel_offset),
        ));
    }

    let mut rgba = Vec::with_capacity(width * height * 4);
    for out_row in 0..height {
        let stored_row = if top_down { out_row } else { height - 1 - out_row };
        let row = &data[pixel_offset + stored_row * row_stride..][..width];
        for &index in row {
            let entry = &palette[index as usize * 4..][..4];
            rgba.extend_from_slice(&[entry[2], entry[1], entry[0], 255]);
        }
    }

    Ok(IndexedImage {
        width: width as u32,
        height: height as u32,
        rgba,
        has_alpha: false,
        source: SourceFormat::Bmp,
    })
}
