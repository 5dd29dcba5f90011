//! 8-bit color-mapped TGA decoding.

use byteorder::{ByteOrder, LittleEndian};

use super::{bad_signature, truncated, IndexedImage, SourceFormat};
use crate::error::RwError;

const HEADER_SIZE: usize = 18;

/// TGA has no magic; this plausibility check is the last resort of the
/// auto-detector. Type 1 with an 8-bit color-mapped pixel stream is the
/// only variant the TXD import path uses.
pub fn looks_like_tga(data: &[u8]) -> bool {
    data.len() >= HEADER_SIZE && data[1] == 1 && data[2] == 1 && data[16] == 8
}

pub fn decode(data: &[u8]) -> Result<IndexedImage, RwError> {
    if data.len() < HEADER_SIZE {
        return Err(truncated(0, HEADER_SIZE, data.len()));
    }

    let id_length = data[0] as usize;
    let color_map_type = data[1];
    let image_type = data[2];
    let map_start = LittleEndian::read_u16(&data[3..5]) as usize;
    let map_length = LittleEndian::read_u16(&data[5..7]) as usize;
    let map_depth = data[7];
    let width = LittleEndian::read_u16(&data[12..14]) as usize;
    let height = LittleEndian::read_u16(&data[14..16]) as usize;
    let pixel_depth = data[16];
    let descriptor = data[17];

    if color_map_type != 1 || image_type != 1 || pixel_depth != 8 {
        return Err(bad_signature("color-mapped TGA", data));
    }
    let entry_size = match map_depth {
        24 => 3,
        32 => 4,
        _ => return Err(bad_signature("24/32-bit TGA color map", data)),
    };
    if map_length == 0 {
        return Err(bad_signature("TGA color map", data));
    }

    let map_offset = HEADER_SIZE + id_length;
    let pixel_offset = map_offset + map_length * entry_size;
    let needed = pixel_offset + width * height;
    if data.len() < needed {
        return Err(truncated(0, needed, data.len()));
    }
    let color_map = &data[map_offset..pixel_offset];
    let pixels = &data[pixel_offset..needed];

    // Descriptor bit 5: rows are stored top-down; otherwise bottom-up.
    let top_down = descriptor & 0x20 != 0;
    let has_alpha = entry_size == 4;

    let mut rgba = Vec::with_capacity(width * height * 4);
    for out_row in 0..height {
        let stored_row = if top_down { out_row } else { height - 1 - out_row };
        for &index in &pixels[stored_row * width..][..width] {
            let index = (index as usize).saturating_sub(map_start).min(map_length - 1);
            let entry = &color_map[index * entry_size..][..entry_size];
            // Entries are BGR or BGRA.
            let alpha = if has_alpha { entry[3] } else { 255 };
            rgba.extend_from_slice(&[entry[2], entry[1], entry[0], alpha]);
        }
    }

    let has_translucency = has_alpha && rgba.chunks_exact(4).any(|px| px[3] != 255);
    Ok(IndexedImage {
        width: width as u32,
        height: height as u32,
        rgba,
        has_alpha: has_translucency,
        source: SourceFormat::Tga,
    })
}
