//! PCX decoding (8-bit, single plane, run-length encoded).

use byteorder::{ByteOrder, LittleEndian};

use super::{bad_signature, truncated, IndexedImage, SourceFormat};
use crate::error::RwError;

const HEADER_SIZE: usize = 128;
const PALETTE_MARKER: u8 = 0x0C;

/// Decodes a version-5 PCX. Bytes whose top two bits are set are run
/// markers (low six bits carry the count, the next byte the value); the
/// 256-color palette sits at the end of the file behind a `0x0C` marker.
pub fn decode(data: &[u8]) -> Result<IndexedImage, RwError> {
    if data.first() != Some(&0x0A) {
        return Err(bad_signature("PCX", data));
    }
    if data.len() < HEADER_SIZE {
        return Err(truncated(0, HEADER_SIZE, data.len()));
    }

    let encoding = data[2];
    let bits_per_pixel = data[3];
    let xmin = LittleEndian::read_u16(&data[4..6]) as usize;
    let ymin = LittleEndian::read_u16(&data[6..8]) as usize;
    let xmax = LittleEndian::read_u16(&data[8..10]) as usize;
    let ymax = LittleEndian::read_u16(&data[10..12]) as usize;
    let planes = data[65];
    let bytes_per_line = LittleEndian::read_u16(&data[66..68]) as usize;

    if encoding != 1 || bits_per_pixel != 8 || planes != 1 || xmax < xmin || ymax < ymin {
        return Err(bad_signature("8-bit PCX", data));
    }

    let width = xmax - xmin + 1;
    let height = ymax - ymin + 1;
    // Each decoded row must hold at least one full image row.
    if bytes_per_line < width {
        return Err(bad_signature("8-bit PCX", data));
    }

    // The palette trails the image data: 768 RGB bytes behind a marker.
    let palette_offset = data
        .len()
        .checked_sub(769)
        .filter(|&off| data[off] == PALETTE_MARKER)
        .ok_or_else(|| bad_signature("PCX palette", data))?;
    let palette = &data[palette_offset + 1..];

    let mut indices = Vec::with_capacity(bytes_per_line * height);
    let mut pos = HEADER_SIZE;
    while indices.len() < bytes_per_line * height {
        if pos >= palette_offset {
            return Err(truncated(pos, bytes_per_line * height - indices.len(), 0));
        }
        let byte = data[pos];
        pos += 1;
        if byte & 0xC0 == 0xC0 {
            let count = (byte & 0x3F) as usize;
            if pos >= palette_offset {
                return Err(truncated(pos, 1, 0));
            }
            let value = data[pos];
            pos += 1;
            indices.extend(std::iter::repeat(value).take(count));
        } else {
            indices.push(byte);
        }
    }

    let mut rgba = Vec::with_capacity(width * height * 4);
    for row in 0..height {
        let line = &indices[row * bytes_per_line..][..width];
        for &index in line {
            let entry = &palette[index as usize * 3..][..3];
            rgba.extend_from_slice(&[entry[0], entry[1], entry[2], 255]);
        }
    }

    Ok(IndexedImage {
        width: width as u32,
        height: height as u32,
        rgba,
        has_alpha: false,
        source: SourceFormat::Pcx,
    })
}
