//! IFF ILBM decoding (planar, optionally ByteRun1-compressed).
//!
//! ILBM is the one big-endian format in this crate, per the IFF
//! standard. The BODY chunk stores each row as `planes` separate
//! bitplanes; pixels are reassembled by gathering one bit per plane.

use byteorder::{BigEndian, ByteOrder};

use super::{bad_signature, truncated, IndexedImage, SourceFormat};
use crate::error::RwError;

struct BitmapHeader {
    width: usize,
    height: usize,
    planes: u8,
    compression: u8,
}

pub fn decode(data: &[u8]) -> Result<IndexedImage, RwError> {
    if data.len() < 12 || &data[0..4] != b"FORM" || &data[8..12] != b"ILBM" {
        return Err(bad_signature("IFF ILBM", data));
    }

    let mut header: Option<BitmapHeader> = None;
    let mut palette: Vec<[u8; 3]> = Vec::new();
    let mut body: Option<&[u8]> = None;

    // Chunks are fourcc + big-endian size, padded to even lengths.
    let mut pos = 12;
    while pos + 8 <= data.len() {
        let fourcc = &data[pos..pos + 4];
        let size = BigEndian::read_u32(&data[pos + 4..pos + 8]) as usize;
        let payload_start = pos + 8;
        if payload_start + size > data.len() {
            return Err(truncated(pos, size, data.len() - payload_start));
        }
        let payload = &data[payload_start..payload_start + size];

        match fourcc {
            b"BMHD" => {
                if size < 11 {
                    return Err(truncated(pos, 11, size));
                }
                header = Some(BitmapHeader {
                    width: BigEndian::read_u16(&payload[0..2]) as usize,
                    height: BigEndian::read_u16(&payload[2..4]) as usize,
                    planes: payload[8],
                    compression: payload[10],
                });
            }
            b"CMAP" => {
                palette = payload.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
            }
            b"BODY" => {
                body = Some(payload);
            }
            _ => {}
        }

        pos = payload_start + size + (size & 1);
    }

    let header = header.ok_or_else(|| bad_signature("ILBM BMHD chunk", data))?;
    let body = body.ok_or_else(|| bad_signature("ILBM BODY chunk", data))?;
    if header.planes == 0 || header.planes > 8 {
        return Err(bad_signature("ILBM with 1-8 planes", data));
    }

    // Each plane row is padded to a 16-pixel boundary.
    let plane_stride = header.width.div_ceil(16) * 2;
    let row_bytes = plane_stride * header.planes as usize;

    let planar = if header.compression == 1 {
        unpack_byterun1(body, row_bytes * header.height)?
    } else {
        if body.len() < row_bytes * header.height {
            return Err(truncated(0, row_bytes * header.height, body.len()));
        }
        body[..row_bytes * header.height].to_vec()
    };

    let mut rgba = Vec::with_capacity(header.width * header.height * 4);
    for y in 0..header.height {
        let row = &planar[y * row_bytes..][..row_bytes];
        for x in 0..header.width {
            let mut index = 0usize;
            for plane in 0..header.planes as usize {
                let byte = row[plane * plane_stride + x / 8];
                let bit = (byte >> (7 - x % 8)) & 1;
                index |= (bit as usize) << plane;
            }
            let entry = palette.get(index).copied().unwrap_or([0, 0, 0]);
            rgba.extend_from_slice(&[entry[0], entry[1], entry[2], 255]);
        }
    }

    Ok(IndexedImage {
        width: header.width as u32,
        height: header.height as u32,
        rgba,
        has_alpha: false,
        source: SourceFormat::Ilbm,
    })
}

/// ByteRun1: a control byte `n` in `0..=127` copies `n + 1` literal
/// bytes; `-1..=-127` repeats the next byte `1 - n` times; `-128` is a
/// no-op.
fn unpack_byterun1(packed: &[u8], expected: usize) -> Result<Vec<u8>, RwError> {
    let mut out = Vec::with_capacity(expected);
    let mut pos = 0;
    while out.len() < expected {
        if pos >= packed.len() {
            return Err(truncated(pos, expected - out.len(), 0));
        }
        let control = packed[pos] as i8;
        pos += 1;
        match control {
            0..=127 => {
                let count = control as usize + 1;
                if pos + count > packed.len() {
                    return Err(truncated(pos, count, packed.len() - pos));
                }
                out.extend_from_slice(&packed[pos..pos + count]);
                pos += count;
            }
            -127..=-1 => {
                let count = 1 - control as isize;
                if pos >= packed.len() {
                    return Err(truncated(pos, 1, 0));
                }
                out.extend(std::iter::repeat(packed[pos]).take(count as usize));
                pos += 1;
            }
            -128 => {}
        }
    }
    Ok(out)
}
