//! S3TC (DXT1/3/5, a.k.a. BC1/BC2/BC3) block codec.
//!
//! Decoding is exact and deterministic. Encoding is the usual cheap
//! heuristic: per block, the two endpoint colors are the pair with the
//! largest L1 distance and every texel snaps to the nearest palette
//! entry. It only runs when the caller has actually edited pixel data;
//! untouched textures are written back from their original blocks.

use byteorder::{ByteOrder, LittleEndian};

use super::raster::{expand5, expand6, RasterFormat};

/// Decodes a DXT payload into a `width * height * 4` RGBA buffer.
///
/// Texels of edge blocks that fall outside the image are discarded.
/// Returns `None` if `format` is not a DXT format or the payload is
/// shorter than the block grid requires.
pub fn decode(format: RasterFormat, data: &[u8], width: u16, height: u16) -> Option<Vec<u8>> {
    let block_size = format.block_size()?;
    let (w, h) = (width as usize, height as usize);
    let blocks_x = w.div_ceil(4);
    let blocks_y = h.div_ceil(4);
    if data.len() < block_size * blocks_x * blocks_y {
        return None;
    }

    let mut rgba = vec![0u8; w * h * 4];
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let block = &data[(by * blocks_x + bx) * block_size..][..block_size];
            let texels = match format {
                RasterFormat::Dxt1 => decode_block_bc1(block, true),
                RasterFormat::Dxt3 => decode_block_bc2(block),
                RasterFormat::Dxt5 => decode_block_bc3(block),
                _ => return None,
            };
            for (i, texel) in texels.iter().enumerate() {
                let x = bx * 4 + i % 4;
                let y = by * 4 + i / 4;
                if x < w && y < h {
                    rgba[(y * w + x) * 4..][..4].copy_from_slice(texel);
                }
            }
        }
    }
    Some(rgba)
}

/// Encodes an RGBA buffer into DXT blocks. Edge blocks are padded by
/// clamping to the nearest in-image texel so padding never dominates the
/// endpoint choice. Returns `None` for non-DXT formats.
pub fn encode(format: RasterFormat, rgba: &[u8], width: u16, height: u16) -> Option<Vec<u8>> {
    let block_size = format.block_size()?;
    let (w, h) = (width as usize, height as usize);
    if rgba.len() < w * h * 4 {
        return None;
    }
    let blocks_x = w.div_ceil(4);
    let blocks_y = h.div_ceil(4);

    let mut out = Vec::with_capacity(block_size * blocks_x * blocks_y);
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let mut texels = [[0u8; 4]; 16];
            for (i, texel) in texels.iter_mut().enumerate() {
                let x = (bx * 4 + i % 4).min(w - 1);
                let y = (by * 4 + i / 4).min(h - 1);
                texel.copy_from_slice(&rgba[(y * w + x) * 4..][..4]);
            }
            match format {
                RasterFormat::Dxt1 => encode_block_bc1(&texels, &mut out),
                RasterFormat::Dxt3 => encode_block_bc2(&texels, &mut out),
                RasterFormat::Dxt5 => encode_block_bc3(&texels, &mut out),
                _ => return None,
            }
        }
    }
    Some(out)
}

fn expand_565(c: u16) -> [u8; 4] {
    [
        expand5(((c >> 11) & 0x1F) as u8),
        expand6(((c >> 5) & 0x3F) as u8),
        expand5((c & 0x1F) as u8),
        255,
    ]
}

fn pack_565(texel: [u8; 4]) -> u16 {
    (((texel[0] as u16) >> 3) << 11) | (((texel[1] as u16) >> 2) << 5) | ((texel[2] as u16) >> 3)
}

fn mix(a: [u8; 4], b: [u8; 4], wa: u16, wb: u16) -> [u8; 4] {
    let total = wa + wb;
    [
        ((a[0] as u16 * wa + b[0] as u16 * wb) / total) as u8,
        ((a[1] as u16 * wa + b[1] as u16 * wb) / total) as u8,
        ((a[2] as u16 * wa + b[2] as u16 * wb) / total) as u8,
        255,
    ]
}

/// The 8-byte color half of a block. `one_bit_alpha` enables the
/// BC1-only punch-through mode when `color0 <= color1`.
fn decode_block_bc1(block: &[u8], one_bit_alpha: bool) -> [[u8; 4]; 16] {
    let c0 = LittleEndian::read_u16(&block[0..2]);
    let c1 = LittleEndian::read_u16(&block[2..4]);
    let p0 = expand_565(c0);
    let p1 = expand_565(c1);
    let palette = if c0 > c1 || !one_bit_alpha {
        [p0, p1, mix(p0, p1, 2, 1), mix(p0, p1, 1, 2)]
    } else {
        [p0, p1, mix(p0, p1, 1, 1), [0, 0, 0, 0]]
    };

    let indices = LittleEndian::read_u32(&block[4..8]);
    let mut texels = [[0u8; 4]; 16];
    for (i, texel) in texels.iter_mut().enumerate() {
        *texel = palette[((indices >> (i * 2)) & 0x3) as usize];
    }
    texels
}

fn decode_block_bc2(block: &[u8]) -> [[u8; 4]; 16] {
    let alpha = LittleEndian::read_u64(&block[0..8]);
    let mut texels = decode_block_bc1(&block[8..16], false);
    for (i, texel) in texels.iter_mut().enumerate() {
        let a4 = ((alpha >> (i * 4)) & 0xF) as u8;
        texel[3] = a4 * 17;
    }
    texels
}

fn decode_block_bc3(block: &[u8]) -> [[u8; 4]; 16] {
    let a0 = block[0];
    let a1 = block[1];
    let palette = alpha_palette(a0, a1);

    let mut bits = 0u64;
    for (i, byte) in block[2..8].iter().enumerate() {
        bits |= (*byte as u64) << (i * 8);
    }

    let mut texels = decode_block_bc1(&block[8..16], false);
    for (i, texel) in texels.iter_mut().enumerate() {
        texel[3] = palette[((bits >> (i * 3)) & 0x7) as usize];
    }
    texels
}

fn alpha_palette(a0: u8, a1: u8) -> [u8; 8] {
    let (a0w, a1w) = (a0 as u16, a1 as u16);
    if a0 > a1 {
        [
            a0,
            a1,
            ((6 * a0w + a1w) / 7) as u8,
            ((5 * a0w + 2 * a1w) / 7) as u8,
            ((4 * a0w + 3 * a1w) / 7) as u8,
            ((3 * a0w + 4 * a1w) / 7) as u8,
            ((2 * a0w + 5 * a1w) / 7) as u8,
            ((a0w + 6 * a1w) / 7) as u8,
        ]
    } else {
        [
            a0,
            a1,
            ((4 * a0w + a1w) / 5) as u8,
            ((3 * a0w + 2 * a1w) / 5) as u8,
            ((2 * a0w + 3 * a1w) / 5) as u8,
            ((a0w + 4 * a1w) / 5) as u8,
            0,
            255,
        ]
    }
}

fn l1_distance(a: [u8; 4], b: [u8; 4]) -> u32 {
    a[..3]
        .iter()
        .zip(&b[..3])
        .map(|(&x, &y)| (x as i32 - y as i32).unsigned_abs())
        .sum()
}

/// Picks the endpoint pair with the largest L1 distance within the block.
fn pick_endpoints(texels: &[[u8; 4]; 16]) -> ([u8; 4], [u8; 4]) {
    let mut best = (texels[0], texels[0]);
    let mut best_dist = 0;
    for i in 0..16 {
        for j in i + 1..16 {
            let dist = l1_distance(texels[i], texels[j]);
            if dist > best_dist {
                best_dist = dist;
                best = (texels[i], texels[j]);
            }
        }
    }
    best
}

/// Writes the shared 8-byte color half. Endpoints are ordered
/// `color0 > color1` so BC1 decoders stay in four-color mode.
fn encode_color_half(texels: &[[u8; 4]; 16], out: &mut Vec<u8>) {
    let (a, b) = pick_endpoints(texels);
    let (mut c0, mut c1) = (pack_565(a), pack_565(b));
    if c0 < c1 {
        std::mem::swap(&mut c0, &mut c1);
    }

    let palette = if c0 == c1 {
        [expand_565(c0); 4]
    } else {
        let p0 = expand_565(c0);
        let p1 = expand_565(c1);
        [p0, p1, mix(p0, p1, 2, 1), mix(p0, p1, 1, 2)]
    };

    let mut indices = 0u32;
    if c0 != c1 {
        for (i, texel) in texels.iter().enumerate() {
            let nearest = palette
                .iter()
                .enumerate()
                .min_by_key(|(_, p)| l1_distance(*texel, **p))
                .map(|(idx, _)| idx as u32)
                .unwrap_or(0);
            indices |= nearest << (i * 2);
        }
    }

    out.extend_from_slice(&c0.to_le_bytes());
    out.extend_from_slice(&c1.to_le_bytes());
    out.extend_from_slice(&indices.to_le_bytes());
}

fn encode_block_bc1(texels: &[[u8; 4]; 16], out: &mut Vec<u8>) {
    encode_color_half(texels, out);
}

fn encode_block_bc2(texels: &[[u8; 4]; 16], out: &mut Vec<u8>) {
    let mut alpha = 0u64;
    for (i, texel) in texels.iter().enumerate() {
        alpha |= ((texel[3] >> 4) as u64) << (i * 4);
    }
    out.extend_from_slice(&alpha.to_le_bytes());
    encode_color_half(texels, out);
}

fn encode_block_bc3(texels: &[[u8; 4]; 16], out: &mut Vec<u8>) {
    let a0 = texels.iter().map(|t| t[3]).max().unwrap_or(255);
    let a1 = texels.iter().map(|t| t[3]).min().unwrap_or(0);
    out.push(a0);
    out.push(a1);

    let palette = alpha_palette(a0, a1);
    let mut bits = 0u64;
    if a0 != a1 {
        for (i, texel) in texels.iter().enumerate() {
            let nearest = palette
                .iter()
                .enumerate()
                .min_by_key(|(_, &p)| (p as i32 - texel[3] as i32).unsigned_abs())
                .map(|(idx, _)| idx as u64)
                .unwrap_or(0);
            bits |= nearest << (i * 3);
        }
    }
    out.extend_from_slice(&bits.to_le_bytes()[..6]);

    encode_color_half(texels, out);
}
