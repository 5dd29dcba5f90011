//! Raster format codes, the raster flag word and pixel conversions.

use modular_bitfield::prelude::*;

pub const FOURCC_DXT1: u32 = 0x31545844;
pub const FOURCC_DXT3: u32 = 0x33545844;
pub const FOURCC_DXT5: u32 = 0x35545844;

/// The raster format flag word of a Texture Native header.
///
/// Bit 16 signals an alpha channel, bit 4 a trailing bumpmap record,
/// bit 10 that the chain carries mipmaps past the base level, and bits
/// 13/14 an 8-bit or 4-bit palette.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterFormatFlags {
    pub format_code: B4,
    pub has_bumpmap: bool,
    pub pad_0: B5,
    pub mipmapped: bool,
    pub pad_1: B2,
    pub pal8: bool,
    pub pal4: bool,
    pub pad_2: B1,
    pub has_alpha: bool,
    pub pad_3: B15,
}

impl RasterFormatFlags {
    pub fn from_raw(raw: u32) -> Self {
        Self::from_bytes(raw.to_le_bytes())
    }

    pub fn to_raw(self) -> u32 {
        u32::from_le_bytes(Self::into_bytes(self))
    }
}

/// Canonical pixel formats a Texture Native can carry.
///
/// Codes outside the table are kept as [RasterFormat::Unknown] with their
/// raw payload bytes, so the texture still survives a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RasterFormat {
    Dxt1,
    Dxt3,
    Dxt5,
    Argb8888,
    Rgb888,
    Argb1555,
    Rgb565,
    Argb4444,
    Pal8,
    Pal4,
    Unknown(u32),
}

impl RasterFormat {
    /// Maps the `(raster_format_flags, d3d_format)` pair of a parsed
    /// header to a canonical format. Palette bits on the flag word win
    /// over the numeric code; DXT is signalled by fourCC.
    pub fn from_codes(flags: RasterFormatFlags, d3d_format: u32) -> Self {
        if flags.pal8() {
            return RasterFormat::Pal8;
        }
        if flags.pal4() {
            return RasterFormat::Pal4;
        }
        match d3d_format {
            FOURCC_DXT1 => RasterFormat::Dxt1,
            FOURCC_DXT3 => RasterFormat::Dxt3,
            FOURCC_DXT5 => RasterFormat::Dxt5,
            0x15 => RasterFormat::Argb8888,
            0x14 => RasterFormat::Rgb888,
            0x02 => RasterFormat::Argb1555,
            0x01 => RasterFormat::Rgb565,
            0x03 => RasterFormat::Argb4444,
            0x05 => RasterFormat::Pal8,
            other => RasterFormat::Unknown(other),
        }
    }

    pub fn d3d_code(&self) -> u32 {
        match self {
            RasterFormat::Dxt1 => FOURCC_DXT1,
            RasterFormat::Dxt3 => FOURCC_DXT3,
            RasterFormat::Dxt5 => FOURCC_DXT5,
            RasterFormat::Argb8888 => 0x15,
            RasterFormat::Rgb888 => 0x14,
            RasterFormat::Argb1555 => 0x02,
            RasterFormat::Rgb565 => 0x01,
            RasterFormat::Argb4444 => 0x03,
            RasterFormat::Pal8 => 0x05,
            RasterFormat::Pal4 => 0x05,
            RasterFormat::Unknown(code) => *code,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            RasterFormat::Dxt1 | RasterFormat::Dxt3 | RasterFormat::Dxt5
        )
    }

    /// DXT block size in bytes, if this is a block-compressed format.
    pub fn block_size(&self) -> Option<usize> {
        match self {
            RasterFormat::Dxt1 => Some(8),
            RasterFormat::Dxt3 | RasterFormat::Dxt5 => Some(16),
            _ => None,
        }
    }

    /// Palette entry count for paletted formats (entries are 4-byte BGRA).
    pub fn palette_entries(&self) -> Option<usize> {
        match self {
            RasterFormat::Pal8 => Some(256),
            RasterFormat::Pal4 => Some(16),
            _ => None,
        }
    }

    /// The exact payload length of one mip level, or `None` for unknown
    /// formats whose layout we cannot compute.
    pub fn level_byte_len(&self, width: u16, height: u16) -> Option<usize> {
        let (w, h) = (width as usize, height as usize);
        match self {
            RasterFormat::Dxt1 => Some(8 * w.div_ceil(4) * h.div_ceil(4)),
            RasterFormat::Dxt3 | RasterFormat::Dxt5 => Some(16 * w.div_ceil(4) * h.div_ceil(4)),
            RasterFormat::Argb8888 => Some(w * h * 4),
            RasterFormat::Rgb888 => Some(w * h * 3),
            RasterFormat::Argb1555 | RasterFormat::Rgb565 | RasterFormat::Argb4444 => {
                Some(w * h * 2)
            }
            RasterFormat::Pal8 => Some(w * h),
            RasterFormat::Pal4 => Some((w * h).div_ceil(2)),
            RasterFormat::Unknown(_) => None,
        }
    }

    pub fn depth(&self) -> u8 {
        match self {
            RasterFormat::Dxt1 | RasterFormat::Pal4 => 4,
            RasterFormat::Dxt3 | RasterFormat::Dxt5 | RasterFormat::Pal8 => 8,
            RasterFormat::Argb1555 | RasterFormat::Rgb565 | RasterFormat::Argb4444 => 16,
            RasterFormat::Rgb888 => 24,
            RasterFormat::Argb8888 => 32,
            RasterFormat::Unknown(_) => 0,
        }
    }
}

/// Swaps the R and B channels of a BGRA buffer, yielding RGBA. The alpha
/// byte is copied through untouched, never recomputed.
pub fn bgra_to_rgba(bgra: &[u8]) -> Vec<u8> {
    let mut rgba = bgra.to_vec();
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    rgba
}

/// The inverse of [bgra_to_rgba]; the swap is its own inverse.
pub fn rgba_to_bgra(rgba: &[u8]) -> Vec<u8> {
    bgra_to_rgba(rgba)
}

/// Expands a stored BGR buffer to RGBA with alpha forced to 255.
pub fn bgr_to_rgba(bgr: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(bgr.len() / 3 * 4);
    for px in bgr.chunks_exact(3) {
        rgba.extend_from_slice(&[px[2], px[1], px[0], 255]);
    }
    rgba
}

pub fn rgba_to_bgr(rgba: &[u8]) -> Vec<u8> {
    let mut bgr = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        bgr.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    bgr
}

/// Expands one 16-bit texel to RGBA for the three 16-bit formats.
pub fn expand_16bit(format: RasterFormat, texel: u16) -> [u8; 4] {
    match format {
        RasterFormat::Argb1555 => {
            let a = if texel & 0x8000 != 0 { 255 } else { 0 };
            let r = ((texel >> 10) & 0x1F) as u8;
            let g = ((texel >> 5) & 0x1F) as u8;
            let b = (texel & 0x1F) as u8;
            [expand5(r), expand5(g), expand5(b), a]
        }
        RasterFormat::Rgb565 => {
            let r = ((texel >> 11) & 0x1F) as u8;
            let g = ((texel >> 5) & 0x3F) as u8;
            let b = (texel & 0x1F) as u8;
            [expand5(r), expand6(g), expand5(b), 255]
        }
        RasterFormat::Argb4444 => {
            let a = ((texel >> 12) & 0xF) as u8;
            let r = ((texel >> 8) & 0xF) as u8;
            let g = ((texel >> 4) & 0xF) as u8;
            let b = (texel & 0xF) as u8;
            [r * 17, g * 17, b * 17, a * 17]
        }
        _ => [0, 0, 0, 255],
    }
}

/// Packs one RGBA texel into a 16-bit texel; the inverse of
/// [expand_16bit] up to quantization.
pub fn pack_16bit(format: RasterFormat, px: [u8; 4]) -> u16 {
    let [r, g, b, a] = px.map(u16::from);
    match format {
        RasterFormat::Argb1555 => {
            let alpha = if a >= 128 { 0x8000 } else { 0 };
            alpha | ((r >> 3) << 10) | ((g >> 3) << 5) | (b >> 3)
        }
        RasterFormat::Rgb565 => ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3),
        RasterFormat::Argb4444 => ((a >> 4) << 12) | ((r >> 4) << 8) | ((g >> 4) << 4) | (b >> 4),
        _ => 0,
    }
}

pub(crate) fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

pub(crate) fn expand6(v: u8) -> u8 {
    (v << 2) | (v >> 4)
}
