//! The TXD (Texture Dictionary) codec.
//!
//! A [TextureDictionary] is parsed from a complete byte buffer and holds
//! every texture with its original encoded bytes, so a dictionary that is
//! never edited writes back byte-identically. Decoded RGBA copies exist
//! purely for display and are produced on demand.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{RwError, Warning};
use crate::rw::{detect_version, Game, Platform, RwVersion};

pub mod builder;
pub mod dxt;
mod parser;
pub mod raster;

pub use builder::TxdBuilder;
pub use raster::{RasterFormat, RasterFormatFlags};

/// Texture and alpha names are stored in 32-byte fields, so 31 characters
/// plus the terminator is the hard limit.
pub const MAX_NAME_LEN: usize = 31;

/// An ordered dictionary of textures plus the stream version and device
/// id it was read with. Textures are kept in on-disk order and written
/// back in the same order.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDictionary {
    pub version: RwVersion,
    pub device_id: u16,
    pub textures: Vec<Texture>,
    /// Non-fatal findings collected while parsing. Empty for a
    /// dictionary built from scratch.
    pub warnings: Vec<Warning>,
}

impl TextureDictionary {
    pub fn new(version: RwVersion, device_id: u16) -> Self {
        Self {
            version,
            device_id,
            textures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, RwError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_memory(&mmap[..])
    }

    pub fn from_memory(data: &[u8]) -> Result<Self, RwError> {
        let mut reader = Cursor::new(data);
        parser::read_dictionary(&mut reader)
    }

    /// Serializes the dictionary. Unedited textures are emitted from
    /// their original encoded bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RwError> {
        TxdBuilder::new(self).build_in_memory()
    }

    pub fn build(&self, path: &Path) -> Result<(), RwError> {
        TxdBuilder::new(self).build(path)
    }

    /// The game and platform this dictionary's version/device pair maps
    /// to, if the pair is in the known table.
    pub fn detect(&self) -> Option<(Game, Platform)> {
        detect_version(self.version.id(), self.device_id)
    }

    pub fn texture(&self, name: &str) -> Option<&Texture> {
        self.textures.iter().find(|t| t.name == name)
    }

    pub fn texture_mut(&mut self, name: &str) -> Option<&mut Texture> {
        self.textures.iter_mut().find(|t| t.name == name)
    }

    pub fn add_texture(&mut self, texture: Texture) -> &mut Self {
        self.textures.push(texture);
        self
    }

    pub fn remove_texture(&mut self, name: &str) -> Option<Texture> {
        let index = self.textures.iter().position(|t| t.name == name)?;
        Some(self.textures.remove(index))
    }

    pub fn rename_texture(&mut self, name: &str, new_name: &str) -> bool {
        match self.texture_mut(name) {
            Some(texture) => {
                texture.name = new_name.chars().take(MAX_NAME_LEN).collect();
                true
            }
            None => false,
        }
    }
}

/// Pixel storage for one mip level.
///
/// A freshly parsed level is `Encoded`; decoding for display moves it to
/// `Both`; editing replaces it with `Decoded`, which forces the
/// serializer to re-encode. The encoded bytes always win on write, which
/// is what makes unedited round trips byte-exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    Encoded(Vec<u8>),
    Decoded(Vec<u8>),
    Both { encoded: Vec<u8>, decoded: Vec<u8> },
}

impl PixelData {
    pub fn encoded(&self) -> Option<&[u8]> {
        match self {
            PixelData::Encoded(bytes) | PixelData::Both { encoded: bytes, .. } => Some(bytes),
            PixelData::Decoded(_) => None,
        }
    }

    pub fn decoded(&self) -> Option<&[u8]> {
        match self {
            PixelData::Decoded(rgba) | PixelData::Both { decoded: rgba, .. } => Some(rgba),
            PixelData::Encoded(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u16,
    pub height: u16,
    pub data: PixelData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BumpMapKind {
    Height,
    Normal,
    Combined,
}

impl BumpMapKind {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(BumpMapKind::Height),
            1 => Some(BumpMapKind::Normal),
            2 => Some(BumpMapKind::Combined),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            BumpMapKind::Height => 0,
            BumpMapKind::Normal => 1,
            BumpMapKind::Combined => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpMap {
    pub kind: BumpMapKind,
    pub data: Vec<u8>,
}

/// One texture of a dictionary, in its platform encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    /// Name of the alpha mask, empty when the texture has none.
    pub alpha_name: String,
    pub platform_id: u32,
    pub filter_flags: u32,
    pub raster_format_flags: RasterFormatFlags,
    pub format: RasterFormat,
    pub width: u16,
    pub height: u16,
    pub depth: u8,
    pub raster_type: u8,
    pub compression: u8,
    /// BGRA palette entries for PAL4/PAL8 rasters.
    pub palette: Option<Vec<u8>>,
    /// At least one level; level 0 is the base image and dimensions
    /// halve (clamped to 1) per level.
    pub mip_levels: Vec<MipLevel>,
    pub bumpmap: Option<BumpMap>,
    /// RGB bytes, `width * height * 3` when present.
    pub reflection_map: Option<Vec<u8>>,
    /// Grayscale bytes, `width * height` when present.
    pub fresnel_map: Option<Vec<u8>>,
}

impl Texture {
    pub fn has_alpha(&self) -> bool {
        self.raster_format_flags.has_alpha()
    }

    /// Decodes one mip level to RGBA for display. Returns `None` for
    /// unknown formats or missing levels; the encoded bytes stay intact.
    pub fn decode_level(&self, level: usize) -> Option<Vec<u8>> {
        let mip = self.mip_levels.get(level)?;
        if let Some(rgba) = mip.data.decoded() {
            return Some(rgba.to_vec());
        }
        let encoded = mip.data.encoded()?;
        decode_pixels(self.format, encoded, self.palette.as_deref(), mip.width, mip.height)
    }

    /// Replaces the base image with caller-provided RGBA pixels.
    ///
    /// The encoded copy and any further mip levels are invalidated, the
    /// alpha flag is re-derived from the new pixels, and the serializer
    /// will re-encode on the next write.
    pub fn replace_pixels(&mut self, rgba: Vec<u8>, width: u16, height: u16) {
        let has_alpha = rgba.chunks_exact(4).any(|px| px[3] != 255);
        self.width = width;
        self.height = height;
        self.mip_levels = vec![MipLevel {
            width,
            height,
            data: PixelData::Decoded(rgba),
        }];
        self.raster_format_flags.set_has_alpha(has_alpha);
        self.raster_format_flags.set_mipmapped(false);
        if !has_alpha {
            self.alpha_name.clear();
        }
    }
}

/// Decodes an encoded payload of any known format to RGBA.
pub(crate) fn decode_pixels(
    format: RasterFormat,
    encoded: &[u8],
    palette: Option<&[u8]>,
    width: u16,
    height: u16,
) -> Option<Vec<u8>> {
    let texel_count = width as usize * height as usize;
    match format {
        RasterFormat::Dxt1 | RasterFormat::Dxt3 | RasterFormat::Dxt5 => {
            dxt::decode(format, encoded, width, height)
        }
        RasterFormat::Argb8888 => {
            (encoded.len() >= texel_count * 4).then(|| raster::bgra_to_rgba(encoded))
        }
        RasterFormat::Rgb888 => {
            (encoded.len() >= texel_count * 3).then(|| raster::bgr_to_rgba(encoded))
        }
        RasterFormat::Argb1555 | RasterFormat::Rgb565 | RasterFormat::Argb4444 => {
            if encoded.len() < texel_count * 2 {
                return None;
            }
            let mut rgba = Vec::with_capacity(texel_count * 4);
            for texel in encoded[..texel_count * 2].chunks_exact(2) {
                let raw = u16::from_le_bytes([texel[0], texel[1]]);
                rgba.extend_from_slice(&raster::expand_16bit(format, raw));
            }
            Some(rgba)
        }
        RasterFormat::Pal8 => {
            let palette = palette?;
            if encoded.len() < texel_count || palette.len() < 256 * 4 {
                return None;
            }
            let mut rgba = Vec::with_capacity(texel_count * 4);
            for &index in &encoded[..texel_count] {
                let entry = &palette[index as usize * 4..][..4];
                rgba.extend_from_slice(&[entry[2], entry[1], entry[0], entry[3]]);
            }
            Some(rgba)
        }
        RasterFormat::Pal4 => {
            let palette = palette?;
            if encoded.len() < texel_count.div_ceil(2) || palette.len() < 16 * 4 {
                return None;
            }
            let mut rgba = Vec::with_capacity(texel_count * 4);
            for i in 0..texel_count {
                let byte = encoded[i / 2];
                let index = if i % 2 == 0 { byte & 0xF } else { byte >> 4 };
                let entry = &palette[index as usize * 4..][..4];
                rgba.extend_from_slice(&[entry[2], entry[1], entry[0], entry[3]]);
            }
            Some(rgba)
        }
        RasterFormat::Unknown(_) => None,
    }
}
