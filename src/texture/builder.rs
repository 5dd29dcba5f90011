//! TXD serialization.
//!
//! The builder mirrors the on-disk layout of the parser exactly. The one
//! crucial contract is the bitwise round trip: a texture that was never
//! edited is emitted from its original encoded bytes, and re-encoding
//! from RGBA happens only when the caller replaced pixel data.

use std::fs::File;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use binrw::BinWrite;

use super::raster::{self, RasterFormat};
use super::{PixelData, Texture, TextureDictionary, dxt};
use crate::error::RwError;
use crate::rw::{SectionHeader, SectionType};
use crate::utils::write_fixed_string;

/// Serializes a [TextureDictionary] to bytes or a file.
pub struct TxdBuilder<'a> {
    dictionary: &'a TextureDictionary,
}

impl<'a> TxdBuilder<'a> {
    pub fn new(dictionary: &'a TextureDictionary) -> Self {
        Self { dictionary }
    }

    pub fn build(self, path: &Path) -> Result<(), RwError> {
        let mut file = File::create(path)?;
        self.build_internal(&mut file)
    }

    pub fn build_in_memory(self) -> Result<Vec<u8>, RwError> {
        let mut writer = Cursor::new(vec![]);
        self.build_internal(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn build_internal<W: Write + Seek>(&self, writer: &mut W) -> Result<(), RwError> {
        let version_id = self.dictionary.version.id();

        let dict = begin_section(writer, SectionType::TextureDictionary, version_id)?;
        {
            let dict_struct = begin_section(writer, SectionType::Struct, version_id)?;
            (self.dictionary.textures.len() as u16).write_le(writer)?;
            self.dictionary.device_id.write_le(writer)?;
            end_section(writer, dict_struct)?;

            for texture in &self.dictionary.textures {
                self.write_texture_native(writer, texture, version_id)?;
            }

            let extension = begin_section(writer, SectionType::Extension, version_id)?;
            end_section(writer, extension)?;
        }
        end_section(writer, dict)
    }

    fn write_texture_native<W: Write + Seek>(
        &self,
        writer: &mut W,
        texture: &Texture,
        version_id: u32,
    ) -> Result<(), RwError> {
        let payloads = encode_levels(texture)?;
        let total_data_size = compute_total_data_size(texture, &payloads);

        // A texture with alpha must carry a mask name; fall back to the
        // texture's own name rather than writing an empty field.
        let alpha_name = if texture.has_alpha() && texture.alpha_name.is_empty() {
            texture.name.as_str()
        } else {
            texture.alpha_name.as_str()
        };

        let native = begin_section(writer, SectionType::TextureNative, version_id)?;
        {
            let native_struct = begin_section(writer, SectionType::Struct, version_id)?;

            texture.platform_id.write_le(writer)?;
            texture.filter_flags.write_le(writer)?;
            write_fixed_string::<32>(&texture.name).write_le(writer)?;
            write_fixed_string::<32>(alpha_name).write_le(writer)?;
            texture.raster_format_flags.to_raw().write_le(writer)?;
            texture.format.d3d_code().write_le(writer)?;
            texture.width.write_le(writer)?;
            texture.height.write_le(writer)?;
            texture.depth.write_le(writer)?;
            (texture.mip_levels.len() as u8).write_le(writer)?;
            texture.raster_type.write_le(writer)?;
            texture.compression.write_le(writer)?;
            total_data_size.write_le(writer)?;

            if let Some(palette) = &texture.palette {
                writer.write_all(palette)?;
            }

            for payload in &payloads {
                writer.write_all(payload)?;
            }

            if let Some(bumpmap) = &texture.bumpmap {
                (bumpmap.data.len() as u32).write_le(writer)?;
                bumpmap.kind.to_raw().write_le(writer)?;
                writer.write_all(&bumpmap.data)?;
            }
            if let Some(reflection) = &texture.reflection_map {
                (reflection.len() as u32).write_le(writer)?;
                writer.write_all(reflection)?;
            }
            if let Some(fresnel) = &texture.fresnel_map {
                (fresnel.len() as u32).write_le(writer)?;
                writer.write_all(fresnel)?;
            }

            end_section(writer, native_struct)?;

            let extension = begin_section(writer, SectionType::Extension, version_id)?;
            end_section(writer, extension)?;
        }
        end_section(writer, native)
    }
}

/// Collects the encoded payload of every mip level, in ascending level
/// order, re-encoding from RGBA only where no encoded copy exists.
fn encode_levels(texture: &Texture) -> Result<Vec<Vec<u8>>, RwError> {
    if texture.mip_levels.is_empty() {
        return Err(RwError::InvariantViolation(format!(
            "texture '{}' has no mip levels",
            texture.name
        )));
    }
    if let Some(entries) = texture.format.palette_entries() {
        let palette_len = texture.palette.as_ref().map(Vec::len).unwrap_or(0);
        if palette_len != entries * 4 {
            return Err(RwError::InvariantViolation(format!(
                "texture '{}' needs a {}-entry palette, found {} bytes",
                texture.name,
                entries,
                palette_len
            )));
        }
    }

    let mut payloads = Vec::with_capacity(texture.mip_levels.len());
    for (level, mip) in texture.mip_levels.iter().enumerate() {
        let expected = texture.format.level_byte_len(mip.width, mip.height);
        let payload = match &mip.data {
            PixelData::Encoded(bytes) | PixelData::Both { encoded: bytes, .. } => bytes.clone(),
            PixelData::Decoded(rgba) => {
                reencode_level(texture, level, rgba, mip.width, mip.height)?
            }
        };
        if let Some(expected) = expected {
            if payload.len() != expected {
                return Err(RwError::InvariantViolation(format!(
                    "texture '{}' level {}: payload is {} bytes, format requires {}",
                    texture.name,
                    level,
                    payload.len(),
                    expected
                )));
            }
        }
        payloads.push(payload);
    }
    Ok(payloads)
}

fn reencode_level(
    texture: &Texture,
    level: usize,
    rgba: &[u8],
    width: u16,
    height: u16,
) -> Result<Vec<u8>, RwError> {
    let fail = |reason: &str| {
        RwError::InvariantViolation(format!(
            "texture '{}' level {level}: cannot re-encode: {reason}",
            texture.name
        ))
    };

    match texture.format {
        RasterFormat::Dxt1 | RasterFormat::Dxt3 | RasterFormat::Dxt5 => {
            dxt::encode(texture.format, rgba, width, height)
                .ok_or_else(|| fail("RGBA buffer shorter than the image"))
        }
        RasterFormat::Argb8888 => Ok(raster::rgba_to_bgra(rgba)),
        RasterFormat::Rgb888 => Ok(raster::rgba_to_bgr(rgba)),
        RasterFormat::Argb1555 | RasterFormat::Rgb565 | RasterFormat::Argb4444 => {
            let mut out = Vec::with_capacity(rgba.len() / 2);
            for px in rgba.chunks_exact(4) {
                let texel = raster::pack_16bit(texture.format, [px[0], px[1], px[2], px[3]]);
                out.extend_from_slice(&texel.to_le_bytes());
            }
            Ok(out)
        }
        RasterFormat::Pal8 | RasterFormat::Pal4 => {
            // Requantizing true color down to a palette is an authoring
            // operation, not a codec concern.
            Err(fail("paletted rasters cannot be rebuilt from RGBA"))
        }
        RasterFormat::Unknown(_) => Err(fail("unknown raster format")),
    }
}

fn compute_total_data_size(texture: &Texture, payloads: &[Vec<u8>]) -> u32 {
    let mut total: usize = payloads.iter().map(Vec::len).sum();
    if let RasterFormat::Unknown(_) = texture.format {
        // The parser sizes an opaque payload by this field alone, so it
        // must cover exactly the pixel bytes.
        return total as u32;
    }
    total += texture.palette.as_ref().map(Vec::len).unwrap_or(0);
    if let Some(bumpmap) = &texture.bumpmap {
        total += 4 + 1 + bumpmap.data.len();
    }
    if let Some(reflection) = &texture.reflection_map {
        total += 4 + reflection.len();
    }
    if let Some(fresnel) = &texture.fresnel_map {
        total += 4 + fresnel.len();
    }
    total as u32
}

struct OpenSection {
    header_offset: u64,
    section_type: u32,
    version_id: u32,
}

fn begin_section<W: Write + Seek>(
    writer: &mut W,
    section_type: SectionType,
    version_id: u32,
) -> Result<OpenSection, RwError> {
    let header_offset = writer.stream_position()?;
    SectionHeader {
        section_type: section_type as u32,
        size: 0,
        version_id,
    }
    .write(writer)?;
    Ok(OpenSection {
        header_offset,
        section_type: section_type as u32,
        version_id,
    })
}

/// Patches the declared size of a section once its children are written,
/// then returns to the end of the stream.
fn end_section<W: Write + Seek>(writer: &mut W, section: OpenSection) -> Result<(), RwError> {
    let end_offset = writer.stream_position()?;
    let size = end_offset - (section.header_offset + 12);
    writer.seek(SeekFrom::Start(section.header_offset))?;
    SectionHeader {
        section_type: section.section_type,
        size: size as u32,
        version_id: section.version_id,
    }
    .write(writer)?;
    writer.seek(SeekFrom::Start(end_offset))?;
    Ok(())
}
