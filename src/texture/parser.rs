//! Texture Native parsing internals.

use std::io::{Cursor, Read, Seek, SeekFrom};

use binrw::{BinRead, BinReaderExt};
use log::debug;

use super::raster::{RasterFormat, RasterFormatFlags};
use super::{BumpMap, BumpMapKind, MipLevel, PixelData, Texture, TextureDictionary};
use crate::error::{RwError, Warning};
use crate::rw::{self, detect_version, SectionType};
use crate::utils::read_fixed_string;

/// The fixed header at the start of every Texture Native struct.
#[derive(BinRead, Debug)]
#[br(little)]
struct TextureNativeHeader {
    platform_id: u32,
    filter_flags: u32,
    name: [u8; 32],
    alpha_name: [u8; 32],
    raster_format_flags: u32,
    d3d_format: u32,
    width: u16,
    height: u16,
    depth: u8,
    mipmap_count: u8,
    raster_type: u8,
    compression: u8,
    total_data_size: u32,
}

pub(super) fn read_dictionary(reader: &mut Cursor<&[u8]>) -> Result<TextureDictionary, RwError> {
    let offset = reader.position();
    let outer = rw::read_header(reader)?;
    if !outer.is(SectionType::TextureDictionary) {
        return Err(RwError::FormatSignature {
            expected: "TXD",
            found: outer.section_type,
            offset,
        });
    }

    let dict_struct = rw::expect_section(reader, SectionType::Struct)?;
    let struct_end = reader.position() + dict_struct.size as u64;
    let texture_count: u16 = reader.read_le()?;
    let device_id: u16 = reader.read_le()?;
    reader.seek(SeekFrom::Start(struct_end))?;

    let mut dictionary = TextureDictionary::new(outer.version(), device_id);
    if detect_version(outer.version_id, device_id).is_none() {
        dictionary.warnings.push(Warning::UnknownVariant {
            context: format!("version/device pair (device {device_id})"),
            code: outer.version_id,
        });
    }

    for _ in 0..texture_count {
        read_texture_native(reader, &mut dictionary)?;
    }

    // The dictionary's own (normally empty) extension.
    let remaining = reader.get_ref().len() as u64 - reader.position();
    if remaining >= 12 {
        rw::skip_section(reader)?;
    }

    Ok(dictionary)
}

fn read_texture_native(
    reader: &mut Cursor<&[u8]>,
    dictionary: &mut TextureDictionary,
) -> Result<(), RwError> {
    let native = rw::expect_section(reader, SectionType::TextureNative)?;
    let native_end = reader.position() + native.size as u64;

    let native_struct = rw::expect_section(reader, SectionType::Struct)?;
    let struct_end = reader.position() + native_struct.size as u64;

    let header: TextureNativeHeader = reader.read_le()?;
    let name = read_fixed_string(&header.name);
    let flags = RasterFormatFlags::from_raw(header.raster_format_flags);
    let format = RasterFormat::from_codes(flags, header.d3d_format);
    if let RasterFormat::Unknown(code) = format {
        dictionary.warnings.push(Warning::UnknownVariant {
            context: format!("raster format of texture '{name}'"),
            code,
        });
    }

    let palette = match format.palette_entries() {
        Some(entries) => Some(read_bytes(reader, entries * 4, struct_end)?),
        None => None,
    };

    let mip_levels = read_mip_levels(reader, &header, format, struct_end)?;

    let mut texture = Texture {
        name,
        alpha_name: read_fixed_string(&header.alpha_name),
        platform_id: header.platform_id,
        filter_flags: header.filter_flags,
        raster_format_flags: flags,
        format,
        width: header.width,
        height: header.height,
        depth: header.depth,
        raster_type: header.raster_type,
        compression: header.compression,
        palette,
        mip_levels,
        bumpmap: None,
        reflection_map: None,
        fresnel_map: None,
    };

    read_trailers(reader, struct_end, &mut texture, &mut dictionary.warnings)?;

    if reader.position() < struct_end {
        debug!(
            "texture '{}': skipping {} unparsed struct bytes",
            texture.name,
            struct_end - reader.position()
        );
    }
    reader.seek(SeekFrom::Start(struct_end))?;

    let extension = rw::expect_section(reader, SectionType::Extension)?;
    reader.seek(SeekFrom::Current(extension.size as i64))?;

    reader.seek(SeekFrom::Start(native_end))?;
    dictionary.textures.push(texture);
    Ok(())
}

fn read_mip_levels(
    reader: &mut Cursor<&[u8]>,
    header: &TextureNativeHeader,
    format: RasterFormat,
    struct_end: u64,
) -> Result<Vec<MipLevel>, RwError> {
    let mut levels = Vec::new();
    let count = header.mipmap_count.max(1);

    if let RasterFormat::Unknown(_) = format {
        // Keep the whole payload opaque as a single level so the
        // texture survives a round trip.
        let bytes = read_bytes(reader, header.total_data_size as usize, struct_end)?;
        levels.push(MipLevel {
            width: header.width,
            height: header.height,
            data: PixelData::Encoded(bytes),
        });
        return Ok(levels);
    }

    let mut width = header.width;
    let mut height = header.height;
    for _ in 0..count {
        let len = format
            .level_byte_len(width, height)
            .unwrap_or(header.total_data_size as usize);
        let bytes = read_bytes(reader, len, struct_end)?;
        levels.push(MipLevel {
            width,
            height,
            data: PixelData::Encoded(bytes),
        });
        if width == 1 && height == 1 {
            break;
        }
        width = (width / 2).max(1);
        height = (height / 2).max(1);
    }
    Ok(levels)
}

/// Optional trailing records, read speculatively in strict order:
/// bumpmap, reflection map, fresnel map. Any validation failure rolls
/// the cursor back so a malformed trailer cannot corrupt the texture.
fn read_trailers(
    reader: &mut Cursor<&[u8]>,
    struct_end: u64,
    texture: &mut Texture,
    warnings: &mut Vec<Warning>,
) -> Result<(), RwError> {
    let texels = texture.width as u64 * texture.height as u64;

    if texture.raster_format_flags.has_bumpmap() {
        let rollback = reader.position();
        match try_read_bumpmap(reader, struct_end, texels) {
            Some(bumpmap) => texture.bumpmap = Some(bumpmap),
            None => {
                reader.seek(SeekFrom::Start(rollback))?;
                warnings.push(Warning::DiscardedTrailer {
                    context: format!("bumpmap of texture '{}'", texture.name),
                });
            }
        }
    }

    let rollback = reader.position();
    match try_read_sized(reader, struct_end, texels * 3) {
        Some(reflection) => {
            texture.reflection_map = Some(reflection);
            let rollback = reader.position();
            match try_read_sized(reader, struct_end, texels) {
                Some(fresnel) => texture.fresnel_map = Some(fresnel),
                None => {
                    reader.seek(SeekFrom::Start(rollback))?;
                }
            }
        }
        None => {
            reader.seek(SeekFrom::Start(rollback))?;
        }
    }

    Ok(())
}

fn try_read_bumpmap(
    reader: &mut Cursor<&[u8]>,
    struct_end: u64,
    texels: u64,
) -> Option<BumpMap> {
    if struct_end - reader.position() < 5 {
        return None;
    }
    let size: u32 = reader.read_le().ok()?;
    let kind_raw: u8 = reader.read_le().ok()?;
    let kind = BumpMapKind::from_raw(kind_raw)?;
    if size == 0 || size as u64 > texels * 4 || reader.position() + size as u64 > struct_end {
        return None;
    }
    let mut data = vec![0u8; size as usize];
    reader.read_exact(&mut data).ok()?;
    Some(BumpMap { kind, data })
}

/// A `{ size: u32, bytes[size] }` trailer accepted only when the size
/// field matches `expected` exactly and the bytes fit.
fn try_read_sized(reader: &mut Cursor<&[u8]>, struct_end: u64, expected: u64) -> Option<Vec<u8>> {
    if struct_end - reader.position() < 4 {
        return None;
    }
    let size: u32 = reader.read_le().ok()?;
    if size as u64 != expected || reader.position() + size as u64 > struct_end {
        return None;
    }
    let mut data = vec![0u8; size as usize];
    reader.read_exact(&mut data).ok()?;
    Some(data)
}

fn read_bytes(reader: &mut Cursor<&[u8]>, len: usize, limit: u64) -> Result<Vec<u8>, RwError> {
    let offset = reader.position();
    let available = limit.saturating_sub(offset);
    if len as u64 > available {
        return Err(RwError::TruncatedData {
            section_type: SectionType::TextureNative as u32,
            offset,
            declared: len as u64,
            available,
        });
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}
