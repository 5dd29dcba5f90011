//! The RenderWare binary stream toolkit shared by the TXD codec.
//!
//! Every RenderWare file is a tree of typed sections, each introduced by a
//! 12-byte header. The walker here never trusts a declared size without
//! checking it against the remaining buffer, so a truncated child section
//! fails the parse instead of reading out of bounds.

use std::io::{Cursor, Seek, SeekFrom};

use binrw::{binrw, BinReaderExt};

use crate::error::RwError;

pub mod version;

pub use version::{detect_version, recommended_version, Game, Platform, RwVersion, KNOWN_VERSIONS};

/// Section ids used by the texture dictionary format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SectionType {
    Struct = 0x01,
    String = 0x02,
    Extension = 0x03,
    TextureNative = 0x15,
    TextureDictionary = 0x16,
}

/// The 12-byte header preceding every section.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy)]
pub struct SectionHeader {
    pub section_type: u32,
    pub size: u32,
    pub version_id: u32,
}

impl SectionHeader {
    pub fn version(&self) -> RwVersion {
        RwVersion::from_id(self.version_id)
    }

    pub fn is(&self, ty: SectionType) -> bool {
        self.section_type == ty as u32
    }
}

/// Reads a section header and verifies that the declared payload fits in
/// the buffer behind the cursor.
pub fn read_header(reader: &mut Cursor<&[u8]>) -> Result<SectionHeader, RwError> {
    let offset = reader.position();
    let header: SectionHeader = reader.read_le()?;
    let available = reader.get_ref().len() as u64 - reader.position();
    if header.size as u64 > available {
        return Err(RwError::TruncatedData {
            section_type: header.section_type,
            offset,
            declared: header.size as u64,
            available,
        });
    }
    Ok(header)
}

/// Reads a section header, failing unless it announces `expected`.
pub fn expect_section(
    reader: &mut Cursor<&[u8]>,
    expected: SectionType,
) -> Result<SectionHeader, RwError> {
    let offset = reader.position();
    let header = read_header(reader)?;
    if !header.is(expected) {
        return Err(RwError::UnexpectedSection {
            expected: expected as u32,
            found: header.section_type,
            offset,
        });
    }
    Ok(header)
}

/// Advances past a whole section, header included.
pub fn skip_section(reader: &mut Cursor<&[u8]>) -> Result<SectionHeader, RwError> {
    let header = read_header(reader)?;
    reader.seek(SeekFrom::Current(header.size as i64))?;
    Ok(header)
}
