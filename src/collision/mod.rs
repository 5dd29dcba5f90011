//! The COL (collision archive) codec.
//!
//! An archive is one or more collision models concatenated, each opening
//! with a 4-byte magic that names its on-disk version. COL1 stores float
//! vertices; COL2 and later quantize them to int16 at a fixed scale of
//! 128. The parser is deliberately tolerant of the garbage face counts
//! found in real files; see [parser] for the repair rules.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use glam::Vec3;
use memmap2::Mmap;
use modular_bitfield::prelude::*;

use crate::error::{RwError, Warning};

pub mod builder;
mod parser;

pub use builder::ColBuilder;

/// COL model names live in a 22-byte field: 21 characters plus terminator.
pub const MAX_NAME_LEN: usize = 21;

/// Quantization scale for COL2+ int16 vertices.
pub const VERTEX_SCALE: f32 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColVersion {
    Col1,
    Col2,
    Col3,
    Col4,
}

impl ColVersion {
    pub fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        match magic {
            b"COLL" => Some(ColVersion::Col1),
            b"COL2" => Some(ColVersion::Col2),
            b"COL3" => Some(ColVersion::Col3),
            b"COL4" => Some(ColVersion::Col4),
            _ => None,
        }
    }

    pub fn magic(&self) -> [u8; 4] {
        match self {
            ColVersion::Col1 => *b"COLL",
            ColVersion::Col2 => *b"COL2",
            ColVersion::Col3 => *b"COL3",
            ColVersion::Col4 => *b"COL4",
        }
    }

    /// Bytes of one on-disk face record for this version.
    pub fn face_stride(&self) -> usize {
        match self {
            ColVersion::Col1 => 16,
            _ => 8,
        }
    }

    pub fn has_quantized_vertices(&self) -> bool {
        !matches!(self, ColVersion::Col1)
    }
}

/// Presence bits in the COL2+ model header.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColFlags {
    pub has_spheres: bool,
    pub has_boxes: bool,
    pub has_mesh: bool,
    pub has_face_groups: bool,
    pub has_shadow_mesh: bool,
    pub pad: B27,
}

impl ColFlags {
    pub fn from_raw(raw: u32) -> Self {
        Self::from_bytes(raw.to_le_bytes())
    }

    pub fn to_raw(self) -> u32 {
        u32::from_le_bytes(Self::into_bytes(self))
    }
}

/// The 4-byte surface descriptor shared by spheres, boxes and faces.
/// COL1 stores all four bytes per face; COL2+ compact faces keep only
/// material and light on disk, so flag and brightness parse as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Surface {
    pub material: u8,
    pub flag: u8,
    pub brightness: u8,
    pub light: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub surface: Surface,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColBox {
    pub min: Vec3,
    pub max: Vec3,
    pub surface: Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Face {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub surface: Surface,
}

/// A COL3+ bounding-box index entry over a contiguous face range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceGroup {
    pub min: Vec3,
    pub max: Vec3,
    pub start_face: u16,
    pub end_face: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub radius: f32,
    pub center: Vec3,
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            radius: 0.0,
            center: Vec3::ZERO,
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShadowMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
}

/// One collision model of an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionModel {
    pub version: ColVersion,
    pub name: String,
    pub model_id: u16,
    pub bounds: Bounds,
    pub spheres: Vec<Sphere>,
    pub boxes: Vec<ColBox>,
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
    pub face_groups: Vec<FaceGroup>,
    /// COL4 only.
    pub shadow_mesh: Option<ShadowMesh>,
    /// The face count exactly as the header declared it.
    pub header_face_count: u32,
    /// Set when the header count was implausible and the parser
    /// recomputed one from the body size. The header value above is
    /// never overwritten; the caller decides which to trust.
    pub calculated_face_count: Option<u32>,
}

impl CollisionModel {
    pub fn new(version: ColVersion, name: &str) -> Self {
        Self {
            version,
            name: name.chars().take(MAX_NAME_LEN).collect(),
            model_id: 0,
            bounds: Bounds::default(),
            spheres: Vec::new(),
            boxes: Vec::new(),
            vertices: Vec::new(),
            faces: Vec::new(),
            face_groups: Vec::new(),
            shadow_mesh: None,
            header_face_count: 0,
            calculated_face_count: None,
        }
    }

    /// Changes the target on-disk version. Geometry stays in floats;
    /// quantization happens at write time, so converting is just a
    /// retag plus dropping records the target cannot carry.
    pub fn convert_to(&mut self, version: ColVersion) {
        if matches!(version, ColVersion::Col1 | ColVersion::Col2) {
            self.face_groups.clear();
        }
        if version != ColVersion::Col4 {
            self.shadow_mesh = None;
        }
        self.version = version;
    }

    /// Recomputes bounds from the geometry extremes: vertices, sphere
    /// extents and box corners.
    pub fn recompute_bounds(&mut self) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        let mut any = false;

        for v in &self.vertices {
            min = min.min(*v);
            max = max.max(*v);
            any = true;
        }
        for s in &self.spheres {
            min = min.min(s.center - Vec3::splat(s.radius));
            max = max.max(s.center + Vec3::splat(s.radius));
            any = true;
        }
        for b in &self.boxes {
            min = min.min(b.min);
            max = max.max(b.max);
            any = true;
        }

        if !any {
            self.bounds = Bounds::default();
            return;
        }

        let center = (min + max) * 0.5;
        let mut radius = center.distance(max).max(center.distance(min));
        for s in &self.spheres {
            radius = radius.max(center.distance(s.center) + s.radius);
        }
        self.bounds = Bounds {
            radius,
            center,
            min,
            max,
        };
    }

    /// The presence flags the serializer will stamp on a COL2+ header.
    pub fn flags(&self) -> ColFlags {
        ColFlags::new()
            .with_has_spheres(!self.spheres.is_empty())
            .with_has_boxes(!self.boxes.is_empty())
            .with_has_mesh(!self.faces.is_empty())
            .with_has_face_groups(!self.face_groups.is_empty())
            .with_has_shadow_mesh(self.shadow_mesh.is_some())
    }
}

/// An ordered sequence of collision models parsed from one buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollisionArchive {
    pub models: Vec<CollisionModel>,
    pub warnings: Vec<Warning>,
}

impl CollisionArchive {
    pub fn from_file(path: &Path) -> Result<Self, RwError> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_memory(&mmap[..])
    }

    pub fn from_memory(data: &[u8]) -> Result<Self, RwError> {
        let mut reader = Cursor::new(data);
        parser::read_archive(&mut reader)
    }

    /// Serializes every model back as its own version.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RwError> {
        ColBuilder::new(self).build_in_memory()
    }

    pub fn build(&self, path: &Path) -> Result<(), RwError> {
        ColBuilder::new(self).build(path)
    }

    pub fn model(&self, name: &str) -> Option<&CollisionModel> {
        self.models.iter().find(|m| m.name == name)
    }
}

/// Quantizes a float coordinate to the COL2+ int16 grid, saturating at
/// the type bounds instead of wrapping.
pub(crate) fn quantize(v: f32) -> i16 {
    (v * VERTEX_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

pub(crate) fn dequantize(v: i16) -> f32 {
    v as f32 / VERTEX_SCALE
}
