//! COL parsing internals, including garbage face-count repair.
//!
//! Real archives in the wild carry face counts that would require more
//! bytes than the model (or the whole file) contains. Instead of failing
//! the load, the parser scans forward for the next model's magic, clamps
//! the count to what actually fits, and records the repair as a warning.
//! Both the header value and the recomputed one stay on the model.

use std::io::{Cursor, Read, Seek, SeekFrom};

use binrw::BinReaderExt;
use glam::Vec3;
use log::debug;

use super::{
    dequantize, Bounds, ColBox, ColFlags, ColVersion, CollisionArchive, CollisionModel, Face,
    FaceGroup, ShadowMesh, Sphere, Surface,
};
use crate::error::{RwError, Warning};
use crate::utils::read_fixed_string;

pub(super) fn read_archive(reader: &mut Cursor<&[u8]>) -> Result<CollisionArchive, RwError> {
    let mut archive = CollisionArchive::default();
    let len = reader.get_ref().len() as u64;

    while len - reader.position() >= 8 {
        read_model(reader, &mut archive)?;
    }

    if archive.models.is_empty() {
        return Err(RwError::FormatSignature {
            expected: "COL",
            found: 0,
            offset: reader.position(),
        });
    }
    Ok(archive)
}

fn read_model(reader: &mut Cursor<&[u8]>, archive: &mut CollisionArchive) -> Result<(), RwError> {
    let start = reader.position();
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    let version = ColVersion::from_magic(&magic).ok_or(RwError::FormatSignature {
        expected: "COL",
        found: u32::from_le_bytes(magic),
        offset: start,
    })?;

    let declared_size: u32 = reader.read_le()?;
    let buffer_len = reader.get_ref().len() as u64;
    // The size field covers everything after itself; clamp it to the
    // buffer so a lying header cannot push the model end out of bounds.
    let model_end = (start + 8 + declared_size as u64).min(buffer_len);

    let mut name_raw = [0u8; 22];
    reader.read_exact(&mut name_raw)?;
    let name = read_fixed_string(&name_raw);
    let model_id: u16 = reader.read_le()?;
    let bounds = read_bounds(reader)?;

    let mut model = CollisionModel {
        version,
        name,
        model_id,
        bounds,
        spheres: Vec::new(),
        boxes: Vec::new(),
        vertices: Vec::new(),
        faces: Vec::new(),
        face_groups: Vec::new(),
        shadow_mesh: None,
        header_face_count: 0,
        calculated_face_count: None,
    };

    match version {
        ColVersion::Col1 => read_col1_body(reader, model_end, &mut model, &mut archive.warnings)?,
        _ => read_col2_body(reader, model_end, &mut model, &mut archive.warnings)?,
    }

    if reader.position() < model_end {
        debug!(
            "model '{}': {} unparsed trailing bytes",
            model.name,
            model_end - reader.position()
        );
    }
    reader.seek(SeekFrom::Start(model_end))?;
    archive.models.push(model);
    Ok(())
}

fn read_col1_body(
    reader: &mut Cursor<&[u8]>,
    model_end: u64,
    model: &mut CollisionModel,
    warnings: &mut Vec<Warning>,
) -> Result<(), RwError> {
    let sphere_count: u32 = reader.read_le()?;
    for _ in 0..sphere_count {
        // COL1 sphere records put the radius before the center.
        let radius: f32 = reader.read_le()?;
        let center = read_vec3(reader)?;
        let surface = read_surface(reader)?;
        model.spheres.push(Sphere {
            center,
            radius,
            surface,
        });
    }

    let box_count: u32 = reader.read_le()?;
    for _ in 0..box_count {
        let min = read_vec3(reader)?;
        let max = read_vec3(reader)?;
        let surface = read_surface(reader)?;
        model.boxes.push(ColBox { min, max, surface });
    }

    let vertex_count: u32 = reader.read_le()?;
    for _ in 0..vertex_count {
        model.vertices.push(read_vec3(reader)?);
    }

    let face_count = read_repaired_face_count(reader, model_end, model, warnings)?;
    for _ in 0..face_count {
        let a: u32 = reader.read_le()?;
        let b: u32 = reader.read_le()?;
        let c: u32 = reader.read_le()?;
        let surface = read_surface(reader)?;
        model.faces.push(Face { a, b, c, surface });
    }
    Ok(())
}

fn read_col2_body(
    reader: &mut Cursor<&[u8]>,
    model_end: u64,
    model: &mut CollisionModel,
    warnings: &mut Vec<Warning>,
) -> Result<(), RwError> {
    let flags = ColFlags::from_raw(reader.read_le()?);

    let sphere_count: u32 = reader.read_le()?;
    let box_count: u32 = reader.read_le()?;
    let vertex_count: u32 = reader.read_le()?;
    let header_face_count: u32 = reader.read_le()?;
    model.header_face_count = header_face_count;

    let face_group_count: u32 = if model.version != ColVersion::Col2 {
        reader.read_le()?
    } else {
        0
    };
    let (shadow_vertex_count, shadow_face_count) = if model.version == ColVersion::Col4 {
        (reader.read_le()?, reader.read_le()?)
    } else {
        (0u32, 0u32)
    };

    if flags.has_spheres() {
        for _ in 0..sphere_count {
            let center = read_vec3(reader)?;
            let radius: f32 = reader.read_le()?;
            let surface = read_surface(reader)?;
            model.spheres.push(Sphere {
                center,
                radius,
                surface,
            });
        }
    }

    if flags.has_boxes() {
        for _ in 0..box_count {
            let min = read_vec3(reader)?;
            let max = read_vec3(reader)?;
            let surface = read_surface(reader)?;
            model.boxes.push(ColBox { min, max, surface });
        }
    }

    if flags.has_mesh() {
        for _ in 0..vertex_count {
            model.vertices.push(read_vec3_quantized(reader)?);
        }

        let face_count = repair_face_count(reader, model_end, model, warnings)?;
        for _ in 0..face_count {
            model.faces.push(read_compact_face(reader)?);
        }
    }

    if flags.has_face_groups() {
        for _ in 0..face_group_count {
            let min = read_vec3(reader)?;
            let max = read_vec3(reader)?;
            let start_face: u16 = reader.read_le()?;
            let end_face: u16 = reader.read_le()?;
            model.face_groups.push(FaceGroup {
                min,
                max,
                start_face,
                end_face,
            });
        }
    }

    if flags.has_shadow_mesh() {
        let mut shadow = ShadowMesh::default();
        for _ in 0..shadow_vertex_count {
            shadow.vertices.push(read_vec3_quantized(reader)?);
        }
        for _ in 0..shadow_face_count {
            shadow.faces.push(read_compact_face(reader)?);
        }
        model.shadow_mesh = Some(shadow);
    }

    Ok(())
}

/// COL1 reads its face count inline; the repair logic is shared.
fn read_repaired_face_count(
    reader: &mut Cursor<&[u8]>,
    model_end: u64,
    model: &mut CollisionModel,
    warnings: &mut Vec<Warning>,
) -> Result<u32, RwError> {
    let header_face_count: u32 = reader.read_le()?;
    model.header_face_count = header_face_count;
    repair_face_count(reader, model_end, model, warnings)
}

/// Clamps an implausible face count to what the remaining bytes can
/// hold. The boundary is the declared model end, tightened to the next
/// model's magic if one appears earlier in the buffer.
fn repair_face_count(
    reader: &mut Cursor<&[u8]>,
    model_end: u64,
    model: &mut CollisionModel,
    warnings: &mut Vec<Warning>,
) -> Result<u32, RwError> {
    let stride = model.version.face_stride() as u64;
    let declared = model.header_face_count;
    let pos = reader.position();

    let boundary = next_model_magic(reader.get_ref(), pos).unwrap_or(model_end).min(model_end);
    let capacity = (boundary.saturating_sub(pos) / stride) as u32;

    if declared <= capacity {
        return Ok(declared);
    }

    debug!(
        "model '{}': face count {} exceeds capacity {}, repairing",
        model.name, declared, capacity
    );
    model.calculated_face_count = Some(capacity);
    warnings.push(Warning::RecoveredCorruption {
        context: format!("face count of model '{}'", model.name),
        header_value: declared,
        recovered_value: capacity,
    });
    Ok(capacity)
}

/// Scans forward for the magic of the next concatenated model.
fn next_model_magic(data: &[u8], from: u64) -> Option<u64> {
    let from = from as usize;
    data.get(from..)?
        .windows(4)
        .position(|w| matches!(w, b"COLL" | b"COL2" | b"COL3" | b"COL4"))
        .map(|off| (from + off) as u64)
}

fn read_bounds(reader: &mut Cursor<&[u8]>) -> Result<Bounds, RwError> {
    Ok(Bounds {
        radius: reader.read_le()?,
        center: read_vec3(reader)?,
        min: read_vec3(reader)?,
        max: read_vec3(reader)?,
    })
}

fn read_surface(reader: &mut Cursor<&[u8]>) -> Result<Surface, RwError> {
    Ok(Surface {
        material: reader.read_le()?,
        flag: reader.read_le()?,
        brightness: reader.read_le()?,
        light: reader.read_le()?,
    })
}

fn read_vec3(reader: &mut Cursor<&[u8]>) -> Result<Vec3, RwError> {
    let x: f32 = reader.read_le()?;
    let y: f32 = reader.read_le()?;
    let z: f32 = reader.read_le()?;
    Ok(Vec3::new(x, y, z))
}

fn read_vec3_quantized(reader: &mut Cursor<&[u8]>) -> Result<Vec3, RwError> {
    let x: i16 = reader.read_le()?;
    let y: i16 = reader.read_le()?;
    let z: i16 = reader.read_le()?;
    Ok(Vec3::new(dequantize(x), dequantize(y), dequantize(z)))
}

fn read_compact_face(reader: &mut Cursor<&[u8]>) -> Result<Face, RwError> {
    let a: u16 = reader.read_le()?;
    let b: u16 = reader.read_le()?;
    let c: u16 = reader.read_le()?;
    let material: u8 = reader.read_le()?;
    let light: u8 = reader.read_le()?;
    Ok(Face {
        a: a as u32,
        b: b as u32,
        c: c as u32,
        surface: Surface {
            material,
            flag: 0,
            brightness: 0,
            light,
        },
    })
}
