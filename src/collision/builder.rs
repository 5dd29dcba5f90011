//! COL serialization.
//!
//! Each model is written back as its own version unless the caller
//! converted it first. COL2+ vertices are requantized to int16 with
//! saturation; face indices are validated against the vertex pool before
//! anything is written.

use std::fs::File;
use std::io::{Cursor, Seek, SeekFrom, Write};
use std::path::Path;

use binrw::BinWrite;
use glam::Vec3;

use super::{quantize, ColVersion, CollisionArchive, CollisionModel, Face, Surface};
use crate::error::RwError;
use crate::utils::write_fixed_string;

/// Serializes a [CollisionArchive] to bytes or a file.
pub struct ColBuilder<'a> {
    archive: &'a CollisionArchive,
}

impl<'a> ColBuilder<'a> {
    pub fn new(archive: &'a CollisionArchive) -> Self {
        Self { archive }
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
        for model in &self.archive.models {
            write_model(writer, model)?;
        }
        Ok(())
    }
}

fn validate(model: &CollisionModel) -> Result<(), RwError> {
    let vertex_count = model.vertices.len() as u32;
    for (i, face) in model.faces.iter().enumerate() {
        if face.a >= vertex_count || face.b >= vertex_count || face.c >= vertex_count {
            return Err(RwError::InvariantViolation(format!(
                "model '{}' face {} references a vertex outside [0, {})",
                model.name, i, vertex_count
            )));
        }
    }
    if model.version.has_quantized_vertices() {
        if vertex_count > u16::MAX as u32 + 1 {
            return Err(RwError::InvariantViolation(format!(
                "model '{}' has {} vertices, more than 16-bit face indices can address",
                model.name, vertex_count
            )));
        }
        if let Some(shadow) = &model.shadow_mesh {
            let shadow_vertex_count = shadow.vertices.len() as u32;
            for (i, face) in shadow.faces.iter().enumerate() {
                if face.a >= shadow_vertex_count
                    || face.b >= shadow_vertex_count
                    || face.c >= shadow_vertex_count
                {
                    return Err(RwError::InvariantViolation(format!(
                        "model '{}' shadow face {} references a vertex outside [0, {})",
                        model.name, i, shadow_vertex_count
                    )));
                }
            }
        }
    }
    Ok(())
}

fn write_model<W: Write + Seek>(writer: &mut W, model: &CollisionModel) -> Result<(), RwError> {
    validate(model)?;

    writer.write_all(&model.version.magic())?;
    let size_offset = writer.stream_position()?;
    0u32.write_le(writer)?;

    write_fixed_string::<22>(&model.name).write_le(writer)?;
    model.model_id.write_le(writer)?;
    write_bounds(writer, model)?;

    match model.version {
        ColVersion::Col1 => write_col1_body(writer, model)?,
        _ => write_col2_body(writer, model)?,
    }

    // Backpatch the size field: it covers everything after itself.
    let end_offset = writer.stream_position()?;
    writer.seek(SeekFrom::Start(size_offset))?;
    ((end_offset - size_offset - 4) as u32).write_le(writer)?;
    writer.seek(SeekFrom::Start(end_offset))?;
    Ok(())
}

fn write_col1_body<W: Write + Seek>(writer: &mut W, model: &CollisionModel) -> Result<(), RwError> {
    (model.spheres.len() as u32).write_le(writer)?;
    for sphere in &model.spheres {
        sphere.radius.write_le(writer)?;
        write_vec3(writer, sphere.center)?;
        write_surface(writer, sphere.surface)?;
    }

    (model.boxes.len() as u32).write_le(writer)?;
    for b in &model.boxes {
        write_vec3(writer, b.min)?;
        write_vec3(writer, b.max)?;
        write_surface(writer, b.surface)?;
    }

    (model.vertices.len() as u32).write_le(writer)?;
    for v in &model.vertices {
        write_vec3(writer, *v)?;
    }

    (model.faces.len() as u32).write_le(writer)?;
    for face in &model.faces {
        face.a.write_le(writer)?;
        face.b.write_le(writer)?;
        face.c.write_le(writer)?;
        write_surface(writer, face.surface)?;
    }
    Ok(())
}

fn write_col2_body<W: Write + Seek>(writer: &mut W, model: &CollisionModel) -> Result<(), RwError> {
    let flags = model.flags();
    flags.to_raw().write_le(writer)?;

    (model.spheres.len() as u32).write_le(writer)?;
    (model.boxes.len() as u32).write_le(writer)?;
    (model.vertices.len() as u32).write_le(writer)?;
    (model.faces.len() as u32).write_le(writer)?;

    if model.version != ColVersion::Col2 {
        (model.face_groups.len() as u32).write_le(writer)?;
    }
    if model.version == ColVersion::Col4 {
        let shadow = model.shadow_mesh.as_ref();
        (shadow.map(|s| s.vertices.len()).unwrap_or(0) as u32).write_le(writer)?;
        (shadow.map(|s| s.faces.len()).unwrap_or(0) as u32).write_le(writer)?;
    }

    if flags.has_spheres() {
        for sphere in &model.spheres {
            write_vec3(writer, sphere.center)?;
            sphere.radius.write_le(writer)?;
            write_surface(writer, sphere.surface)?;
        }
    }

    if flags.has_boxes() {
        for b in &model.boxes {
            write_vec3(writer, b.min)?;
            write_vec3(writer, b.max)?;
            write_surface(writer, b.surface)?;
        }
    }

    if flags.has_mesh() {
        for v in &model.vertices {
            write_vec3_quantized(writer, *v)?;
        }
        for face in &model.faces {
            write_compact_face(writer, face)?;
        }
    }

    if flags.has_face_groups() {
        for group in &model.face_groups {
            write_vec3(writer, group.min)?;
            write_vec3(writer, group.max)?;
            group.start_face.write_le(writer)?;
            group.end_face.write_le(writer)?;
        }
    }

    if flags.has_shadow_mesh() {
        if let Some(shadow) = &model.shadow_mesh {
            for v in &shadow.vertices {
                write_vec3_quantized(writer, *v)?;
            }
            for face in &shadow.faces {
                write_compact_face(writer, face)?;
            }
        }
    }

    Ok(())
}

fn write_bounds<W: Write + Seek>(writer: &mut W, model: &CollisionModel) -> Result<(), RwError> {
    model.bounds.radius.write_le(writer)?;
    write_vec3(writer, model.bounds.center)?;
    write_vec3(writer, model.bounds.min)?;
    write_vec3(writer, model.bounds.max)?;
    Ok(())
}

fn write_surface<W: Write + Seek>(writer: &mut W, surface: Surface) -> Result<(), RwError> {
    surface.material.write_le(writer)?;
    surface.flag.write_le(writer)?;
    surface.brightness.write_le(writer)?;
    surface.light.write_le(writer)?;
    Ok(())
}

fn write_vec3<W: Write + Seek>(writer: &mut W, v: Vec3) -> Result<(), RwError> {
    v.x.write_le(writer)?;
    v.y.write_le(writer)?;
    v.z.write_le(writer)?;
    Ok(())
}

fn write_vec3_quantized<W: Write + Seek>(writer: &mut W, v: Vec3) -> Result<(), RwError> {
    quantize(v.x).write_le(writer)?;
    quantize(v.y).write_le(writer)?;
    quantize(v.z).write_le(writer)?;
    Ok(())
}

fn write_compact_face<W: Write + Seek>(writer: &mut W, face: &Face) -> Result<(), RwError> {
    (face.a as u16).write_le(writer)?;
    (face.b as u16).write_le(writer)?;
    (face.c as u16).write_le(writer)?;
    face.surface.material.write_le(writer)?;
    face.surface.light.write_le(writer)?;
    Ok(())
}
