//! Model file serialization.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::model::{Mesh, Model};
use crate::options::ConversionOptions;
use crate::report::ConversionReport;

use super::{
    effective_declaration, index_size, VertexDeclaration, ENDIAN_CHECK, FEATURE_HAS_ANIMATION,
    FORMAT_VERSION, NODE_TYPE_JOINT, NODE_TYPE_STANDARD,
};

/// Serialize the model to `path`.
///
/// A failed write never leaves a truncated file behind; the partial output
/// is removed before the error is returned.
pub fn write_model_file(
    path: &Path,
    model: &Model,
    options: &ConversionOptions,
    report: &mut ConversionReport,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let result = write_model(&mut writer, model, options, report)
        .and_then(|()| writer.flush().context("failed to flush output file"));
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result.with_context(|| format!("failed to write model file {}", path.display()))
}

/// Serialize the model to an arbitrary writer.
pub fn write_model<W: Write>(
    writer: &mut W,
    model: &Model,
    options: &ConversionOptions,
    report: &mut ConversionReport,
) -> Result<()> {
    let declaration = effective_declaration(model, options, report);
    let index_size = index_size(model);
    let animated = options.animated;

    // The header stores the joint count in a single byte.
    if animated && model.joint_count() > u8::MAX as usize {
        bail!(
            "Skeleton has {} joints; the file format can express at most {}",
            model.joint_count(),
            u8::MAX
        );
    }

    write_header(writer, model, &declaration, index_size, animated)?;
    if animated {
        write_skeleton(writer, model)?;
    }
    let joint_count = if animated { model.joint_count() } else { 0 };
    for mesh in &model.meshes {
        write_mesh(writer, mesh, &declaration, index_size, joint_count)?;
    }
    Ok(())
}

fn write_header<W: Write>(
    writer: &mut W,
    model: &Model,
    declaration: &VertexDeclaration,
    index_size: u8,
    animated: bool,
) -> Result<()> {
    writer.write_all(&ENDIAN_CHECK.to_le_bytes())?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;

    let mut features = Vec::new();
    if animated {
        features.push(FEATURE_HAS_ANIMATION);
    }
    writer.write_all(&[features.len() as u8])?;
    writer.write_all(&features)?;

    let elements = declaration.element_bytes();
    writer.write_all(&[elements.len() as u8])?;
    writer.write_all(&elements)?;

    writer.write_all(&[index_size])?;

    write_vec3(writer, model.min)?;
    write_vec3(writer, model.max)?;

    writer.write_all(&(model.meshes.len() as u16).to_le_bytes())?;

    if animated {
        writer.write_all(&(model.skeleton.nodes.len() as i16).to_le_bytes())?;
        writer.write_all(&[model.joint_count() as u8])?;
    }
    Ok(())
}

fn write_skeleton<W: Write>(writer: &mut W, model: &Model) -> Result<()> {
    for node in &model.skeleton.nodes {
        write_name(writer, &node.name)?;
        writer.write_all(&node.parent_index.to_le_bytes())?;
        if let Some(joint_index) = node.joint_index {
            writer.write_all(&[NODE_TYPE_JOINT, joint_index])?;
        } else {
            writer.write_all(&[NODE_TYPE_STANDARD])?;
        }
    }
    Ok(())
}

fn write_mesh<W: Write>(
    writer: &mut W,
    mesh: &Mesh,
    declaration: &VertexDeclaration,
    index_size: u8,
    joint_count: usize,
) -> Result<()> {
    write_name(writer, &mesh.name)?;
    write_count(writer, mesh.vertices.len(), index_size)?;
    write_count(writer, mesh.triangle_count(), index_size)?;

    write_vec3(writer, mesh.min)?;
    write_vec3(writer, mesh.max)?;

    // The loader expects one matrix per skeleton joint in every mesh of an
    // animated file; meshes without skin data get identity matrices.
    if joint_count > 0 {
        let empty = Vec::new();
        let matrices = mesh.inverse_bind_matrices.as_ref().unwrap_or(&empty);
        for joint in 0..joint_count {
            let matrix = matrices.get(joint).copied().unwrap_or(glam::Mat4::IDENTITY);
            for value in matrix.to_cols_array() {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
    }

    for vertex in &mesh.vertices {
        if declaration.position {
            write_vec3(writer, vertex.position)?;
            writer.write_all(&1.0f32.to_le_bytes())?;
        }
        if declaration.normal {
            write_vec3(writer, vertex.normal.unwrap_or_default())?;
        }
        if declaration.texcoord {
            let texcoord = vertex.texcoord.unwrap_or_default();
            writer.write_all(&texcoord.x.to_le_bytes())?;
            writer.write_all(&texcoord.y.to_le_bytes())?;
        }
        if declaration.color {
            writer.write_all(&vertex.color.unwrap_or([0, 0, 0, 255]))?;
        }
        if declaration.weights {
            for weight in vertex.weights.unwrap_or_default() {
                writer.write_all(&weight.to_le_bytes())?;
            }
        }
        if declaration.joint_indices {
            writer.write_all(&vertex.joint_indices.unwrap_or_default())?;
        }
    }

    for &index in &mesh.indices {
        write_count(writer, index as usize, index_size)?;
    }
    Ok(())
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> Result<()> {
    writer.write_all(name.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

fn write_count<W: Write>(writer: &mut W, value: usize, index_size: u8) -> Result<()> {
    if index_size == 2 {
        writer.write_all(&(value as u16).to_le_bytes())?;
    } else {
        writer.write_all(&(value as u32).to_le_bytes())?;
    }
    Ok(())
}

fn write_vec3<W: Write>(writer: &mut W, v: glam::Vec3) -> Result<()> {
    writer.write_all(&v.x.to_le_bytes())?;
    writer.write_all(&v.y.to_le_bytes())?;
    writer.write_all(&v.z.to_le_bytes())?;
    Ok(())
}
