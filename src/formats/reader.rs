//! Model file parsing.
//!
//! Used by the `info` command and by tests to verify what was written. The
//! parsed structures stay close to the wire layout rather than rebuilding a
//! full [`crate::model::Model`].

use glam::{Mat4, Vec2, Vec3};
use thiserror::Error;

use super::{
    VertexDeclaration, ELEMENT_COLOR, ELEMENT_JOINT_INDICES, ELEMENT_NORMAL, ELEMENT_POSITION,
    ELEMENT_TEXCOORD, ELEMENT_WEIGHTS, ENDIAN_CHECK, FEATURE_HAS_ANIMATION, FORMAT_VERSION,
    NODE_TYPE_JOINT, NODE_TYPE_STANDARD,
};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("file truncated while reading {0}")]
    Truncated(&'static str),
    #[error("endianness check failed (read {0}, expected {ENDIAN_CHECK})")]
    EndianCheck(u32),
    #[error("unsupported format version {0} (expected {FORMAT_VERSION})")]
    UnsupportedVersion(u32),
    #[error("unknown feature flag {0}")]
    UnknownFeature(u8),
    #[error("unknown vertex element {0}")]
    UnknownElement(u8),
    #[error("unknown skeleton node type {0}")]
    UnknownNodeType(u8),
    #[error("invalid index size {0}")]
    InvalidIndexSize(u8),
    #[error("name is not valid UTF-8")]
    InvalidName(#[from] std::string::FromUtf8Error),
}

/// A model file parsed back from its wire form.
#[derive(Debug, Clone)]
pub struct ParsedModel {
    pub version: u32,
    pub has_animation: bool,
    pub declaration: VertexDeclaration,
    pub index_size: u8,
    pub min: Vec3,
    pub max: Vec3,
    pub skeleton_nodes: Vec<ParsedSkeletonNode>,
    pub joint_count: u8,
    pub meshes: Vec<ParsedMesh>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSkeletonNode {
    pub name: String,
    pub parent_index: i16,
    pub joint_index: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct ParsedMesh {
    pub name: String,
    pub min: Vec3,
    pub max: Vec3,
    pub inverse_bind_matrices: Vec<Mat4>,
    pub vertices: Vec<ParsedVertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedVertex {
    pub position: Option<Vec3>,
    pub normal: Option<Vec3>,
    pub texcoord: Option<Vec2>,
    pub color: Option<[u8; 4]>,
    pub weights: Option<[f32; 4]>,
    pub joint_indices: Option<[u8; 4]>,
}

impl ParsedModel {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = Cursor { bytes, offset: 0 };

        let endian = cursor.u32("endianness check")?;
        if endian != ENDIAN_CHECK {
            return Err(FormatError::EndianCheck(endian));
        }
        let version = cursor.u32("version")?;
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let mut has_animation = false;
        for _ in 0..cursor.u8("feature count")? {
            match cursor.u8("feature flag")? {
                FEATURE_HAS_ANIMATION => has_animation = true,
                other => return Err(FormatError::UnknownFeature(other)),
            }
        }

        let mut declaration = VertexDeclaration::default();
        for _ in 0..cursor.u8("vertex element count")? {
            match cursor.u8("vertex element")? {
                ELEMENT_POSITION => declaration.position = true,
                ELEMENT_NORMAL => declaration.normal = true,
                ELEMENT_TEXCOORD => declaration.texcoord = true,
                ELEMENT_COLOR => declaration.color = true,
                ELEMENT_WEIGHTS => declaration.weights = true,
                ELEMENT_JOINT_INDICES => declaration.joint_indices = true,
                other => return Err(FormatError::UnknownElement(other)),
            }
        }

        let index_size = cursor.u8("index size")?;
        if index_size != 2 && index_size != 4 {
            return Err(FormatError::InvalidIndexSize(index_size));
        }

        let min = cursor.vec3("model bounds")?;
        let max = cursor.vec3("model bounds")?;
        let mesh_count = cursor.u16("mesh count")?;

        let mut skeleton_nodes = Vec::new();
        let mut joint_count = 0;
        if has_animation {
            let node_count = cursor.i16("skeleton node count")?.max(0) as usize;
            joint_count = cursor.u8("joint count")?;
            for _ in 0..node_count {
                let name = cursor.name("skeleton node name")?;
                let parent_index = cursor.i16("skeleton parent index")?;
                let joint_index = match cursor.u8("skeleton node type")? {
                    NODE_TYPE_STANDARD => None,
                    NODE_TYPE_JOINT => Some(cursor.u8("joint index")?),
                    other => return Err(FormatError::UnknownNodeType(other)),
                };
                skeleton_nodes.push(ParsedSkeletonNode {
                    name,
                    parent_index,
                    joint_index,
                });
            }
        }

        let mut meshes = Vec::with_capacity(mesh_count as usize);
        for _ in 0..mesh_count {
            meshes.push(read_mesh(
                &mut cursor,
                &declaration,
                index_size,
                has_animation,
                joint_count,
            )?);
        }

        Ok(Self {
            version,
            has_animation,
            declaration,
            index_size,
            min,
            max,
            skeleton_nodes,
            joint_count,
            meshes,
        })
    }
}

fn read_mesh(
    cursor: &mut Cursor<'_>,
    declaration: &VertexDeclaration,
    index_size: u8,
    has_animation: bool,
    joint_count: u8,
) -> Result<ParsedMesh, FormatError> {
    let name = cursor.name("mesh name")?;
    let vertex_count = cursor.count("vertex count", index_size)?;
    let triangle_count = cursor.count("triangle count", index_size)?;

    let min = cursor.vec3("mesh bounds")?;
    let max = cursor.vec3("mesh bounds")?;

    let mut inverse_bind_matrices = Vec::new();
    if has_animation {
        for _ in 0..joint_count {
            let mut values = [0.0f32; 16];
            for value in &mut values {
                *value = cursor.f32("inverse bind matrix")?;
            }
            inverse_bind_matrices.push(Mat4::from_cols_array(&values));
        }
    }

    let mut vertices = Vec::with_capacity(vertex_count);
    for _ in 0..vertex_count {
        let mut vertex = ParsedVertex::default();
        if declaration.position {
            let position = cursor.vec3("vertex position")?;
            cursor.f32("vertex position w")?;
            vertex.position = Some(position);
        }
        if declaration.normal {
            vertex.normal = Some(cursor.vec3("vertex normal")?);
        }
        if declaration.texcoord {
            let u = cursor.f32("texture coordinate")?;
            let v = cursor.f32("texture coordinate")?;
            vertex.texcoord = Some(Vec2::new(u, v));
        }
        if declaration.color {
            vertex.color = Some(cursor.bytes4("vertex colour")?);
        }
        if declaration.weights {
            let mut weights = [0.0f32; 4];
            for weight in &mut weights {
                *weight = cursor.f32("bone weight")?;
            }
            vertex.weights = Some(weights);
        }
        if declaration.joint_indices {
            vertex.joint_indices = Some(cursor.bytes4("joint indices")?);
        }
        vertices.push(vertex);
    }

    let mut indices = Vec::with_capacity(triangle_count * 3);
    for _ in 0..triangle_count * 3 {
        indices.push(cursor.count("triangle index", index_size)? as u32);
    }

    Ok(ParsedMesh {
        name,
        min,
        max,
        inverse_bind_matrices,
        vertices,
        indices,
    })
}

struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Cursor<'_> {
    fn take(&mut self, len: usize, what: &'static str) -> Result<&[u8], FormatError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(FormatError::Truncated(what))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, FormatError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, FormatError> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn i16(&mut self, what: &'static str) -> Result<i16, FormatError> {
        let bytes = self.take(2, what)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, FormatError> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn f32(&mut self, what: &'static str) -> Result<f32, FormatError> {
        Ok(f32::from_bits(self.u32(what)?))
    }

    fn bytes4(&mut self, what: &'static str) -> Result<[u8; 4], FormatError> {
        let bytes = self.take(4, what)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn count(&mut self, what: &'static str, index_size: u8) -> Result<usize, FormatError> {
        if index_size == 2 {
            Ok(self.u16(what)? as usize)
        } else {
            Ok(self.u32(what)? as usize)
        }
    }

    fn vec3(&mut self, what: &'static str) -> Result<Vec3, FormatError> {
        let x = self.f32(what)?;
        let y = self.f32(what)?;
        let z = self.f32(what)?;
        Ok(Vec3::new(x, y, z))
    }

    fn name(&mut self, what: &'static str) -> Result<String, FormatError> {
        let remaining = &self.bytes[self.offset..];
        let terminator = remaining
            .iter()
            .position(|&b| b == 0)
            .ok_or(FormatError::Truncated(what))?;
        let name = String::from_utf8(remaining[..terminator].to_vec())?;
        self.offset += terminator + 1;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_endian_sentinel() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1234u32.to_le_bytes());
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        assert!(matches!(
            ParsedModel::from_bytes(&bytes),
            Err(FormatError::EndianCheck(1234))
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&ENDIAN_CHECK.to_le_bytes());
        bytes.extend_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            ParsedModel::from_bytes(&bytes),
            Err(FormatError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn truncated_header_is_an_error() {
        let bytes = ENDIAN_CHECK.to_le_bytes();
        assert!(matches!(
            ParsedModel::from_bytes(&bytes),
            Err(FormatError::Truncated(_))
        ));
    }
}
