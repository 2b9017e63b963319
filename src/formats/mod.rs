//! Binary model file format.
//!
//! Little-endian, versioned container holding an optional skeleton and a
//! list of meshes with interleaved vertex streams. The layout is fixed by
//! the runtime loader; every field here mirrors what it reads.

mod reader;
mod writer;

pub use reader::{FormatError, ParsedMesh, ParsedModel, ParsedSkeletonNode, ParsedVertex};
pub use writer::{write_model, write_model_file};

use crate::model::Model;
use crate::options::ConversionOptions;
use crate::report::ConversionReport;

/// Sentinel read back by the loader to detect endianness mismatches.
pub const ENDIAN_CHECK: u32 = 6666;
/// Format version this tool writes.
pub const FORMAT_VERSION: u32 = 12;

/// File-level feature flags.
pub const FEATURE_HAS_ANIMATION: u8 = 1;

/// Vertex element identifiers, one byte each in the header declaration.
pub const ELEMENT_POSITION: u8 = 1;
pub const ELEMENT_NORMAL: u8 = 2;
pub const ELEMENT_TEXCOORD: u8 = 3;
pub const ELEMENT_COLOR: u8 = 4;
pub const ELEMENT_WEIGHTS: u8 = 5;
pub const ELEMENT_JOINT_INDICES: u8 = 6;

/// Skeleton node type bytes.
pub const NODE_TYPE_STANDARD: u8 = 0;
pub const NODE_TYPE_JOINT: u8 = 1;

/// Largest count a 16-bit index stream can express.
const MAX_U16: usize = u16::MAX as usize;

/// Which vertex elements a file carries, in stream order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexDeclaration {
    pub position: bool,
    pub normal: bool,
    pub texcoord: bool,
    pub color: bool,
    pub weights: bool,
    pub joint_indices: bool,
}

impl VertexDeclaration {
    /// Element bytes in the order the vertex stream interleaves them.
    pub fn element_bytes(&self) -> Vec<u8> {
        let flags = [
            (self.position, ELEMENT_POSITION),
            (self.normal, ELEMENT_NORMAL),
            (self.texcoord, ELEMENT_TEXCOORD),
            (self.color, ELEMENT_COLOR),
            (self.weights, ELEMENT_WEIGHTS),
            (self.joint_indices, ELEMENT_JOINT_INDICES),
        ];
        flags
            .into_iter()
            .filter(|(enabled, _)| *enabled)
            .map(|(_, byte)| byte)
            .collect()
    }
}

/// Intersect the requested vertex format with the fields the converted data
/// actually carries.
///
/// A field counts as populated only when every vertex of every mesh has it;
/// a partially populated field cannot be interleaved and is dropped with a
/// warning.
pub fn effective_declaration(
    model: &Model,
    options: &ConversionOptions,
    report: &mut ConversionReport,
) -> VertexDeclaration {
    let format = &options.vertex_format;
    let all = |pred: fn(&crate::model::Vertex) -> bool| {
        !model.meshes.is_empty()
            && model
                .meshes
                .iter()
                .all(|mesh| mesh.vertices.iter().all(pred))
    };

    let populated = VertexDeclaration {
        position: !model.meshes.is_empty(),
        normal: all(|v| v.normal.is_some()),
        texcoord: all(|v| v.texcoord.is_some()),
        color: all(|v| v.color.is_some()),
        weights: all(|v| v.weights.is_some()),
        joint_indices: all(|v| v.joint_indices.is_some()),
    };

    let requested = [
        (format.position, populated.position, "positions"),
        (format.normal, populated.normal, "normals"),
        (format.texcoord, populated.texcoord, "texture coordinates"),
        (format.color, populated.color, "vertex colours"),
        (format.weights, populated.weights, "bone weights"),
        (format.joint_indices, populated.joint_indices, "joint indices"),
    ];
    for (wanted, present, what) in requested {
        if wanted && !present {
            report.warn(format!(
                "The vertex format requests {what} but the converted data does not carry them \
                 for every vertex; the element is left out of the file"
            ));
        }
    }

    VertexDeclaration {
        position: format.position && populated.position,
        normal: format.normal && populated.normal,
        texcoord: format.texcoord && populated.texcoord,
        color: format.color && populated.color,
        weights: format.weights && populated.weights,
        joint_indices: format.joint_indices && populated.joint_indices,
    }
}

/// Pick the index width for the whole file: 4 bytes as soon as any single
/// mesh has more vertices or indices than 16 bits can address, 2 otherwise.
pub fn index_size(model: &Model) -> u8 {
    let needs_wide = model
        .meshes
        .iter()
        .any(|mesh| mesh.vertices.len() > MAX_U16 || mesh.indices.len() > MAX_U16);
    if needs_wide {
        4
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mesh, Vertex};
    use glam::Vec3;

    fn model_with_vertices(count: usize) -> Model {
        let mut mesh = Mesh::new("m");
        for i in 0..count {
            mesh.vertices.push(Vertex::at(Vec3::splat(i as f32)));
        }
        mesh.indices = vec![0; count];
        let mut model = Model::new();
        model.meshes.push(mesh);
        model
    }

    #[test]
    fn index_size_crosses_over_above_u16_max() {
        assert_eq!(index_size(&model_with_vertices(3)), 2);
        assert_eq!(index_size(&model_with_vertices(65_535)), 2);
        assert_eq!(index_size(&model_with_vertices(65_536)), 4);
    }

    #[test]
    fn partially_populated_field_is_dropped_with_warning() {
        let mut model = model_with_vertices(2);
        model.meshes[0].vertices[0].normal = Some(Vec3::Y);

        let mut options = ConversionOptions::default();
        options.vertex_format.normal = true;
        let mut report = ConversionReport::new();

        let declaration = effective_declaration(&model, &options, &mut report);
        assert!(!declaration.normal);
        assert!(report.has_warning("normals"));
    }

    #[test]
    fn unrequested_field_stays_out_without_warning() {
        let mut model = model_with_vertices(1);
        model.meshes[0].vertices[0].color = Some([255, 0, 0, 255]);

        let mut options = ConversionOptions::default();
        options.vertex_format = crate::options::VertexFormat {
            position: true,
            normal: false,
            texcoord: false,
            color: false,
            weights: false,
            joint_indices: false,
        };
        let mut report = ConversionReport::new();

        let declaration = effective_declaration(&model, &options, &mut report);
        assert!(declaration.position && !declaration.color);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn element_bytes_follow_stream_order() {
        let declaration = VertexDeclaration {
            position: true,
            normal: false,
            texcoord: true,
            color: false,
            weights: true,
            joint_indices: true,
        };
        assert_eq!(
            declaration.element_bytes(),
            vec![
                ELEMENT_POSITION,
                ELEMENT_TEXCOORD,
                ELEMENT_WEIGHTS,
                ELEMENT_JOINT_INDICES
            ]
        );
    }
}
