//! In-memory model built by the converter and consumed by the serializer.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// The converted model: an AABB, a skeleton, and an ordered mesh list.
///
/// Mesh order is insertion order and is significant - it determines the order
/// meshes are written to file.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub min: Vec3,
    pub max: Vec3,
    pub skeleton: Skeleton,
    pub meshes: Vec<Mesh>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a mesh by name.
    pub fn mesh(&self, name: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }

    pub fn mesh_mut(&mut self, name: &str) -> Option<&mut Mesh> {
        self.meshes.iter_mut().find(|mesh| mesh.name == name)
    }

    /// Number of joints in the skeleton.
    pub fn joint_count(&self) -> usize {
        self.skeleton
            .nodes
            .iter()
            .filter(|node| node.is_joint)
            .count()
    }

    /// Index of the joint with the given source node id.
    pub fn joint_index(&self, id: &str) -> Option<u8> {
        self.skeleton
            .nodes
            .iter()
            .find(|node| node.id == id)
            .and_then(|node| node.joint_index)
    }

    /// Recompute the model AABB as the component-wise min/max across all
    /// mesh AABBs. Zero when there are no meshes.
    pub fn update_bounds(&mut self) {
        if self.meshes.is_empty() {
            self.min = Vec3::ZERO;
            self.max = Vec3::ZERO;
            return;
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for mesh in &self.meshes {
            min = min.min(mesh.min);
            max = max.max(mesh.max);
        }
        self.min = min;
        self.max = max;
    }
}

/// The canonical joint hierarchy shared by every skinned mesh in a model.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    /// Nodes in discovery order.
    pub nodes: Vec<SkeletonNode>,
    /// Set once the first skinned mesh has fixed the skeleton shape. Every
    /// later mesh must produce an identical node list.
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonNode {
    /// Stable id of the source scene node.
    pub id: String,
    /// Display name written to file.
    pub name: String,
    /// Id of the parent skeleton node, empty for the root.
    pub parent_id: String,
    pub is_joint: bool,
    /// Assigned to joints only, contiguous from 0 in node order.
    pub joint_index: Option<u8>,
    /// Index of the parent within the node list, -1 for the root.
    pub parent_index: i16,
}

/// One mesh of the model.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    /// Flat triangle index list (triples).
    pub indices: Vec<u32>,
    pub material: Material,
    /// Per-joint inverse bind matrices in skeleton joint order. Present only
    /// for skinned meshes.
    pub inverse_bind_matrices: Option<Vec<Mat4>>,
    pub min: Vec3,
    pub max: Vec3,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            indices: Vec::new(),
            material: Material::default(),
            inverse_bind_matrices: None,
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Grow the mesh AABB to contain a point.
    pub fn grow_bounds(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Mesh surface material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub emissive: Vec4,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub shininess: f32,
    /// Resolved texture filename (last path segment). `None` when the effect
    /// has no diffuse texture.
    pub texture: Option<String>,
}

/// Engine default when the effect carries no diffuse colour.
pub const DEFAULT_DIFFUSE: Vec4 = Vec4::new(1.0, 1.0, 1.0, 1.0);
/// Engine default when the effect carries no emissive colour.
pub const DEFAULT_EMISSIVE: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            emissive: DEFAULT_EMISSIVE,
            ambient: Vec4::ZERO,
            diffuse: DEFAULT_DIFFUSE,
            specular: Vec4::ZERO,
            shininess: 0.0,
            texture: None,
        }
    }
}

/// A single vertex. Optional fields are present only when the source data
/// carries them and the conversion options request them.
///
/// Equality is full structural equality across all present fields - this is
/// what vertex welding keys on.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    /// Unit normal.
    pub normal: Option<Vec3>,
    pub texcoord: Option<Vec2>,
    /// RGBA, 0-255.
    pub color: Option<[u8; 4]>,
    /// Bone weights, zero-padded to 4; must sum to 1 within tolerance.
    pub weights: Option<[f32; 4]>,
    /// Skeleton joint indices, zero-padded to 4; meaningful only where the
    /// matching weight is non-zero.
    pub joint_indices: Option<[u8; 4]>,
}

impl Vertex {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            normal: None,
            texcoord: None,
            color: None,
            weights: None,
            joint_indices: None,
        }
    }
}

/// Identity key for vertex welding: the bit patterns of every populated
/// field. Two vertices with the same key are structurally equal (negative
/// zero is canonicalized so `-0.0` and `0.0` weld together, matching float
/// equality).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexKey {
    position: [u32; 3],
    normal: Option<[u32; 3]>,
    texcoord: Option<[u32; 2]>,
    color: Option<[u8; 4]>,
    weights: Option<[u32; 4]>,
    joint_indices: Option<[u8; 4]>,
}

fn bits(value: f32) -> u32 {
    // +0.0 and -0.0 compare equal but differ bitwise
    if value == 0.0 {
        0.0f32.to_bits()
    } else {
        value.to_bits()
    }
}

impl VertexKey {
    pub fn of(vertex: &Vertex) -> Self {
        let p = vertex.position;
        Self {
            position: [bits(p.x), bits(p.y), bits(p.z)],
            normal: vertex.normal.map(|n| [bits(n.x), bits(n.y), bits(n.z)]),
            texcoord: vertex.texcoord.map(|t| [bits(t.x), bits(t.y)]),
            color: vertex.color,
            weights: vertex.weights.map(|w| w.map(bits)),
            joint_indices: vertex.joint_indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_equality_covers_all_fields() {
        let mut a = Vertex::at(Vec3::new(1.0, 2.0, 3.0));
        let mut b = a.clone();
        assert_eq!(a, b);

        a.normal = Some(Vec3::Y);
        assert_ne!(a, b);
        b.normal = Some(Vec3::Y);
        assert_eq!(a, b);

        a.weights = Some([1.0, 0.0, 0.0, 0.0]);
        b.weights = Some([0.5, 0.5, 0.0, 0.0]);
        assert_ne!(a, b);
    }

    #[test]
    fn vertex_key_welds_negative_zero() {
        let a = Vertex::at(Vec3::new(0.0, 1.0, 2.0));
        let b = Vertex::at(Vec3::new(-0.0, 1.0, 2.0));
        assert_eq!(a, b);
        assert_eq!(VertexKey::of(&a), VertexKey::of(&b));
    }

    #[test]
    fn model_bounds_span_all_meshes() {
        let mut model = Model::new();
        let mut a = Mesh::new("a");
        a.grow_bounds(Vec3::new(-1.0, 0.0, 0.0));
        a.grow_bounds(Vec3::new(1.0, 1.0, 1.0));
        let mut b = Mesh::new("b");
        b.grow_bounds(Vec3::new(0.0, -2.0, 0.5));
        b.grow_bounds(Vec3::new(3.0, 0.0, 0.5));
        model.meshes.push(a);
        model.meshes.push(b);

        model.update_bounds();
        assert_eq!(model.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(model.max, Vec3::new(3.0, 1.0, 1.0));
    }
}
