//! Parsed scene-graph document types.
//!
//! This is the typed tree the external document front end hands the
//! converter: named geometries, skin controllers, materials/effects, and the
//! visual-scene node hierarchy. The converter never sees raw markup; the CLI
//! loads a serialized document (JSON) produced by the front end.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// A complete parsed scene document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Name of the tool that authored the source file, from the document's
    /// asset metadata. Used to detect known non-conformant exporters.
    #[serde(default)]
    pub authoring_tool: String,
    #[serde(default)]
    pub geometries: HashMap<String, Geometry>,
    #[serde(default)]
    pub controllers: HashMap<String, Controller>,
    #[serde(default)]
    pub materials: HashMap<String, SceneMaterial>,
    #[serde(default)]
    pub effects: HashMap<String, Effect>,
    #[serde(default)]
    pub images: HashMap<String, Image>,
    /// Root nodes of the visual scene, in document order.
    #[serde(default)]
    pub root_nodes: Vec<SceneNode>,
}

/// A node in the visual-scene hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
    /// Local transform, row-major 4x4. Identity when absent.
    #[serde(default)]
    pub matrix: Option<[f32; 16]>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

/// What a scene node instantiates, if anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Plain grouping node.
    #[default]
    Base,
    /// Skeleton joint.
    Joint,
    /// Instantiates a geometry.
    Geometry(GeometryInstance),
    /// Instantiates a skin controller.
    Controller(ControllerInstance),
    Light,
    Camera,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryInstance {
    /// Id of the referenced geometry.
    pub geometry: String,
    /// Material symbol -> material id bindings for this instance.
    #[serde(default)]
    pub material_bindings: Vec<MaterialBinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerInstance {
    /// Id of the referenced controller.
    pub controller: String,
    /// Id of the node at the root of the skeleton this skin binds to.
    pub skeleton_root: String,
    #[serde(default)]
    pub material_bindings: Vec<MaterialBinding>,
}

/// Binds a material symbol used inside a geometry to a material definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialBinding {
    pub symbol: String,
    pub target: String,
}

/// A named geometry: per-vertex source arrays plus one or more triangle
/// groups (one per material).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    pub name: String,
    /// Source id -> source array.
    #[serde(default)]
    pub sources: HashMap<String, Source>,
    /// The geometry's vertices element: its id, the semantic of its single
    /// input, and the source that input references.
    pub vertices: VerticesElement,
    #[serde(default)]
    pub triangle_groups: Vec<TriangleGroup>,
}

/// The `vertices` indirection element that triangle-group VERTEX inputs
/// resolve through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerticesElement {
    pub id: String,
    pub semantic: String,
    pub source: String,
}

/// One triangle list inside a geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleGroup {
    /// Material symbol this group is drawn with, resolved through the
    /// instancing node's bindings. Absent for unassigned groups.
    #[serde(default)]
    pub material_symbol: Option<String>,
    /// Shared inputs, each with a per-semantic offset into the index tuples.
    pub inputs: Vec<SharedInput>,
    /// Flat interleaved index array; tuple width is the number of distinct
    /// input offsets, three tuples per triangle.
    pub indices: Vec<u32>,
}

/// An input with an offset into an interleaved index array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedInput {
    /// Semantic tag (VERTEX, NORMAL, TEXCOORD, COLOR, JOINT, WEIGHT).
    /// Matched case-insensitively.
    pub semantic: String,
    /// Id of the referenced source (or vertices element for VERTEX).
    pub source: String,
    pub offset: usize,
}

/// An input without an offset (used by a skin's joints element).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkinInput {
    pub semantic: String,
    pub source: String,
}

/// A data source: a float or name array with an access stride.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub array: SourceArray,
    #[serde(default = "default_stride")]
    pub stride: usize,
}

fn default_stride() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceArray {
    Floats(Vec<f32>),
    Names(Vec<String>),
}

impl Source {
    /// The float data, or `None` for a name array.
    pub fn floats(&self) -> Option<&[f32]> {
        match &self.array {
            SourceArray::Floats(data) => Some(data),
            SourceArray::Names(_) => None,
        }
    }

    /// The name data, or `None` for a float array.
    pub fn names(&self) -> Option<&[String]> {
        match &self.array {
            SourceArray::Names(data) => Some(data),
            SourceArray::Floats(_) => None,
        }
    }
}

/// A skin controller binding a geometry to a skeleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Controller {
    /// Id of the skinned geometry.
    pub geometry: String,
    /// Bind shape matrix, row-major 4x4.
    pub bind_shape_matrix: [f32; 16],
    /// Source id -> source array (joint names, inverse bind matrices,
    /// weights).
    #[serde(default)]
    pub sources: HashMap<String, Source>,
    /// Inputs of the skin's joints element (JOINT, INV_BIND_MATRIX).
    pub joints_inputs: Vec<SkinInput>,
    pub vertex_weights: VertexWeights,
}

/// The skin's per-vertex weight block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexWeights {
    /// Number of vertices covered (length of `vcount`).
    pub count: usize,
    /// Shared inputs (JOINT, WEIGHT) with offsets into `v`.
    pub inputs: Vec<SharedInput>,
    /// Influence count per vertex.
    pub vcount: Vec<usize>,
    /// Flat influence index array, `inputs.len()` entries per influence.
    pub v: Vec<u32>,
}

/// A material definition referencing an effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMaterial {
    pub name: String,
    /// Id of the referenced effect.
    pub effect: String,
}

/// A shading effect (Blinn/Phong technique).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Effect {
    #[serde(default)]
    pub emissive: Option<[f32; 4]>,
    #[serde(default)]
    pub ambient: Option<[f32; 4]>,
    #[serde(default)]
    pub diffuse: Option<[f32; 4]>,
    #[serde(default)]
    pub specular: Option<[f32; 4]>,
    #[serde(default)]
    pub shininess: Option<f32>,
    /// The diffuse texture reference: a sampler parameter name in conformant
    /// documents, or an image id for the known non-conformant FBX exporter.
    #[serde(default)]
    pub diffuse_texture: Option<String>,
    /// Effect-scoped parameters (samplers and surfaces).
    #[serde(default)]
    pub params: HashMap<String, EffectParam>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectParam {
    /// A 2D sampler referencing a surface parameter.
    Sampler2d { source: String },
    /// A surface referencing an image.
    Surface { init_from: String },
}

/// An image definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    /// Source path of the image, as authored (either path separator).
    pub init_from: String,
}

impl SceneNode {
    /// Depth-first search for a node by id across this subtree.
    pub fn find(&self, id: &str) -> Option<&SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Depth-first search for a node by id across a node forest.
pub fn find_node<'a>(roots: &'a [SceneNode], id: &str) -> Option<&'a SceneNode> {
    roots.iter().find_map(|root| root.find(id))
}
