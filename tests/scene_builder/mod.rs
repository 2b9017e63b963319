//! Programmatic scene-document generation for integration tests.
//!
//! Builds small but complete documents: a textured quad, a skinned triangle
//! with a three-joint chain, and variants used to exercise failure paths.

use cinder_export::scene::{
    Controller, ControllerInstance, Effect, EffectParam, Geometry, GeometryInstance, Image,
    MaterialBinding, NodeKind, SceneDocument, SceneMaterial, SceneNode, SharedInput, SkinInput,
    Source, SourceArray, TriangleGroup, VertexWeights, VerticesElement,
};
use hashbrown::HashMap;

pub const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Row-major translation matrix.
pub fn translation(x: f32, y: f32, z: f32) -> [f32; 16] {
    [
        1.0, 0.0, 0.0, x, //
        0.0, 1.0, 0.0, y, //
        0.0, 0.0, 1.0, z, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

fn float_source(values: Vec<f32>, stride: usize) -> Source {
    Source {
        array: SourceArray::Floats(values),
        stride,
    }
}

fn name_source(names: &[&str]) -> Source {
    Source {
        array: SourceArray::Names(names.iter().map(|s| s.to_string()).collect()),
        stride: 1,
    }
}

fn node(id: &str, kind: NodeKind) -> SceneNode {
    SceneNode {
        id: id.to_string(),
        name: id.to_string(),
        kind,
        matrix: None,
        children: Vec::new(),
    }
}

/// A unit quad with normals, texture coordinates, and a textured material.
///
/// Two triangles share the diagonal, so welding should produce exactly four
/// vertices and six indices.
pub fn quad_scene() -> SceneDocument {
    let mut sources = HashMap::new();
    sources.insert(
        "quad-pos".to_string(),
        float_source(
            vec![
                -1.0, -1.0, 0.0, //
                1.0, -1.0, 0.0, //
                1.0, 1.0, 0.0, //
                -1.0, 1.0, 0.0,
            ],
            3,
        ),
    );
    sources.insert(
        "quad-norm".to_string(),
        float_source(vec![0.0, 0.0, 1.0], 3),
    );
    sources.insert(
        "quad-uv".to_string(),
        float_source(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], 2),
    );

    let geometry = Geometry {
        name: "Quad".to_string(),
        sources,
        vertices: VerticesElement {
            id: "quad-verts".to_string(),
            semantic: "POSITION".to_string(),
            source: "quad-pos".to_string(),
        },
        triangle_groups: vec![TriangleGroup {
            material_symbol: Some("mat0".to_string()),
            inputs: vec![
                shared_input("VERTEX", "quad-verts", 0),
                shared_input("NORMAL", "quad-norm", 1),
                shared_input("TEXCOORD", "quad-uv", 2),
            ],
            indices: vec![
                0, 0, 0, 1, 0, 1, 2, 0, 2, //
                0, 0, 0, 2, 0, 2, 3, 0, 3,
            ],
        }],
    };

    let mut quad_node = node(
        "quad_node",
        NodeKind::Geometry(GeometryInstance {
            geometry: "quad-geom".to_string(),
            material_bindings: vec![MaterialBinding {
                symbol: "mat0".to_string(),
                target: "mat-quad".to_string(),
            }],
        }),
    );
    quad_node.matrix = Some(IDENTITY);

    let mut root = node("scene_root", NodeKind::Base);
    root.children.push(quad_node);

    let mut geometries = HashMap::new();
    geometries.insert("quad-geom".to_string(), geometry);

    let mut materials = HashMap::new();
    materials.insert(
        "mat-quad".to_string(),
        SceneMaterial {
            name: "QuadMaterial".to_string(),
            effect: "fx-quad".to_string(),
        },
    );

    let mut params = HashMap::new();
    params.insert(
        "samp0".to_string(),
        EffectParam::Sampler2d {
            source: "surf0".to_string(),
        },
    );
    params.insert(
        "surf0".to_string(),
        EffectParam::Surface {
            init_from: "img0".to_string(),
        },
    );
    let mut effects = HashMap::new();
    effects.insert(
        "fx-quad".to_string(),
        Effect {
            emissive: None,
            ambient: None,
            diffuse: Some([0.8, 0.2, 0.2, 1.0]),
            specular: None,
            shininess: Some(16.0),
            diffuse_texture: Some("samp0".to_string()),
            params,
        },
    );

    let mut images = HashMap::new();
    images.insert(
        "img0".to_string(),
        Image {
            init_from: "textures\\characters\\diffuse.png".to_string(),
        },
    );

    SceneDocument {
        authoring_tool: "test generator".to_string(),
        geometries,
        controllers: HashMap::new(),
        materials,
        effects,
        images,
        root_nodes: vec![root],
    }
}

fn shared_input(semantic: &str, source: &str, offset: usize) -> SharedInput {
    SharedInput {
        semantic: semantic.to_string(),
        source: source.to_string(),
        offset,
    }
}

/// Joint chain `skel_root -> spine -> head`, each offset one unit up.
fn joint_chain(root_id: &str) -> SceneNode {
    let mut head = node("head", NodeKind::Joint);
    head.matrix = Some(translation(0.0, 1.0, 0.0));
    let mut spine = node("spine", NodeKind::Joint);
    spine.matrix = Some(translation(0.0, 1.0, 0.0));
    spine.children.push(head);
    let mut root = node(root_id, NodeKind::Joint);
    root.matrix = Some(IDENTITY);
    root.children.push(spine);
    root
}

/// A single skinned triangle bound to a three-joint chain.
///
/// Vertex 0 is fully weighted to the root, vertex 1 to the spine, and
/// vertex 2 is split evenly between spine and head.
pub fn skinned_scene() -> SceneDocument {
    let mut doc = skinless_triangle_document();
    doc.root_nodes = vec![
        joint_chain("skel_root"),
        skin_node("skin_node", "ctrl0", "skel_root"),
    ];
    doc.controllers
        .insert("ctrl0".to_string(), triangle_controller(&["skel_root", "spine", "head"]));
    doc
}

/// Two skinned triangle instances whose controllers name different skeleton
/// roots. Converting both must fail.
pub fn conflicting_skins_scene() -> SceneDocument {
    let mut doc = skinless_triangle_document();
    doc.root_nodes = vec![
        joint_chain("skel_root"),
        joint_chain("other_root"),
        skin_node("skin_node", "ctrl0", "skel_root"),
        skin_node("skin_node2", "ctrl1", "other_root"),
    ];
    doc.controllers
        .insert("ctrl0".to_string(), triangle_controller(&["skel_root", "spine", "head"]));
    doc.controllers
        .insert("ctrl1".to_string(), triangle_controller(&["other_root", "spine", "head"]));
    doc
}

fn skin_node(id: &str, controller: &str, skeleton_root: &str) -> SceneNode {
    node(
        id,
        NodeKind::Controller(ControllerInstance {
            controller: controller.to_string(),
            skeleton_root: skeleton_root.to_string(),
            material_bindings: Vec::new(),
        }),
    )
}

fn skinless_triangle_document() -> SceneDocument {
    let mut sources = HashMap::new();
    sources.insert(
        "tri-pos".to_string(),
        float_source(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0], 3),
    );

    let geometry = Geometry {
        name: "Tri".to_string(),
        sources,
        vertices: VerticesElement {
            id: "tri-verts".to_string(),
            semantic: "POSITION".to_string(),
            source: "tri-pos".to_string(),
        },
        triangle_groups: vec![TriangleGroup {
            material_symbol: None,
            inputs: vec![shared_input("VERTEX", "tri-verts", 0)],
            indices: vec![0, 1, 2],
        }],
    };

    let mut geometries = HashMap::new();
    geometries.insert("tri-geom".to_string(), geometry);

    SceneDocument {
        authoring_tool: "test generator".to_string(),
        geometries,
        controllers: HashMap::new(),
        materials: HashMap::new(),
        effects: HashMap::new(),
        images: HashMap::new(),
        root_nodes: Vec::new(),
    }
}

fn triangle_controller(joint_ids: &[&str]) -> Controller {
    let mut sources = HashMap::new();
    sources.insert("skin-joints".to_string(), name_source(joint_ids));
    let mut ibms = Vec::new();
    for _ in joint_ids {
        ibms.extend_from_slice(&IDENTITY);
    }
    sources.insert("skin-ibms".to_string(), float_source(ibms, 16));
    sources.insert(
        "skin-weights".to_string(),
        float_source(vec![1.0, 0.5], 1),
    );

    Controller {
        geometry: "tri-geom".to_string(),
        bind_shape_matrix: IDENTITY,
        sources,
        joints_inputs: vec![
            SkinInput {
                semantic: "JOINT".to_string(),
                source: "skin-joints".to_string(),
            },
            SkinInput {
                semantic: "INV_BIND_MATRIX".to_string(),
                source: "skin-ibms".to_string(),
            },
        ],
        vertex_weights: VertexWeights {
            count: 3,
            inputs: vec![
                shared_input("JOINT", "skin-joints", 0),
                shared_input("WEIGHT", "skin-weights", 1),
            ],
            vcount: vec![1, 1, 2],
            v: vec![
                0, 0, //
                1, 0, //
                1, 1, 2, 1,
            ],
        },
    }
}
