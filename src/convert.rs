//! Scene-graph to model conversion.
//!
//! Walks the visual-scene node tree depth-first with a stack of accumulated
//! world matrices, resolves exportable geometry and controller instances,
//! and builds per-mesh vertex/index buffers, materials, and skinning data.

use anyhow::{bail, Context, Result};
use glam::{Mat4, Vec2, Vec3, Vec4};
use hashbrown::HashMap;

use crate::model::{Material, Mesh, Model, Vertex, VertexKey};
use crate::options::ConversionOptions;
use crate::report::ConversionReport;
use crate::scene::{
    Controller, Geometry, NodeKind, SceneDocument, SceneMaterial, SceneNode, SharedInput,
    TriangleGroup,
};
use crate::skeleton;

/// Allowed deviation of a vertex's weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f32 = 1e-4;

/// Authoring tool whose exporter writes the diffuse texture reference as an
/// image id instead of a sampler parameter.
const FBX_COLLADA_EXPORTER: &str = "FBX COLLADA exporter";

/// Convert the document into a model.
///
/// `export_roots` lists the node ids to export; eligibility is inherited by
/// every descendant of a listed node.
pub fn convert(
    export_roots: &[String],
    doc: &SceneDocument,
    options: &ConversionOptions,
    report: &mut ConversionReport,
) -> Result<Model> {
    let mut converter = ModelConverter {
        doc,
        options,
        report,
        matrix_stack: vec![Mat4::IDENTITY],
        weld_maps: HashMap::new(),
    };

    let mut model = Model::new();
    for node in &doc.root_nodes {
        converter.convert_node(node, export_roots, false, &mut model)?;
    }
    model.update_bounds();
    Ok(model)
}

/// Convert a row-major 4x4 matrix array (document storage) to a glam
/// column-vector matrix.
pub(crate) fn mat4_from_row_major(values: &[f32; 16]) -> Mat4 {
    Mat4::from_cols_array(values).transpose()
}

/// Influence indices per skinned vertex, expanded from the skin's
/// run-length-encoded weight block.
struct WeightIndexData {
    weight_indices: Vec<Vec<u32>>,
    joint_indices: Vec<Vec<u32>>,
}

struct ModelConverter<'a> {
    doc: &'a SceneDocument,
    options: &'a ConversionOptions,
    report: &'a mut ConversionReport,
    matrix_stack: Vec<Mat4>,
    /// Per-mesh weld index: vertex identity -> vertex index.
    weld_maps: HashMap<String, HashMap<VertexKey, u32>>,
}

impl ModelConverter<'_> {
    fn world(&self) -> Mat4 {
        self.matrix_stack.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    fn convert_node(
        &mut self,
        node: &SceneNode,
        export_roots: &[String],
        parent_exported: bool,
        model: &mut Model,
    ) -> Result<()> {
        let local = node
            .matrix
            .map(|m| mat4_from_row_major(&m))
            .unwrap_or(Mat4::IDENTITY);
        // The document's row convention puts the local matrix on the left of
        // the parent; in column convention the local transform applies first.
        let world = self.world() * local;

        self.matrix_stack.push(world);
        let result = self.convert_node_children(node, export_roots, parent_exported, model);
        self.matrix_stack.pop();
        result
    }

    /// Body of the node visit, run with the node's world matrix on the stack.
    fn convert_node_children(
        &mut self,
        node: &SceneNode,
        export_roots: &[String],
        parent_exported: bool,
        model: &mut Model,
    ) -> Result<()> {
        let should_export = parent_exported
            || export_roots.iter().any(|id| id.eq_ignore_ascii_case(&node.id));

        if should_export {
            match &node.kind {
                NodeKind::Controller(instance) => {
                    let controller =
                        self.doc.controllers.get(&instance.controller).with_context(|| {
                            format!(
                                "Controller '{}' instanced by node '{}' is not defined",
                                instance.controller, node.id
                            )
                        })?;
                    skeleton::build_or_reuse(
                        &self.doc.root_nodes,
                        &instance.skeleton_root,
                        model,
                    )?;
                    let bindings = binding_map(&instance.material_bindings);
                    self.build_model_data(
                        &controller.geometry,
                        Some((instance.controller.as_str(), controller)),
                        &bindings,
                        model,
                    )?;
                }
                NodeKind::Geometry(instance) => {
                    let bindings = binding_map(&instance.material_bindings);
                    self.build_model_data(&instance.geometry, None, &bindings, model)?;
                }
                _ => {}
            }
        }

        for child in &node.children {
            self.convert_node(child, export_roots, should_export, model)?;
        }
        Ok(())
    }

    /// Build mesh data for every triangle group of a geometry.
    fn build_model_data(
        &mut self,
        geometry_id: &str,
        controller: Option<(&str, &Controller)>,
        bindings: &HashMap<String, String>,
        model: &mut Model,
    ) -> Result<()> {
        let geometry = self.doc.geometries.get(geometry_id).with_context(|| {
            format!("Geometry '{geometry_id}' is not defined in the document")
        })?;

        for group in &geometry.triangle_groups {
            let material_id = group
                .material_symbol
                .as_deref()
                .and_then(|symbol| bindings.get(symbol));
            let material = material_id.and_then(|id| self.doc.materials.get(id));

            // Resolve the target mesh: combine mode merges all groups that
            // share a material, otherwise each group is its own mesh.
            let (mesh_index, is_new) = if material.is_some() && self.options.combine_meshes {
                let mesh_name = group.material_symbol.clone().unwrap_or_default();
                match model.meshes.iter().position(|m| m.name == mesh_name) {
                    Some(index) => (index, false),
                    None => {
                        model.meshes.push(Mesh::new(&mesh_name));
                        (model.meshes.len() - 1, true)
                    }
                }
            } else {
                let mut mesh_name = geometry.name.clone();
                if geometry.triangle_groups.len() > 1 {
                    if material.is_none() {
                        bail!(
                            "Geometry '{}' has multiple triangle groups without material \
                             assignments; the meshes cannot be disambiguated",
                            geometry.name
                        );
                    }
                    if let Some(symbol) = &group.material_symbol {
                        mesh_name.push('-');
                        mesh_name.push_str(symbol);
                    }
                }

                // A repeated name replaces the earlier mesh outright.
                self.weld_maps.remove(&mesh_name);
                match model.meshes.iter().position(|m| m.name == mesh_name) {
                    Some(index) => {
                        model.meshes[index] = Mesh::new(&mesh_name);
                        (index, true)
                    }
                    None => {
                        model.meshes.push(Mesh::new(&mesh_name));
                        (model.meshes.len() - 1, true)
                    }
                }
            };
            let mesh_name = model.meshes[mesh_index].name.clone();

            let inverse_bind_matrices = match controller {
                Some((controller_id, controller)) if is_new => {
                    Some(self.build_inverse_bind_matrices(model, controller_id, controller)?)
                }
                _ => None,
            };

            // Joint id -> joint index, extracted up front so vertex building
            // does not need the model.
            let joint_map: HashMap<String, u8> = model
                .skeleton
                .nodes
                .iter()
                .filter_map(|node| node.joint_index.map(|index| (node.id.clone(), index)))
                .collect();

            let built =
                self.build_group_vertices(geometry, controller, group, &joint_map, &mesh_name)?;
            let resolved_material = self.build_material(material)?;

            let mesh = &mut model.meshes[mesh_index];
            if let Some(matrices) = inverse_bind_matrices {
                mesh.inverse_bind_matrices = Some(matrices);
            }
            mesh.material = resolved_material;

            let weld = self.weld_maps.entry(mesh_name).or_default();
            for vertex in built {
                add_vertex(weld, mesh, vertex);
            }
        }
        Ok(())
    }

    /// Read the skin's inverse bind matrices into skeleton joint order.
    fn build_inverse_bind_matrices(
        &self,
        model: &Model,
        controller_id: &str,
        controller: &Controller,
    ) -> Result<Vec<Mat4>> {
        let mut joint_source_id = None;
        let mut matrix_source_id = None;
        for input in &controller.joints_inputs {
            if input.semantic.eq_ignore_ascii_case("JOINT") {
                joint_source_id = Some(input.source.as_str());
            } else if input.semantic.eq_ignore_ascii_case("INV_BIND_MATRIX") {
                matrix_source_id = Some(input.source.as_str());
            }
        }
        let (Some(joint_source_id), Some(matrix_source_id)) = (joint_source_id, matrix_source_id)
        else {
            bail!(
                "Controller '{controller_id}' is missing the JOINT or INV_BIND_MATRIX source \
                 for its inverse bind pose"
            );
        };

        let joint_names = controller
            .sources
            .get(joint_source_id)
            .and_then(|source| source.names())
            .with_context(|| {
                format!("Controller '{controller_id}': joint source '{joint_source_id}' is not a name array")
            })?;
        let matrix_floats = controller
            .sources
            .get(matrix_source_id)
            .and_then(|source| source.floats())
            .with_context(|| {
                format!(
                    "Controller '{controller_id}': matrix source '{matrix_source_id}' is not a float array"
                )
            })?;

        if joint_names.len() != matrix_floats.len() / 16
            || joint_names.len() != model.joint_count()
        {
            bail!(
                "Controller '{}' binds {} joints but the skeleton has {}; the skeleton \
                 hierarchy likely contains something the tool cannot represent, such as geometry",
                controller_id,
                joint_names.len(),
                model.joint_count()
            );
        }

        // The skin may list joints in any order; place each matrix at the
        // joint's canonical skeleton index.
        let mut matrices = vec![Mat4::IDENTITY; joint_names.len()];
        for (i, joint_name) in joint_names.iter().enumerate() {
            let joint_index = model.joint_index(joint_name).with_context(|| {
                format!(
                    "Joint '{joint_name}' from controller '{controller_id}' is not part of the skeleton"
                )
            })?;
            let raw: [f32; 16] = matrix_floats[i * 16..(i + 1) * 16]
                .try_into()
                .map_err(|_| anyhow::anyhow!("inverse bind matrix data truncated"))?;
            matrices[joint_index as usize] = mat4_from_row_major(&raw);
        }
        Ok(matrices)
    }

    /// Build one vertex per triangle corner of the group.
    fn build_group_vertices(
        &mut self,
        geometry: &Geometry,
        controller: Option<(&str, &Controller)>,
        group: &TriangleGroup,
        joint_map: &HashMap<String, u8>,
        mesh_name: &str,
    ) -> Result<Vec<Vertex>> {
        let format = &self.options.vertex_format;
        let width = group.inputs.len();
        if width == 0 {
            bail!("Geometry '{}' has a triangle group with no inputs", geometry.name);
        }

        let position_input = group_input(geometry, group, "VERTEX")?;
        let normal_input = optional_group_input(group, "NORMAL");
        let texcoord_input = optional_group_input(group, "TEXCOORD");
        let color_input = optional_group_input(group, "COLOR");
        for input in &group.inputs {
            let semantic = input.semantic.as_str();
            if !["VERTEX", "NORMAL", "TEXCOORD", "COLOR"]
                .iter()
                .any(|known| semantic.eq_ignore_ascii_case(known))
            {
                self.report.error(format!(
                    "Unknown input semantic '{}' in geometry '{}'",
                    input.semantic, geometry.name
                ));
            }
            if input.offset >= width {
                bail!(
                    "Geometry '{}': input offset {} exceeds the input count {}",
                    geometry.name,
                    input.offset,
                    width
                );
            }
        }

        self.warn_field_mismatches(
            geometry,
            mesh_name,
            normal_input.is_some(),
            texcoord_input.is_some(),
            color_input.is_some(),
            controller.is_some(),
        );

        // Position always routes through the vertices element.
        if geometry.vertices.id != position_input.source
            || !geometry.vertices.semantic.eq_ignore_ascii_case("POSITION")
        {
            bail!(
                "Vertices element '{}' with semantic '{}' is not supported in geometry '{}'",
                geometry.vertices.id,
                geometry.vertices.semantic,
                geometry.name
            );
        }
        let positions = float_source(geometry, &geometry.vertices.source, 3, "POSITION")?;
        let normals = match normal_input {
            Some(input) if format.normal => {
                Some((input, float_source(geometry, &input.source, 3, "NORMAL")?))
            }
            _ => None,
        };
        let texcoords = match texcoord_input {
            Some(input) if format.texcoord => {
                Some((input, float_source(geometry, &input.source, 2, "TEXCOORD")?))
            }
            _ => None,
        };
        let colors = match color_input {
            Some(input) if format.color => {
                Some((input, float_source(geometry, &input.source, 3, "COLOR")?))
            }
            _ => None,
        };

        let read_weights = format.weights && controller.is_some();
        let read_joints = format.joint_indices && controller.is_some();
        let weight_data = match controller {
            Some((controller_id, controller)) if read_weights || read_joints => {
                Some(self.build_weight_index_data(controller_id, controller)?)
            }
            _ => None,
        };
        let weight_floats = match controller {
            Some((controller_id, controller)) if read_weights => {
                let input = skin_input(controller_id, controller, "WEIGHT")?;
                Some(
                    controller
                        .sources
                        .get(&input.source)
                        .and_then(|source| source.floats())
                        .with_context(|| {
                            format!(
                                "Controller '{controller_id}': weight source '{}' is not a float array",
                                input.source
                            )
                        })?,
                )
            }
            _ => None,
        };
        let joint_names = match controller {
            Some((controller_id, controller)) if read_joints => {
                let input = skin_input(controller_id, controller, "JOINT")?;
                Some(
                    controller
                        .sources
                        .get(&input.source)
                        .and_then(|source| source.names())
                        .with_context(|| {
                            format!(
                                "Controller '{controller_id}': joint source '{}' is not a name array",
                                input.source
                            )
                        })?,
                )
            }
            _ => None,
        };

        if group.indices.len() % width != 0 {
            bail!(
                "Geometry '{}': index array length {} is not a multiple of the input count {}",
                geometry.name,
                group.indices.len(),
                width
            );
        }
        let corner_count = group.indices.len() / width;
        if corner_count % 3 != 0 {
            bail!(
                "Geometry '{}' contains non-triangle polygons ({} corners)",
                geometry.name,
                corner_count
            );
        }

        let bind_shape = controller
            .map(|(_, c)| mat4_from_row_major(&c.bind_shape_matrix));
        let world = self.world();

        let mut vertices = Vec::with_capacity(corner_count);
        for corner in 0..corner_count {
            let tuple = &group.indices[corner * width..(corner + 1) * width];
            let position_index = tuple[position_input.offset] as usize;

            let mut position = read_vec3(positions, position_index).with_context(|| {
                format!(
                    "Geometry '{}': position index {} is out of range",
                    geometry.name, position_index
                )
            })?;
            if let Some(bind_shape) = bind_shape {
                position = bind_shape.transform_point3(position);
            }
            position = world.transform_point3(position);
            let mut vertex = Vertex::at(position);

            if let Some((input, source)) = normals {
                let index = tuple[input.offset] as usize;
                let mut normal = read_vec3(source, index).with_context(|| {
                    format!("Geometry '{}': normal index {index} is out of range", geometry.name)
                })?;
                // Direction vectors ignore translation; the combined matrix is
                // reused as-is rather than inverse-transposed, so non-uniform
                // scale skews normals the same way the source pipeline did.
                if let Some(bind_shape) = bind_shape {
                    normal = bind_shape.transform_vector3(normal);
                }
                normal = world.transform_vector3(normal);
                vertex.normal = Some(normal.normalize_or_zero());
            }

            if let Some((input, source)) = texcoords {
                let index = tuple[input.offset] as usize;
                let texcoord = read_vec2(source, index).with_context(|| {
                    format!(
                        "Geometry '{}': texture coordinate index {index} is out of range",
                        geometry.name
                    )
                })?;
                vertex.texcoord = Some(texcoord);
            }

            if let Some((input, source)) = colors {
                let index = tuple[input.offset] as usize;
                let color = read_vec3(source, index).with_context(|| {
                    format!("Geometry '{}': colour index {index} is out of range", geometry.name)
                })?;
                vertex.color = Some([
                    (color.x * 255.0).clamp(0.0, 255.0) as u8,
                    (color.y * 255.0).clamp(0.0, 255.0) as u8,
                    (color.z * 255.0).clamp(0.0, 255.0) as u8,
                    255,
                ]);
            }

            if let Some(data) = &weight_data {
                if read_weights {
                    let floats = weight_floats.unwrap_or(&[]);
                    vertex.weights = Some(self.read_weights(
                        data,
                        floats,
                        position_index,
                        mesh_name,
                    )?);
                }
                if read_joints {
                    let names = joint_names.unwrap_or(&[]);
                    vertex.joint_indices =
                        Some(read_joint_indices(data, names, joint_map, position_index, mesh_name)?);
                }
            }

            vertices.push(vertex);
        }
        Ok(vertices)
    }

    /// Warn when requested vertex fields have no source data or vice versa.
    #[allow(clippy::too_many_arguments)]
    fn warn_field_mismatches(
        &mut self,
        geometry: &Geometry,
        mesh_name: &str,
        has_normals: bool,
        has_texcoords: bool,
        has_colors: bool,
        skinned: bool,
    ) {
        let format = &self.options.vertex_format;
        let fields = [
            (format.normal, has_normals, "normals"),
            (format.texcoord, has_texcoords, "texture coordinates"),
            (format.color, has_colors, "vertex colours"),
            (format.weights && format.joint_indices, skinned, "skinning data"),
        ];
        for (requested, available, what) in fields {
            if requested && !available {
                self.report.warn(format!(
                    "Mesh '{mesh_name}': {what} were requested but geometry '{}' has none",
                    geometry.name
                ));
            } else if available && !requested {
                self.report.warn(format!(
                    "Mesh '{mesh_name}': geometry '{}' has {what} but they were not requested \
                     and will be dropped",
                    geometry.name
                ));
            }
        }
    }

    /// Expand the skin's run-length-encoded vertex-weight block into per-
    /// vertex influence index lists.
    fn build_weight_index_data(
        &self,
        controller_id: &str,
        controller: &Controller,
    ) -> Result<WeightIndexData> {
        let block = &controller.vertex_weights;
        let width = block.inputs.len();

        #[derive(Clone, Copy, PartialEq)]
        enum Kind {
            None,
            Weight,
            Joint,
        }
        let mut kind_by_offset = vec![Kind::None; width];
        for input in &block.inputs {
            let kind = if input.semantic.eq_ignore_ascii_case("WEIGHT") {
                Kind::Weight
            } else if input.semantic.eq_ignore_ascii_case("JOINT") {
                Kind::Joint
            } else {
                Kind::None
            };
            let slot = kind_by_offset.get_mut(input.offset).with_context(|| {
                format!(
                    "Controller '{controller_id}': vertex-weight input offset {} exceeds the input count {width}",
                    input.offset
                )
            })?;
            *slot = kind;
        }

        if block.vcount.len() != block.count {
            bail!(
                "Controller '{controller_id}': vertex-weight count {} does not match the vcount \
                 array length {}",
                block.count,
                block.vcount.len()
            );
        }

        let mut weight_indices = Vec::with_capacity(block.count);
        let mut joint_indices = Vec::with_capacity(block.count);
        let mut cursor = 0usize;
        for &influences in &block.vcount {
            let mut weights = Vec::with_capacity(influences);
            let mut joints = Vec::with_capacity(influences);
            for _ in 0..influences {
                for kind in &kind_by_offset {
                    let value = *block.v.get(cursor).with_context(|| {
                        format!("Controller '{controller_id}': vertex-weight index array is truncated")
                    })?;
                    cursor += 1;
                    match kind {
                        Kind::Weight => weights.push(value),
                        Kind::Joint => joints.push(value),
                        Kind::None => {}
                    }
                }
            }
            weight_indices.push(weights);
            joint_indices.push(joints);
        }

        Ok(WeightIndexData {
            weight_indices,
            joint_indices,
        })
    }

    /// Read up to four bone weights for a vertex, zero-padded, and warn when
    /// they do not sum to 1.
    fn read_weights(
        &mut self,
        data: &WeightIndexData,
        floats: &[f32],
        position_index: usize,
        mesh_name: &str,
    ) -> Result<[f32; 4]> {
        let indices = data.weight_indices.get(position_index).with_context(|| {
            format!("Mesh '{mesh_name}': vertex {position_index} has no weight data")
        })?;

        let mut weights = [0.0f32; 4];
        for (slot, &index) in weights.iter_mut().zip(indices.iter()) {
            *slot = *floats.get(index as usize).with_context(|| {
                format!("Mesh '{mesh_name}': weight index {index} is out of range")
            })?;
        }

        let total: f32 = weights.iter().sum();
        if !(1.0 - WEIGHT_SUM_TOLERANCE..=1.0 + WEIGHT_SUM_TOLERANCE).contains(&total) {
            self.report.warn(format!(
                "Mesh '{mesh_name}': vertex weights add up to {total}, not 1.0"
            ));
        }
        Ok(weights)
    }

    /// Build the mesh material from the resolved document material, falling
    /// back to engine defaults when fields are absent.
    fn build_material(&self, material: Option<&SceneMaterial>) -> Result<Material> {
        let Some(material) = material else {
            return Ok(Material::default());
        };
        let effect = self.doc.effects.get(&material.effect).with_context(|| {
            format!(
                "Effect '{}' referenced by material '{}' is not defined",
                material.effect, material.name
            )
        })?;

        Ok(Material {
            name: material.name.clone(),
            emissive: effect
                .emissive
                .map(Vec4::from)
                .unwrap_or(crate::model::DEFAULT_EMISSIVE),
            ambient: effect.ambient.map(Vec4::from).unwrap_or(Vec4::ZERO),
            diffuse: effect
                .diffuse
                .map(Vec4::from)
                .unwrap_or(crate::model::DEFAULT_DIFFUSE),
            specular: effect.specular.map(Vec4::from).unwrap_or(Vec4::ZERO),
            shininess: effect.shininess.unwrap_or(0.0),
            texture: self.resolve_texture(material)?,
        })
    }

    /// Resolve the effect's diffuse texture to an image filename.
    ///
    /// Conformant documents route texture -> sampler parameter -> surface
    /// parameter -> image. The FBX COLLADA exporter instead writes the image
    /// id directly into the texture reference; that shape is detected via the
    /// document's authoring-tool metadata, not guessed from the data.
    fn resolve_texture(&self, material: &SceneMaterial) -> Result<Option<String>> {
        let effect = self.doc.effects.get(&material.effect).with_context(|| {
            format!(
                "Effect '{}' referenced by material '{}' is not defined",
                material.effect, material.name
            )
        })?;
        let Some(sampler_name) = effect.diffuse_texture.as_deref().filter(|s| !s.is_empty())
        else {
            return Ok(None);
        };

        let image_id = if self.doc.authoring_tool == FBX_COLLADA_EXPORTER {
            sampler_name.to_string()
        } else {
            let source = match effect.params.get(sampler_name) {
                Some(crate::scene::EffectParam::Sampler2d { source }) => source,
                _ => bail!(
                    "Effect '{}': diffuse texture reference '{sampler_name}' is not a sampler \
                     parameter",
                    material.effect
                ),
            };
            match effect.params.get(source) {
                Some(crate::scene::EffectParam::Surface { init_from }) => init_from.clone(),
                _ => bail!(
                    "Effect '{}': sampler source '{source}' is not a surface parameter",
                    material.effect
                ),
            }
        };

        let Some(image) = self.doc.images.get(&image_id) else {
            return Ok(None);
        };

        let path = image.init_from.replace('\\', "/");
        let filename = path
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or(&path);
        Ok(Some(filename.to_string()))
    }
}

/// Read up to four joint indices for a vertex, mapped from skin joint names
/// to canonical skeleton joint indices, zero-padded.
fn read_joint_indices(
    data: &WeightIndexData,
    names: &[String],
    joint_map: &HashMap<String, u8>,
    position_index: usize,
    mesh_name: &str,
) -> Result<[u8; 4]> {
    let indices = data.joint_indices.get(position_index).with_context(|| {
        format!("Mesh '{mesh_name}': vertex {position_index} has no joint data")
    })?;

    let mut joints = [0u8; 4];
    for (slot, &index) in joints.iter_mut().zip(indices.iter()) {
        let name = names.get(index as usize).with_context(|| {
            format!("Mesh '{mesh_name}': joint name index {index} is out of range")
        })?;
        *slot = *joint_map.get(name.as_str()).with_context(|| {
            format!("Joint '{name}' referenced by mesh '{mesh_name}' is not part of the skeleton")
        })?;
    }
    Ok(joints)
}

/// Append a vertex, welding it onto an existing structurally identical one.
fn add_vertex(weld: &mut HashMap<VertexKey, u32>, mesh: &mut Mesh, vertex: Vertex) {
    let key = VertexKey::of(&vertex);
    if let Some(&index) = weld.get(&key) {
        mesh.indices.push(index);
        return;
    }
    let index = mesh.vertices.len() as u32;
    mesh.grow_bounds(vertex.position);
    mesh.vertices.push(vertex);
    mesh.indices.push(index);
    weld.insert(key, index);
}

fn binding_map(bindings: &[crate::scene::MaterialBinding]) -> HashMap<String, String> {
    bindings
        .iter()
        .filter(|binding| !binding.symbol.is_empty() && !binding.target.is_empty())
        .map(|binding| (binding.symbol.clone(), binding.target.clone()))
        .collect()
}

/// Find a triangle-group input by semantic. Missing semantics that the
/// caller requires are fatal.
fn group_input<'g>(
    geometry: &Geometry,
    group: &'g TriangleGroup,
    semantic: &str,
) -> Result<&'g SharedInput> {
    optional_group_input(group, semantic).with_context(|| {
        format!("Geometry '{}' has no input with semantic '{semantic}'", geometry.name)
    })
}

fn optional_group_input<'g>(group: &'g TriangleGroup, semantic: &str) -> Option<&'g SharedInput> {
    group
        .inputs
        .iter()
        .find(|input| input.semantic.eq_ignore_ascii_case(semantic))
}

/// Find a skin vertex-weight input by semantic.
fn skin_input<'c>(
    controller_id: &str,
    controller: &'c Controller,
    semantic: &str,
) -> Result<&'c SharedInput> {
    controller
        .vertex_weights
        .inputs
        .iter()
        .find(|input| input.semantic.eq_ignore_ascii_case(semantic))
        .with_context(|| {
            format!("Controller '{controller_id}' has no input with semantic '{semantic}'")
        })
}

/// A float source with its stride, validated against a minimum stride.
#[derive(Clone, Copy)]
struct FloatSource<'g> {
    floats: &'g [f32],
    stride: usize,
}

fn float_source<'g>(
    geometry: &'g Geometry,
    source_id: &str,
    min_stride: usize,
    semantic: &str,
) -> Result<FloatSource<'g>> {
    let source = geometry.sources.get(source_id).with_context(|| {
        format!("Source '{source_id}' is not defined in geometry '{}'", geometry.name)
    })?;
    let floats = source.floats().with_context(|| {
        format!("Source '{source_id}' in geometry '{}' is not a float array", geometry.name)
    })?;
    if source.stride < min_stride {
        bail!(
            "A stride of less than {min_stride} is not supported for {semantic} sources \
             (geometry '{}')",
            geometry.name
        );
    }
    Ok(FloatSource {
        floats,
        stride: source.stride,
    })
}

fn read_vec3(source: FloatSource<'_>, index: usize) -> Option<Vec3> {
    let base = index.checked_mul(source.stride)?;
    let chunk = source.floats.get(base..base + 3)?;
    Some(Vec3::new(chunk[0], chunk[1], chunk[2]))
}

fn read_vec2(source: FloatSource<'_>, index: usize) -> Option<Vec2> {
    let base = index.checked_mul(source.stride)?;
    let chunk = source.floats.get(base..base + 2)?;
    Some(Vec2::new(chunk[0], chunk[1]))
}
