//! In-place coordinate transforms applied after conversion.
//!
//! The passes run in a fixed order: handedness flip, then Y/Z axis swap,
//! then vertical texture-coordinate flip. Each pass rewrites vertices,
//! bounds, inverse bind matrices, and triangle winding together so the
//! model stays self-consistent.

use glam::{Mat4, Vec3, Vec4};

use crate::model::Model;
use crate::options::ConversionOptions;

/// Apply the transforms selected in `options` to the model.
pub fn apply(model: &mut Model, options: &ConversionOptions) {
    if options.swap_handedness {
        swap_handedness(model);
    }
    if options.swap_yz {
        swap_yz_axes(model);
    }
    if options.flip_vertical_texcoords {
        flip_vertical_texcoords(model);
    }
}

/// Mirror the model across the XZ plane and reverse triangle winding.
fn swap_handedness(model: &mut Model) {
    // Conjugating by S = diag(1,-1,1,1) re-expresses each bind matrix in the
    // mirrored space.
    let flip = Mat4::from_diagonal(Vec4::new(1.0, -1.0, 1.0, 1.0));

    for mesh in &mut model.meshes {
        for vertex in &mut mesh.vertices {
            vertex.position.y = -vertex.position.y;
            if let Some(normal) = &mut vertex.normal {
                normal.y = -normal.y;
            }
        }
        if let Some(matrices) = &mut mesh.inverse_bind_matrices {
            for matrix in matrices.iter_mut() {
                *matrix = flip * *matrix * flip;
            }
        }
        // Negating Y swaps which bound is the minimum.
        let (min_y, max_y) = (-mesh.max.y, -mesh.min.y);
        mesh.min.y = min_y;
        mesh.max.y = max_y;

        for triangle in mesh.indices.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
    }

    let (min_y, max_y) = (-model.max.y, -model.min.y);
    model.min.y = min_y;
    model.max.y = max_y;
}

/// Exchange the Y and Z axes, converting between Y-up and Z-up conventions.
fn swap_yz_axes(model: &mut Model) {
    let swap = Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    );

    for mesh in &mut model.meshes {
        for vertex in &mut mesh.vertices {
            vertex.position = swap_vec_yz(vertex.position);
            if let Some(normal) = &mut vertex.normal {
                *normal = swap_vec_yz(*normal);
            }
        }
        if let Some(matrices) = &mut mesh.inverse_bind_matrices {
            for matrix in matrices.iter_mut() {
                *matrix = swap * *matrix * swap;
            }
        }
        mesh.min = swap_vec_yz(mesh.min);
        mesh.max = swap_vec_yz(mesh.max);
    }

    model.min = swap_vec_yz(model.min);
    model.max = swap_vec_yz(model.max);
}

fn swap_vec_yz(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, v.y)
}

/// Flip texture coordinates for images addressed from the opposite vertical
/// edge: v' = 1 - v.
fn flip_vertical_texcoords(model: &mut Model) {
    for mesh in &mut model.meshes {
        for vertex in &mut mesh.vertices {
            if let Some(texcoord) = &mut vertex.texcoord {
                texcoord.y = 1.0 - texcoord.y;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mesh, Vertex};
    use glam::Vec2;

    fn sample_model() -> Model {
        let mut mesh = Mesh::new("m");
        let mut a = Vertex::at(Vec3::new(1.0, 2.0, 3.0));
        a.normal = Some(Vec3::new(0.0, 1.0, 0.0));
        a.texcoord = Some(Vec2::new(0.25, 0.75));
        let mut b = Vertex::at(Vec3::new(-1.0, -2.0, -3.0));
        b.normal = Some(Vec3::new(0.0, -1.0, 0.0));
        b.texcoord = Some(Vec2::new(0.5, 0.0));
        let c = Vertex::at(Vec3::new(0.0, 0.5, 1.0));
        for vertex in [&a, &b, &c] {
            mesh.grow_bounds(vertex.position);
        }
        mesh.vertices = vec![a, b, c];
        mesh.indices = vec![0, 1, 2];
        mesh.inverse_bind_matrices = Some(vec![Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))]);

        let mut model = Model::new();
        model.meshes.push(mesh);
        model.update_bounds();
        model
    }

    fn options(swap_handedness: bool, swap_yz: bool, flip_uvs: bool) -> ConversionOptions {
        ConversionOptions {
            swap_handedness,
            swap_yz,
            flip_vertical_texcoords: flip_uvs,
            ..ConversionOptions::default()
        }
    }

    #[test]
    fn handedness_swap_negates_y_and_rewinds_triangles() {
        let mut model = sample_model();
        apply(&mut model, &options(true, false, false));

        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices[0].position, Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(mesh.vertices[0].normal, Some(Vec3::new(0.0, -1.0, 0.0)));
        assert_eq!(mesh.indices, vec![0, 2, 1]);
        assert!(mesh.min.y <= mesh.max.y);
        assert!(model.min.y <= model.max.y);

        let ibm = mesh.inverse_bind_matrices.as_ref().unwrap()[0];
        assert_eq!(ibm.w_axis, glam::Vec4::new(1.0, -2.0, 3.0, 1.0));
    }

    #[test]
    fn handedness_swap_twice_is_identity() {
        let mut model = sample_model();
        let reference = sample_model();
        apply(&mut model, &options(true, false, false));
        apply(&mut model, &options(true, false, false));

        let (mesh, original) = (&model.meshes[0], &reference.meshes[0]);
        assert_eq!(mesh.vertices, original.vertices);
        assert_eq!(mesh.indices, original.indices);
        assert_eq!(mesh.min, original.min);
        assert_eq!(mesh.max, original.max);
    }

    #[test]
    fn yz_swap_exchanges_components_everywhere() {
        let mut model = sample_model();
        apply(&mut model, &options(false, true, false));

        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices[0].position, Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(mesh.vertices[0].normal, Some(Vec3::new(0.0, 0.0, 1.0)));

        let ibm = mesh.inverse_bind_matrices.as_ref().unwrap()[0];
        assert_eq!(ibm.w_axis, glam::Vec4::new(1.0, 3.0, 2.0, 1.0));
    }

    #[test]
    fn texcoord_flip_inverts_v_only() {
        let mut model = sample_model();
        apply(&mut model, &options(false, false, true));

        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices[0].texcoord, Some(Vec2::new(0.25, 0.25)));
        assert_eq!(mesh.vertices[1].texcoord, Some(Vec2::new(0.5, 1.0)));
        assert_eq!(mesh.vertices[2].texcoord, None);
    }
}
