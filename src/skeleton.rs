//! Skeleton extraction.
//!
//! Builds the canonical joint hierarchy from the visual-scene node tree and
//! enforces the one-skeleton-per-model invariant: the first skinned mesh
//! locks the skeleton, every later one must produce an identical node list.

use anyhow::{bail, Context, Result};

use crate::model::{Model, Skeleton, SkeletonNode};
use crate::scene::{self, NodeKind, SceneNode};

/// Maximum number of joints the file format can express: joint indices and
/// the header's joint count are both single bytes, and the count must fit.
pub const MAX_JOINTS: usize = 255;

/// Build the skeleton rooted at `skeleton_root_id`, or validate it against
/// the already locked skeleton.
pub fn build_or_reuse(
    roots: &[SceneNode],
    skeleton_root_id: &str,
    model: &mut Model,
) -> Result<()> {
    let candidate = build_skeleton(roots, skeleton_root_id)?;

    if model.skeleton.locked {
        return compare_skeletons(&model.skeleton, &candidate);
    }

    model.skeleton = candidate;
    model.skeleton.locked = true;
    Ok(())
}

/// Build a skeleton by walking the subtree under the named root.
///
/// Every node in the subtree joins the skeleton in discovery order; non-joint
/// nodes are kept as structural entries so parent chains stay connected.
/// Joint indices are then assigned contiguously from 0 in node order, and
/// parent ids are resolved to node-list indices.
fn build_skeleton(roots: &[SceneNode], skeleton_root_id: &str) -> Result<Skeleton> {
    let root = scene::find_node(roots, skeleton_root_id).with_context(|| {
        format!("Skeleton root node '{skeleton_root_id}' was not found in the visual scene")
    })?;

    let mut nodes = Vec::new();
    collect_nodes(root, "", &mut nodes);

    let mut next_joint = 0usize;
    for node in &mut nodes {
        if node.is_joint {
            if next_joint >= MAX_JOINTS {
                bail!(
                    "Skeleton rooted at '{}' has more than {} joints",
                    skeleton_root_id,
                    MAX_JOINTS
                );
            }
            node.joint_index = Some(next_joint as u8);
            next_joint += 1;
        }
    }

    for i in 0..nodes.len() {
        let parent_id = nodes[i].parent_id.clone();
        nodes[i].parent_index = if parent_id.is_empty() {
            -1
        } else {
            nodes
                .iter()
                .position(|node| node.id == parent_id)
                .map(|index| index as i16)
                .unwrap_or(-1)
        };
    }

    Ok(Skeleton {
        nodes,
        locked: false,
    })
}

fn collect_nodes(node: &SceneNode, parent_id: &str, out: &mut Vec<SkeletonNode>) {
    let name = if node.name.is_empty() {
        node.id.clone()
    } else {
        node.name.clone()
    };
    out.push(SkeletonNode {
        id: node.id.clone(),
        name,
        parent_id: parent_id.to_string(),
        is_joint: matches!(node.kind, NodeKind::Joint),
        joint_index: None,
        parent_index: -1,
    });
    for child in &node.children {
        collect_nodes(child, &node.id, out);
    }
}

/// Compare a candidate skeleton against the locked one. Any difference in
/// node count, node names, or parent indices is fatal - joint indices would
/// be ambiguous across meshes otherwise.
fn compare_skeletons(locked: &Skeleton, candidate: &Skeleton) -> Result<()> {
    let locked_root = locked
        .nodes
        .first()
        .map(|node| node.name.as_str())
        .unwrap_or("<empty>");
    let candidate_root = candidate
        .nodes
        .first()
        .map(|node| node.name.as_str())
        .unwrap_or("<empty>");

    let matches = locked.nodes.len() == candidate.nodes.len()
        && locked
            .nodes
            .iter()
            .zip(&candidate.nodes)
            .all(|(a, b)| a.name == b.name && a.parent_index == b.parent_index);

    if !matches {
        bail!(
            "A second, different skeleton was found: all meshes must share one skeleton \
             (roots '{locked_root}' and '{candidate_root}')"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joint(id: &str, children: Vec<SceneNode>) -> SceneNode {
        SceneNode {
            id: id.to_string(),
            name: id.to_string(),
            kind: NodeKind::Joint,
            matrix: None,
            children,
        }
    }

    fn group(id: &str, children: Vec<SceneNode>) -> SceneNode {
        SceneNode {
            id: id.to_string(),
            name: id.to_string(),
            kind: NodeKind::Base,
            matrix: None,
            children,
        }
    }

    fn sample_roots() -> Vec<SceneNode> {
        // root (plain) -> hip -> [spine -> head, leg]
        vec![group(
            "root",
            vec![joint(
                "hip",
                vec![joint("spine", vec![joint("head", vec![])]), joint("leg", vec![])],
            )],
        )]
    }

    #[test]
    fn joint_indices_are_contiguous_in_discovery_order() {
        let roots = sample_roots();
        let mut model = Model::new();
        build_or_reuse(&roots, "root", &mut model).unwrap();

        assert!(model.skeleton.locked);
        assert_eq!(model.skeleton.nodes.len(), 5);
        assert!(!model.skeleton.nodes[0].is_joint);

        let indices: Vec<_> = model
            .skeleton
            .nodes
            .iter()
            .filter_map(|node| node.joint_index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(model.joint_count(), 4);
    }

    #[test]
    fn parent_indices_resolve_to_node_positions() {
        let roots = sample_roots();
        let mut model = Model::new();
        build_or_reuse(&roots, "root", &mut model).unwrap();

        let nodes = &model.skeleton.nodes;
        assert_eq!(nodes[0].parent_index, -1);
        assert_eq!(nodes[1].parent_index, 0); // hip -> root
        assert_eq!(nodes[2].parent_index, 1); // spine -> hip
        assert_eq!(nodes[3].parent_index, 2); // head -> spine
        assert_eq!(nodes[4].parent_index, 1); // leg -> hip
    }

    #[test]
    fn same_root_revalidates_without_error() {
        let roots = sample_roots();
        let mut model = Model::new();
        build_or_reuse(&roots, "root", &mut model).unwrap();
        build_or_reuse(&roots, "root", &mut model).unwrap();
        assert_eq!(model.skeleton.nodes.len(), 5);
    }

    #[test]
    fn different_root_is_fatal_and_names_both_roots() {
        let roots = sample_roots();
        let mut model = Model::new();
        build_or_reuse(&roots, "root", &mut model).unwrap();

        let err = build_or_reuse(&roots, "spine", &mut model).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("second, different skeleton"));
        assert!(message.contains("root"));
        assert!(message.contains("spine"));
    }

    #[test]
    fn joint_count_stops_at_what_the_count_byte_can_hold() {
        // 1 joint root + 254 joint children = 255 joints, the last count a
        // single byte can express.
        let children: Vec<_> = (0..254)
            .map(|i| joint(&format!("j{i}"), vec![]))
            .collect();
        let roots = vec![joint("root", children)];
        let mut model = Model::new();
        build_or_reuse(&roots, "root", &mut model).unwrap();
        assert_eq!(model.joint_count(), MAX_JOINTS);
        assert_eq!(
            model.skeleton.nodes.last().and_then(|node| node.joint_index),
            Some(254)
        );

        // One more joint would wrap the header's joint-count byte.
        let children: Vec<_> = (0..255)
            .map(|i| joint(&format!("j{i}"), vec![]))
            .collect();
        let roots = vec![joint("root", children)];
        let mut model = Model::new();
        let err = build_or_reuse(&roots, "root", &mut model).unwrap_err();
        assert!(err.to_string().contains("more than 255 joints"));
    }

    #[test]
    fn subset_skeleton_is_still_a_mismatch() {
        // A mesh attached at a lower joint builds a strict subset - that must
        // fail, joint indices would disagree between the two meshes.
        let roots = sample_roots();
        let mut model = Model::new();
        build_or_reuse(&roots, "hip", &mut model).unwrap();
        assert!(build_or_reuse(&roots, "head", &mut model).is_err());
    }
}
