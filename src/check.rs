//! Runtime-limit checks on a converted model.
//!
//! These limits come from the renderer rather than the file format, so
//! breaching them is reported as a warning and never stops the conversion.

use crate::model::Model;
use crate::report::ConversionReport;

/// Largest index count or index value a 16-bit index buffer can express.
const MAX_U16_INDEX: usize = u16::MAX as usize;
/// Skeleton node cap imposed by the runtime's i16 node indices being loaded
/// into a fixed pool.
const MAX_SKELETON_NODES: usize = 256;
/// Joint cap imposed by the runtime's shader constant budget.
const MAX_SKINNED_JOINTS: usize = 60;

/// Warn about anything in the model that exceeds runtime limits.
pub fn check_model(model: &Model, report: &mut ConversionReport) {
    for mesh in &model.meshes {
        if mesh.indices.len() > MAX_U16_INDEX {
            report.warn(format!(
                "Mesh '{}' has {} indices, more than a 16-bit index buffer can hold",
                mesh.name,
                mesh.indices.len()
            ));
        }
        if let Some(largest) = mesh.indices.iter().max() {
            if *largest as usize > MAX_U16_INDEX {
                report.warn(format!(
                    "Mesh '{}' references vertex {}, beyond the 16-bit index range",
                    mesh.name, largest
                ));
            }
        }
    }

    if model.skeleton.nodes.len() > MAX_SKELETON_NODES {
        report.warn(format!(
            "Skeleton has {} nodes, more than the runtime limit of {MAX_SKELETON_NODES}",
            model.skeleton.nodes.len()
        ));
    }
    if model.joint_count() > MAX_SKINNED_JOINTS {
        report.warn(format!(
            "Skeleton has {} joints, more than the runtime limit of {MAX_SKINNED_JOINTS}",
            model.joint_count()
        ));
    }
}
