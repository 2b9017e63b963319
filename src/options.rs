//! Conversion options and pre-flight validation.

use std::path::PathBuf;

use crate::report::ConversionReport;

/// Options for one conversion run.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub input: PathBuf,
    pub output: PathBuf,

    /// Export skeleton and skinning data.
    pub animated: bool,
    /// Negate Y to switch handedness.
    pub swap_handedness: bool,
    /// Swap the Y and Z axes.
    pub swap_yz: bool,
    /// Flip the V texture coordinate (`v' = 1 - v`).
    pub flip_vertical_texcoords: bool,
    /// Merge triangle groups that share a material into one mesh.
    pub combine_meshes: bool,

    /// Which vertex fields to read and write. Independent of what the source
    /// data actually carries; a mismatch warns, never fails.
    pub vertex_format: VertexFormat,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            animated: false,
            swap_handedness: false,
            swap_yz: false,
            flip_vertical_texcoords: false,
            combine_meshes: false,
            vertex_format: VertexFormat::default(),
        }
    }
}

/// Requested vertex fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexFormat {
    pub position: bool,
    pub normal: bool,
    pub texcoord: bool,
    pub color: bool,
    pub weights: bool,
    pub joint_indices: bool,
}

impl Default for VertexFormat {
    fn default() -> Self {
        Self {
            position: true,
            normal: true,
            texcoord: true,
            color: false,
            weights: false,
            joint_indices: false,
        }
    }
}

impl VertexFormat {
    /// Parse a format string such as `POS_NORMAL_UV_COLOR_WEIGHTS_JOINTS`.
    pub fn parse(s: &str) -> Self {
        let s = s.to_uppercase();
        Self {
            position: s.contains("POS"),
            normal: s.contains("NORMAL"),
            texcoord: s.contains("UV"),
            color: s.contains("COLOR"),
            weights: s.contains("WEIGHT"),
            joint_indices: s.contains("JOINT"),
        }
    }
}

/// Check for nonsensical option combinations before conversion starts.
///
/// Recoverable combinations are fixed up in place with a warning.
pub fn validate_options(options: &mut ConversionOptions, report: &mut ConversionReport) {
    if options.animated
        && !(options.vertex_format.weights && options.vertex_format.joint_indices)
    {
        report.warn(
            "Animation data was requested without weight and joint-index vertex fields; \
             skinned meshes will not deform",
        );
    }

    // Welding by material cannot preserve per-mesh skin assignment.
    if options.combine_meshes && options.animated {
        options.combine_meshes = false;
        report.warn("Combine-meshes is incompatible with animation data and has been disabled");
    }
}
