//! cinder-export library
//!
//! Converts parsed scene-graph documents into the renderer's binary model
//! format (.cmdl).

pub mod check;
pub mod convert;
pub mod formats;
pub mod model;
pub mod options;
pub mod report;
pub mod scene;
pub mod skeleton;
pub mod transform;

pub use convert::convert;
pub use model::Model;
pub use options::{ConversionOptions, VertexFormat};
pub use report::ConversionReport;
pub use scene::SceneDocument;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};

/// File extension of the binary model format.
pub const MODEL_EXTENSION: &str = "cmdl";

/// Load a scene document from a JSON file.
pub fn load_document(path: &Path) -> Result<SceneDocument> {
    let file = File::open(path)
        .with_context(|| format!("failed to open scene document {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse scene document {}", path.display()))
}

/// Run the full pipeline: validate options, convert, check limits, apply
/// coordinate transforms, and write the model file.
///
/// The report summary is logged whether the run succeeds or aborts, so the
/// counts accumulated before a fatal error are never lost.
pub fn run(
    export_roots: &[String],
    doc: &SceneDocument,
    mut options: ConversionOptions,
    report: &mut ConversionReport,
) -> Result<Model> {
    options::validate_options(&mut options, report);
    let result = convert_and_write(export_roots, doc, &options, report);
    report.finish();
    result
}

fn convert_and_write(
    export_roots: &[String],
    doc: &SceneDocument,
    options: &ConversionOptions,
    report: &mut ConversionReport,
) -> Result<Model> {
    let mut model = convert::convert(export_roots, doc, options, report)?;
    check::check_model(&model, report);
    transform::apply(&mut model, options);
    formats::write_model_file(&options.output, &model, options, report)?;
    Ok(model)
}
