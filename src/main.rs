//! cinder-export - scene-graph to binary model converter
//!
//! Converts parsed scene-graph documents (JSON) to the renderer's compact
//! binary model format (.cmdl).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cinder_export::{check, convert, formats, options};
use cinder_export::{ConversionOptions, ConversionReport, VertexFormat, MODEL_EXTENSION};

#[derive(Parser)]
#[command(name = "cinder-export")]
#[command(about = "Cinder model export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a scene document to a binary model file
    Convert {
        /// Input scene document (JSON)
        input: PathBuf,

        /// Output .cmdl file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ids of the scene nodes to export (descendants are included)
        #[arg(short, long = "export", required = true)]
        export_roots: Vec<String>,

        /// Vertex format (e.g. POS_NORMAL_UV_WEIGHTS_JOINTS)
        #[arg(short, long)]
        format: Option<String>,

        /// Export skeleton and skinning data
        #[arg(long)]
        animated: bool,

        /// Mirror the model to the opposite handedness
        #[arg(long)]
        swap_handedness: bool,

        /// Swap the Y and Z axes
        #[arg(long)]
        swap_yz: bool,

        /// Flip texture coordinates vertically
        #[arg(long)]
        flip_uvs: bool,

        /// Merge triangle groups that share a material into one mesh
        #[arg(long)]
        combine: bool,
    },

    /// Convert without writing and report warnings and errors
    Check {
        /// Input scene document (JSON)
        input: PathBuf,

        /// Ids of the scene nodes to export
        #[arg(short, long = "export", required = true)]
        export_roots: Vec<String>,

        /// Vertex format (e.g. POS_NORMAL_UV)
        #[arg(short, long)]
        format: Option<String>,

        /// Check skeleton and skinning data as well
        #[arg(long)]
        animated: bool,
    },

    /// Print a summary of an existing model file
    Info {
        /// Input .cmdl file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            export_roots,
            format,
            animated,
            swap_handedness,
            swap_yz,
            flip_uvs,
            combine,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension(MODEL_EXTENSION));
            tracing::info!("Converting {:?} -> {:?}", input, output);

            let doc = cinder_export::load_document(&input)?;
            let options = ConversionOptions {
                input,
                output,
                animated,
                swap_handedness,
                swap_yz,
                flip_vertical_texcoords: flip_uvs,
                combine_meshes: combine,
                vertex_format: vertex_format(format.as_deref(), animated),
            };

            let mut report = ConversionReport::new();
            cinder_export::run(&export_roots, &doc, options, &mut report)?;
            tracing::info!("Done!");
        }

        Commands::Check {
            input,
            export_roots,
            format,
            animated,
        } => {
            tracing::info!("Checking {:?}", input);

            let doc = cinder_export::load_document(&input)?;
            let mut options = ConversionOptions {
                input,
                animated,
                vertex_format: vertex_format(format.as_deref(), animated),
                ..ConversionOptions::default()
            };

            let mut report = ConversionReport::new();
            options::validate_options(&mut options, &mut report);
            let model = convert::convert(&export_roots, &doc, &options, &mut report)?;
            check::check_model(&model, &mut report);
            report.finish();
            tracing::info!(
                "Document is convertible: {} meshes, {} warnings",
                model.meshes.len(),
                report.warning_count()
            );
        }

        Commands::Info { input } => {
            let bytes = std::fs::read(&input)?;
            let parsed = formats::ParsedModel::from_bytes(&bytes)?;
            print_info(&parsed);
        }
    }

    Ok(())
}

fn vertex_format(format: Option<&str>, animated: bool) -> VertexFormat {
    match format {
        Some(s) => VertexFormat::parse(s),
        None if animated => VertexFormat {
            weights: true,
            joint_indices: true,
            ..VertexFormat::default()
        },
        None => VertexFormat::default(),
    }
}

fn print_info(parsed: &formats::ParsedModel) {
    println!("version:    {}", parsed.version);
    println!("animated:   {}", parsed.has_animation);
    println!("index size: {} bytes", parsed.index_size);
    println!("bounds:     {:?} .. {:?}", parsed.min, parsed.max);
    if parsed.has_animation {
        println!(
            "skeleton:   {} nodes, {} joints",
            parsed.skeleton_nodes.len(),
            parsed.joint_count
        );
    }
    println!("meshes:     {}", parsed.meshes.len());
    for mesh in &parsed.meshes {
        println!(
            "  {}: {} vertices, {} triangles",
            mesh.name,
            mesh.vertices.len(),
            mesh.indices.len() / 3
        );
    }
}
