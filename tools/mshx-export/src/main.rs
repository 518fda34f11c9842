//! mshx-export - MSHX mesh compiler
//!
//! Converts OBJ/MTL meshes to validated, optimized .mshx binaries

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use mshx_export::formats::read_mshx_mesh;
use mshx_export::{manifest, mesh, ByteOrder, DedupTolerances, PipelineConfig, QuadMode, MSHX_EXT};

#[derive(Parser)]
#[command(name = "mshx-export")]
#[command(about = "MSHX mesh compiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only log errors
    #[arg(long, global = true)]
    silent: bool,

    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "silent")]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build meshes from a manifest file
    Build {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate manifest without building
    Check {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,
    },

    /// Convert a single OBJ file
    Mesh {
        /// Input OBJ file
        input: PathBuf,

        /// Output .mshx file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write little-endian output
        #[arg(long = "le", conflicts_with = "big_endian")]
        little_endian: bool,

        /// Write big-endian output
        #[arg(long = "be")]
        big_endian: bool,

        /// Merge near-duplicate vertices, normals and texture coordinates
        #[arg(short, long)]
        dedup: bool,

        /// Reorder faces and attributes for cache locality
        #[arg(long = "mo")]
        optimize: bool,

        /// Quad handling: 0 skip, 1 strict, 2 repair, 3 triangulate
        #[arg(short = 'q', long = "quad-mode", default_value_t = 0,
              value_parser = clap::value_parser!(u8).range(0..=3))]
        quad_mode: u8,

        /// Position merge distance
        #[arg(long)]
        position_epsilon: Option<f64>,

        /// Per-axis normal merge tolerance
        #[arg(long)]
        normal_epsilon: Option<f64>,

        /// Per-axis texture coordinate merge tolerance
        #[arg(long)]
        uv_epsilon: Option<f64>,
    },

    /// Print the header and counts of an .mshx file
    Inspect {
        /// Input .mshx file
        input: PathBuf,
    },
}

fn init_logging(silent: bool, verbose: bool) {
    let level = if silent {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();
}

fn inspect(input: &Path) -> Result<()> {
    let mut file =
        std::fs::File::open(input).with_context(|| format!("Failed to open {:?}", input))?;
    let mesh = read_mshx_mesh(&mut file).with_context(|| format!("Failed to decode {:?}", input))?;
    let header = &mesh.header;
    let [x, y, z, radius] = header.bound_sphere;

    tracing::info!("{:?}: MSHX version 1, {}", input, mesh.byte_order);
    tracing::info!("  vertex type: {}", header.vertex_type);
    tracing::info!("  vertices:    {}", header.vertex_count);
    tracing::info!("  normals:     {}", header.normal_count);
    tracing::info!("  uvs:         {}", header.uv_count);
    tracing::info!("  faces:       {}", header.face_count);
    tracing::info!("  materials:   {}", header.material_count);
    tracing::info!("  bounds:      center ({}, {}, {}) radius {}", x, y, z, radius);

    let quads = mesh.store.faces.iter().filter(|f| f.is_quad()).count();
    tracing::info!("  quads:       {}", quads);
    for (i, material) in mesh.store.materials.iter().enumerate() {
        tracing::info!(
            "  material {}: diffuse {:?}, texture {}",
            i,
            material.diffuse,
            material.texture.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.silent, cli.verbose);

    match cli.command {
        Commands::Build { manifest, output } => {
            tracing::debug!("Building meshes from {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            let outcomes =
                manifest::build_all(&config, manifest::manifest_dir(&manifest), output.as_deref())?;
            tracing::info!("Build complete! {} meshes", outcomes.len());
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config, manifest::manifest_dir(&manifest))?;
            tracing::info!("Manifest is valid!");
        }

        Commands::Mesh {
            input,
            output,
            little_endian,
            big_endian,
            dedup,
            optimize,
            quad_mode,
            position_epsilon,
            normal_epsilon,
            uv_epsilon,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension(MSHX_EXT));
            tracing::info!("Converting {:?} -> {:?}", input, output);

            let byte_order = if big_endian {
                ByteOrder::Big
            } else {
                if !little_endian {
                    tracing::warn!("No byte order given (--le or --be), writing little-endian");
                }
                ByteOrder::Little
            };

            let defaults = DedupTolerances::default();
            let config = PipelineConfig {
                byte_order,
                dedup,
                optimize,
                quad_mode: QuadMode::try_from(quad_mode).map_err(anyhow::Error::msg)?,
                tolerances: DedupTolerances {
                    position: position_epsilon.unwrap_or(defaults.position),
                    normal: normal_epsilon.unwrap_or(defaults.normal),
                    tex_coord: uv_epsilon.unwrap_or(defaults.tex_coord),
                },
            };

            let ext = input
                .extension()
                .and_then(|e| e.to_str())
                .map(|s| s.to_lowercase())
                .unwrap_or_default();
            if ext != "obj" {
                anyhow::bail!("Unsupported mesh format: {:?} (use .obj)", input);
            }

            mesh::convert_obj(&input, &output, &config)?;
            tracing::info!("Done!");
        }

        Commands::Inspect { input } => inspect(&input)?,
    }

    Ok(())
}
