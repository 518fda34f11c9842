//! Manifest parsing and build orchestration
//!
//! Parses assets.toml and converts every listed mesh in order.

use anyhow::{Context, Result};
use hashbrown::HashSet;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use mshx_common::{ByteOrder, MSHX_EXT};

use crate::pipeline::{PipelineConfig, PipelineReport};
use crate::quad::QuadMode;

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    /// Defaults applied to every mesh
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub meshes: Vec<MeshEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshEntry {
    pub id: String,
    /// Source OBJ, relative to the manifest directory
    pub path: PathBuf,
    /// Output file name inside the output directory
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub byte_order: Option<ByteOrder>,
    #[serde(default)]
    pub dedup: Option<bool>,
    #[serde(default)]
    pub optimize: Option<bool>,
    #[serde(default)]
    pub quad_mode: Option<QuadMode>,
}

impl MeshEntry {
    /// Manifest defaults with this entry's overrides applied
    pub fn config(&self, defaults: &PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            byte_order: self.byte_order.unwrap_or(defaults.byte_order),
            dedup: self.dedup.unwrap_or(defaults.dedup),
            optimize: self.optimize.unwrap_or(defaults.optimize),
            quad_mode: self.quad_mode.unwrap_or(defaults.quad_mode),
            tolerances: defaults.tolerances,
        }
    }

    pub fn output_name(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.{}", self.id, MSHX_EXT)))
    }

    fn is_obj(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("obj"))
    }
}

/// Result of converting one manifest entry
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub id: String,
    pub output: PathBuf,
    pub bytes: usize,
    pub report: PipelineReport,
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let manifest: Manifest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    Ok(manifest)
}

/// Directory that relative manifest paths resolve against
pub fn manifest_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

/// Validate a manifest without building
pub fn validate(manifest: &Manifest, base_dir: &Path) -> Result<()> {
    let mut ids = HashSet::new();
    for entry in &manifest.meshes {
        if entry.id.trim().is_empty() {
            anyhow::bail!("Mesh with source {:?} has an empty id", entry.path);
        }
        if !ids.insert(entry.id.as_str()) {
            anyhow::bail!("Duplicate mesh id '{}'", entry.id);
        }
        if !entry.is_obj() {
            anyhow::bail!(
                "Unsupported mesh format for '{}': {:?} (use .obj)",
                entry.id,
                entry.path
            );
        }
        let source = base_dir.join(&entry.path);
        if !source.exists() {
            anyhow::bail!("Mesh '{}' source not found: {:?}", entry.id, source);
        }
    }
    Ok(())
}

/// Build all meshes from a manifest, stopping at the first failure
pub fn build_all(
    manifest: &Manifest,
    base_dir: &Path,
    output_override: Option<&Path>,
) -> Result<Vec<BuildOutcome>> {
    validate(manifest, base_dir)?;

    let output_dir = match output_override {
        Some(dir) => dir.to_path_buf(),
        None => base_dir.join(&manifest.output.dir),
    };
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut outcomes = Vec::with_capacity(manifest.meshes.len());
    for entry in &manifest.meshes {
        let input = base_dir.join(&entry.path);
        let output = output_dir.join(entry.output_name());
        tracing::info!("Converting mesh: {} -> {:?}", entry.id, output);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }

        let config = entry.config(&manifest.pipeline);
        let mesh = crate::mesh::convert_obj(&input, &output, &config)
            .with_context(|| format!("Failed to build mesh '{}'", entry.id))?;

        outcomes.push(BuildOutcome {
            id: entry.id.clone(),
            output,
            bytes: mesh.data.len(),
            report: mesh.report,
        });
    }

    Ok(outcomes)
}
