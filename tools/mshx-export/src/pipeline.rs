//! Conversion pipeline
//!
//! Runs the stages in a fixed order over one exclusively borrowed store:
//! index check, bounding sphere, quad handling, material resolution,
//! optional dedup, optional optimization, final index check.

use mshx_common::{ByteOrder, Face, GeometryStore};
use serde::{Deserialize, Serialize};

use crate::bounds::ritter_bounding_sphere;
use crate::dedup::{deduplicate, DedupReport, DedupTolerances};
use crate::error::ExportError;
use crate::formats::encode_mshx_mesh;
use crate::optimize::{self, OptimizeReport};
use crate::quad::{process_quads, QuadMode, QuadReport};

/// Operating parameters of one conversion
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub byte_order: ByteOrder,
    pub optimize: bool,
    pub dedup: bool,
    pub tolerances: DedupTolerances,
    pub quad_mode: QuadMode,
}

/// What each stage did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub quads: QuadReport,
    /// Faces whose material name had no match and fell back to material 0
    pub material_misses: usize,
    pub dedup: Option<DedupReport>,
    pub optimize: Option<OptimizeReport>,
    pub stride_before: u64,
    pub stride_after: u64,
}

/// Sum of absolute differences between consecutive vertex indices, walking
/// every face corner in order. Lower means better vertex cache locality.
pub fn vertex_stride_distance(faces: &[Face]) -> u64 {
    let Some(&first) = faces.first().and_then(|f| f.v.first()) else {
        return 0;
    };

    let mut prev = i64::from(first);
    let mut total = 0u64;
    for face in faces {
        for &index in &face.v {
            let index = i64::from(index);
            total += (index - prev).unsigned_abs();
            prev = index;
        }
    }
    total
}

/// Run every stage on `store`. On success the store is index-consistent and
/// ready to encode.
pub fn process(
    store: &mut GeometryStore,
    config: &PipelineConfig,
) -> Result<PipelineReport, ExportError> {
    store.check_indices()?;

    store.bound_sphere = ritter_bounding_sphere(&store.vertices);
    let sphere = store.bound_sphere;
    tracing::info!(
        "Bounding sphere: center ({}, {}, {}) radius {}",
        sphere.center.x,
        sphere.center.y,
        sphere.center.z,
        sphere.radius
    );

    let quads = process_quads(store, config.quad_mode)?;

    let material_misses = store.resolve_materials();
    // Without a material library every face uses the default slot
    if material_misses > 0 && !store.materials.is_empty() {
        tracing::warn!(
            "{} faces reference unknown materials and use material 0",
            material_misses
        );
    }

    let dedup = config
        .dedup
        .then(|| deduplicate(store, &config.tolerances));

    let stride_before = vertex_stride_distance(&store.faces);
    let optimize = config.optimize.then(|| optimize::optimize(store));
    let stride_after = vertex_stride_distance(&store.faces);
    tracing::debug!(
        "Vertex stride distance: {} -> {}",
        stride_before,
        stride_after
    );

    store.check_indices()?;

    Ok(PipelineReport {
        quads,
        material_misses,
        dedup,
        optimize,
        stride_before,
        stride_after,
    })
}

/// Process `store` and encode it in the configured byte order
pub fn compile_mesh(
    store: &mut GeometryStore,
    config: &PipelineConfig,
) -> Result<(PipelineReport, Vec<u8>), ExportError> {
    let report = process(store, config)?;
    let bytes = encode_mshx_mesh(store, config.byte_order)?;
    Ok((report, bytes))
}
