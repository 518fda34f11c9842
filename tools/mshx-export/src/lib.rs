//! mshx-export library
//!
//! Compiles OBJ/MTL meshes into `.mshx` binaries: validation, quad handling,
//! attribute deduplication and cache-locality reordering, then encoding in a
//! selectable byte order.

pub mod bounds;
pub mod dedup;
pub mod error;
pub mod formats;
pub mod manifest;
pub mod mesh;
pub mod optimize;
pub mod pipeline;
pub mod quad;

pub use error::ExportError;

// Re-export the geometry model and file layout from mshx-common
pub use mshx_common::{
    BoundSphere, ByteOrder, Face, GeometryStore, Material, Normal, TexCoord, Vertex, VertexType,
    MSHX_EXT,
};

pub use dedup::{DedupReport, DedupTolerances};
pub use mesh::{convert_obj, convert_obj_to_memory, ConvertedMesh};
pub use pipeline::{compile_mesh, process, PipelineConfig, PipelineReport};
pub use quad::{QuadMode, QuadReport};
