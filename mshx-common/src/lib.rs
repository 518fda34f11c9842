//! Shared types for the MSHX mesh compiler
//!
//! This crate provides the pieces shared between:
//! - `mshx-export` (asset pipeline and CLI)
//! - runtimes that load `.mshx` files
//!
//! # Modules
//!
//! - [`store`] - Geometry store (vertices, normals, texture coordinates, faces, materials)
//! - [`formats`] - `.mshx` header, byte order switch and decoder

pub mod formats;
pub mod store;

// Re-export the geometry store
pub use store::{
    BoundSphere, Corners, CornerSet, Face, GeometryStore, Material, Normal, StoreError, Tangent,
    TexCoord, Vertex, VertexType,
};

// Re-export commonly used format items
pub use formats::{
    ByteOrder, DecodedMesh, FormatError, MATERIAL_FIXED_SIZE, MSHX_EXT, MSHX_MAGIC, MSHX_VERSION,
    MshxHeader, decode_mshx_mesh, read_mshx_mesh,
};
