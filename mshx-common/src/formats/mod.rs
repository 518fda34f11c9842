//! MSHX binary asset format
//!
//! Header and record layout of compiled meshes, the byte order switch that
//! applies to a whole file, and the decoder used by loaders and tests.
//! The encoder lives in `mshx-export`.

mod byte_order;
pub mod mesh;

pub use byte_order::ByteOrder;
pub use mesh::*;
