//! Error types for mesh conversion

use mshx_common::{FormatError, StoreError};

use crate::quad::QuadDefect;

/// Fatal outcome of a single conversion
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("line {line}: unsupported polygon with {corners} corners (only triangles and quads)")]
    UnsupportedPolygon { line: usize, corners: usize },

    #[error("line {line}: invalid {attribute} index '{token}'")]
    InvalidIndex {
        line: usize,
        attribute: &'static str,
        token: String,
    },

    #[error("line {line}: relative {attribute} index '{token}' is not supported")]
    RelativeIndex {
        line: usize,
        attribute: &'static str,
        token: String,
    },

    #[error("line {line}: face corner '{token}' has more than 3 components")]
    TooManyComponents { line: usize, token: String },

    #[error("line {line}: face corners do not all reference the same attributes")]
    MixedCorners { line: usize },

    #[error("line {line}: malformed '{keyword}' statement")]
    Malformed { line: usize, keyword: String },

    #[error("line {line}: material property '{keyword}' defined outside of a material block")]
    PropertyOutsideMaterial { line: usize, keyword: String },

    #[error("line {line}: only RGB transmission is supported, found '{space}'")]
    UnsupportedColorSpace { line: usize, space: String },

    #[error("face {face}: {defect}")]
    InvalidQuad { face: usize, defect: QuadDefect },

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Format(#[from] FormatError),
}
