//! Mesh converter (OBJ/MTL -> .mshx)

mod mtl;
mod obj;

use std::io::BufRead;

use mshx_common::GeometryStore;

use crate::error::ExportError;
use crate::pipeline::PipelineReport;

pub use mtl::parse_mtl;
pub use obj::{convert_obj, convert_obj_to_memory, load_obj, parse_obj, ParsedObj};

/// A processed mesh together with its encoded `.mshx` bytes
#[derive(Debug, Clone)]
pub struct ConvertedMesh {
    /// Store after every pipeline stage ran
    pub store: GeometryStore,
    pub report: PipelineReport,
    pub data: Vec<u8>,
}

/// Statement lines of an OBJ or MTL stream as `(line number, text)`.
///
/// Lines are split on raw bytes; blank and `#` lines are skipped before any
/// decoding, so comments may hold arbitrary bytes. Statement lines are
/// decoded lossily.
fn statement_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<(usize, String), ExportError>> {
    reader
        .split(b'\n')
        .enumerate()
        .filter_map(|(index, bytes)| {
            let bytes = match bytes {
                Ok(bytes) => bytes,
                Err(err) => return Some(Err(err.into())),
            };
            let text = String::from_utf8_lossy(&bytes);
            let text = text.trim();
            if text.is_empty() || text.starts_with('#') {
                return None;
            }
            Some(Ok((index + 1, text.to_string())))
        })
}
