//! Byte order switch for `.mshx` files
//!
//! One byte order applies to every multi-byte field of a file.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::mesh::MSHX_VERSION;

/// Byte order of all multi-byte fields in a `.mshx` file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    #[inline]
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    #[inline]
    pub fn f32_bytes(self, value: f32) -> [u8; 4] {
        self.u32_bytes(value.to_bits())
    }

    #[inline]
    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn read_f32(self, bytes: [u8; 4]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    /// Detect the byte order of a file from its version field (bytes 4..8).
    ///
    /// Returns `None` if the data is too short or the version is unknown in
    /// both byte orders.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        let version: [u8; 4] = bytes.get(4..8)?.try_into().ok()?;
        if u32::from_le_bytes(version) == MSHX_VERSION {
            Some(ByteOrder::Little)
        } else if u32::from_be_bytes(version) == MSHX_VERSION {
            Some(ByteOrder::Big)
        } else {
            None
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Little => f.write_str("little-endian"),
            ByteOrder::Big => f.write_str("big-endian"),
        }
    }
}
