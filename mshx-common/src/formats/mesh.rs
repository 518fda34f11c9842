//! MSHX binary mesh format (.mshx)
//!
//! Every multi-byte field uses the single byte order selected for the file.
//!
//! # Layout
//! ```text
//! 0x00: magic "MSHX"
//! 0x04: version u32 (= 1)
//! 0x08: vertex_count u32
//! 0x0C: normal_count u32
//! 0x10: tangent_count u32 (always 0)
//! 0x14: uv_count u32
//! 0x18: face_count u32
//! 0x1C: material_count u32
//! 0x20: vertex_type u32 (0 = xyz, 1 = xyz + argb)
//! 0x24: bounding sphere f32 × 4 (center x, y, z, radius)
//! 0x34: vertex records   (x, y, z [, a, r, g, b] f32)
//! var:  normal records   (x, y, z f32)
//! var:  uv records       (u, v f32)
//! var:  face records     (edges u8, v[edges] u32, n[edges] u32 if normals,
//!                         uv[edges] u32 if uvs, material u32)
//! var:  material records (diffuse, specular, ambient, transmissive, emissive f32 × 3,
//!                         power, transparency, refractivity f32, illum u32,
//!                         roughness, metallic, sheen, clearcoat thickness,
//!                         clearcoat roughness, aniso, aniso rotation f32,
//!                         texture name length u32, texture name bytes)
//! ```

use std::io::Read;

use super::byte_order::ByteOrder;
use crate::store::{
    BoundSphere, Corners, Face, GeometryStore, Material, Normal, StoreError, TexCoord, Vertex,
    VertexType,
};

/// File magic
pub const MSHX_MAGIC: [u8; 4] = *b"MSHX";

/// Current format version
pub const MSHX_VERSION: u32 = 1;

/// File extension for compiled meshes
pub const MSHX_EXT: &str = "mshx";

/// Size of a material record before its texture name bytes
pub const MATERIAL_FIXED_SIZE: usize = 27 * 4;

/// MSHX file header (52 bytes)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MshxHeader {
    pub vertex_count: u32,
    pub normal_count: u32,
    pub tangent_count: u32,
    pub uv_count: u32,
    pub face_count: u32,
    pub material_count: u32,
    pub vertex_type: u32,
    /// center x, y, z, radius
    pub bound_sphere: [f32; 4],
}

impl MshxHeader {
    pub const SIZE: usize = 52;

    /// Build the header describing a geometry store
    pub fn for_store(store: &GeometryStore) -> Self {
        Self {
            vertex_count: store.vertices.len() as u32,
            normal_count: store.normals.len() as u32,
            tangent_count: 0,
            uv_count: store.tex_coords.len() as u32,
            face_count: store.faces.len() as u32,
            material_count: store.materials.len() as u32,
            vertex_type: store.vertex_type.tag(),
            bound_sphere: store.bound_sphere.to_array(),
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self, order: ByteOrder) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&MSHX_MAGIC);
        bytes[4..8].copy_from_slice(&order.u32_bytes(MSHX_VERSION));

        let counts = [
            self.vertex_count,
            self.normal_count,
            self.tangent_count,
            self.uv_count,
            self.face_count,
            self.material_count,
            self.vertex_type,
        ];
        for (i, value) in counts.iter().enumerate() {
            let at = 8 + i * 4;
            bytes[at..at + 4].copy_from_slice(&order.u32_bytes(*value));
        }
        for (i, value) in self.bound_sphere.iter().enumerate() {
            let at = 36 + i * 4;
            bytes[at..at + 4].copy_from_slice(&order.f32_bytes(*value));
        }
        bytes
    }

    /// Read header from bytes
    ///
    /// Returns `None` if the data is too short or does not start with the
    /// MSHX magic. The version is not checked.
    pub fn from_bytes(bytes: &[u8], order: ByteOrder) -> Option<Self> {
        if bytes.len() < Self::SIZE || bytes[0..4] != MSHX_MAGIC {
            return None;
        }
        let word = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
        let u = |at: usize| order.read_u32(word(at));
        let f = |at: usize| order.read_f32(word(at));

        Some(Self {
            vertex_count: u(8),
            normal_count: u(12),
            tangent_count: u(16),
            uv_count: u(20),
            face_count: u(24),
            material_count: u(28),
            vertex_type: u(32),
            bound_sphere: [f(36), f(40), f(44), f(48)],
        })
    }
}

/// Errors raised while decoding a `.mshx` file
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of data reading {what} at offset {offset}")]
    Truncated { what: &'static str, offset: usize },

    #[error("bad magic {0:?}, expected \"MSHX\"")]
    BadMagic([u8; 4]),

    #[error("unsupported version (expected 1 in either byte order)")]
    UnsupportedVersion,

    #[error("unknown vertex type {0}")]
    UnknownVertexType(u32),

    #[error("{0} tangent records present, tangents are not supported")]
    UnexpectedTangents(u32),

    #[error("face {face}: invalid edge count {edges}")]
    InvalidFaceDegree { face: usize, edges: u8 },

    #[error("material {material}: texture name is not valid UTF-8")]
    InvalidTextureName { material: usize },

    #[error("{0} trailing bytes after the last material record")]
    TrailingBytes(usize),

    #[error("decoded mesh is inconsistent: {0}")]
    Store(#[from] StoreError),
}

/// Result of decoding a `.mshx` file
#[derive(Debug, Clone)]
pub struct DecodedMesh {
    pub byte_order: ByteOrder,
    pub header: MshxHeader,
    /// Material names are not serialized, so the decoded materials are unnamed
    pub store: GeometryStore,
}

/// Sequential reader over the record section
struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> ByteCursor<'a> {
    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], FormatError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(FormatError::Truncated {
                what,
                offset: self.pos,
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn word(&mut self, what: &'static str) -> Result<[u8; 4], FormatError> {
        let b = self.take(4, what)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, FormatError> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, FormatError> {
        Ok(self.order.read_u32(self.word(what)?))
    }

    fn f32(&mut self, what: &'static str) -> Result<f32, FormatError> {
        Ok(self.order.read_f32(self.word(what)?))
    }

    fn rgb(&mut self, what: &'static str) -> Result<[f32; 3], FormatError> {
        Ok([self.f32(what)?, self.f32(what)?, self.f32(what)?])
    }

    fn corners(&mut self, edges: usize, what: &'static str) -> Result<Corners, FormatError> {
        (0..edges).map(|_| self.u32(what)).collect()
    }
}

/// Read and decode a complete `.mshx` stream
pub fn read_mshx_mesh<R: Read>(reader: &mut R) -> Result<DecodedMesh, FormatError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_mshx_mesh(&bytes)
}

/// Decode a `.mshx` file, detecting its byte order from the version field.
///
/// The decoded store is checked for index consistency before it is returned.
pub fn decode_mshx_mesh(bytes: &[u8]) -> Result<DecodedMesh, FormatError> {
    if bytes.len() < MshxHeader::SIZE {
        return Err(FormatError::Truncated {
            what: "header",
            offset: 0,
        });
    }
    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if magic != MSHX_MAGIC {
        return Err(FormatError::BadMagic(magic));
    }
    let order = ByteOrder::detect(bytes).ok_or(FormatError::UnsupportedVersion)?;
    let header = MshxHeader::from_bytes(bytes, order).ok_or(FormatError::BadMagic(magic))?;

    let vertex_type = VertexType::from_tag(header.vertex_type)
        .ok_or(FormatError::UnknownVertexType(header.vertex_type))?;
    if header.tangent_count != 0 {
        return Err(FormatError::UnexpectedTangents(header.tangent_count));
    }

    let mut cursor = ByteCursor {
        bytes,
        pos: MshxHeader::SIZE,
        order,
    };
    let mut store = GeometryStore {
        vertex_type,
        bound_sphere: BoundSphere::from_array(header.bound_sphere),
        ..GeometryStore::default()
    };

    for _ in 0..header.vertex_count {
        let mut vertex = Vertex::new(
            cursor.f32("vertex")?,
            cursor.f32("vertex")?,
            cursor.f32("vertex")?,
        );
        if vertex_type.has_color() {
            vertex.a = cursor.f32("vertex color")?;
            vertex.r = cursor.f32("vertex color")?;
            vertex.g = cursor.f32("vertex color")?;
            vertex.b = cursor.f32("vertex color")?;
        }
        store.vertices.push(vertex);
    }

    // Stored normals are already unit length, keep the exact bits
    for _ in 0..header.normal_count {
        store.normals.push(Normal {
            x: cursor.f32("normal")?,
            y: cursor.f32("normal")?,
            z: cursor.f32("normal")?,
            w: 0.0,
        });
    }

    for _ in 0..header.uv_count {
        store
            .tex_coords
            .push(TexCoord::new(cursor.f32("uv")?, cursor.f32("uv")?));
    }

    for face_index in 0..header.face_count as usize {
        let edges = cursor.u8("face edge count")?;
        if !(3..=4).contains(&edges) {
            return Err(FormatError::InvalidFaceDegree {
                face: face_index,
                edges,
            });
        }
        let edges = usize::from(edges);
        let mut face = Face {
            v: cursor.corners(edges, "face vertex indices")?,
            ..Face::default()
        };
        if header.normal_count > 0 {
            face.n = cursor.corners(edges, "face normal indices")?;
        }
        if header.uv_count > 0 {
            face.uv = cursor.corners(edges, "face uv indices")?;
        }
        face.material_id = cursor.u32("face material")?;
        store.faces.push(face);
    }

    for material_index in 0..header.material_count as usize {
        let mut material = Material {
            diffuse: cursor.rgb("material diffuse")?,
            specular: cursor.rgb("material specular")?,
            ambient: cursor.rgb("material ambient")?,
            transmissive: cursor.rgb("material transmissive")?,
            emissive: cursor.rgb("material emissive")?,
            ..Material::default()
        };
        material.power = cursor.f32("material power")?;
        material.transparency = cursor.f32("material transparency")?;
        material.refractivity = cursor.f32("material refractivity")?;
        material.illum = cursor.u32("material illum")?;
        material.roughness = cursor.f32("material roughness")?;
        material.metallic = cursor.f32("material metallic")?;
        material.sheen = cursor.f32("material sheen")?;
        material.clearcoat_thickness = cursor.f32("material clearcoat")?;
        material.clearcoat_roughness = cursor.f32("material clearcoat")?;
        material.aniso = cursor.f32("material anisotropy")?;
        material.aniso_rotation = cursor.f32("material anisotropy")?;

        let name_len = cursor.u32("texture name length")? as usize;
        let name = cursor.take(name_len, "texture name")?;
        if !name.is_empty() {
            let name = std::str::from_utf8(name).map_err(|_| FormatError::InvalidTextureName {
                material: material_index,
            })?;
            material.texture = Some(name.to_owned());
        }
        store.materials.push(material);
    }

    let trailing = bytes.len() - cursor.pos;
    if trailing > 0 {
        return Err(FormatError::TrailingBytes(trailing));
    }

    store.check_indices()?;

    Ok(DecodedMesh {
        byte_order: order,
        header,
        store,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> MshxHeader {
        MshxHeader {
            vertex_count: 8,
            normal_count: 0,
            tangent_count: 0,
            uv_count: 0,
            face_count: 6,
            material_count: 0,
            vertex_type: 0,
            bound_sphere: [0.5, 0.5, 0.5, 0.866],
        }
    }

    #[test]
    fn test_header_layout_little_endian() {
        let bytes = sample_header().to_bytes(ByteOrder::Little);
        assert_eq!(&bytes[0..12], &[0x4D, 0x53, 0x48, 0x58, 1, 0, 0, 0, 8, 0, 0, 0]);
        assert_eq!(&bytes[24..28], &[6, 0, 0, 0]);
        assert_eq!(&bytes[36..40], &0.5f32.to_le_bytes());
    }

    #[test]
    fn test_header_layout_big_endian() {
        let bytes = sample_header().to_bytes(ByteOrder::Big);
        assert_eq!(&bytes[0..12], &[0x4D, 0x53, 0x48, 0x58, 0, 0, 0, 1, 0, 0, 0, 8]);
        assert_eq!(&bytes[48..52], &0.866f32.to_be_bytes());
    }

    #[test]
    fn test_header_from_bytes() {
        let header = sample_header();
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let bytes = header.to_bytes(order);
            assert_eq!(MshxHeader::from_bytes(&bytes, order), Some(header));
        }
        assert_eq!(MshxHeader::from_bytes(&[0u8; 10], ByteOrder::Little), None);
    }

    #[test]
    fn test_decode_empty_mesh() {
        let header = MshxHeader {
            vertex_count: 0,
            face_count: 0,
            bound_sphere: [0.0; 4],
            ..sample_header()
        };
        let decoded = decode_mshx_mesh(&header.to_bytes(ByteOrder::Big)).unwrap();
        assert_eq!(decoded.byte_order, ByteOrder::Big);
        assert!(decoded.store.vertices.is_empty());
        assert!(decoded.store.faces.is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut bytes = sample_header().to_bytes(ByteOrder::Little);
        bytes[0] = b'X';
        assert!(matches!(
            decode_mshx_mesh(&bytes),
            Err(FormatError::BadMagic(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_records() {
        // Header promises 8 vertices but no record data follows
        let bytes = sample_header().to_bytes(ByteOrder::Little);
        assert!(matches!(
            decode_mshx_mesh(&bytes),
            Err(FormatError::Truncated { what: "vertex", offset: 52 })
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let header = MshxHeader {
            vertex_count: 0,
            face_count: 0,
            ..sample_header()
        };
        let mut bytes = header.to_bytes(ByteOrder::Little).to_vec();
        bytes.extend_from_slice(&[0, 0]);
        assert!(matches!(
            decode_mshx_mesh(&bytes),
            Err(FormatError::TrailingBytes(2))
        ));
    }
}
