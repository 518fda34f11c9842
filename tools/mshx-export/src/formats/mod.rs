//! Binary format writers for compiled mesh files
//!
//! Re-exports the `.mshx` layout and decoder from mshx-common.

pub use mshx_common::formats::*;

use mshx_common::GeometryStore;
use std::io::Write;

/// Field writer applying one byte order to every multi-byte value
struct RecordWriter<'a, W: Write> {
    w: &'a mut W,
    order: ByteOrder,
}

impl<W: Write> RecordWriter<'_, W> {
    fn u8(&mut self, value: u8) -> std::io::Result<()> {
        self.w.write_all(&[value])
    }

    fn u32(&mut self, value: u32) -> std::io::Result<()> {
        self.w.write_all(&self.order.u32_bytes(value))
    }

    fn f32s(&mut self, values: &[f32]) -> std::io::Result<()> {
        for &value in values {
            self.w.write_all(&self.order.f32_bytes(value))?;
        }
        Ok(())
    }

    fn u32s(&mut self, values: &[u32]) -> std::io::Result<()> {
        for &value in values {
            self.u32(value)?;
        }
        Ok(())
    }
}

/// Write a complete MSHX file
///
/// The store must be index-consistent (see `GeometryStore::check_indices`);
/// per-face normal and uv indices are written only when the mesh has normals
/// or uvs at all.
pub fn write_mshx_mesh<W: Write>(
    w: &mut W,
    store: &GeometryStore,
    order: ByteOrder,
) -> Result<(), FormatError> {
    let header = MshxHeader::for_store(store);
    w.write_all(&header.to_bytes(order))?;

    let mut out = RecordWriter { w, order };
    let with_color = store.vertex_type.has_color();

    for v in &store.vertices {
        out.f32s(&[v.x, v.y, v.z])?;
        if with_color {
            out.f32s(&[v.a, v.r, v.g, v.b])?;
        }
    }

    for n in &store.normals {
        out.f32s(&[n.x, n.y, n.z])?;
    }

    for uv in &store.tex_coords {
        out.f32s(&[uv.u, uv.v])?;
    }

    let with_normals = !store.normals.is_empty();
    let with_uvs = !store.tex_coords.is_empty();
    for face in &store.faces {
        out.u8(face.edges())?;
        out.u32s(&face.v)?;
        if with_normals {
            out.u32s(&face.n)?;
        }
        if with_uvs {
            out.u32s(&face.uv)?;
        }
        out.u32(face.material_id)?;
    }

    for m in &store.materials {
        out.f32s(&m.diffuse)?;
        out.f32s(&m.specular)?;
        out.f32s(&m.ambient)?;
        out.f32s(&m.transmissive)?;
        out.f32s(&m.emissive)?;
        out.f32s(&[m.power, m.transparency, m.refractivity])?;
        out.u32(m.illum)?;
        out.f32s(&[
            m.roughness,
            m.metallic,
            m.sheen,
            m.clearcoat_thickness,
            m.clearcoat_roughness,
            m.aniso,
            m.aniso_rotation,
        ])?;

        let texture = m.texture.as_deref().unwrap_or_default().as_bytes();
        out.u32(texture.len() as u32)?;
        out.w.write_all(texture)?;
    }

    Ok(())
}

/// Encode a store into an in-memory `.mshx` image
pub fn encode_mshx_mesh(store: &GeometryStore, order: ByteOrder) -> Result<Vec<u8>, FormatError> {
    let mut bytes = Vec::new();
    write_mshx_mesh(&mut bytes, store, order)?;
    Ok(bytes)
}
