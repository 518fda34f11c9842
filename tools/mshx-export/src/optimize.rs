//! Cache-locality mesh reordering
//!
//! Faces are sorted along a Z-order curve through the bounding volume so that
//! spatially adjacent faces end up next to each other, then the vertex,
//! normal and texture coordinate arrays are rebuilt in the order the sorted
//! faces first touch them.

use glam::Vec3;
use mshx_common::{BoundSphere, CornerSet, Face, GeometryStore};

use crate::dedup::rewrite_corners;

/// Quantization steps per axis (10 bits)
const QUANTIZE_SCALE: f32 = 1024.0;
const QUANTIZE_MAX: u32 = 1023;

/// Spread the low 10 bits of `x` so two zero bits follow each one
#[inline]
fn interleave_bits(x: u32) -> u32 {
    let mut x = x;
    x = (x | (x << 16)) & 0x0300_00FF;
    x = (x | (x << 8)) & 0x0300_F00F;
    x = (x | (x << 4)) & 0x030C_30C3;
    x = (x | (x << 2)) & 0x0924_9249;
    x
}

/// 30-bit Morton code of three 10-bit coordinates (x in bit 0 of each triad)
#[inline]
pub fn morton3d(x: u32, y: u32, z: u32) -> u32 {
    interleave_bits(x) | (interleave_bits(y) << 1) | (interleave_bits(z) << 2)
}

/// Axis-aligned box enclosing the bounding sphere
pub fn sphere_extent(sphere: &BoundSphere) -> (Vec3, Vec3) {
    let r = Vec3::splat(sphere.radius);
    (sphere.center - r, sphere.center + r)
}

/// Map a coordinate to a 10-bit cell of `[min, max]`, clamping out-of-range
/// values. A degenerate range gives 0.
#[inline]
fn quantize(value: f32, min: f32, max: f32) -> u32 {
    let t = (value - min) / (max - min);
    // `as` truncates and maps NaN and negatives to 0
    ((t * QUANTIZE_SCALE) as u32).min(QUANTIZE_MAX)
}

/// Mean of the face's corner positions
fn centroid(store: &GeometryStore, face: &Face) -> Vec3 {
    let sum = face
        .v
        .iter()
        .fold(Vec3::ZERO, |acc, &i| acc + store.vertices[i as usize].position());
    sum / f32::from(face.edges())
}

/// Assign every face the Morton code of its centroid within `extent`
pub fn assign_spatial_codes(store: &mut GeometryStore, extent: (Vec3, Vec3)) {
    let (min, max) = extent;
    let codes: Vec<u32> = store
        .faces
        .iter()
        .map(|face| {
            let c = centroid(store, face);
            morton3d(
                quantize(c.x, min.x, max.x),
                quantize(c.y, min.y, max.y),
                quantize(c.z, min.z, max.z),
            )
        })
        .collect();

    for (face, code) in store.faces.iter_mut().zip(codes) {
        face.spatial_code = code;
    }
}

/// Rebuild one attribute array in first-touch order of `faces`.
///
/// Entries no face references keep their relative order after the touched
/// ones, so the array length never changes.
fn reorder_by_first_use<T: Copy>(items: &mut Vec<T>, faces: &mut [Face], set: CornerSet) {
    const UNSEEN: u32 = u32::MAX;
    let mut remap = vec![UNSEEN; items.len()];
    let mut reordered = Vec::with_capacity(items.len());

    for face in faces.iter() {
        for &old in face.corners(set) {
            let slot = &mut remap[old as usize];
            if *slot == UNSEEN {
                *slot = reordered.len() as u32;
                reordered.push(items[old as usize]);
            }
        }
    }

    for (old, slot) in remap.iter_mut().enumerate() {
        if *slot == UNSEEN {
            *slot = reordered.len() as u32;
            reordered.push(items[old]);
        }
    }

    rewrite_corners(faces, set, &remap);
    *items = reordered;
}

/// Summary of an optimization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeReport {
    pub faces: usize,
    /// Faces whose position in the face list changed
    pub moved_faces: usize,
}

/// Reorder faces by Morton code and recompact the attribute arrays.
///
/// Uses `store.bound_sphere` as the spatial extent, so the sphere must be
/// computed beforehand. Face indices must be consistent on entry.
pub fn optimize(store: &mut GeometryStore) -> OptimizeReport {
    assign_spatial_codes(store, sphere_extent(&store.bound_sphere));

    let mut order: Vec<usize> = (0..store.faces.len()).collect();
    order.sort_by_key(|&i| store.faces[i].spatial_code);
    let moved_faces = order.iter().enumerate().filter(|(to, from)| to != *from).count();

    let mut faces = std::mem::take(&mut store.faces);
    faces.sort_by_key(|f| f.spatial_code);

    reorder_by_first_use(&mut store.vertices, &mut faces, CornerSet::Vertex);
    reorder_by_first_use(&mut store.normals, &mut faces, CornerSet::Normal);
    reorder_by_first_use(&mut store.tex_coords, &mut faces, CornerSet::TexCoord);
    store.faces = faces;

    let report = OptimizeReport {
        faces: store.faces.len(),
        moved_faces,
    };
    tracing::info!(
        "Reordered {} faces ({} moved) along Morton order",
        report.faces,
        report.moved_faces
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::ritter_bounding_sphere;
    use mshx_common::{Normal, TexCoord, Vertex};

    #[test]
    fn test_interleave_bits() {
        assert_eq!(interleave_bits(0), 0);
        assert_eq!(interleave_bits(1), 1);
        assert_eq!(interleave_bits(0b11), 0b1001);
        assert_eq!(interleave_bits(1023), 0x0924_9249);
    }

    #[test]
    fn test_morton_axis_positions() {
        assert_eq!(morton3d(1, 0, 0), 0b001);
        assert_eq!(morton3d(0, 1, 0), 0b010);
        assert_eq!(morton3d(0, 0, 1), 0b100);
        assert_eq!(morton3d(2, 0, 0), 0b001_000);
        assert_eq!(morton3d(1023, 1023, 1023), (1 << 30) - 1);
    }

    #[test]
    fn test_quantize_clamps() {
        assert_eq!(quantize(0.0, 0.0, 1.0), 0);
        assert_eq!(quantize(0.5, 0.0, 1.0), 512);
        assert_eq!(quantize(1.0, 0.0, 1.0), 1023);
        assert_eq!(quantize(2.0, 0.0, 1.0), 1023);
        assert_eq!(quantize(-1.0, 0.0, 1.0), 0);
        assert_eq!(quantize(3.0, 3.0, 3.0), 0);
    }

    #[test]
    fn test_sphere_extent() {
        let sphere = BoundSphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let (min, max) = sphere_extent(&sphere);
        assert_eq!(min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(max, Vec3::new(1.5, 2.5, 3.5));
    }

    /// Row of unit quads along x, listed back to front, each with its own
    /// normal and uv entries
    fn strip_store(count: u32) -> GeometryStore {
        let mut store = GeometryStore::new();
        for i in 0..=count {
            store.vertices.push(Vertex::new(i as f32, 0.0, 0.0));
            store.vertices.push(Vertex::new(i as f32, 1.0, 0.0));
        }
        for i in (0..count).rev() {
            let v = [2 * i, 2 * i + 2, 2 * i + 3, 2 * i + 1];
            store.normals.push(Normal::new(0.0, 0.0, 1.0));
            store.tex_coords.push(TexCoord::new(i as f32, 0.0));
            let a = store.normals.len() as u32 - 1;
            let b = store.tex_coords.len() as u32 - 1;
            store
                .faces
                .push(Face::new(&v).with_normals(&[a; 4]).with_uvs(&[b; 4]));
        }
        store.bound_sphere = ritter_bounding_sphere(&store.vertices);
        store
    }

    fn assert_first_touch_order(store: &GeometryStore, set: CornerSet) {
        let mut next = 0;
        for face in &store.faces {
            for &i in face.corners(set) {
                assert!(i <= next, "{:?} index {} touched before {}", set, i, next);
                if i == next {
                    next += 1;
                }
            }
        }
    }

    #[test]
    fn test_faces_sorted_by_morton_code() {
        let mut store = strip_store(8);
        optimize(&mut store);

        let codes: Vec<u32> = store.faces.iter().map(|f| f.spatial_code).collect();
        assert!(codes.windows(2).all(|w| w[0] <= w[1]));
        // Listed back to front, so the sort reverses the strip
        assert_eq!(store.tex_coords[store.faces[0].uv[0] as usize].u, 0.0);
    }

    #[test]
    fn test_attribute_lengths_unchanged() {
        let mut store = strip_store(6);
        store.vertices.push(Vertex::new(50.0, 50.0, 50.0)); // unreferenced
        let (v, n, uv) = (
            store.vertices.len(),
            store.normals.len(),
            store.tex_coords.len(),
        );

        optimize(&mut store);

        assert_eq!(store.vertices.len(), v);
        assert_eq!(store.normals.len(), n);
        assert_eq!(store.tex_coords.len(), uv);
        assert_eq!(store.vertices.last().map(|p| p.x), Some(50.0));
        assert_eq!(store.check_indices(), Ok(()));
    }

    #[test]
    fn test_first_touch_order() {
        let mut store = strip_store(10);
        optimize(&mut store);

        assert_first_touch_order(&store, CornerSet::Vertex);
        assert_first_touch_order(&store, CornerSet::Normal);
        assert_first_touch_order(&store, CornerSet::TexCoord);
    }

    #[test]
    fn test_positions_follow_remap() {
        let mut store = strip_store(5);
        let before: Vec<Vec<Vec3>> = {
            let mut faces: Vec<&Face> = store.faces.iter().collect();
            faces.sort_by(|a, b| {
                let ca = centroid(&store, a).x;
                let cb = centroid(&store, b).x;
                ca.total_cmp(&cb)
            });
            faces
                .iter()
                .map(|f| f.v.iter().map(|&i| store.vertices[i as usize].position()).collect())
                .collect()
        };

        optimize(&mut store);

        let after: Vec<Vec<Vec3>> = store
            .faces
            .iter()
            .map(|f| f.v.iter().map(|&i| store.vertices[i as usize].position()).collect())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_stable_for_equal_codes() {
        let mut store = GeometryStore::new();
        store.vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        store.faces = vec![
            Face::new(&[0, 1, 2]).with_material("first"),
            Face::new(&[2, 1, 0]).with_material("second"),
        ];
        store.bound_sphere = ritter_bounding_sphere(&store.vertices);

        let report = optimize(&mut store);

        assert_eq!(report.moved_faces, 0);
        assert_eq!(store.faces[0].material_name, "first");
        assert_eq!(store.faces[1].material_name, "second");
        assert_eq!(store.faces[0].v.as_slice(), &[0, 1, 2]);
        assert_eq!(store.faces[1].v.as_slice(), &[2, 1, 0]);
    }
}
