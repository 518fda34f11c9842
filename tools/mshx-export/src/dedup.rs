//! Near-duplicate attribute merging
//!
//! Vertices, normals and texture coordinates are deduplicated independently.
//! Entries are scanned in index order: a later entry within tolerance of an
//! earlier surviving entry is merged into it, and every face corner that
//! referenced the merged entry is pointed at the survivor. Survivors keep their
//! relative order, so the result matches removing merged entries one at a time.

use mshx_common::{CornerSet, Face, GeometryStore, Normal, TexCoord, Vertex};
use serde::{Deserialize, Serialize};

/// Merge tolerances, one per attribute class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupTolerances {
    /// Euclidean distance between positions
    pub position: f64,
    /// Per-axis difference between normals
    pub normal: f64,
    /// Per-axis difference between texture coordinates
    pub tex_coord: f64,
}

impl Default for DedupTolerances {
    fn default() -> Self {
        Self {
            position: 1e-4,
            normal: 1e-5,
            tex_coord: 1e-5,
        }
    }
}

/// Number of entries removed per attribute class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupReport {
    pub vertices: usize,
    pub normals: usize,
    pub tex_coords: usize,
}

impl DedupReport {
    pub fn total(&self) -> usize {
        self.vertices + self.normals + self.tex_coords
    }
}

pub fn vertices_match(a: &Vertex, b: &Vertex, tolerance: f64) -> bool {
    (a.position() - b.position()).as_dvec3().length() < tolerance
}

pub fn normals_match(a: &Normal, b: &Normal, tolerance: f64) -> bool {
    let d = (a.direction() - b.direction()).abs().as_dvec3();
    d.x < tolerance && d.y < tolerance && d.z < tolerance
}

pub fn tex_coords_match(a: &TexCoord, b: &TexCoord, tolerance: f64) -> bool {
    f64::from((a.u - b.u).abs()) < tolerance && f64::from((a.v - b.v).abs()) < tolerance
}

/// For each entry, the earlier survivor it merges into (`None` = survivor)
fn find_duplicates<T>(items: &[T], is_duplicate: impl Fn(&T, &T) -> bool) -> Vec<Option<usize>> {
    let mut merged_into = vec![None; items.len()];
    for i in 0..items.len() {
        if merged_into[i].is_some() {
            continue;
        }
        for j in (i + 1)..items.len() {
            if merged_into[j].is_none() && is_duplicate(&items[i], &items[j]) {
                merged_into[j] = Some(i);
            }
        }
    }
    merged_into
}

/// Drop merged entries and return the old -> new index table
fn compact<T>(items: &mut Vec<T>, merged_into: &[Option<usize>]) -> Vec<u32> {
    let mut remap: Vec<u32> = Vec::with_capacity(merged_into.len());
    let mut kept = 0u32;
    for target in merged_into {
        match *target {
            None => {
                remap.push(kept);
                kept += 1;
            }
            // Survivors always precede the entries merged into them
            Some(survivor) => remap.push(remap[survivor]),
        }
    }

    let mut index = 0;
    items.retain(|_| {
        let keep = merged_into[index].is_none();
        index += 1;
        keep
    });
    remap
}

pub(crate) fn rewrite_corners(faces: &mut [Face], set: CornerSet, remap: &[u32]) {
    for face in faces {
        for index in face.corners_mut(set).iter_mut() {
            *index = remap[*index as usize];
        }
    }
}

fn dedup_class<T>(
    items: &mut Vec<T>,
    faces: &mut [Face],
    set: CornerSet,
    is_duplicate: impl Fn(&T, &T) -> bool,
) -> usize {
    let merged_into = find_duplicates(items, is_duplicate);
    let removed = merged_into.iter().filter(|m| m.is_some()).count();
    if removed == 0 {
        return 0;
    }

    let remap = compact(items, &merged_into);
    rewrite_corners(faces, set, &remap);
    removed
}

/// Merge near-duplicate vertices, normals and texture coordinates.
///
/// Face indices must be consistent on entry and stay consistent on return.
pub fn deduplicate(store: &mut GeometryStore, tolerances: &DedupTolerances) -> DedupReport {
    let report = DedupReport {
        vertices: dedup_class(
            &mut store.vertices,
            &mut store.faces,
            CornerSet::Vertex,
            |a, b| vertices_match(a, b, tolerances.position),
        ),
        normals: dedup_class(
            &mut store.normals,
            &mut store.faces,
            CornerSet::Normal,
            |a, b| normals_match(a, b, tolerances.normal),
        ),
        tex_coords: dedup_class(
            &mut store.tex_coords,
            &mut store.faces,
            CornerSet::TexCoord,
            |a, b| tex_coords_match(a, b, tolerances.tex_coord),
        ),
    };

    tracing::info!("Removed {} duplicate vertices", report.vertices);
    tracing::info!("Removed {} duplicate normals", report.normals);
    tracing::info!("Removed {} duplicate texture coords", report.tex_coords);

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_normal(x: f32, y: f32, z: f32) -> Normal {
        Normal { x, y, z, w: 0.0 }
    }

    #[test]
    fn test_vertex_merge_and_remap() {
        let mut store = GeometryStore::new();
        store.vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(0.00001, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 0.00002, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        store.faces = vec![Face::new(&[1, 2, 4]), Face::new(&[3, 4, 2])];

        let report = deduplicate(&mut store, &DedupTolerances::default());

        assert_eq!(report.vertices, 2);
        assert_eq!(store.vertices.len(), 3);
        assert_eq!(store.vertices[1].position().x, 1.0);
        assert_eq!(store.vertices[2].position().y, 1.0);
        assert_eq!(store.faces[0].v.as_slice(), &[0, 1, 2]);
        assert_eq!(store.faces[1].v.as_slice(), &[0, 2, 1]);
        assert_eq!(store.check_indices(), Ok(()));
    }

    #[test]
    fn test_chain_merges_into_first_survivor_only() {
        // 1 merges into 0; 2 is too far from 0 and 1 is no longer a survivor
        let mut store = GeometryStore::new();
        store.vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(0.00006, 0.0, 0.0),
            Vertex::new(0.00012, 0.0, 0.0),
        ];
        store.faces = vec![Face::new(&[0, 1, 2])];

        let report = deduplicate(&mut store, &DedupTolerances::default());

        assert_eq!(report.vertices, 1);
        assert_eq!(store.vertices.len(), 2);
        assert_eq!(store.faces[0].v.as_slice(), &[0, 0, 1]);
    }

    #[test]
    fn test_normals_compare_per_axis() {
        let tolerance = 1e-5;
        let a = raw_normal(0.577_35, 0.577_35, 0.577_35);
        // Each axis differs by less than the tolerance, the Euclidean
        // distance does not
        let b = raw_normal(0.577_358, 0.577_358, 0.577_358);
        assert!(normals_match(&a, &b, tolerance));
        assert!((a.direction() - b.direction()).length() > tolerance as f32);

        let c = raw_normal(0.577_35, 0.577_35, 0.577_37);
        assert!(!normals_match(&a, &c, tolerance));
    }

    #[test]
    fn test_normal_and_uv_dedup() {
        let mut store = GeometryStore::new();
        store.vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        store.normals = vec![
            Normal::new(0.0, 0.0, 1.0),
            Normal::new(0.0, 0.0, 1.0),
            Normal::new(0.0, 1.0, 0.0),
        ];
        store.tex_coords = vec![
            TexCoord::new(0.5, 0.5),
            TexCoord::new(0.25, 0.0),
            TexCoord::new(0.500001, 0.5),
        ];
        store.faces = vec![Face::new(&[0, 1, 2])
            .with_normals(&[1, 2, 0])
            .with_uvs(&[2, 1, 0])];

        let report = deduplicate(&mut store, &DedupTolerances::default());

        assert_eq!(
            report,
            DedupReport {
                vertices: 0,
                normals: 1,
                tex_coords: 1
            }
        );
        assert_eq!(report.total(), 2);
        assert_eq!(store.normals.len(), 2);
        assert_eq!(store.tex_coords.len(), 2);
        assert_eq!(store.faces[0].n.as_slice(), &[0, 1, 0]);
        assert_eq!(store.faces[0].uv.as_slice(), &[0, 1, 0]);
        assert_eq!(store.check_indices(), Ok(()));
    }

    #[test]
    fn test_survivors_are_pairwise_distinct() {
        let tolerances = DedupTolerances::default();
        let mut store = GeometryStore::new();
        for i in 0..40 {
            // Clusters of four points 1e-5 apart, clusters 1e-3 apart
            let base = (i / 4) as f32 * 1e-3;
            let jitter = (i % 4) as f32 * 1e-5;
            store.vertices.push(Vertex::new(base + jitter, 0.0, 0.0));
        }
        store.faces = (0..38u32).map(|i| Face::new(&[i, i + 1, i + 2])).collect();

        let before = store.vertices.len();
        let report = deduplicate(&mut store, &tolerances);

        assert_eq!(store.vertices.len(), before - report.vertices);
        assert_eq!(store.vertices.len(), 10);
        for i in 0..store.vertices.len() {
            for j in (i + 1)..store.vertices.len() {
                assert!(!vertices_match(
                    &store.vertices[i],
                    &store.vertices[j],
                    tolerances.position
                ));
            }
        }
        assert_eq!(store.check_indices(), Ok(()));
    }

    #[test]
    fn test_surviving_normals_and_uvs_are_pairwise_distinct() {
        let tolerances = DedupTolerances::default();
        let mut store = GeometryStore::new();
        store.vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        for i in 0..40 {
            // Clusters of four entries 2e-6 apart per axis, clusters 1e-4 apart
            let base = 0.2 + (i / 4) as f32 * 1e-4;
            let jitter = (i % 4) as f32 * 2e-6;
            store.normals.push(raw_normal(base + jitter, 0.5, base - jitter));
            store.tex_coords.push(TexCoord::new(0.5 - jitter, base + jitter));
        }
        store.faces = (0..38u32)
            .map(|i| {
                Face::new(&[0, 1, 2])
                    .with_normals(&[i, i + 1, i + 2])
                    .with_uvs(&[i + 2, i + 1, i])
            })
            .collect();

        let report = deduplicate(&mut store, &tolerances);

        assert_eq!(report.vertices, 0);
        assert_eq!(store.normals.len(), 40 - report.normals);
        assert_eq!(store.tex_coords.len(), 40 - report.tex_coords);
        assert_eq!(store.normals.len(), 10);
        assert_eq!(store.tex_coords.len(), 10);
        for i in 0..store.normals.len() {
            for j in (i + 1)..store.normals.len() {
                assert!(!normals_match(
                    &store.normals[i],
                    &store.normals[j],
                    tolerances.normal
                ));
            }
        }
        for i in 0..store.tex_coords.len() {
            for j in (i + 1)..store.tex_coords.len() {
                assert!(!tex_coords_match(
                    &store.tex_coords[i],
                    &store.tex_coords[j],
                    tolerances.tex_coord
                ));
            }
        }
        assert_eq!(store.faces[0].n.as_slice(), &[0, 0, 0]);
        assert_eq!(store.faces[3].n.as_slice(), &[0, 1, 1]);
        assert_eq!(store.check_indices(), Ok(()));
    }

    #[test]
    fn test_compact_matches_shift_compaction() {
        let mut items = vec!['a', 'b', 'c', 'd', 'e', 'f'];
        let merged_into = [None, Some(0), None, Some(2), Some(0), None];

        let remap = compact(&mut items, &merged_into);

        assert_eq!(items, vec!['a', 'c', 'f']);
        assert_eq!(remap, vec![0, 0, 1, 1, 0, 2]);
    }

    #[test]
    fn test_no_duplicates_is_noop() {
        let mut store = GeometryStore::new();
        store.vertices = vec![Vertex::new(0.0, 0.0, 0.0), Vertex::new(1.0, 0.0, 0.0)];
        let report = deduplicate(&mut store, &DedupTolerances::default());
        assert_eq!(report, DedupReport::default());
        assert_eq!(store.vertices.len(), 2);
    }
}
