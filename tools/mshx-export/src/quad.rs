//! Quad face validation and triangulation
//!
//! Quads are checked for planarity (the two fan triangles must have nearly
//! parallel normals) and convexity (in the XY projection only). Depending on
//! the [`QuadMode`] a failing quad aborts the conversion or is split into two
//! triangles.

use std::fmt;

use glam::{DVec3, Vec3};
use hashbrown::HashSet;
use mshx_common::{CornerSet, Corners, Face, GeometryStore, Vertex};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// Minimum |dot| between the unit normals of the two fan triangles
pub const PLANARITY_THRESHOLD: f64 = 0.999;

/// How quad faces are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum QuadMode {
    /// 0: no validation
    #[default]
    Skip,
    /// 1: validate, a failing quad is fatal
    Strict,
    /// 2: validate, a failing quad is split into triangles
    Repair,
    /// 3: split every quad into triangles
    Triangulate,
}

impl TryFrom<u8> for QuadMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QuadMode::Skip),
            1 => Ok(QuadMode::Strict),
            2 => Ok(QuadMode::Repair),
            3 => Ok(QuadMode::Triangulate),
            _ => Err(format!("invalid quad mode {} (must be 0-3)", value)),
        }
    }
}

impl From<QuadMode> for u8 {
    fn from(mode: QuadMode) -> u8 {
        match mode {
            QuadMode::Skip => 0,
            QuadMode::Strict => 1,
            QuadMode::Repair => 2,
            QuadMode::Triangulate => 3,
        }
    }
}

/// Why a quad failed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadDefect {
    NonPlanar { dot: f64 },
    NonConvex,
}

impl fmt::Display for QuadDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuadDefect::NonPlanar { dot } => write!(f, "quad is not planar (dot = {:.6})", dot),
            QuadDefect::NonConvex => f.write_str("quad is not convex"),
        }
    }
}

/// Summary of quad processing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuadReport {
    /// Quads present before processing
    pub quads: usize,
    /// Quads that passed validation
    pub validated: usize,
    /// Quads split into two triangles (repaired ones included)
    pub triangulated: usize,
    /// Quads split because they failed validation
    pub repaired: usize,
    /// Indices of quads whose corners reference only 3 distinct vertices
    pub fake_quads: Vec<usize>,
}

fn corner_positions(vertices: &[Vertex], face: &Face) -> [Vec3; 4] {
    [0usize, 1, 2, 3].map(|i| vertices[face.v[i] as usize].position())
}

/// Check that triangles (0,1,2) and (0,2,3) face the same way.
///
/// Only the magnitude of the dot product is tested, so exactly opposed
/// normals pass. Degenerate triangles produce NaN and are not flagged here.
pub fn check_planarity(p: &[Vec3; 4]) -> Result<(), QuadDefect> {
    let ab = (p[1] - p[0]).as_dvec3();
    let ac = (p[2] - p[0]).as_dvec3();
    let ad = (p[3] - p[0]).as_dvec3();

    let n1: DVec3 = ab.cross(ac);
    let n2: DVec3 = ac.cross(ad);
    let dot = (n1 / n1.length()).dot(n2 / n2.length());

    if dot.abs() < PLANARITY_THRESHOLD {
        return Err(QuadDefect::NonPlanar { dot });
    }
    Ok(())
}

/// Convexity of the quad projected onto the XY plane.
///
/// All four edge-to-edge turns must have the same strict sign.
pub fn is_convex_xy(p: &[Vec3; 4]) -> bool {
    let edge = |from: usize, to: usize| {
        (
            f64::from(p[to].x) - f64::from(p[from].x),
            f64::from(p[to].y) - f64::from(p[from].y),
        )
    };
    let edges = [edge(0, 1), edge(1, 2), edge(2, 3), edge(3, 0)];

    let turns = [0usize, 1, 2, 3].map(|i| {
        let (ax, ay) = edges[i];
        let (bx, by) = edges[(i + 1) % 4];
        ax * by - ay * bx
    });

    turns.iter().all(|&c| c > 0.0) || turns.iter().all(|&c| c < 0.0)
}

/// Planarity then convexity
pub fn validate_quad(p: &[Vec3; 4]) -> Result<(), QuadDefect> {
    check_planarity(p)?;
    if !is_convex_xy(p) {
        return Err(QuadDefect::NonConvex);
    }
    Ok(())
}

/// A quad whose corners reference only 3 distinct vertex indices
pub fn is_fake_quad(face: &Face) -> bool {
    face.is_quad() && face.v.iter().collect::<HashSet<_>>().len() == 3
}

/// Split quad (0,1,2,3) into (0,1,2), kept in place, and (0,2,3), appended.
///
/// Populated per-corner arrays follow the same corner selection.
pub fn split_quad(faces: &mut Vec<Face>, index: usize) {
    let face = &mut faces[index];

    let pick = |c: &Corners| -> Corners {
        if c.len() == 4 {
            Corners::from_slice(&[c[0], c[2], c[3]])
        } else {
            Corners::new()
        }
    };
    let second = Face {
        v: pick(&face.v),
        n: pick(&face.n),
        uv: pick(&face.uv),
        t: pick(&face.t),
        material_id: face.material_id,
        material_name: face.material_name.clone(),
        spatial_code: 0,
    };

    for set in CornerSet::ALL {
        let corners = face.corners_mut(set);
        if corners.len() == 4 {
            corners.truncate(3);
        }
    }

    faces.push(second);
}

/// Validate and/or triangulate every quad of the store according to `mode`.
///
/// Face indices must already be consistent (see
/// [`GeometryStore::check_indices`]). Triangles appended by a split are not
/// revisited.
pub fn process_quads(store: &mut GeometryStore, mode: QuadMode) -> Result<QuadReport, ExportError> {
    let mut report = QuadReport::default();
    let face_count = store.faces.len();

    for index in 0..face_count {
        if !store.faces[index].is_quad() {
            continue;
        }
        report.quads += 1;

        if mode != QuadMode::Triangulate && is_fake_quad(&store.faces[index]) {
            tracing::warn!(
                "Fake quad: face {} corners {:?} reference only 3 distinct vertices",
                index,
                store.faces[index].v.as_slice()
            );
            report.fake_quads.push(index);
        }

        match mode {
            QuadMode::Skip => {}
            QuadMode::Triangulate => {
                split_quad(&mut store.faces, index);
                report.triangulated += 1;
            }
            QuadMode::Strict | QuadMode::Repair => {
                let positions = corner_positions(&store.vertices, &store.faces[index]);
                match validate_quad(&positions) {
                    Ok(()) => {
                        report.validated += 1;
                    }
                    Err(defect) if mode == QuadMode::Strict => {
                        tracing::debug!("Face {} corner positions: {:?}", index, positions);
                        return Err(ExportError::InvalidQuad {
                            face: index,
                            defect,
                        });
                    }
                    Err(defect) => {
                        tracing::debug!("Face {}: {}, converting to triangles", index, defect);
                        split_quad(&mut store.faces, index);
                        report.repaired += 1;
                        report.triangulated += 1;
                    }
                }
            }
        }
    }

    Ok(report)
}
