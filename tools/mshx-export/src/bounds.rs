//! Bounding sphere generation (Ritter's algorithm)
//!
//! Two passes over the points: a seed sphere spanning an approximate
//! diameter, then growth to cover any point left outside. The result always
//! contains every point but is not guaranteed minimal.

use glam::Vec3;
use mshx_common::{BoundSphere, Vertex};

/// Euclidean distance in double precision
#[inline]
fn distance(a: Vec3, b: Vec3) -> f64 {
    (a - b).as_dvec3().length()
}

/// Point farthest from `from`; the first maximum wins on ties
fn farthest_point(points: &[Vertex], from: Vec3) -> Vec3 {
    let mut farthest = from;
    let mut max_dist = -1.0;
    for p in points {
        let d = distance(from, p.position());
        if d > max_dist {
            max_dist = d;
            farthest = p.position();
        }
    }
    farthest
}

/// Compute a bounding sphere for the vertex positions.
///
/// An empty slice yields a zero-radius sphere at the origin.
pub fn ritter_bounding_sphere(points: &[Vertex]) -> BoundSphere {
    let Some(first) = points.first() else {
        return BoundSphere::default();
    };

    let p1 = farthest_point(points, first.position());
    let p2 = farthest_point(points, p1);

    let mut center = (p1 + p2) / 2.0;
    let mut radius = distance(p1, p2) / 2.0;

    for p in points {
        let p = p.position();
        let d = distance(center, p);
        if d > radius {
            let new_radius = (radius + d) / 2.0;
            let ratio = (new_radius - radius) / d;
            center += ((p - center).as_dvec3() * ratio).as_vec3();
            radius = new_radius;
        }
    }

    BoundSphere::new(center, radius as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verts(points: &[[f32; 3]]) -> Vec<Vertex> {
        points.iter().map(|p| Vertex::new(p[0], p[1], p[2])).collect()
    }

    fn assert_contains_all(sphere: &BoundSphere, points: &[Vertex], epsilon: f32) {
        for p in points {
            assert!(
                sphere.contains(p.position(), epsilon),
                "{:?} outside sphere {:?}",
                p.position(),
                sphere
            );
        }
    }

    #[test]
    fn test_empty_input() {
        let sphere = ritter_bounding_sphere(&[]);
        assert_eq!(sphere.center, Vec3::ZERO);
        assert_eq!(sphere.radius, 0.0);
    }

    #[test]
    fn test_single_point() {
        let sphere = ritter_bounding_sphere(&verts(&[[1.0, 2.0, 3.0]]));
        assert_eq!(sphere.center, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(sphere.radius, 0.0);
    }

    #[test]
    fn test_two_points_seed_sphere() {
        let sphere = ritter_bounding_sphere(&verts(&[[-1.0, 0.0, 0.0], [3.0, 0.0, 0.0]]));
        assert_eq!(sphere.center, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(sphere.radius, 2.0);
    }

    #[test]
    fn test_unit_cube() {
        let points = verts(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ]);
        let sphere = ritter_bounding_sphere(&points);
        assert_contains_all(&sphere, &points, 1e-5);
        // The seed already spans the cube diagonal
        assert!((sphere.radius - 3f32.sqrt() / 2.0).abs() < 1e-6);
        assert!((sphere.center - Vec3::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn test_growth_pass_covers_outliers() {
        // Seed diameter runs along x; the y and z outliers force growth
        let points = verts(&[
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [5.0, 4.9, 0.0],
            [5.0, -4.0, 4.0],
            [5.0, 0.0, -4.9],
        ]);
        let sphere = ritter_bounding_sphere(&points);
        assert_contains_all(&sphere, &points, 1e-4);
    }

    #[test]
    fn test_scattered_points() {
        let mut points = Vec::new();
        let mut seed = 12345u32;
        for _ in 0..500 {
            let mut next = || {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (seed >> 8) as f32 / (1u32 << 24) as f32 * 200.0 - 100.0
            };
            points.push(Vertex::new(next(), next(), next()));
        }
        let sphere = ritter_bounding_sphere(&points);
        // f32 center rounding at this scale stays well below 1e-3
        assert_contains_all(&sphere, &points, 1e-3);
    }

    #[test]
    fn test_farthest_point_first_maximum_wins() {
        let points = verts(&[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [-2.0, 0.0, 0.0]]);
        assert_eq!(farthest_point(&points, Vec3::ZERO), Vec3::new(2.0, 0.0, 0.0));
    }
}
