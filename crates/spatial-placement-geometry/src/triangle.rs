//! Triangle containment on the horizontal plane

use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// A point on the floor plane, `x` and `y` standing for world `x` and `z`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// z component of the 3D cross product of two in-plane vectors
    fn perp_dot(&self, other: &Point2D) -> f32 {
        self.x * other.y - self.y * other.x
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Self) -> Self::Output {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Barycentric weights of `p` relative to triangle `(a, b, c)`, returned as
/// `(u, v, w)` where `u` weighs `b`, `v` weighs `c` and `w = 1 - u - v`.
///
/// Degenerate triangles have no barycentric frame and yield `None`.
pub fn barycentric(p: Point2D, a: Point2D, b: Point2D, c: Point2D) -> Option<(f32, f32, f32)> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let area = ab.perp_dot(&ac);
    if area.abs() <= f32::EPSILON {
        return None;
    }

    let u = ap.perp_dot(&ac) / area;
    let v = ab.perp_dot(&ap) / area;
    Some((u, v, 1.0 - u - v))
}

/// True when `p` lies inside triangle `(a, b, c)` or on its boundary
pub fn point_in_triangle(p: Point2D, a: Point2D, b: Point2D, c: Point2D) -> bool {
    barycentric(p, a, b, c).is_some_and(|(u, v, w)| {
        [u, v, w].iter().all(|coord| (0.0..=1.0).contains(coord))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Point2D = Point2D::new(0.0, 0.0);
    const B: Point2D = Point2D::new(1.0, 0.0);
    const C: Point2D = Point2D::new(0.0, 1.0);

    #[test]
    fn test_vertices_have_unit_weights() {
        let (u, v, w) = barycentric(B, A, B, C).unwrap();
        assert!((u - 1.0).abs() < 1e-6);
        assert!(v.abs() < 1e-6);
        assert!(w.abs() < 1e-6);
    }

    #[test]
    fn test_inside_point() {
        assert!(point_in_triangle(Point2D::new(0.25, 0.25), A, B, C));
    }

    #[test]
    fn test_edge_counts_as_inside() {
        assert!(point_in_triangle(Point2D::new(0.5, 0.0), A, B, C));
    }

    #[test]
    fn test_outside_point() {
        assert!(!point_in_triangle(Point2D::new(0.75, 0.75), A, B, C));
        assert!(!point_in_triangle(Point2D::new(-0.1, 0.5), A, B, C));
    }

    #[test]
    fn test_winding_order_does_not_matter() {
        assert!(point_in_triangle(Point2D::new(0.2, 0.2), A, C, B));
    }

    #[test]
    fn test_degenerate_triangle_contains_nothing() {
        let collinear = Point2D::new(2.0, 0.0);
        assert_eq!(barycentric(A, A, B, collinear), None);
        assert!(!point_in_triangle(A, A, B, collinear));
    }
}
