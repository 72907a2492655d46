//! Positions in world or anchor space

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use super::{Point2D, Vector3D};

/// A position in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    /// Origin point (0, 0, 0)
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point3D) -> f32 {
        (*self - *other).magnitude()
    }

    /// Absolute height difference, ignoring the horizontal components
    pub fn vertical_distance(&self, other: &Point3D) -> f32 {
        (self.y - other.y).abs()
    }

    /// Projection onto the floor plane (x, z)
    pub fn horizontal(&self) -> Point2D {
        Point2D::new(self.x, self.z)
    }

    /// Same point with its height replaced
    pub fn with_y(&self, y: f32) -> Self {
        Self { y, ..*self }
    }

    pub fn to_vector(&self) -> Vector3D {
        Vector3D::new(self.x, self.y, self.z)
    }
}

impl Add<Vector3D> for Point3D {
    type Output = Point3D;

    fn add(self, rhs: Vector3D) -> Self::Output {
        Point3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub<Vector3D> for Point3D {
    type Output = Point3D;

    fn sub(self, rhs: Vector3D) -> Self::Output {
        Point3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub for Point3D {
    type Output = Vector3D;

    fn sub(self, rhs: Self) -> Self::Output {
        Vector3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point3D::ORIGIN;
        let b = Point3D::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 0.0001);
    }

    #[test]
    fn test_vertical_distance_ignores_horizontal_offset() {
        let a = Point3D::new(10.0, 1.5, -3.0);
        let b = Point3D::new(-2.0, 1.0, 8.0);
        assert!((a.vertical_distance(&b) - 0.5).abs() < 0.0001);
    }

    #[test]
    fn test_horizontal_projection() {
        let p = Point3D::new(1.0, 2.0, 3.0).horizontal();
        assert_eq!(p, Point2D::new(1.0, 3.0));
    }
}
