//! Spatial primitives for anchored object placement
//!
//! Uses a right-handed coordinate system:
//! - X: Right (+) / Left (-)
//! - Y: Up (+) / Down (-), aligned with gravity
//! - Z: Forward (+) / Backward (-)

mod point3d;
mod quaternion;
mod transform;
mod triangle;
mod vector3d;

pub use point3d::Point3D;
pub use quaternion::Quaternion;
pub use transform::Transform;
pub use triangle::{barycentric, point_in_triangle, Point2D};
pub use vector3d::Vector3D;
