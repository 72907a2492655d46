//! Rigid transforms with scale, used for device, anchor and object poses

use serde::{Deserialize, Serialize};

use super::{Point3D, Quaternion, Vector3D};

/// Below this horizontal forward length the heading is considered undefined
const HEADING_EPSILON: f32 = 1e-4;

/// Position, rotation and scale of a node in its parent's space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Point3D,
    pub rotation: Quaternion,
    pub scale: Vector3D,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Point3D::ORIGIN,
        rotation: Quaternion::IDENTITY,
        scale: Vector3D::ONE,
    };

    pub fn from_position(position: Point3D) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Point3D, rotation: Quaternion) -> Self {
        Self {
            position,
            rotation,
            scale: Vector3D::ONE,
        }
    }

    pub fn with_position(&self, position: Point3D) -> Self {
        Self { position, ..*self }
    }

    pub fn forward(&self) -> Vector3D {
        self.rotation.forward()
    }

    /// Local space to parent space
    pub fn transform_point(&self, local: Point3D) -> Point3D {
        let scaled = local.to_vector().scale_by(&self.scale);
        self.position + self.rotation.rotate_vector(scaled)
    }

    /// Parent space to local space
    pub fn inverse_transform_point(&self, world: Point3D) -> Point3D {
        let unrotated = self.rotation.inverse().rotate_vector(world - self.position);
        let local = unrotated.scale_by(&self.scale.recip());
        Point3D::new(local.x, local.y, local.z)
    }

    /// Composes `local`, expressed in this transform's space, into parent space
    pub fn then(&self, local: &Transform) -> Transform {
        Transform {
            position: self.transform_point(local.position),
            rotation: (self.rotation * local.rotation).normalize(),
            scale: self.scale.scale_by(&local.scale),
        }
    }

    /// Keeps the position and heading but removes pitch and roll, so the
    /// resulting up axis matches gravity.
    ///
    /// Looking straight up or down has no defined heading; the identity yaw
    /// is used then.
    pub fn gravity_aligned(&self) -> Transform {
        let forward = self.forward();
        let horizontal = Vector3D::new(forward.x, 0.0, forward.z);
        let rotation = if horizontal.magnitude() < HEADING_EPSILON {
            Quaternion::IDENTITY
        } else {
            Quaternion::from_yaw(horizontal.x.atan2(horizontal.z))
        };

        Transform {
            position: self.position,
            rotation,
            scale: self.scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
