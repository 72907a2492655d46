//! Interface to the rendering and collision collaborator.
//!
//! The engine never owns meshes or physics state. It spawns opaque nodes,
//! positions them, and asks the scene to raycast against their collision
//! proxies.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use spatial_placement_geometry::{Point3D, Transform, Vector3D};

/// Opaque handle to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Collision category bit set used for raycast masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionGroup(u32);

impl CollisionGroup {
    pub const PREVIEW: Self = Self(1 << 15);
    pub const PLACED_OBJECT: Self = Self(1 << 29);
    pub const VERTICAL_PLANE: Self = Self(1 << 30);
    pub const HORIZONTAL_PLANE: Self = Self(1 << 31);
    pub const ALL_PLANES: Self = Self(Self::HORIZONTAL_PLANE.0 | Self::VERTICAL_PLANE.0);

    /// True when the two sets share at least one category
    pub const fn intersects(&self, other: CollisionGroup) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for CollisionGroup {
    type Output = CollisionGroup;

    fn bitor(self, rhs: Self) -> Self::Output {
        CollisionGroup(self.0 | rhs.0)
    }
}

/// Collision geometry attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollisionShape {
    Box { half_extents: Vector3D },
    StaticMesh { positions: Vec<Point3D>, indices: Vec<u32> },
}

/// Physics body behaviour; only the static/dynamic toggle used while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    #[default]
    Static,
    Dynamic,
}

/// Nearest intersection reported by a raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub distance: f32,
    pub position: Point3D,
    pub node: NodeId,
    pub group: CollisionGroup,
}

/// Scene graph and collision queries.
///
/// Transforms are relative to the node's parent; parentless nodes live at the
/// scene root, so their transform is in world space.
pub trait SceneGraph: Send {
    fn spawn_node(&mut self, name: &str) -> NodeId;

    fn remove_node(&mut self, node: NodeId);

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>);

    fn set_transform(&mut self, node: NodeId, transform: Transform);

    fn set_enabled(&mut self, node: NodeId, enabled: bool);

    /// Attach collision shapes tagged with `group`.
    fn set_collision(
        &mut self,
        node: NodeId,
        shapes: &[CollisionShape],
        group: CollisionGroup,
    ) -> Result<(), SceneError>;

    fn set_body_mode(&mut self, node: NodeId, mode: BodyMode);

    fn collision_group(&self, node: NodeId) -> Option<CollisionGroup>;

    /// Nearest hit along the ray against proxies whose group intersects `mask`.
    fn raycast(
        &self,
        origin: Point3D,
        direction: Vector3D,
        max_distance: f32,
        mask: CollisionGroup,
    ) -> Option<RaycastHit>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_groups_are_mutually_exclusive() {
        assert!(!CollisionGroup::HORIZONTAL_PLANE.intersects(CollisionGroup::VERTICAL_PLANE));
        assert!(CollisionGroup::ALL_PLANES.intersects(CollisionGroup::VERTICAL_PLANE));
        assert!(CollisionGroup::ALL_PLANES.intersects(CollisionGroup::HORIZONTAL_PLANE));
        assert!(!CollisionGroup::ALL_PLANES.intersects(CollisionGroup::PLACED_OBJECT));
    }

    #[test]
    fn bitor_combines_categories() {
        let combined = CollisionGroup::HORIZONTAL_PLANE | CollisionGroup::VERTICAL_PLANE;
        assert_eq!(combined, CollisionGroup::ALL_PLANES);
    }
}
