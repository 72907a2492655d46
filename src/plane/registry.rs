use std::collections::HashMap;

use tracing::{debug, warn};

use crate::scene::{BodyMode, CollisionGroup, NodeId, SceneGraph};
use crate::tracking::{AnchorEvent, AnchorId, AnchorUpdate, PlaneAlignment, PlaneAnchor};

/// Currently detected surfaces, keyed by anchor identity.
///
/// Each plane owns one proxy node in the scene carrying its collision mesh.
/// Planes whose mesh cannot be turned into a collision shape are still
/// registered; their proxy just never shows up in raycasts.
#[derive(Debug, Default)]
pub struct PlaneRegistry {
    anchors: HashMap<AnchorId, PlaneAnchor>,
    proxies: HashMap<AnchorId, NodeId>,
}

impl PlaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, update: AnchorUpdate<PlaneAnchor>, scene: &mut dyn SceneGraph) {
        let AnchorUpdate { anchor, event } = update;
        let id = anchor.id;

        if event == AnchorEvent::Removed {
            self.anchors.remove(&id);
            if let Some(proxy) = self.proxies.remove(&id) {
                scene.remove_node(proxy);
            }
            debug!(plane = %id, "Plane removed");
            return;
        }

        let proxy = Self::build_proxy(&anchor, scene);
        if let Some(previous) = self.proxies.insert(id, proxy) {
            scene.remove_node(previous);
        }
        if event == AnchorEvent::Added {
            debug!(plane = %id, alignment = ?anchor.alignment, "Plane detected");
        }
        self.anchors.insert(id, anchor);
    }

    fn build_proxy(anchor: &PlaneAnchor, scene: &mut dyn SceneGraph) -> NodeId {
        let node = scene.spawn_node(&format!("Plane {}", anchor.id));
        scene.set_transform(node, anchor.transform);

        let group = match anchor.alignment {
            PlaneAlignment::Horizontal => CollisionGroup::HORIZONTAL_PLANE,
            PlaneAlignment::Vertical => CollisionGroup::VERTICAL_PLANE,
        };
        let attached = anchor
            .mesh
            .collision_shape()
            .and_then(|shape| scene.set_collision(node, &[shape], group));
        if let Err(err) = attached {
            warn!(plane = %anchor.id, error = %err, "Plane registered without a collision proxy");
        }
        scene.set_body_mode(node, BodyMode::Static);
        node
    }

    pub fn current_planes(&self) -> impl Iterator<Item = &PlaneAnchor> {
        self.anchors.values()
    }

    pub fn get(&self, id: &AnchorId) -> Option<&PlaneAnchor> {
        self.anchors.get(id)
    }

    pub fn proxy(&self, id: &AnchorId) -> Option<NodeId> {
        self.proxies.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeScene;
    use crate::tracking::PlaneMesh;
    use spatial_placement_geometry::{Point3D, Transform};

    fn plane(alignment: PlaneAlignment, mesh: PlaneMesh) -> PlaneAnchor {
        PlaneAnchor {
            id: AnchorId::random(),
            alignment,
            transform: Transform::from_position(Point3D::new(0.0, 0.5, 0.0)),
            mesh,
        }
    }

    #[test]
    fn added_plane_gets_a_proxy_in_its_alignment_group() {
        let mut scene = FakeScene::new();
        let mut registry = PlaneRegistry::new();
        let floor = plane(PlaneAlignment::Horizontal, PlaneMesh::square(2.0));
        let wall = plane(PlaneAlignment::Vertical, PlaneMesh::square(2.0));
        let (floor_id, wall_id) = (floor.id, wall.id);

        registry.process(AnchorUpdate::added(floor), &mut scene);
        registry.process(AnchorUpdate::added(wall), &mut scene);

        assert_eq!(registry.len(), 2);
        let floor_proxy = registry.proxy(&floor_id).unwrap();
        let wall_proxy = registry.proxy(&wall_id).unwrap();
        assert_eq!(
            scene.collision_group(floor_proxy),
            Some(CollisionGroup::HORIZONTAL_PLANE)
        );
        assert_eq!(
            scene.collision_group(wall_proxy),
            Some(CollisionGroup::VERTICAL_PLANE)
        );
    }

    #[test]
    fn update_rebuilds_the_proxy() {
        let mut scene = FakeScene::new();
        let mut registry = PlaneRegistry::new();
        let mut floor = plane(PlaneAlignment::Horizontal, PlaneMesh::square(1.0));
        let id = floor.id;

        registry.process(AnchorUpdate::added(floor.clone()), &mut scene);
        let first = registry.proxy(&id).unwrap();

        floor.mesh = PlaneMesh::square(4.0);
        registry.process(AnchorUpdate::updated(floor), &mut scene);
        let second = registry.proxy(&id).unwrap();

        assert_ne!(first, second);
        assert!(!scene.contains(first));
        assert!(scene.contains(second));
        assert_eq!(registry.get(&id).unwrap().mesh, PlaneMesh::square(4.0));
    }

    #[test]
    fn removal_discards_anchor_and_proxy() {
        let mut scene = FakeScene::new();
        let mut registry = PlaneRegistry::new();
        let floor = plane(PlaneAlignment::Horizontal, PlaneMesh::square(1.0));
        let id = floor.id;

        registry.process(AnchorUpdate::added(floor.clone()), &mut scene);
        let proxy = registry.proxy(&id).unwrap();
        registry.process(AnchorUpdate::removed(floor), &mut scene);

        assert!(registry.is_empty());
        assert!(registry.proxy(&id).is_none());
        assert!(!scene.contains(proxy));
    }

    #[test]
    fn broken_mesh_still_registers_the_plane() {
        let mut scene = FakeScene::new();
        let mut registry = PlaneRegistry::new();
        let floor = plane(PlaneAlignment::Horizontal, PlaneMesh::default());
        let id = floor.id;

        registry.process(AnchorUpdate::added(floor), &mut scene);

        assert_eq!(registry.len(), 1);
        let proxy = registry.proxy(&id).unwrap();
        assert_eq!(scene.collision_group(proxy), None);
    }
}
