//! Materialized object instances and their anchoring lifecycle

use std::fmt;

use tracing::warn;

use super::{ModelDescriptor, RenderContent};
use crate::scene::{BodyMode, CollisionGroup, CollisionShape, NodeId, SceneGraph};
use crate::tracking::AnchorId;
use spatial_placement_geometry::{Point3D, Quaternion, Transform, Vector3D};

/// Engine-local identity of a placed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object-{}", self.0)
    }
}

/// Anchoring state of a placed object. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Bound to a confirmed world anchor
    Anchored(AnchorId),
    /// Anchor requested, waiting for the session to report it
    PendingAnchor(AnchorId),
    /// Free-floating, waiting to settle before re-anchoring
    Moving,
}

impl Lifecycle {
    pub fn anchor(&self) -> Option<AnchorId> {
        match self {
            Lifecycle::Anchored(id) | Lifecycle::PendingAnchor(id) => Some(*id),
            Lifecycle::Moving => None,
        }
    }
}

/// A materialized instance living in the physical scene.
#[derive(Debug)]
pub struct PlacedObject {
    id: ObjectId,
    descriptor: ModelDescriptor,
    node: NodeId,
    ui_origin: NodeId,
    transform: Transform,
    extents: Vector3D,
    visible: bool,
    body_mode: BodyMode,
    dragged: bool,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) at_rest: bool,
    pub(crate) last_checked_position: Option<Point3D>,
}

impl PlacedObject {
    /// Creates the scene nodes for a new instance. The node stays hidden until
    /// its first anchor update arrives.
    pub(crate) fn spawn(
        id: ObjectId,
        descriptor: ModelDescriptor,
        content: &RenderContent,
        shapes: &[CollisionShape],
        pose: Transform,
        scene: &mut dyn SceneGraph,
    ) -> Self {
        let transform = Transform {
            scale: content.scale,
            ..pose
        };

        let node = scene.spawn_node(&format!("{} ({id})", descriptor.display_name));
        scene.set_transform(node, transform);
        scene.set_enabled(node, false);
        if let Err(err) = scene.set_collision(node, shapes, CollisionGroup::PLACED_OBJECT) {
            warn!(object = %id, error = %err, "Placed object has no collision proxy");
        }
        scene.set_body_mode(node, BodyMode::Static);

        let ui_origin = scene.spawn_node("ui origin");
        scene.set_parent(ui_origin, Some(node));
        scene.set_transform(
            ui_origin,
            Transform::from_position(ui_origin_offset(content.extents)),
        );

        Self {
            id,
            descriptor,
            node,
            ui_origin,
            transform,
            extents: content.extents,
            visible: false,
            body_mode: BodyMode::Static,
            dragged: false,
            lifecycle: Lifecycle::Moving,
            at_rest: false,
            last_checked_position: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Local origin for contextual controls, centred at half height
    pub fn ui_origin(&self) -> NodeId {
        self.ui_origin
    }

    /// Position of the UI origin in the object's local space
    pub fn ui_origin_offset(&self) -> Point3D {
        ui_origin_offset(self.extents)
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn position(&self) -> Point3D {
        self.transform.position
    }

    pub fn scale(&self) -> Vector3D {
        self.transform.scale
    }

    pub fn extents(&self) -> Vector3D {
        self.extents
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dragged(&self) -> bool {
        self.dragged
    }

    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    pub fn body_mode(&self) -> BodyMode {
        self.body_mode
    }

    pub fn last_checked_position(&self) -> Option<Point3D> {
        self.last_checked_position
    }

    pub fn set_transform(&mut self, transform: Transform, scene: &mut dyn SceneGraph) {
        self.transform = transform;
        scene.set_transform(self.node, transform);
    }

    /// Move and rotate, keeping the object's own scale
    pub fn set_pose(&mut self, position: Point3D, rotation: Quaternion, scene: &mut dyn SceneGraph) {
        let transform = Transform {
            position,
            rotation,
            scale: self.transform.scale,
        };
        self.set_transform(transform, scene);
    }

    pub fn set_visible(&mut self, visible: bool, scene: &mut dyn SceneGraph) {
        if self.visible != visible {
            self.visible = visible;
            scene.set_enabled(self.node, visible);
        }
    }

    /// Dragged objects are held static; released objects fall under physics.
    pub fn set_dragged(&mut self, dragged: bool, scene: &mut dyn SceneGraph) {
        self.dragged = dragged;
        let mode = if dragged {
            BodyMode::Static
        } else {
            BodyMode::Dynamic
        };
        self.set_body_mode(mode, scene);
    }

    fn set_body_mode(&mut self, mode: BodyMode, scene: &mut dyn SceneGraph) {
        if self.body_mode != mode {
            self.body_mode = mode;
            scene.set_body_mode(self.node, mode);
        }
    }

    /// Enter the moving state and start tracking from the current position.
    pub(crate) fn mark_moving(&mut self) {
        self.lifecycle = Lifecycle::Moving;
        self.at_rest = false;
        self.last_checked_position = Some(self.transform.position);
    }

    pub(crate) fn remove_from_scene(self, scene: &mut dyn SceneGraph) {
        scene.remove_node(self.ui_origin);
        scene.remove_node(self.node);
    }
}

fn ui_origin_offset(extents: Vector3D) -> Point3D {
    Point3D::new(0.0, extents.y / 2.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeScene;

    fn pillow() -> (ModelDescriptor, RenderContent, Vec<CollisionShape>) {
        let extents = Vector3D::new(0.6, 0.3, 0.4);
        (
            ModelDescriptor::new("pillow").with_display_name("Pillow"),
            RenderContent {
                scale: Vector3D::new(2.0, 2.0, 2.0),
                extents,
            },
            vec![CollisionShape::Box {
                half_extents: extents * 0.5,
            }],
        )
    }

    fn spawn(scene: &mut FakeScene) -> PlacedObject {
        let (descriptor, content, shapes) = pillow();
        let pose = Transform {
            position: Point3D::new(1.0, 0.0, 2.0),
            rotation: Quaternion::from_yaw(0.5),
            scale: Vector3D::new(5.0, 5.0, 5.0),
        };
        PlacedObject::spawn(ObjectId::new(7), descriptor, &content, &shapes, pose, scene)
    }

    #[test]
    fn spawned_object_is_hidden_and_keeps_model_scale() {
        let mut scene = FakeScene::new();
        let object = spawn(&mut scene);

        assert_eq!(object.scale(), Vector3D::new(2.0, 2.0, 2.0));
        assert_eq!(object.position(), Point3D::new(1.0, 0.0, 2.0));
        assert!(!object.is_visible());
        assert_eq!(object.lifecycle(), Lifecycle::Moving);

        let node = scene.node(object.node()).unwrap();
        assert_eq!(node.name, "Pillow (object-7)");
        assert!(!node.enabled);
        assert_eq!(node.group, Some(CollisionGroup::PLACED_OBJECT));
        assert_eq!(node.body_mode, BodyMode::Static);
        assert_eq!(node.transform, object.transform());
    }

    #[test]
    fn ui_origin_sits_at_half_height() {
        let mut scene = FakeScene::new();
        let object = spawn(&mut scene);

        let ui_origin = scene.node(object.ui_origin()).unwrap();
        assert_eq!(ui_origin.parent, Some(object.node()));
        assert_eq!(ui_origin.transform.position, Point3D::new(0.0, 0.15, 0.0));
        assert_eq!(object.ui_origin_offset(), Point3D::new(0.0, 0.15, 0.0));
    }

    #[test]
    fn collision_failure_leaves_object_without_proxy() {
        let mut scene = FakeScene::new();
        scene.set_fail_collision(true);
        let object = spawn(&mut scene);

        assert!(scene.contains(object.node()));
        assert_eq!(scene.collision_group(object.node()), None);
    }

    #[test]
    fn dragging_toggles_body_mode() {
        let mut scene = FakeScene::new();
        let mut object = spawn(&mut scene);

        object.set_dragged(true, &mut scene);
        assert!(object.is_dragged());
        assert_eq!(object.body_mode(), BodyMode::Static);

        object.set_dragged(false, &mut scene);
        assert!(!object.is_dragged());
        assert_eq!(object.body_mode(), BodyMode::Dynamic);
        assert_eq!(scene.node(object.node()).unwrap().body_mode, BodyMode::Dynamic);
    }

    #[test]
    fn set_pose_keeps_scale() {
        let mut scene = FakeScene::new();
        let mut object = spawn(&mut scene);
        let rotation = Quaternion::from_yaw(1.2);

        object.set_pose(Point3D::new(0.0, 1.0, 0.0), rotation, &mut scene);

        let transform = object.transform();
        assert_eq!(transform.position, Point3D::new(0.0, 1.0, 0.0));
        assert_eq!(transform.rotation, rotation);
        assert_eq!(transform.scale, Vector3D::new(2.0, 2.0, 2.0));
        assert_eq!(scene.node(object.node()).unwrap().transform, transform);
    }

    #[test]
    fn mark_moving_records_current_position() {
        let mut scene = FakeScene::new();
        let mut object = spawn(&mut scene);
        object.lifecycle = Lifecycle::Anchored(AnchorId::random());
        object.at_rest = true;

        object.mark_moving();

        assert_eq!(object.lifecycle(), Lifecycle::Moving);
        assert!(!object.is_at_rest());
        assert_eq!(object.last_checked_position(), Some(object.position()));
    }

    #[test]
    fn removal_clears_both_nodes() {
        let mut scene = FakeScene::new();
        let object = spawn(&mut scene);
        let (node, ui_origin) = (object.node(), object.ui_origin());

        object.remove_from_scene(&mut scene);

        assert!(!scene.contains(node));
        assert!(!scene.contains(ui_origin));
    }

    #[test]
    fn lifecycle_exposes_its_anchor() {
        let anchor = AnchorId::random();
        assert_eq!(Lifecycle::Anchored(anchor).anchor(), Some(anchor));
        assert_eq!(Lifecycle::PendingAnchor(anchor).anchor(), Some(anchor));
        assert_eq!(Lifecycle::Moving.anchor(), None);
    }
}
