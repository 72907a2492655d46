//! In-memory stand-ins for the tracking session and the scene graph.
//!
//! Both fakes record what the engine asked of them so tests can assert on
//! side effects without a device.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{SceneError, TrackingError};
use crate::object::{ModelCatalog, ModelDescriptor, PlaceableObject, RenderContent};
use crate::scene::{BodyMode, CollisionGroup, CollisionShape, NodeId, RaycastHit, SceneGraph};
use crate::tracking::{
    AnchorId, AnchorUpdate, DevicePose, PlaneAnchor, TrackingSession, WorldAnchor,
};
use spatial_placement_geometry::{Point3D, Transform, Vector3D};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct SessionState {
    reject_adds: bool,
    fail_removals: bool,
    auto_confirm: bool,
    running: bool,
    device_pose: Option<DevicePose>,
    add_requests: Vec<(AnchorId, Transform)>,
    remove_requests: Vec<AnchorId>,
}

/// Tracking session driven entirely by the test.
///
/// With auto-confirm enabled, accepted add and remove requests are echoed
/// back on the world-anchor stream as `Added` and `Removed` events.
pub struct FakeTrackingSession {
    state: Mutex<SessionState>,
    world_tx: UnboundedSender<AnchorUpdate<WorldAnchor>>,
    world_rx: Mutex<Option<UnboundedReceiver<AnchorUpdate<WorldAnchor>>>>,
    plane_tx: UnboundedSender<AnchorUpdate<PlaneAnchor>>,
    plane_rx: Mutex<Option<UnboundedReceiver<AnchorUpdate<PlaneAnchor>>>>,
}

impl Default for FakeTrackingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTrackingSession {
    pub fn new() -> Self {
        let (world_tx, world_rx) = mpsc::unbounded();
        let (plane_tx, plane_rx) = mpsc::unbounded();
        Self {
            state: Mutex::new(SessionState {
                running: true,
                ..SessionState::default()
            }),
            world_tx,
            world_rx: Mutex::new(Some(world_rx)),
            plane_tx,
            plane_rx: Mutex::new(Some(plane_rx)),
        }
    }

    pub fn set_auto_confirm(&self, enabled: bool) {
        lock(&self.state).auto_confirm = enabled;
    }

    pub fn set_reject_adds(&self, reject: bool) {
        lock(&self.state).reject_adds = reject;
    }

    pub fn set_fail_removals(&self, fail: bool) {
        lock(&self.state).fail_removals = fail;
    }

    pub fn set_running(&self, running: bool) {
        lock(&self.state).running = running;
    }

    pub fn set_device_pose(&self, pose: Option<DevicePose>) {
        lock(&self.state).device_pose = pose;
    }

    pub fn push_world_update(&self, update: AnchorUpdate<WorldAnchor>) {
        let _ = self.world_tx.unbounded_send(update);
    }

    pub fn push_plane_update(&self, update: AnchorUpdate<PlaneAnchor>) {
        let _ = self.plane_tx.unbounded_send(update);
    }

    /// Accepted add requests, in order
    pub fn add_requests(&self) -> Vec<(AnchorId, Transform)> {
        lock(&self.state).add_requests.clone()
    }

    /// Remove requests, including failed ones
    pub fn remove_requests(&self) -> Vec<AnchorId> {
        lock(&self.state).remove_requests.clone()
    }
}

#[async_trait]
impl TrackingSession for FakeTrackingSession {
    async fn request_anchor_add(&self, transform: Transform) -> Result<AnchorId, TrackingError> {
        let mut state = lock(&self.state);
        if !state.running {
            return Err(TrackingError::NotRunning);
        }
        if state.reject_adds {
            return Err(TrackingError::Rejected("rejected by fake session".into()));
        }

        let id = AnchorId::random();
        state.add_requests.push((id, transform));
        if state.auto_confirm {
            let anchor = WorldAnchor {
                id,
                transform,
                tracked: true,
            };
            let _ = self.world_tx.unbounded_send(AnchorUpdate::added(anchor));
        }
        Ok(id)
    }

    async fn request_anchor_remove(&self, id: AnchorId) -> Result<(), TrackingError> {
        let mut state = lock(&self.state);
        state.remove_requests.push(id);
        if state.fail_removals {
            return Err(TrackingError::UnknownAnchor(id));
        }
        if state.auto_confirm {
            let anchor = WorldAnchor {
                id,
                transform: Transform::IDENTITY,
                tracked: false,
            };
            let _ = self.world_tx.unbounded_send(AnchorUpdate::removed(anchor));
        }
        Ok(())
    }

    fn world_anchor_updates(&self) -> BoxStream<'static, AnchorUpdate<WorldAnchor>> {
        match lock(&self.world_rx).take() {
            Some(rx) => rx.boxed(),
            None => stream::pending().boxed(),
        }
    }

    fn plane_anchor_updates(&self) -> BoxStream<'static, AnchorUpdate<PlaneAnchor>> {
        match lock(&self.plane_rx).take() {
            Some(rx) => rx.boxed(),
            None => stream::pending().boxed(),
        }
    }

    fn current_device_pose(&self, _at: Instant) -> Option<DevicePose> {
        lock(&self.state).device_pose
    }

    fn is_running(&self) -> bool {
        lock(&self.state).running
    }
}

/// Recorded state of one node in [`FakeScene`].
#[derive(Debug, Clone)]
pub struct FakeNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub transform: Transform,
    pub enabled: bool,
    pub group: Option<CollisionGroup>,
    pub shapes: Vec<CollisionShape>,
    pub body_mode: BodyMode,
}

/// Scene graph with scripted raycast results.
#[derive(Debug, Default)]
pub struct FakeScene {
    next_id: u64,
    nodes: HashMap<NodeId, FakeNode>,
    parent_changes: usize,
    fail_collision: bool,
    hits: Vec<RaycastHit>,
    last_ray: Cell<Option<(Point3D, Vector3D)>>,
}

impl FakeScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> Option<&FakeNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn is_enabled(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.enabled)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of `set_parent` calls so far
    pub fn parent_changes(&self) -> usize {
        self.parent_changes
    }

    /// Make every later `set_collision` call fail
    pub fn set_fail_collision(&mut self, fail: bool) {
        self.fail_collision = fail;
    }

    /// Hit reported by raycasts whose mask and range include it
    pub fn add_raycast_hit(&mut self, hit: RaycastHit) {
        self.hits.push(hit);
    }

    pub fn clear_raycast_hits(&mut self) {
        self.hits.clear();
    }

    /// Origin and direction of the most recent raycast
    pub fn last_ray(&self) -> Option<(Point3D, Vector3D)> {
        self.last_ray.get()
    }
}

impl SceneGraph for FakeScene {
    fn spawn_node(&mut self, name: &str) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(
            id,
            FakeNode {
                name: name.to_string(),
                parent: None,
                transform: Transform::IDENTITY,
                enabled: true,
                group: None,
                shapes: Vec::new(),
                body_mode: BodyMode::Static,
            },
        );
        id
    }

    fn remove_node(&mut self, node: NodeId) {
        self.nodes.remove(&node);
        self.hits.retain(|hit| hit.node != node);
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        self.parent_changes += 1;
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.parent = parent;
        }
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.transform = transform;
        }
    }

    fn set_enabled(&mut self, node: NodeId, enabled: bool) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.enabled = enabled;
        }
    }

    fn set_collision(
        &mut self,
        node: NodeId,
        shapes: &[CollisionShape],
        group: CollisionGroup,
    ) -> Result<(), SceneError> {
        if self.fail_collision {
            return Err(SceneError::ShapeGeneration("scripted failure".into()));
        }
        let entry = self
            .nodes
            .get_mut(&node)
            .ok_or(SceneError::UnknownNode(node))?;
        entry.group = Some(group);
        entry.shapes = shapes.to_vec();
        Ok(())
    }

    fn set_body_mode(&mut self, node: NodeId, mode: BodyMode) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.body_mode = mode;
        }
    }

    fn collision_group(&self, node: NodeId) -> Option<CollisionGroup> {
        self.nodes.get(&node).and_then(|entry| entry.group)
    }

    fn raycast(
        &self,
        origin: Point3D,
        direction: Vector3D,
        max_distance: f32,
        mask: CollisionGroup,
    ) -> Option<RaycastHit> {
        self.last_ray.set(Some((origin, direction)));
        self.hits
            .iter()
            .filter(|hit| hit.group.intersects(mask) && hit.distance <= max_distance)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .copied()
    }
}

/// Catalog of box-shaped models, one per file name, with previews spawned
/// in `scene`.
pub fn sample_catalog(scene: &mut dyn SceneGraph, file_names: &[&str]) -> ModelCatalog {
    let extents = Vector3D::new(0.4, 0.2, 0.4);
    ModelCatalog::new(file_names.iter().map(|name| {
        let preview = scene.spawn_node(&format!("{name} preview"));
        PlaceableObject::new(
            ModelDescriptor::new(*name),
            preview,
            vec![CollisionShape::Box {
                half_extents: extents * 0.5,
            }],
            RenderContent {
                scale: Vector3D::ONE,
                extents,
            },
        )
    }))
}
