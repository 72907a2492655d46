use tracing::{debug, info, warn};

use super::PlacementState;
use crate::config::PlacementSettings;
use crate::error::{PlacementError, Result};
use crate::object::{ModelCatalog, ObjectId};
use crate::persistence::AnchorManager;
use crate::plane::{project_onto_horizontal_plane, PlaneRegistry};
use crate::scene::{CollisionGroup, NodeId, SceneGraph};
use crate::tracking::{AnchorId, DevicePose};
use spatial_placement_geometry::{Point3D, Quaternion, Transform, Vector3D};

/// Below this horizontal length the UI keeps its current heading
const FACING_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
struct DragState {
    object: ObjectId,
    initial_position: Point3D,
}

/// Contextual controls attached to the highlighted object.
#[derive(Debug, Clone, Copy)]
struct UiControls {
    delete_button: NodeId,
    drag_tooltip: NodeId,
}

/// Decides where the selected model would land and what the user is
/// pointing at, and applies drag gestures to placed objects.
pub struct PlacementController {
    settings: PlacementSettings,
    state: PlacementState,
    placement_location: NodeId,
    placement_pose: Transform,
    drag: Option<DragState>,
    controls: Option<UiControls>,
}

impl PlacementController {
    pub fn new(settings: PlacementSettings, scene: &mut dyn SceneGraph) -> Self {
        let placement_location = scene.spawn_node("placement location");
        Self {
            settings,
            state: PlacementState::default(),
            placement_location,
            placement_pose: Transform::IDENTITY,
            drag: None,
            controls: None,
        }
    }

    pub fn state(&self) -> &PlacementState {
        &self.state
    }

    /// Node the selected preview is parented to
    pub fn placement_location(&self) -> NodeId {
        self.placement_location
    }

    /// World pose a placed object would get right now
    pub fn placement_pose(&self) -> Transform {
        self.placement_pose
    }

    pub fn register_ui_controls(
        &mut self,
        delete_button: NodeId,
        drag_tooltip: NodeId,
        scene: &mut dyn SceneGraph,
    ) {
        for node in [delete_button, drag_tooltip] {
            scene.set_enabled(node, false);
        }
        self.controls = Some(UiControls {
            delete_button,
            drag_tooltip,
        });
    }

    /// Selects a model by file name. Selecting the current model deselects it.
    pub fn select(
        &mut self,
        file_name: Option<&str>,
        catalog: &mut ModelCatalog,
        scene: &mut dyn SceneGraph,
    ) {
        if let Some(previous) = self.state.selected.take() {
            if let Some(placeable) = catalog.get_mut(&previous) {
                scene.set_parent(placeable.preview(), None);
                placeable.set_preview_visible(false, scene);
            }
            if file_name == Some(previous.as_str()) {
                self.state.active_collisions = 0;
                debug!(model = %previous, "Deselected");
                return;
            }
        }
        self.state.active_collisions = 0;

        let Some(file_name) = file_name else {
            return;
        };
        let Some(placeable) = catalog.get_mut(file_name) else {
            warn!(model = %file_name, "Cannot select a model missing from the catalog");
            return;
        };
        scene.set_parent(placeable.preview(), Some(self.placement_location));
        placeable.set_preview_visible(self.state.should_show_preview(), scene);
        self.state.selected = Some(file_name.to_string());
        info!(model = %file_name, "Selected model");
    }

    /// One evaluation cycle for the latest device pose.
    pub fn update(
        &mut self,
        device: Option<DevicePose>,
        planes: &PlaneRegistry,
        anchors: &AnchorManager,
        catalog: &mut ModelCatalog,
        scene: &mut dyn SceneGraph,
    ) {
        self.state.device_pose_available = device.is_some();
        self.state.planes_detected = !planes.is_empty();
        self.sync_preview_visibility(catalog, scene);

        let Some(device) = device.filter(|pose| pose.tracked) else {
            return;
        };
        let (origin, direction) = self.ray(&device.transform);

        let pointed_at = scene
            .raycast(
                origin,
                direction,
                self.settings.highlight_max_distance,
                CollisionGroup::PLACED_OBJECT,
            )
            .and_then(|hit| anchors.object_for_node(hit.node));
        if self.set_highlighted(pointed_at, anchors, scene) {
            self.sync_preview_visibility(catalog, scene);
        }
        self.face_device(device.transform.position, anchors, scene);

        self.update_placement_location(&device.transform, origin, direction, scene);
    }

    fn sync_preview_visibility(&self, catalog: &mut ModelCatalog, scene: &mut dyn SceneGraph) {
        let visible = self.state.should_show_preview();
        if let Some(placeable) = self
            .state
            .selected
            .as_deref()
            .and_then(|name| catalog.get_mut(name))
        {
            placeable.set_preview_visible(visible, scene);
        }
    }

    /// Device-forward ray tilted toward the floor
    fn ray(&self, device: &Transform) -> (Point3D, Vector3D) {
        let tilt = Quaternion::from_axis_angle(
            Vector3D::RIGHT,
            self.settings.raycast_tilt_degrees.to_radians(),
        );
        let rotation = (device.rotation * tilt).normalize();
        (device.position, rotation.forward())
    }

    fn update_placement_location(
        &mut self,
        device: &Transform,
        origin: Point3D,
        direction: Vector3D,
        scene: &mut dyn SceneGraph,
    ) {
        let upright = Transform {
            scale: Vector3D::ONE,
            ..device.gravity_aligned()
        };
        let surface_hit = scene
            .raycast(
                origin,
                direction,
                self.settings.raycast_max_distance,
                CollisionGroup::ALL_PLANES,
            )
            .filter(|hit| {
                hit.distance > self.settings.raycast_min_distance
                    && hit.group != CollisionGroup::VERTICAL_PLANE
            });

        let (pose, surface_found) = match surface_hit {
            Some(hit) => {
                let lifted = hit.position + Vector3D::UP * self.settings.surface_clearance;
                (upright.with_position(lifted), true)
            }
            None => {
                let offset = Transform::from_position(Point3D::new(
                    0.0,
                    -self.settings.fallback_downward_offset,
                    self.settings.fallback_forward_distance,
                ));
                (upright.then(&offset), false)
            }
        };

        self.placement_pose = pose;
        self.state.surface_found = surface_found;
        scene.set_transform(self.placement_location, pose);
    }

    /// Moves the contextual controls onto `target`. Returns whether the
    /// highlight changed.
    pub fn set_highlighted(
        &mut self,
        target: Option<ObjectId>,
        anchors: &AnchorManager,
        scene: &mut dyn SceneGraph,
    ) -> bool {
        if self.state.highlighted == target {
            return false;
        }
        self.state.highlighted = target;

        let Some(controls) = self.controls else {
            return true;
        };
        for node in [controls.delete_button, controls.drag_tooltip] {
            scene.set_parent(node, None);
            scene.set_enabled(node, false);
        }

        let Some(object) = target.and_then(|id| anchors.object(id)) else {
            return true;
        };
        let extents = object.extents();
        let scale = object.scale().recip();
        let top_left = Point3D::new(-extents.x / 2.0, extents.y / 2.0 + 0.02, 0.0);
        let front_bottom = Point3D::new(0.0, -extents.y / 2.0 + 0.04, extents.z / 2.0 + 0.04);

        // the drag hint only shows until the first drag
        let show_tooltip = !self.state.user_dragged_an_object;
        for (node, position, enabled) in [
            (controls.delete_button, top_left, true),
            (controls.drag_tooltip, front_bottom, show_tooltip),
        ] {
            scene.set_parent(node, Some(object.ui_origin()));
            scene.set_transform(
                node,
                Transform {
                    position,
                    rotation: Quaternion::IDENTITY,
                    scale,
                },
            );
            scene.set_enabled(node, enabled);
        }
        true
    }

    /// Turns the highlighted object's UI origin to face the device, about
    /// the vertical axis only.
    fn face_device(
        &self,
        device_position: Point3D,
        anchors: &AnchorManager,
        scene: &mut dyn SceneGraph,
    ) {
        let Some(object) = self.state.highlighted.and_then(|id| anchors.object(id)) else {
            return;
        };
        let local_position = object.ui_origin_offset();
        let world_position = object.transform().transform_point(local_position);
        let to_device = device_position - world_position;
        if Vector3D::new(to_device.x, 0.0, to_device.z).magnitude() < FACING_EPSILON {
            return;
        }

        let heading = Quaternion::from_yaw(to_device.x.atan2(to_device.z));
        let local_rotation = (object.transform().rotation.inverse() * heading).normalize();
        scene.set_transform(
            object.ui_origin(),
            Transform::from_position_rotation(local_position, local_rotation),
        );
    }

    /// Places the selected model at the current placement pose, if allowed.
    pub async fn place_selected(
        &mut self,
        catalog: &ModelCatalog,
        anchors: &mut AnchorManager,
        scene: &mut dyn SceneGraph,
    ) -> Result<Option<AnchorId>> {
        let Some(file_name) = self.state.object_to_place().map(str::to_owned) else {
            return Ok(None);
        };
        let placeable = catalog.get(&file_name).ok_or_else(|| {
            PlacementError::Invariant(format!("selected model '{file_name}' is not in the catalog"))
        })?;

        self.state.user_placed_an_object = true;
        anchors
            .place_new_object(placeable, self.placement_pose, scene)
            .await
    }

    /// Applies a drag gesture on `target`, `translation` being the total
    /// world-space movement since the drag began.
    ///
    /// A gesture on a different object ends the current drag first. The
    /// dragged position snaps onto a horizontal plane within the snap
    /// distance. Returns false when `target` is not a placed object.
    pub fn update_drag(
        &mut self,
        target: NodeId,
        translation: Vector3D,
        planes: &PlaneRegistry,
        anchors: &mut AnchorManager,
        scene: &mut dyn SceneGraph,
    ) -> bool {
        let Some(object_id) = anchors.object_for_node(target) else {
            return false;
        };
        if self.drag.is_some_and(|drag| drag.object != object_id) {
            self.end_drag(anchors, scene);
        }

        let Some(object) = anchors.object_mut(object_id) else {
            return false;
        };
        let drag = match self.drag {
            Some(drag) => drag,
            None => {
                object.set_dragged(true, scene);
                let drag = DragState {
                    object: object_id,
                    initial_position: object.position(),
                };
                self.drag = Some(drag);
                self.state.drag_in_progress = true;
                self.state.user_dragged_an_object = true;
                debug!(object = %object_id, "Drag started");
                drag
            }
        };

        let moved = object
            .transform()
            .with_position(drag.initial_position + translation);
        let resolved = project_onto_horizontal_plane(
            &moved,
            planes.current_planes(),
            self.settings.drag_snap_distance,
        )
        .unwrap_or(moved);
        object.set_transform(resolved, scene);
        true
    }

    /// Releases the dragged object to physics; it is re-anchored once it settles.
    pub fn end_drag(&mut self, anchors: &mut AnchorManager, scene: &mut dyn SceneGraph) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        self.state.drag_in_progress = false;
        if let Some(object) = anchors.object_mut(drag.object) {
            object.set_dragged(false, scene);
        }
        debug!(object = %drag.object, "Drag ended");
    }

    pub fn collision_began(&mut self, a: NodeId, b: NodeId, catalog: &ModelCatalog) {
        if self.involves_selected_preview(a, b, catalog) {
            self.state.active_collisions = self.state.active_collisions.saturating_add(1);
        }
    }

    pub fn collision_ended(&mut self, a: NodeId, b: NodeId, catalog: &ModelCatalog) {
        if self.involves_selected_preview(a, b, catalog) {
            self.state.active_collisions = self.state.active_collisions.saturating_sub(1);
        }
    }

    fn involves_selected_preview(&self, a: NodeId, b: NodeId, catalog: &ModelCatalog) -> bool {
        self.state
            .selected
            .as_deref()
            .and_then(|name| catalog.get(name))
            .is_some_and(|placeable| placeable.matches_collision(a, b))
    }

    /// Deletes the highlighted object. Returns whether one was highlighted.
    pub async fn remove_highlighted(
        &mut self,
        anchors: &mut AnchorManager,
        scene: &mut dyn SceneGraph,
    ) -> Result<bool> {
        let Some(id) = self.state.highlighted else {
            return Ok(false);
        };
        self.set_highlighted(None, anchors, scene);
        if self.drag.is_some_and(|drag| drag.object == id) {
            self.end_drag(anchors, scene);
        }
        anchors.remove_object(id, scene).await?;
        Ok(true)
    }
}
