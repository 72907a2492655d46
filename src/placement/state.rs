use crate::object::ObjectId;

/// Placement flags, recomputed as the device moves. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementState {
    /// File name of the selected model
    pub selected: Option<String>,
    pub highlighted: Option<ObjectId>,
    /// A horizontal surface was hit by the latest placement raycast
    pub surface_found: bool,
    /// Contacts between the selected preview and other geometry
    pub active_collisions: u32,
    pub drag_in_progress: bool,
    pub device_pose_available: bool,
    pub planes_detected: bool,
    pub user_placed_an_object: bool,
    pub user_dragged_an_object: bool,
}

impl PlacementState {
    pub fn collision_detected(&self) -> bool {
        self.active_collisions > 0
    }

    pub fn should_show_preview(&self) -> bool {
        self.device_pose_available
            && self.planes_detected
            && !self.drag_in_progress
            && self.highlighted.is_none()
    }

    pub fn is_placement_possible(&self) -> bool {
        self.selected.is_some()
            && self.should_show_preview()
            && self.surface_found
            && !self.collision_detected()
            && !self.drag_in_progress
    }

    /// The selected model, if it can be placed right now
    pub fn object_to_place(&self) -> Option<&str> {
        if self.is_placement_possible() {
            self.selected.as_deref()
        } else {
            None
        }
    }
}
