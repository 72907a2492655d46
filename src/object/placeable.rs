//! Reusable templates that spawn placed objects

use tracing::debug;

use super::{ModelDescriptor, ObjectId, PlacedObject};
use crate::error::{PlacementError, Result};
use crate::scene::{CollisionShape, NodeId, SceneGraph};
use spatial_placement_geometry::{Transform, Vector3D};

/// Render-side facts about a model needed to spawn instances.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContent {
    /// Scale baked into the loaded model
    pub scale: Vector3D,
    /// Unscaled bounding box size
    pub extents: Vector3D,
}

impl Default for RenderContent {
    fn default() -> Self {
        Self {
            scale: Vector3D::ONE,
            extents: Vector3D::ZERO,
        }
    }
}

/// Template bound to one model kind.
///
/// Owns the translucent preview node that follows the placement location
/// while the model is selected.
#[derive(Debug)]
pub struct PlaceableObject {
    descriptor: ModelDescriptor,
    preview: NodeId,
    preview_shapes: Vec<CollisionShape>,
    content: RenderContent,
    preview_visible: bool,
}

impl PlaceableObject {
    /// `preview_shapes` are the collision shapes generated for the preview;
    /// placed instances reuse them.
    pub fn new(
        descriptor: ModelDescriptor,
        preview: NodeId,
        preview_shapes: Vec<CollisionShape>,
        content: RenderContent,
    ) -> Self {
        Self {
            descriptor,
            preview,
            preview_shapes,
            content,
            preview_visible: true,
        }
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn preview(&self) -> NodeId {
        self.preview
    }

    pub fn content(&self) -> &RenderContent {
        &self.content
    }

    /// Show or hide the preview. Returns whether anything changed.
    pub fn set_preview_visible(&mut self, visible: bool, scene: &mut dyn SceneGraph) -> bool {
        if self.preview_visible == visible {
            return false;
        }
        self.preview_visible = visible;
        scene.set_enabled(self.preview, visible);
        true
    }

    /// Whether a contact between `a` and `b` involves this preview
    pub fn matches_collision(&self, a: NodeId, b: NodeId) -> bool {
        a == self.preview || b == self.preview
    }

    /// Spawn an independent, physically simulated instance at `pose`.
    ///
    /// The instance keeps the model's own scale regardless of `pose.scale`.
    pub fn materialize(
        &self,
        id: ObjectId,
        pose: Transform,
        scene: &mut dyn SceneGraph,
    ) -> Result<PlacedObject> {
        if self.preview_shapes.is_empty() {
            return Err(PlacementError::Invariant(format!(
                "preview of '{}' carries no collision shapes",
                self.descriptor.file_name
            )));
        }

        debug!(object = %id, model = %self.descriptor.file_name, "Materializing placed object");
        Ok(PlacedObject::spawn(
            id,
            self.descriptor.clone(),
            &self.content,
            &self.preview_shapes,
            pose,
            scene,
        ))
    }
}
