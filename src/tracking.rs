//! Interface to the platform's spatial-tracking session.
//!
//! The session owns world anchors, plane anchors and the device pose. The
//! engine only holds copies of the latest anchor snapshots and talks back to
//! the session through [`TrackingSession`].

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SceneError, TrackingError};
use crate::scene::CollisionShape;
use spatial_placement_geometry::{Point3D, Transform};

/// Stable identity of a world or plane anchor, valid across app restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(Uuid);

impl AnchorId {
    /// A fresh random identity
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Snapshot of a session-tracked persistent pose.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldAnchor {
    pub id: AnchorId,
    pub transform: Transform,
    pub tracked: bool,
}

/// Orientation class of a detected surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneAlignment {
    Horizontal,
    Vertical,
}

/// Triangle mesh of a detected surface, in the plane anchor's local space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaneMesh {
    pub vertices: Vec<Point3D>,
    pub faces: Vec<[u32; 3]>,
}

impl PlaneMesh {
    /// Axis-aligned square of side `size` centred on the anchor origin
    pub fn square(size: f32) -> Self {
        let h = size / 2.0;
        Self {
            vertices: vec![
                Point3D::new(-h, 0.0, -h),
                Point3D::new(h, 0.0, -h),
                Point3D::new(h, 0.0, h),
                Point3D::new(-h, 0.0, h),
            ],
            faces: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    /// Faces resolved to vertex positions; faces with out-of-range indices are skipped
    pub fn triangles(&self) -> impl Iterator<Item = [Point3D; 3]> + '_ {
        self.faces.iter().filter_map(|face| {
            let vertex = |i: u32| self.vertices.get(i as usize).copied();
            Some([vertex(face[0])?, vertex(face[1])?, vertex(face[2])?])
        })
    }

    /// Static collision mesh for this surface
    pub fn collision_shape(&self) -> Result<CollisionShape, SceneError> {
        if self.faces.is_empty() {
            return Err(SceneError::ShapeGeneration("plane mesh has no faces".into()));
        }
        let vertex_count = self.vertices.len();
        if let Some(face) = self
            .faces
            .iter()
            .find(|face| face.iter().any(|&i| i as usize >= vertex_count))
        {
            return Err(SceneError::ShapeGeneration(format!(
                "face {face:?} references a vertex outside 0..{vertex_count}"
            )));
        }

        Ok(CollisionShape::StaticMesh {
            positions: self.vertices.clone(),
            indices: self.faces.iter().flatten().copied().collect(),
        })
    }
}

/// Snapshot of a detected flat surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneAnchor {
    pub id: AnchorId,
    pub alignment: PlaneAlignment,
    pub transform: Transform,
    pub mesh: PlaneMesh,
}

impl PlaneAnchor {
    pub fn is_horizontal(&self) -> bool {
        self.alignment == PlaneAlignment::Horizontal
    }

    /// World-space height of the plane origin
    pub fn height(&self) -> f32 {
        self.transform.position.y
    }
}

/// Kind of change carried by an anchor update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorEvent {
    Added,
    Updated,
    Removed,
}

/// One element of an anchor update stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorUpdate<A> {
    pub anchor: A,
    pub event: AnchorEvent,
}

impl<A> AnchorUpdate<A> {
    pub fn added(anchor: A) -> Self {
        Self {
            anchor,
            event: AnchorEvent::Added,
        }
    }

    pub fn updated(anchor: A) -> Self {
        Self {
            anchor,
            event: AnchorEvent::Updated,
        }
    }

    pub fn removed(anchor: A) -> Self {
        Self {
            anchor,
            event: AnchorEvent::Removed,
        }
    }
}

/// Head pose sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePose {
    pub transform: Transform,
    pub tracked: bool,
}

/// The spatial-tracking session collaborator.
///
/// Each update stream preserves arrival order and is handed out once; later
/// calls return a stream that never yields.
#[async_trait]
pub trait TrackingSession: Send + Sync {
    /// Submit a new world anchor at `transform`.
    async fn request_anchor_add(&self, transform: Transform) -> Result<AnchorId, TrackingError>;

    /// Ask the session to drop a world anchor.
    async fn request_anchor_remove(&self, id: AnchorId) -> Result<(), TrackingError>;

    fn world_anchor_updates(&self) -> BoxStream<'static, AnchorUpdate<WorldAnchor>>;

    fn plane_anchor_updates(&self) -> BoxStream<'static, AnchorUpdate<PlaneAnchor>>;

    /// Latest device pose predicted for `at`, if tracking has one.
    fn current_device_pose(&self, at: Instant) -> Option<DevicePose>;

    fn is_running(&self) -> bool {
        true
    }
}
