//! spatial-placement: anchored object placement for spatial-tracking apps
//!
//! This crate provides the engine behind placing 3D models in a room:
//! - Plane registry with collision proxies for detected surfaces
//! - Placement pose from a tilted device raycast, with a fallback pose
//! - Drag resolution with snapping onto horizontal planes
//! - World-anchor lifecycle: anchored, pending, moving, re-anchored on settle
//! - Persisted anchor table restoring placements across sessions
//!
//! The tracking session and the scene graph are collaborators behind the
//! [`TrackingSession`] and [`SceneGraph`] traits.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod object;
pub mod persistence;
pub mod placement;
pub mod plane;
pub mod scene;
pub mod test_utils;
pub mod tracking;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{EngineCommand, EngineHandle, PlacementEngine};
pub use error::{PlacementError, Result};
pub use object::{Lifecycle, ModelCatalog, ModelDescriptor, ObjectId, PlaceableObject, PlacedObject};
pub use persistence::{AnchorManager, AnchorTableStore};
pub use placement::{PlacementController, PlacementState};
pub use plane::PlaneRegistry;
pub use scene::{CollisionGroup, NodeId, SceneGraph};
pub use tracking::{AnchorId, TrackingSession};
pub use spatial_placement_geometry as geometry;
