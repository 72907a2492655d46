//! Error types for the placement engine.
//!
//! Failures are grouped by the collaborator that produced them. Only
//! [`PlacementError::Invariant`] is fatal; every other variant is recovered
//! locally by skipping a cycle, discarding an object or logging.

use std::path::PathBuf;

use crate::object::ObjectId;
use crate::scene::NodeId;
use crate::tracking::AnchorId;

/// Failures reported by the spatial-tracking session.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("tracking session is not running")]
    NotRunning,

    #[error("anchor request rejected: {0}")]
    Rejected(String),

    #[error("anchor {0} is unknown to the tracking session")]
    UnknownAnchor(AnchorId),
}

/// Failures reported by the scene/collision collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("collision shape generation failed: {0}")]
    ShapeGeneration(String),
}

/// Failures reading or writing the persisted anchor table.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read anchor table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode anchor table {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode anchor table: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write anchor table {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no data directory is available for the anchor table")]
    NoDataDirectory,
}

/// Top-level error for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("object {0} does not exist")]
    UnknownObject(ObjectId),

    /// A precondition that upstream construction should have established
    /// does not hold.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl PlacementError {
    /// Whether the engine must stop instead of skipping the failed step.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlacementError::Invariant(_))
    }
}

pub type Result<T> = std::result::Result<T, PlacementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariant_violations_are_fatal() {
        assert!(PlacementError::Invariant("missing shapes".into()).is_fatal());
        assert!(!PlacementError::from(TrackingError::NotRunning).is_fatal());
        assert!(!PlacementError::from(PersistenceError::NoDataDirectory).is_fatal());
        assert!(!PlacementError::UnknownObject(ObjectId::new(3)).is_fatal());
    }

    #[test]
    fn tracking_errors_pass_through_display() {
        let err = PlacementError::from(TrackingError::Rejected("quota".into()));
        assert_eq!(err.to_string(), "anchor request rejected: quota");
    }
}
