//! Engine configuration
//!
//! Every section and field has a default, so an empty or partial TOML file is
//! valid:
//!
//! ```toml
//! [loops]
//! device_pose_hz = 60.0
//!
//! [persistence]
//! file = "/var/lib/placement/anchors.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::persistence::AnchorTableStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub loops: LoopRates,
    pub placement: PlacementSettings,
    pub anchoring: AnchoringSettings,
    pub persistence: PersistenceSettings,
}

/// Frequencies of the periodic activities, in Hz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopRates {
    pub device_pose_hz: f64,
    pub drift_check_hz: f64,
    pub settle_check_hz: f64,
}

impl Default for LoopRates {
    fn default() -> Self {
        Self {
            device_pose_hz: 90.0,
            drift_check_hz: 10.0,
            settle_check_hz: 2.0,
        }
    }
}

impl LoopRates {
    pub fn device_pose_period(&self) -> Duration {
        period(self.device_pose_hz)
    }

    pub fn drift_check_period(&self) -> Duration {
        period(self.drift_check_hz)
    }

    pub fn settle_check_period(&self) -> Duration {
        period(self.settle_check_hz)
    }
}

fn period(hz: f64) -> Duration {
    Duration::from_secs_f64(1.0 / hz)
}

/// Distances are in metres, angles in degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSettings {
    /// Downward tilt of the placement ray relative to the device forward axis
    pub raycast_tilt_degrees: f32,
    pub raycast_min_distance: f32,
    pub raycast_max_distance: f32,
    /// Lift above the hit surface
    pub surface_clearance: f32,
    pub fallback_forward_distance: f32,
    pub fallback_downward_offset: f32,
    /// Max vertical gap for a dragged object to snap onto a plane
    pub drag_snap_distance: f32,
    pub highlight_max_distance: f32,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            raycast_tilt_degrees: 15.0,
            raycast_min_distance: 0.2,
            raycast_max_distance: 3.0,
            surface_clearance: 0.01,
            fallback_forward_distance: 0.5,
            fallback_downward_offset: 0.3,
            drag_snap_distance: 0.04,
            highlight_max_distance: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchoringSettings {
    /// Distance that counts as drift away from an anchor, and the movement
    /// below which a moving object counts as settled
    pub drift_threshold: f32,
}

impl Default for AnchoringSettings {
    fn default() -> Self {
        Self {
            drift_threshold: 0.001,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Anchor table location; the platform data directory when unset
    pub file: Option<PathBuf>,
}

impl PersistenceSettings {
    /// Store for the configured file, else the platform data directory.
    /// Without either, placements are not persisted for this session.
    pub fn store(&self) -> AnchorTableStore {
        if let Some(path) = &self.file {
            return AnchorTableStore::new(path);
        }
        AnchorTableStore::at_default_location().unwrap_or_else(|err| {
            warn!(error = %err, "Anchor table will not be persisted");
            AnchorTableStore::unavailable()
        })
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("invalid engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("loops.device_pose_hz", self.loops.device_pose_hz),
            ("loops.drift_check_hz", self.loops.drift_check_hz),
            ("loops.settle_check_hz", self.loops.settle_check_hz),
        ];
        for (name, hz) in rates {
            if !(hz.is_finite() && hz > 0.0) {
                bail!("{name} must be a positive frequency, got {hz}");
            }
        }

        let placement = &self.placement;
        if placement.raycast_min_distance < 0.0
            || placement.raycast_max_distance <= placement.raycast_min_distance
        {
            bail!(
                "placement raycast range [{}, {}] is empty",
                placement.raycast_min_distance,
                placement.raycast_max_distance
            );
        }
        if placement.drag_snap_distance < 0.0 {
            bail!("placement.drag_snap_distance must not be negative");
        }
        let threshold = self.anchoring.drift_threshold;
        if threshold.is_nan() || threshold <= 0.0 {
            bail!("anchoring.drift_threshold must be positive");
        }
        Ok(())
    }
}
