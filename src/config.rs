//! Construction-time settings for a `TileManager`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_lib::{api, ClientError, DEFAULT_ORIGIN};

/// Tile logic engages at or above this zoom magnitude (`log2(scale)`).
pub const ZOOM_THRESHOLD: f64 = 10.0;
/// Quiet period before a burst of viewport changes is resolved.
pub const DEBOUNCE_MS: u64 = 300;
/// Simultaneous tile fetches.
pub const MAX_CONCURRENT_OPERATIONS: usize = 4;

/// What happens to loaded tiles when the zoom drops below the threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BelowThresholdPolicy {
    /// Keep them until the next reconciliation above the threshold replaces them.
    #[default]
    Retain,
    /// Drop them from the cache and render group on the way out.
    Evict,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
    #[error(transparent)]
    Origin(#[from] ClientError),
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid { field, message: message.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Base URL of the tile service.
    pub origin: String,
    pub zoom_threshold: f64,
    pub debounce_ms: u64,
    pub max_concurrent: usize,
    /// Screen size the projection is fitted to, in pixels.
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Allowed range of the zoom transform's scale factor.
    pub min_scale: f64,
    pub max_scale: f64,
    pub below_threshold: BelowThresholdPolicy,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            zoom_threshold: ZOOM_THRESHOLD,
            debounce_ms: DEBOUNCE_MS,
            max_concurrent: MAX_CONCURRENT_OPERATIONS,
            viewport_width: 1280.0,
            viewport_height: 800.0,
            min_scale: 1.0,
            max_scale: 2048.0,
            below_threshold: BelowThresholdPolicy::Retain,
        }
    }
}

impl ManagerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::invalid("max_concurrent", "must be at least 1"));
        }
        if !(self.viewport_width > 0.0 && self.viewport_height > 0.0) {
            return Err(ConfigError::invalid(
                "viewport size",
                format!("{}x{} is not a positive size", self.viewport_width, self.viewport_height),
            ));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale) {
            return Err(ConfigError::invalid(
                "scale extent",
                format!("[{}, {}] is not a positive range", self.min_scale, self.max_scale),
            ));
        }
        if !self.zoom_threshold.is_finite() {
            return Err(ConfigError::invalid("zoom_threshold", "must be finite"));
        }
        api::parse_origin(&self.origin)?;
        Ok(())
    }
}
