use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tileview_core::{BoundingBox, Feature};

pub use tile_lib::TileId;

/// Visible geographic box and zoom magnitude, derived from the current
/// pan/zoom transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: BoundingBox,
    /// `log2` of the transform scale.
    pub zoom: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileStatus {
    /// Acquired by a reconciliation, fetch not yet committed.
    Pending,
    /// Fetched and drawn.
    Loaded,
    /// Was loaded, then dropped by a later reconciliation.
    Evicted,
    /// Dropped while still pending; any late fetch result is thrown away.
    Discarded,
}

#[derive(Clone, Debug)]
pub struct TileEntry {
    pub id: TileId,
    pub status: TileStatus,
    pub features: Option<Arc<Vec<Feature>>>,
}

impl TileEntry {
    pub fn pending(id: TileId) -> Self {
        Self { id, status: TileStatus::Pending, features: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.status == TileStatus::Loaded
    }

    pub fn feature_count(&self) -> usize {
        self.features.as_ref().map_or(0, |f| f.len())
    }
}
