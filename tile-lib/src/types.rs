use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tileview_core::PayloadError;

/// Opaque name of a tile resource on the tile service.
///
/// Used as-is for cache and render-group keys and as the final path segment
/// of the tile's URL.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(String);

impl TileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid origin '{origin}': {message}")]
    Origin { origin: String, message: String },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} from {url}")]
    Status { status: reqwest::StatusCode, url: String },
    #[error("failed to parse JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tile {id}: {source}")]
    Payload {
        id: TileId,
        #[source]
        source: PayloadError,
    },
}

/// Boundary feature collection endpoint.
pub const BOUNDARIES_PATH: &str = "tile_boundaries.geojson";
/// Tile resolver endpoint.
pub const FIND_TILES_PATH: &str = "find_tiles";
/// Default local tile server.
pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";
