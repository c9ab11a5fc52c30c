use std::rc::Rc;

use tile_lib::{ClientError, TileClient, TileId};
use tileview_core::{BoundingBox, Feature, FeatureCollection};

/// The remote side of the tile manager: tile resolution, tile download and
/// the boundary overlay.
///
/// Futures are polled on a single-threaded local task set, so
/// implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait TileService {
    type Error: std::error::Error + 'static;

    /// Tile ids intersecting `bounds`.
    async fn find_tiles(&self, bounds: &BoundingBox) -> Result<Vec<TileId>, Self::Error>;

    /// One tile, already flattened into features.
    async fn fetch_tile(&self, id: &TileId) -> Result<Vec<Feature>, Self::Error>;

    async fn fetch_boundaries(&self) -> Result<FeatureCollection, Self::Error>;
}

impl TileService for TileClient {
    type Error = ClientError;

    async fn find_tiles(&self, bounds: &BoundingBox) -> Result<Vec<TileId>, ClientError> {
        TileClient::find_tiles(self, bounds).await
    }

    async fn fetch_tile(&self, id: &TileId) -> Result<Vec<Feature>, ClientError> {
        TileClient::fetch_tile(self, id).await
    }

    async fn fetch_boundaries(&self) -> Result<FeatureCollection, ClientError> {
        TileClient::fetch_boundaries(self).await
    }
}

impl<T: TileService> TileService for Rc<T> {
    type Error = T::Error;

    async fn find_tiles(&self, bounds: &BoundingBox) -> Result<Vec<TileId>, T::Error> {
        (**self).find_tiles(bounds).await
    }

    async fn fetch_tile(&self, id: &TileId) -> Result<Vec<Feature>, T::Error> {
        (**self).fetch_tile(id).await
    }

    async fn fetch_boundaries(&self) -> Result<FeatureCollection, T::Error> {
        (**self).fetch_boundaries().await
    }
}
