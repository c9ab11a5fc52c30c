use std::time::Duration;

use reqwest::Url;
use tileview_core::{BoundingBox, Feature, FeatureCollection};

use crate::api;
use crate::types::{ClientError, TileId};

/// A `reqwest::Client` bound to one tile service origin.
#[derive(Clone, Debug)]
pub struct TileClient {
    client: reqwest::Client,
    origin: Url,
}

impl TileClient {
    pub fn new(origin: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), origin)
    }

    /// Like `new`, with a per-request timeout.
    pub fn with_timeout(origin: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Request {
                url: origin.to_string(),
                source,
            })?;
        Self::with_client(client, origin)
    }

    pub fn with_client(client: reqwest::Client, origin: &str) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            origin: api::parse_origin(origin)?,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub async fn find_tiles(&self, bounds: &BoundingBox) -> Result<Vec<TileId>, ClientError> {
        api::find_tiles(&self.client, &self.origin, bounds).await
    }

    pub async fn fetch_tile(&self, id: &TileId) -> Result<Vec<Feature>, ClientError> {
        api::fetch_tile(&self.client, &self.origin, id).await
    }

    pub async fn fetch_boundaries(&self) -> Result<FeatureCollection, ClientError> {
        api::fetch_boundaries(&self.client, &self.origin).await
    }
}
