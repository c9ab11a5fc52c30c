use reqwest::Url;
use serde::de::DeserializeOwned;
use tileview_core::{normalize_payload, BoundingBox, Feature, FeatureCollection};

use crate::types::{ClientError, TileId, BOUNDARIES_PATH, FIND_TILES_PATH};

/// Parse and normalize a service origin such as `http://127.0.0.1:8000`.
pub fn parse_origin(origin: &str) -> Result<Url, ClientError> {
    let url = Url::parse(origin.trim()).map_err(|e| ClientError::Origin {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Origin {
            origin: origin.to_string(),
            message: "origin cannot carry a path".into(),
        });
    }
    Ok(url)
}

/// `origin` with one more path segment appended (percent-encoded as needed).
pub fn endpoint(origin: &Url, segment: &str) -> Url {
    let mut url = origin.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(segment);
    }
    url
}

pub fn tile_url(origin: &Url, id: &TileId) -> Url {
    endpoint(origin, id.as_str())
}

/// Send a request and parse the JSON body of a successful response.
async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    url: &Url,
) -> Result<T, ClientError> {
    let resp = request.send().await.map_err(|source| ClientError::Request {
        url: url.to_string(),
        source,
    })?;

    if !resp.status().is_success() {
        return Err(ClientError::Status {
            status: resp.status(),
            url: url.to_string(),
        });
    }

    let body = resp.bytes().await.map_err(|source| ClientError::Request {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Ask the catalog which tiles intersect `bounds`.
pub async fn find_tiles(
    client: &reqwest::Client,
    origin: &Url,
    bounds: &BoundingBox,
) -> Result<Vec<TileId>, ClientError> {
    let url = endpoint(origin, FIND_TILES_PATH);
    let ids: Vec<TileId> = send_json(client.post(url.clone()).json(bounds), &url).await?;
    log::info!("Found {} tiles to load", ids.len());
    Ok(ids)
}

/// Download one tile and flatten it into features.
pub async fn fetch_tile(
    client: &reqwest::Client,
    origin: &Url,
    id: &TileId,
) -> Result<Vec<Feature>, ClientError> {
    let url = tile_url(origin, id);
    log::debug!("Loading tile: {id}");
    let body: serde_json::Value = send_json(client.get(url.clone()), &url).await?;
    normalize_payload(body).map_err(|source| ClientError::Payload { id: id.clone(), source })
}

/// Download the tile boundary overlay.
pub async fn fetch_boundaries(
    client: &reqwest::Client,
    origin: &Url,
) -> Result<FeatureCollection, ClientError> {
    let url = endpoint(origin, BOUNDARIES_PATH);
    let boundaries: FeatureCollection = send_json(client.get(url.clone()), &url).await?;
    log::info!("Boundaries loaded: {} features", boundaries.len());
    Ok(boundaries)
}
