//! Scripted in-process tile service for tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde_json::{json, Value};
use tileview_core::{normalize_payload, BoundingBox, Feature, FeatureCollection};

use crate::service::TileService;
use crate::types::TileId;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub String);

pub fn ids(names: &[&str]) -> Vec<TileId> {
    names.iter().map(|n| TileId::from(*n)).collect()
}

#[derive(Default)]
pub struct FakeService {
    tiles: RefCell<Vec<TileId>>,
    fail_resolve: Cell<bool>,
    resolve_delay: Cell<Duration>,
    fetch_delay: Cell<Duration>,
    slow: RefCell<HashMap<TileId, Duration>>,
    failing: RefCell<HashSet<TileId>>,
    malformed: RefCell<HashSet<TileId>>,
    boundaries: RefCell<Option<FeatureCollection>>,
    resolver_calls: RefCell<Vec<BoundingBox>>,
    started: RefCell<Vec<TileId>>,
    active: Cell<usize>,
    peak: Cell<usize>,
}

impl FakeService {
    pub fn new() -> Self {
        let service = Self::default();
        service.fetch_delay.set(Duration::from_millis(100));
        service
    }

    /// What the resolver answers from now on.
    pub fn set_tiles(&self, names: &[&str]) {
        *self.tiles.borrow_mut() = ids(names);
    }

    pub fn fail_resolve(&self, fail: bool) {
        self.fail_resolve.set(fail);
    }

    pub fn set_resolve_delay(&self, delay: Duration) {
        self.resolve_delay.set(delay);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.fetch_delay.set(delay);
    }

    pub fn set_slow(&self, name: &str, delay: Duration) {
        self.slow.borrow_mut().insert(TileId::from(name), delay);
    }

    pub fn set_failing(&self, name: &str) {
        self.failing.borrow_mut().insert(TileId::from(name));
    }

    pub fn set_malformed(&self, name: &str) {
        self.malformed.borrow_mut().insert(TileId::from(name));
    }

    pub fn set_boundaries(&self, boundaries: FeatureCollection) {
        *self.boundaries.borrow_mut() = Some(boundaries);
    }

    pub fn resolver_calls(&self) -> Vec<BoundingBox> {
        self.resolver_calls.borrow().clone()
    }

    /// Fetches in the order they started.
    pub fn started(&self) -> Vec<TileId> {
        self.started.borrow().clone()
    }

    pub fn active(&self) -> usize {
        self.active.get()
    }

    /// Most fetches ever awaiting at once.
    pub fn peak(&self) -> usize {
        self.peak.get()
    }

    fn payload(&self, id: &TileId) -> Value {
        if self.malformed.borrow().contains(id) {
            return json!({"type": "Sphere"});
        }
        json!({
            "type": "Topology",
            "arcs": [[[0.0, 0.0], [1.0, 1.0]]],
            "objects": {"data": {"type": "GeometryCollection", "geometries": [
                {"type": "LineString", "arcs": [0], "properties": {"tile": id.as_str()}}
            ]}}
        })
    }
}

impl TileService for FakeService {
    type Error = FakeError;

    async fn find_tiles(&self, bounds: &BoundingBox) -> Result<Vec<TileId>, FakeError> {
        self.resolver_calls.borrow_mut().push(*bounds);
        let delay = self.resolve_delay.get();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_resolve.get() {
            return Err(FakeError("connection refused".into()));
        }
        Ok(self.tiles.borrow().clone())
    }

    async fn fetch_tile(&self, id: &TileId) -> Result<Vec<Feature>, FakeError> {
        self.started.borrow_mut().push(id.clone());
        self.active.set(self.active.get() + 1);
        self.peak.set(self.peak.get().max(self.active.get()));

        let delay = self.slow.borrow().get(id).copied().unwrap_or(self.fetch_delay.get());
        tokio::time::sleep(delay).await;
        self.active.set(self.active.get() - 1);

        if self.failing.borrow().contains(id) {
            return Err(FakeError(format!("HTTP 503 for {id}")));
        }
        normalize_payload(self.payload(id)).map_err(|e| FakeError(e.to_string()))
    }

    async fn fetch_boundaries(&self) -> Result<FeatureCollection, FakeError> {
        self.boundaries
            .borrow()
            .clone()
            .ok_or_else(|| FakeError("HTTP 404 for tile_boundaries.geojson".into()))
    }
}
