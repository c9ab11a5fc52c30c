use std::cell::{Cell, RefCell};
use std::sync::Arc;

use tileview_core::Feature;

use crate::render::TileRenderer;
use crate::tiles::TileCache;
use crate::types::{TileEntry, TileId};

/// Cache and render group, shared by the manager and its fetch tasks.
///
/// Everything runs on one local task set, so plain `RefCell`s suffice as
/// long as no borrow is held across an `.await`.
pub struct TileState<R> {
    pub cache: RefCell<TileCache>,
    pub renderer: RefCell<R>,
    closed: Cell<bool>,
}

impl<R: TileRenderer> TileState<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            cache: RefCell::new(TileCache::new()),
            renderer: RefCell::new(renderer),
            closed: Cell::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Store and draw a fetched tile if it is still pending.
    pub fn commit(&self, id: &TileId, features: Vec<Feature>) -> bool {
        if self.closed.get() {
            return false;
        }
        let features = Arc::new(features);
        if !self.cache.borrow_mut().put(id, features.clone()) {
            return false;
        }
        self.renderer.borrow_mut().draw_tile(id, features);
        true
    }

    /// Forget a pending tile whose fetch failed so a later cycle asks again.
    pub fn abandon(&self, id: &TileId) {
        let mut cache = self.cache.borrow_mut();
        if cache.is_pending(id) {
            cache.delete(id);
        }
    }

    /// Remove a tile from the render group and the cache.
    pub fn evict(&self, id: &TileId) -> Option<TileEntry> {
        self.renderer.borrow_mut().remove_tile(id);
        self.cache.borrow_mut().delete(id)
    }

    pub fn evict_all(&self) -> usize {
        let ids = self.cache.borrow_mut().clear();
        let mut renderer = self.renderer.borrow_mut();
        for id in &ids {
            renderer.remove_tile(id);
        }
        ids.len()
    }

    /// Clear everything and refuse further commits.
    pub fn close(&self) {
        self.closed.set(true);
        self.cache.borrow_mut().clear();
        self.renderer.borrow_mut().clear();
    }
}
