//! Tile cache: which tiles are pending or loaded, and their features.
//!
//! Only `Pending` and `Loaded` entries are stored.  Deleting an entry hands
//! it back stamped with its terminal state (`Discarded` or `Evicted`); a tile
//! that comes back into view later starts over as a fresh `Pending` entry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tileview_core::Feature;

use crate::types::{TileEntry, TileId, TileStatus};

#[derive(Debug, Default)]
pub struct TileCache {
    entries: HashMap<TileId, TileEntry>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, id: &TileId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &TileId) -> Option<&TileEntry> {
        self.entries.get(id)
    }

    pub fn is_pending(&self, id: &TileId) -> bool {
        self.entries.get(id).is_some_and(|e| e.status == TileStatus::Pending)
    }

    /// Start tracking `id` as pending.  Returns `false` if it is already present.
    pub fn insert_pending(&mut self, id: &TileId) -> bool {
        if self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(id.clone(), TileEntry::pending(id.clone()));
        true
    }

    /// Commit fetched features.  Only a pending entry accepts them; anything
    /// else means the tile stopped being wanted while it was in flight.
    pub fn put(&mut self, id: &TileId, features: Arc<Vec<Feature>>) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if entry.status == TileStatus::Pending => {
                entry.status = TileStatus::Loaded;
                entry.features = Some(features);
                true
            }
            _ => false,
        }
    }

    /// Remove `id`, returning the entry in its terminal state.
    pub fn delete(&mut self, id: &TileId) -> Option<TileEntry> {
        let mut entry = self.entries.remove(id)?;
        entry.status = match entry.status {
            TileStatus::Pending => TileStatus::Discarded,
            _ => TileStatus::Evicted,
        };
        Some(entry)
    }

    /// Snapshot of every tracked id, pending or loaded.
    pub fn keys(&self) -> HashSet<TileId> {
        self.entries.keys().cloned().collect()
    }

    /// Loaded ids in sorted order.
    pub fn loaded_ids(&self) -> Vec<TileId> {
        let mut ids: Vec<TileId> = self
            .entries
            .values()
            .filter(|e| e.is_loaded())
            .map(|e| e.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_loaded()).count()
    }

    pub fn feature_count(&self) -> usize {
        self.entries.values().map(|e| e.feature_count()).sum()
    }

    /// Drop everything, returning the removed ids.
    pub fn clear(&mut self) -> Vec<TileId> {
        self.entries.drain().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileview_core::Geometry;

    fn features(n: usize) -> Arc<Vec<Feature>> {
        Arc::new(
            (0..n)
                .map(|i| Feature::from_geometry(Geometry::Point { coordinates: vec![i as f64, 0.0] }))
                .collect(),
        )
    }

    #[test]
    fn test_pending_then_loaded() {
        let mut cache = TileCache::new();
        let id = TileId::from("a");
        assert!(!cache.has(&id));
        assert!(cache.insert_pending(&id));
        assert!(!cache.insert_pending(&id));
        assert!(cache.is_pending(&id));
        assert_eq!(cache.loaded_count(), 0);

        assert!(cache.put(&id, features(3)));
        let entry = cache.get(&id).unwrap();
        assert_eq!(entry.status, TileStatus::Loaded);
        assert_eq!(entry.feature_count(), 3);
        assert_eq!(cache.loaded_ids(), vec![id.clone()]);

        // A second commit for the same tile is refused.
        assert!(!cache.put(&id, features(1)));
        assert_eq!(cache.feature_count(), 3);
    }

    #[test]
    fn test_put_without_pending_entry_is_refused() {
        let mut cache = TileCache::new();
        assert!(!cache.put(&TileId::from("ghost"), features(1)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_delete_stamps_terminal_state() {
        let mut cache = TileCache::new();
        let (a, b) = (TileId::from("a"), TileId::from("b"));
        cache.insert_pending(&a);
        cache.insert_pending(&b);
        cache.put(&a, features(1));

        assert_eq!(cache.delete(&a).map(|e| e.status), Some(TileStatus::Evicted));
        assert_eq!(cache.delete(&b).map(|e| e.status), Some(TileStatus::Discarded));
        assert!(cache.delete(&a).is_none());

        // Late data for a discarded tile never comes back.
        assert!(!cache.put(&b, features(1)));
        assert!(!cache.has(&b));
    }

    #[test]
    fn test_returning_tile_starts_fresh() {
        let mut cache = TileCache::new();
        let id = TileId::from("a");
        cache.insert_pending(&id);
        cache.put(&id, features(2));
        cache.delete(&id);
        assert!(cache.insert_pending(&id));
        let entry = cache.get(&id).unwrap();
        assert_eq!(entry.status, TileStatus::Pending);
        assert!(entry.features.is_none());
    }

    #[test]
    fn test_keys_include_pending_and_clear_empties() {
        let mut cache = TileCache::new();
        cache.insert_pending(&TileId::from("a"));
        cache.insert_pending(&TileId::from("b"));
        cache.put(&TileId::from("a"), features(1));
        let keys = cache.keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&TileId::from("b")));

        let mut cleared = cache.clear();
        cleared.sort();
        assert_eq!(cleared, vec![TileId::from("a"), TileId::from("b")]);
        assert_eq!(cache.len(), 0);
    }
}
