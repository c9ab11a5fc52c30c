use std::collections::HashSet;

use crate::types::TileId;

/// Difference between the tiles a viewport needs and the tiles the cache holds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Cached but no longer resolved, sorted.
    pub evict: Vec<TileId>,
    /// Resolved but not cached, in resolver order.
    pub acquire: Vec<TileId>,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.evict.is_empty() && self.acquire.is_empty()
    }
}

/// `evict = cached − resolved`, `acquire = resolved − cached`.
pub fn reconcile(resolved: &[TileId], cached: &HashSet<TileId>) -> Reconciliation {
    let wanted: HashSet<&TileId> = resolved.iter().collect();

    let mut evict: Vec<TileId> = cached
        .iter()
        .filter(|id| !wanted.contains(id))
        .cloned()
        .collect();
    evict.sort();

    let mut seen = HashSet::with_capacity(resolved.len());
    let acquire = resolved
        .iter()
        .filter(|id| !cached.contains(*id) && seen.insert(*id))
        .cloned()
        .collect();

    Reconciliation { evict, acquire }
}
