pub mod config;
pub mod debounce;
pub mod manager;
pub mod render;
pub mod service;
pub mod state;
pub mod tiles;
pub mod types;
pub mod viewport;

#[cfg(test)]
mod test_support;

pub use config::{BelowThresholdPolicy, ConfigError, ManagerConfig};
pub use debounce::DebounceGate;
pub use manager::{CycleOutcome, Lifecycle, TileManager};
pub use render::{BoundaryLabel, RenderGroup, TileRenderer};
pub use service::TileService;
pub use tiles::{reconcile, QueueStats, Reconciliation, TileCache};
pub use types::{TileEntry, TileId, TileStatus, Viewport};
pub use viewport::ViewportMonitor;
