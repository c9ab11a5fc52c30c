pub mod cache;
pub mod fetch_queue;
pub mod reconcile;

pub use cache::TileCache;
pub use fetch_queue::{FetchQueue, QueueStats};
pub use reconcile::{reconcile, Reconciliation};
