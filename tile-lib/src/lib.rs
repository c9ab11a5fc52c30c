pub mod api;
pub mod client;
pub mod types;

pub use client::TileClient;
pub use types::*;
