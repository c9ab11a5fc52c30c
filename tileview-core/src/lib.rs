pub mod geo;
pub mod geometry;
pub mod index;
pub mod payload;
pub mod projection;
pub mod topojson;

pub use geo::{BoundingBox, LonLat};
pub use geometry::{Feature, FeatureCollection, Geometry};
pub use index::BoundaryIndex;
pub use payload::{normalize_payload, PayloadError};
pub use projection::{MercatorProjection, ZoomTransform};
pub use topojson::{Topology, TopologyError};
