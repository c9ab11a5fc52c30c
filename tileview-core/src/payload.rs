//! Tile payload normalization.
//!
//! The tile service answers either with a TopoJSON topology holding one
//! object named `data`, or with plain GeoJSON.  Both shapes are reduced to a
//! flat feature list before they reach the cache.

use serde_json::Value;
use thiserror::Error;

use crate::geometry::{Feature, FeatureCollection, Geometry, GEOMETRY_TYPES};
use crate::topojson::{Topology, TopologyError};

/// Object name the tile service uses inside each topology.
pub const TOPOLOGY_OBJECT: &str = "data";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("unexpected tile payload shape: {0}")]
    UnexpectedShape(String),
    #[error("invalid {kind} payload: {source}")]
    Invalid {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

pub fn normalize_payload(value: Value) -> Result<Vec<Feature>, PayloadError> {
    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_string(),
        None if value.is_object() => {
            return Err(PayloadError::UnexpectedShape("object without a type".into()))
        }
        None => return Err(PayloadError::UnexpectedShape(json_kind(&value).into())),
    };

    match kind.as_str() {
        "Topology" => {
            let topology: Topology = parse(&kind, value)?;
            Ok(topology.features(TOPOLOGY_OBJECT)?)
        }
        "FeatureCollection" => {
            let collection: FeatureCollection = parse(&kind, value)?;
            Ok(collection.features)
        }
        "Feature" => Ok(vec![parse(&kind, value)?]),
        k if GEOMETRY_TYPES.contains(&k) => {
            let geometry: Geometry = parse(&kind, value)?;
            Ok(vec![Feature::from_geometry(geometry)])
        }
        other => Err(PayloadError::UnexpectedShape(format!("type '{other}'"))),
    }
}

fn parse<T: serde::de::DeserializeOwned>(kind: &str, value: Value) -> Result<T, PayloadError> {
    serde_json::from_value(value).map_err(|source| PayloadError::Invalid {
        kind: kind.to_string(),
        source,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
