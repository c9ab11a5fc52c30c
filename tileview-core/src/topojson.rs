//! TopoJSON → GeoJSON conversion.
//!
//! Arcs are decoded once per topology (delta + quantization transform when
//! present), then each geometry object stitches its arcs back into lines and
//! rings.  Negative arc indices address arc `!i` traversed in reverse.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::geometry::{Feature, Geometry, Position};

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("topology has no object named '{0}'")]
    MissingObject(String),
    #[error("unknown topology geometry type '{0}'")]
    UnknownType(String),
    #[error("arc index {index} out of range ({count} arcs)")]
    ArcIndex { index: i64, count: usize },
    #[error("malformed {kind} geometry: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuantizeTransform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

/// A geometry object as stored in `objects`; arcs and coordinates stay raw
/// JSON until the object's type says how deep they nest.
#[derive(Clone, Debug, Deserialize)]
pub struct TopoObject {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    #[serde(default)]
    arcs: Option<Value>,
    #[serde(default)]
    coordinates: Option<Value>,
    #[serde(default)]
    geometries: Vec<TopoObject>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<QuantizeTransform>,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    pub objects: BTreeMap<String, TopoObject>,
}

impl Topology {
    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Flatten the named object into features.  A top-level
    /// `GeometryCollection` yields one feature per member.
    pub fn features(&self, name: &str) -> Result<Vec<Feature>, TopologyError> {
        let object = self
            .objects
            .get(name)
            .ok_or_else(|| TopologyError::MissingObject(name.to_string()))?;
        let decoder = ArcDecoder::new(self);

        if object.kind.as_deref() == Some("GeometryCollection") {
            object
                .geometries
                .iter()
                .map(|g| decoder.feature(g))
                .collect()
        } else {
            Ok(vec![decoder.feature(object)?])
        }
    }
}

struct ArcDecoder<'a> {
    transform: Option<&'a QuantizeTransform>,
    arcs: Vec<Vec<Position>>,
}

impl<'a> ArcDecoder<'a> {
    fn new(topology: &'a Topology) -> Self {
        let transform = topology.transform.as_ref();
        let arcs = topology
            .arcs
            .iter()
            .map(|arc| decode_arc(arc, transform))
            .collect();
        Self { transform, arcs }
    }

    fn point(&self, raw: &[f64]) -> Position {
        let mut p = raw.to_vec();
        if let (Some(t), true) = (self.transform, p.len() >= 2) {
            p[0] = p[0] * t.scale[0] + t.translate[0];
            p[1] = p[1] * t.scale[1] + t.translate[1];
        }
        p
    }

    fn arc(&self, index: i64, points: &mut Vec<Position>) -> Result<(), TopologyError> {
        let reversed = index < 0;
        let slot = if reversed { !index } else { index };
        let arc = usize::try_from(slot)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .ok_or(TopologyError::ArcIndex { index, count: self.arcs.len() })?;

        // Consecutive arcs share their junction point.
        if !points.is_empty() {
            points.pop();
        }
        if reversed {
            points.extend(arc.iter().rev().cloned());
        } else {
            points.extend(arc.iter().cloned());
        }
        Ok(())
    }

    fn line(&self, arcs: &[i64]) -> Result<Vec<Position>, TopologyError> {
        let mut points = Vec::new();
        for &i in arcs {
            self.arc(i, &mut points)?;
        }
        if points.len() == 1 {
            points.push(points[0].clone());
        }
        Ok(points)
    }

    fn ring(&self, arcs: &[i64]) -> Result<Vec<Position>, TopologyError> {
        let mut points = self.line(arcs)?;
        while !points.is_empty() && points.len() < 4 {
            points.push(points[0].clone());
        }
        Ok(points)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Vec<Vec<Position>>, TopologyError> {
        rings.iter().map(|r| self.ring(r)).collect()
    }

    fn feature(&self, object: &TopoObject) -> Result<Feature, TopologyError> {
        let geometry = self.geometry(object)?;
        Ok(Feature::new(geometry, object.properties.clone()).with_id(object.id.clone()))
    }

    fn geometry(&self, object: &TopoObject) -> Result<Option<Geometry>, TopologyError> {
        let Some(kind) = object.kind.as_deref() else {
            return Ok(None);
        };
        let geometry = match kind {
            "Point" => {
                let raw: Vec<f64> = raw_field(kind, &object.coordinates)?;
                Geometry::Point { coordinates: self.point(&raw) }
            }
            "MultiPoint" => {
                let raw: Vec<Vec<f64>> = raw_field(kind, &object.coordinates)?;
                Geometry::MultiPoint {
                    coordinates: raw.iter().map(|p| self.point(p)).collect(),
                }
            }
            "LineString" => {
                let arcs: Vec<i64> = raw_field(kind, &object.arcs)?;
                Geometry::LineString { coordinates: self.line(&arcs)? }
            }
            "MultiLineString" => {
                let arcs: Vec<Vec<i64>> = raw_field(kind, &object.arcs)?;
                Geometry::MultiLineString {
                    coordinates: arcs.iter().map(|a| self.line(a)).collect::<Result<_, _>>()?,
                }
            }
            "Polygon" => {
                let arcs: Vec<Vec<i64>> = raw_field(kind, &object.arcs)?;
                Geometry::Polygon { coordinates: self.polygon(&arcs)? }
            }
            "MultiPolygon" => {
                let arcs: Vec<Vec<Vec<i64>>> = raw_field(kind, &object.arcs)?;
                Geometry::MultiPolygon {
                    coordinates: arcs.iter().map(|p| self.polygon(p)).collect::<Result<_, _>>()?,
                }
            }
            "GeometryCollection" => {
                let mut geometries = Vec::with_capacity(object.geometries.len());
                for g in &object.geometries {
                    if let Some(g) = self.geometry(g)? {
                        geometries.push(g);
                    }
                }
                Geometry::GeometryCollection { geometries }
            }
            other => return Err(TopologyError::UnknownType(other.to_string())),
        };
        Ok(Some(geometry))
    }
}

/// Undo delta encoding and quantization for one arc.
fn decode_arc(arc: &[Vec<f64>], transform: Option<&QuantizeTransform>) -> Vec<Position> {
    let Some(t) = transform else {
        return arc.to_vec();
    };
    let (mut x, mut y) = (0.0, 0.0);
    arc.iter()
        .map(|p| {
            let mut out = p.clone();
            if p.len() >= 2 {
                x += p[0];
                y += p[1];
                out[0] = x * t.scale[0] + t.translate[0];
                out[1] = y * t.scale[1] + t.translate[1];
            }
            out
        })
        .collect()
}

fn raw_field<T: serde::de::DeserializeOwned>(
    kind: &str,
    value: &Option<Value>,
) -> Result<T, TopologyError> {
    serde_json::from_value(value.clone().unwrap_or(Value::Null)).map_err(|source| {
        TopologyError::Malformed { kind: kind.to_string(), source }
    })
}
