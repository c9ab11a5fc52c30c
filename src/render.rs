//! Render hook.
//!
//! The manager never draws anything itself; it tells a `TileRenderer` which
//! tiles appeared and disappeared.  `RenderGroup` is the in-memory renderer:
//! a typed map keyed by tile id plus the boundary overlay.

use std::collections::BTreeMap;
use std::sync::Arc;

use tileview_core::{Feature, FeatureCollection, LonLat, ZoomTransform};

use crate::types::TileId;

pub trait TileRenderer {
    /// The pan/zoom transform applied to the whole map group.
    fn set_transform(&mut self, _transform: &ZoomTransform) {}

    fn draw_boundaries(&mut self, _boundaries: &FeatureCollection) {}

    fn draw_tile(&mut self, id: &TileId, features: Arc<Vec<Feature>>);

    fn remove_tile(&mut self, id: &TileId);

    /// Drop every tile and overlay.
    fn clear(&mut self);
}

/// Label placed at the middle of a boundary's envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryLabel {
    pub code: String,
    pub anchor: LonLat,
}

#[derive(Debug, Default)]
pub struct RenderGroup {
    transform: ZoomTransform,
    tiles: BTreeMap<TileId, Arc<Vec<Feature>>>,
    boundaries: Vec<Feature>,
    labels: Vec<BoundaryLabel>,
    draws: usize,
    removals: usize,
}

impl RenderGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn has_tile(&self, id: &TileId) -> bool {
        self.tiles.contains_key(id)
    }

    pub fn tile(&self, id: &TileId) -> Option<&[Feature]> {
        self.tiles.get(id).map(|f| f.as_slice())
    }

    /// Drawn tile ids in order.
    pub fn tile_ids(&self) -> Vec<TileId> {
        self.tiles.keys().cloned().collect()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn feature_count(&self) -> usize {
        self.tiles.values().map(|f| f.len()).sum()
    }

    pub fn boundaries(&self) -> &[Feature] {
        &self.boundaries
    }

    pub fn labels(&self) -> &[BoundaryLabel] {
        &self.labels
    }

    /// Total `draw_tile` calls since creation.
    pub fn draws(&self) -> usize {
        self.draws
    }

    /// Total `remove_tile` calls that removed something.
    pub fn removals(&self) -> usize {
        self.removals
    }
}

impl TileRenderer for RenderGroup {
    fn set_transform(&mut self, transform: &ZoomTransform) {
        self.transform = *transform;
    }

    fn draw_boundaries(&mut self, boundaries: &FeatureCollection) {
        self.boundaries = boundaries.features.clone();
        self.labels = boundaries
            .features
            .iter()
            .filter_map(|f| {
                let code = f.property_string("code")?;
                let anchor = f.bbox()?.center();
                Some(BoundaryLabel { code, anchor })
            })
            .collect();
        log::info!("Boundaries rendered");
    }

    fn draw_tile(&mut self, id: &TileId, features: Arc<Vec<Feature>>) {
        self.draws += 1;
        self.tiles.insert(id.clone(), features);
    }

    fn remove_tile(&mut self, id: &TileId) {
        if self.tiles.remove(id).is_some() {
            self.removals += 1;
        }
    }

    fn clear(&mut self) {
        self.tiles.clear();
        self.boundaries.clear();
        self.labels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tileview_core::Geometry;

    #[test]
    fn test_boundary_labels_use_code_and_envelope_center() {
        let boundaries: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"code": "A1"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 0.0]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [9.0, 9.0]}}
            ]
        }))
        .unwrap();
        let mut group = RenderGroup::new();
        group.draw_boundaries(&boundaries);
        assert_eq!(group.boundaries().len(), 2);
        assert_eq!(group.labels(), &[BoundaryLabel { code: "A1".into(), anchor: [1.0, 1.0] }]);
    }

    #[test]
    fn test_tiles_are_keyed_by_raw_id() {
        let mut group = RenderGroup::new();
        let id = TileId::from("tl_2023_01001_roads.A-1.topojson");
        let features = Arc::new(vec![Feature::from_geometry(Geometry::Point { coordinates: vec![0.0, 0.0] })]);
        group.draw_tile(&id, features);
        assert!(group.has_tile(&id));
        assert_eq!(group.tile(&id).map(|f| f.len()), Some(1));
        group.remove_tile(&id);
        group.remove_tile(&id);
        assert!(!group.has_tile(&id));
        assert_eq!((group.draws(), group.removals()), (1, 1));
    }
}
