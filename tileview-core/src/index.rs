//! Envelope index over the tile boundary collection.
//!
//! Each boundary feature carries a `code` property naming its tile.  The
//! index answers "which tiles touch this box" without a round trip, using
//! each boundary's bounding box as its footprint.

use crate::geo::BoundingBox;
use crate::geometry::FeatureCollection;

/// File name pattern the tile server uses for road tiles.
pub const DEFAULT_TILE_TEMPLATE: &str = "tl_2023_01001_roads.{code}.topojson";

#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryEntry {
    pub code: String,
    pub bbox: BoundingBox,
}

#[derive(Clone, Debug, Default)]
pub struct BoundaryIndex {
    entries: Vec<BoundaryEntry>,
}

impl BoundaryIndex {
    /// Features without geometry are skipped; a missing `code` becomes `"unknown"`.
    pub fn from_features(collection: &FeatureCollection) -> Self {
        let mut entries = Vec::with_capacity(collection.len());
        for feature in &collection.features {
            let code = feature
                .property_string("code")
                .unwrap_or_else(|| "unknown".to_string());
            match feature.bbox() {
                Some(bbox) => entries.push(BoundaryEntry { code, bbox }),
                None => log::debug!("Boundary {code} has no geometry, skipped"),
            }
        }
        log::info!("Indexed {} tile boundaries", entries.len());
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BoundaryEntry] {
        &self.entries
    }

    /// Codes whose envelope intersects `bounds`, sorted and deduplicated.
    pub fn intersecting(&self, bounds: &BoundingBox) -> Vec<String> {
        let mut codes: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.bbox.intersects(bounds))
            .map(|e| e.code.clone())
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }

    /// Tile names for `bounds`, substituting each code into `template`.
    pub fn tile_names(&self, bounds: &BoundingBox, template: &str) -> Vec<String> {
        self.intersecting(bounds)
            .into_iter()
            .map(|code| template.replace("{code}", &code))
            .collect()
    }

    /// Envelope of every boundary.
    pub fn extent(&self) -> Option<BoundingBox> {
        self.entries
            .iter()
            .map(|e| e.bbox)
            .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn boundaries() -> FeatureCollection {
        serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"code": "B2"},
                 "geometry": {"type": "Polygon", "coordinates": [[[1.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 0.0]]]}},
                {"type": "Feature", "properties": {"code": "A1"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]}},
                {"type": "Feature", "properties": {"code": "Z9"}, "geometry": null}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_index_skips_features_without_geometry() {
        let index = BoundaryIndex::from_features(&boundaries());
        assert_eq!(index.len(), 3);
        assert_eq!(index.entries()[2].code, "unknown");
        assert_eq!(index.extent(), Some(BoundingBox::new(0.0, 6.0, 6.0, 0.0)));
    }

    #[test]
    fn test_intersecting_is_sorted() {
        let index = BoundaryIndex::from_features(&boundaries());
        let hits = index.intersecting(&BoundingBox::new(0.5, 1.5, 0.5, 0.2));
        assert_eq!(hits, vec!["A1", "B2"]);
        assert!(index.intersecting(&BoundingBox::new(10.0, 11.0, 11.0, 10.0)).is_empty());
    }

    #[test]
    fn test_tile_names_apply_template() {
        let index = BoundaryIndex::from_features(&boundaries());
        let names = index.tile_names(&BoundingBox::new(0.1, 0.2, 0.2, 0.1), DEFAULT_TILE_TEMPLATE);
        assert_eq!(names, vec!["tl_2023_01001_roads.A1.topojson"]);
    }
}
