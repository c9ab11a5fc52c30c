use serde::{Deserialize, Serialize};

/// Longitude/latitude pair in degrees.
pub type LonLat = [f64; 2];

/// Axis-aligned geographic box in degrees.
///
/// Serializes as `{"west":…,"east":…,"north":…,"south":…}`, which is also the
/// request body of the tile service's `/find_tiles` endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
}

impl BoundingBox {
    pub fn new(west: f64, east: f64, north: f64, south: f64) -> Self {
        Self { west, east, north, south }
    }

    /// Box spanning two arbitrary corners.
    pub fn from_corners(a: LonLat, b: LonLat) -> Self {
        Self {
            west: a[0].min(b[0]),
            east: a[0].max(b[0]),
            north: a[1].max(b[1]),
            south: a[1].min(b[1]),
        }
    }

    /// Degenerate box covering a single point.
    pub fn point(p: LonLat) -> Self {
        Self::from_corners(p, p)
    }

    /// Grow the box to include `p`.
    pub fn extend(&mut self, p: LonLat) {
        self.west = self.west.min(p[0]);
        self.east = self.east.max(p[0]);
        self.south = self.south.min(p[1]);
        self.north = self.north.max(p[1]);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            west: self.west.min(other.west),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
            south: self.south.min(other.south),
        }
    }

    /// Closed-interval overlap test; boxes that only touch count as intersecting.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.west <= other.east
            && other.west <= self.east
            && self.south <= other.north
            && other.south <= self.north
    }

    pub fn contains(&self, p: LonLat) -> bool {
        p[0] >= self.west && p[0] <= self.east && p[1] >= self.south && p[1] <= self.north
    }

    pub fn center(&self) -> LonLat {
        [(self.west + self.east) / 2.0, (self.north + self.south) / 2.0]
    }

    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// All edges finite and ordered (`west <= east`, `south <= north`).
    pub fn is_valid(&self) -> bool {
        [self.west, self.east, self.north, self.south]
            .iter()
            .all(|v| v.is_finite())
            && self.west <= self.east
            && self.south <= self.north
    }
}
