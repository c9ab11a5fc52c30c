//! Screen ↔ geographic conversion.
//!
//! `ZoomTransform` is the pan/zoom state of the map group (translate then
//! uniform scale, as d3-zoom reports it).  `MercatorProjection` maps between
//! the untransformed map plane and longitude/latitude.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use serde::{Deserialize, Serialize};

use crate::geo::LonLat;

/// Pan/zoom transform: screen = map * k + (x, y).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ZoomTransform {
    pub fn new(k: f64, x: f64, y: f64) -> Self {
        Self { k, x, y }
    }

    pub fn identity() -> Self {
        Self { k: 1.0, x: 0.0, y: 0.0 }
    }

    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [p[0] * self.k + self.x, p[1] * self.k + self.y]
    }

    pub fn invert(&self, p: [f64; 2]) -> [f64; 2] {
        [(p[0] - self.x) / self.k, (p[1] - self.y) / self.k]
    }

    /// Zoom magnitude, `log2(k)`.
    pub fn zoom_level(&self) -> f64 {
        self.k.log2()
    }

    /// Same translation with `k` clamped into `[min_scale, max_scale]`.
    pub fn clamped(&self, min_scale: f64, max_scale: f64) -> Self {
        Self { k: self.k.clamp(min_scale, max_scale), ..*self }
    }

    /// Transform showing `scale` with the map point `focus` at screen point `screen`.
    pub fn centered_on(scale: f64, focus: [f64; 2], screen: [f64; 2]) -> Self {
        Self {
            k: scale,
            x: screen[0] - focus[0] * scale,
            y: screen[1] - focus[1] * scale,
        }
    }
}

/// Spherical Mercator with d3 conventions (y grows downward on screen).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MercatorProjection {
    pub scale: f64,
    pub translate: [f64; 2],
}

impl MercatorProjection {
    pub fn new(scale: f64, translate: [f64; 2]) -> Self {
        Self { scale, translate }
    }

    /// Whole world across `width` pixels, centered in the viewport.
    pub fn for_viewport(width: f64, height: f64) -> Self {
        Self {
            scale: width / 2.0 / PI,
            translate: [width / 2.0, height / 2.0],
        }
    }

    pub fn project(&self, lonlat: LonLat) -> [f64; 2] {
        let lambda = lonlat[0].to_radians();
        let phi = lonlat[1].to_radians();
        let y = (FRAC_PI_4 + phi / 2.0).tan().ln();
        [
            self.translate[0] + self.scale * lambda,
            self.translate[1] - self.scale * y,
        ]
    }

    pub fn invert(&self, p: [f64; 2]) -> LonLat {
        let x = (p[0] - self.translate[0]) / self.scale;
        let y = (self.translate[1] - p[1]) / self.scale;
        let phi = 2.0 * y.exp().atan() - FRAC_PI_2;
        [x.to_degrees(), phi.to_degrees()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_projection_round_trip() {
        let proj = MercatorProjection::for_viewport(1280.0, 800.0);
        let p = proj.project([-86.9, 32.5]);
        let back = proj.invert(p);
        assert!(close(back[0], -86.9), "lon {}", back[0]);
        assert!(close(back[1], 32.5), "lat {}", back[1]);
    }

    #[test]
    fn test_viewport_center_is_null_island() {
        let proj = MercatorProjection::for_viewport(1000.0, 600.0);
        let c = proj.invert([500.0, 300.0]);
        assert!(close(c[0], 0.0));
        assert!(close(c[1], 0.0));
        // Left edge of the viewport is the antimeridian.
        let left = proj.invert([0.0, 300.0]);
        assert!(close(left[0], -180.0));
    }

    #[test]
    fn test_transform_invert_undoes_apply() {
        let t = ZoomTransform::new(4.0, -120.0, 35.0);
        let p = t.apply([10.0, 20.0]);
        assert_eq!(p, [-80.0, 115.0]);
        assert_eq!(t.invert(p), [10.0, 20.0]);
    }

    #[test]
    fn test_zoom_level_is_log2_scale() {
        assert_eq!(ZoomTransform::identity().zoom_level(), 0.0);
        assert_eq!(ZoomTransform::new(1024.0, 0.0, 0.0).zoom_level(), 10.0);
    }

    #[test]
    fn test_clamped_keeps_translation() {
        let t = ZoomTransform::new(5000.0, 3.0, 4.0).clamped(1.0, 2048.0);
        assert_eq!(t, ZoomTransform::new(2048.0, 3.0, 4.0));
    }

    #[test]
    fn test_centered_on_maps_focus_to_screen_point() {
        let t = ZoomTransform::centered_on(8.0, [100.0, 50.0], [640.0, 400.0]);
        assert_eq!(t.apply([100.0, 50.0]), [640.0, 400.0]);
    }
}
