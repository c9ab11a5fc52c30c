use tileview_core::{BoundingBox, LonLat, MercatorProjection, ZoomTransform};

use crate::config::ManagerConfig;
use crate::types::Viewport;

/// Turns pan/zoom transforms into geographic viewports and decides whether
/// tile logic applies to them.
#[derive(Clone, Debug)]
pub struct ViewportMonitor {
    projection: MercatorProjection,
    width: f64,
    height: f64,
    min_scale: f64,
    max_scale: f64,
    zoom_threshold: f64,
}

impl ViewportMonitor {
    pub fn new(config: &ManagerConfig) -> Self {
        Self {
            projection: MercatorProjection::for_viewport(config.viewport_width, config.viewport_height),
            width: config.viewport_width,
            height: config.viewport_height,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            zoom_threshold: config.zoom_threshold,
        }
    }

    pub fn projection(&self) -> &MercatorProjection {
        &self.projection
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Scale clamped into the configured extent.
    pub fn clamp(&self, transform: &ZoomTransform) -> ZoomTransform {
        transform.clamped(self.min_scale, self.max_scale)
    }

    /// Invert the top-left and bottom-right screen corners into lon/lat.
    pub fn viewport(&self, transform: &ZoomTransform) -> Viewport {
        let transform = self.clamp(transform);
        let top_left = self.projection.invert(transform.invert([0.0, 0.0]));
        let bottom_right = self.projection.invert(transform.invert([self.width, self.height]));
        Viewport {
            bounds: BoundingBox {
                west: top_left[0],
                east: bottom_right[0],
                north: top_left[1],
                south: bottom_right[1],
            },
            zoom: transform.zoom_level(),
        }
    }

    pub fn is_active(&self, viewport: &Viewport) -> bool {
        viewport.zoom >= self.zoom_threshold
    }

    /// Transform that puts `center` in the middle of the screen at `zoom`.
    pub fn transform_for(&self, center: LonLat, zoom: f64) -> ZoomTransform {
        let scale = 2f64.powf(zoom).clamp(self.min_scale, self.max_scale);
        let focus = self.projection.project(center);
        ZoomTransform::centered_on(scale, focus, [self.width / 2.0, self.height / 2.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ViewportMonitor {
        ViewportMonitor::new(&ManagerConfig::default())
    }

    #[test]
    fn test_identity_transform_sees_whole_world() {
        let vp = monitor().viewport(&ZoomTransform::identity());
        assert_eq!(vp.zoom, 0.0);
        assert!((vp.bounds.west + 180.0).abs() < 1e-9);
        assert!((vp.bounds.east - 180.0).abs() < 1e-9);
        assert!(vp.bounds.north > 0.0 && vp.bounds.south < 0.0);
        assert!(!monitor().is_active(&vp));
    }

    #[test]
    fn test_zoomed_viewport_is_centered_and_active() {
        let m = monitor();
        let center = [-86.8, 33.5];
        let vp = m.viewport(&m.transform_for(center, 11.0));
        assert!((vp.zoom - 11.0).abs() < 1e-9);
        assert!(m.is_active(&vp));
        assert!(vp.bounds.is_valid());
        assert!(vp.bounds.contains(center));
        let c = vp.bounds.center();
        assert!((c[0] - center[0]).abs() < 1e-6);
        // Mercator stretches latitude, so the box center sits slightly off.
        assert!((c[1] - center[1]).abs() < 1e-3);
        // 1280px at 2^11 over a 2π-wide world: 360 / 2048 degrees.
        assert!((vp.bounds.width() - 360.0 / 2048.0).abs() < 1e-9);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let m = monitor();
        let at = m.viewport(&ZoomTransform::new(1024.0, 0.0, 0.0));
        let below = m.viewport(&ZoomTransform::new(1023.0, 0.0, 0.0));
        assert!(m.is_active(&at));
        assert!(!m.is_active(&below));
    }

    #[test]
    fn test_scale_is_clamped_to_extent() {
        let m = monitor();
        let vp = m.viewport(&ZoomTransform::new(1_000_000.0, 0.0, 0.0));
        assert_eq!(vp.zoom, 11.0);
        let vp = m.viewport(&ZoomTransform::new(0.25, 0.0, 0.0));
        assert_eq!(vp.zoom, 0.0);
    }
}
