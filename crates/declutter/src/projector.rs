use foundation::math::{LatLng, Vec2, lat_lng_to_world_px, world_px_to_lat_lng};

use crate::viewport::Viewport;

/// Geographic coordinate to screen pixel, given the current viewport.
///
/// Implementations must be pure functions of `(location, viewport)`.
/// Returning `None` marks the geometry as unavailable; the resolver then
/// drops that candidate from the pass.
///
/// Pixel distances may grow with zoom by at most a factor of two per level.
/// A spatial index kept across a fractional zoom change sizes its neighbor
/// lookups on that bound.
pub trait Projector {
    fn project(&self, location: LatLng, viewport: &Viewport) -> Option<Vec2>;

    fn unproject(&self, point: Vec2, viewport: &Viewport) -> Option<LatLng>;
}

/// Spherical Web Mercator into world-pixel space at the viewport zoom.
///
/// Pixel positions depend only on zoom, so panning never moves them and
/// distances match what a slippy map shows on screen.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct WebMercatorProjector;

impl Projector for WebMercatorProjector {
    fn project(&self, location: LatLng, viewport: &Viewport) -> Option<Vec2> {
        if !location.lat.is_finite() || !location.lng.is_finite() {
            return None;
        }
        let p = lat_lng_to_world_px(location, viewport.zoom);
        p.is_finite().then_some(p)
    }

    fn unproject(&self, point: Vec2, viewport: &Viewport) -> Option<LatLng> {
        if !point.is_finite() {
            return None;
        }
        Some(world_px_to_lat_lng(point, viewport.zoom))
    }
}
