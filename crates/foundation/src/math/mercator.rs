use super::{LatLng, MERCATOR_MAX_LAT, Vec2};

/// Tile edge length of the spherical Web Mercator pyramid (pixels).
pub const TILE_SIZE_PX: f64 = 256.0;

/// Size of the whole world in pixels at `zoom` (fractional zoom allowed).
pub fn world_size_px(zoom: f64) -> f64 {
    TILE_SIZE_PX * zoom.exp2()
}

/// Projects a geographic coordinate to world-pixel space at `zoom`.
///
/// Origin is the north-west corner of the world; y grows southwards.
/// Latitude is clamped to the Mercator limit so poles stay finite.
pub fn lat_lng_to_world_px(p: LatLng, zoom: f64) -> Vec2 {
    let size = world_size_px(zoom);
    let lat = p.lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    let x = (p.lng + 180.0) / 360.0 * size;
    let merc_n = (std::f64::consts::FRAC_PI_4 + lat * 0.5).tan().ln();
    let y = (1.0 - merc_n / std::f64::consts::PI) * 0.5 * size;
    Vec2::new(x, y)
}

/// Inverse of [`lat_lng_to_world_px`].
pub fn world_px_to_lat_lng(p: Vec2, zoom: f64) -> LatLng {
    let size = world_size_px(zoom);
    let lng = p.x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * p.y / size;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_maps_to_world_center() {
        let p = lat_lng_to_world_px(LatLng::new(0.0, 0.0), 0.0);
        assert_close(p.x, 128.0, 1e-9);
        assert_close(p.y, 128.0, 1e-9);
    }

    #[test]
    fn each_zoom_level_doubles_distances() {
        let a = LatLng::new(10.0, 10.0);
        let b = LatLng::new(11.0, 12.0);
        let d3 = lat_lng_to_world_px(a, 3.0).distance(lat_lng_to_world_px(b, 3.0));
        let d4 = lat_lng_to_world_px(a, 4.0).distance(lat_lng_to_world_px(b, 4.0));
        assert_close(d4, d3 * 2.0, 1e-9);
    }

    #[test]
    fn poles_are_clamped_to_finite_pixels() {
        let north = lat_lng_to_world_px(LatLng::new(90.0, 0.0), 2.0);
        assert!(north.is_finite());
        assert_close(north.y, 0.0, 1e-6);
    }

    #[test]
    fn round_trip_world_px() {
        let geo = LatLng::new(48.8566, 2.3522);
        let px = lat_lng_to_world_px(geo, 7.5);
        let rt = world_px_to_lat_lng(px, 7.5);
        assert_close(rt.lat, geo.lat, 1e-9);
        assert_close(rt.lng, geo.lng, 1e-9);
    }
}
