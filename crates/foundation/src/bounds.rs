use crate::math::{LatLng, Vec2};

/// Geographic rectangle in degrees (south-west / north-east corners).
///
/// Containment is inclusive on every edge. Rectangles crossing the
/// antimeridian are not represented.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// The whole Web Mercator world.
    pub fn world() -> Self {
        Self::new(-90.0, -180.0, 90.0, 180.0)
    }

    /// Tight bounds around `points`, `None` when empty.
    pub fn from_points(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut b = Self::new(first.lat, first.lng, first.lat, first.lng);
        for p in iter {
            b.south = b.south.min(p.lat);
            b.west = b.west.min(p.lng);
            b.north = b.north.max(p.lat);
            b.east = b.east.max(p.lng);
        }
        Some(b)
    }

    pub fn is_valid(&self) -> bool {
        [self.south, self.west, self.north, self.east]
            .iter()
            .all(|v| v.is_finite())
            && self.south <= self.north
            && self.west <= self.east
    }

    pub fn width(&self) -> f64 {
        (self.east - self.west).abs()
    }

    pub fn height(&self) -> f64 {
        (self.north - self.south).abs()
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) * 0.5,
            (self.west + self.east) * 0.5,
        )
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }

    pub fn contains_bounds(&self, other: &GeoBounds) -> bool {
        other.south >= self.south
            && other.north <= self.north
            && other.west >= self.west
            && other.east <= self.east
    }

    /// Grows every edge outward by `ratio` of the height (lat) or width (lng).
    pub fn pad(&self, ratio: f64) -> Self {
        let dh = self.height() * ratio;
        let dw = self.width() * ratio;
        Self::new(
            self.south - dh,
            self.west - dw,
            self.north + dh,
            self.east + dw,
        )
    }
}

/// Axis-aligned box in pixel space; `min` is the top-left corner.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb2 {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Aabb2 { min, max }
    }

    /// Box of side `size` whose top-left corner is `min`.
    pub fn square(min: Vec2, size: f64) -> Self {
        Aabb2::new(min, min + Vec2::new(size, size))
    }

    /// Tight box around `points`, `None` when empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut b = Aabb2::new(first, first);
        for p in iter {
            b.min = Vec2::new(b.min.x.min(p.x), b.min.y.min(p.y));
            b.max = Vec2::new(b.max.x.max(p.x), b.max.y.max(p.y));
        }
        Some(b)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max).scale(0.5)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_box(&self, other: &Aabb2) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_grows_each_edge_by_ratio() {
        let b = GeoBounds::new(0.0, 0.0, 10.0, 20.0);
        let p = b.pad(0.5);
        assert_eq!(p, GeoBounds::new(-5.0, -10.0, 15.0, 30.0));
        assert!(p.contains_bounds(&b));
        assert!(!b.contains_bounds(&p));
    }

    #[test]
    fn containment_is_inclusive() {
        let b = GeoBounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains(LatLng::new(0.0, 10.0)));
        assert!(b.contains(LatLng::new(5.0, 5.0)));
        assert!(!b.contains(LatLng::new(10.0001, 5.0)));
    }

    #[test]
    fn from_points_is_tight() {
        let b = GeoBounds::from_points([
            LatLng::new(1.0, 5.0),
            LatLng::new(-2.0, 7.0),
            LatLng::new(3.0, 6.0),
        ])
        .unwrap();
        assert_eq!(b, GeoBounds::new(-2.0, 5.0, 3.0, 7.0));
        assert!(GeoBounds::from_points([]).is_none());
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        assert!(GeoBounds::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!GeoBounds::new(2.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!GeoBounds::new(0.0, f64::NAN, 1.0, 1.0).is_valid());
    }

    #[test]
    fn pixel_box_wraps_points() {
        let b = Aabb2::from_points([
            Vec2::new(3.0, 4.0),
            Vec2::new(-1.0, 6.0),
            Vec2::new(2.0, 2.0),
        ])
        .unwrap();
        assert_eq!(b, Aabb2::new(Vec2::new(-1.0, 2.0), Vec2::new(3.0, 6.0)));
        assert_eq!((b.width(), b.height()), (4.0, 4.0));
        assert_eq!(b.center(), Vec2::new(1.0, 4.0));
        assert!(Aabb2::square(Vec2::new(-2.0, 0.0), 10.0).contains_box(&b));
        assert!(!b.contains(Vec2::new(3.5, 4.0)));
        assert!(Aabb2::from_points([]).is_none());
    }
}
