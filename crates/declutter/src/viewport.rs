use foundation::bounds::GeoBounds;
use thiserror::Error;

/// Geographic rectangle plus zoom, replaced wholesale on every pan or zoom.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub bounds: GeoBounds,
    pub zoom: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ViewportError {
    #[error("viewport bounds are not a valid rectangle: {0:?}")]
    InvalidBounds(GeoBounds),
    #[error("viewport zoom {0} is not finite")]
    InvalidZoom(f64),
}

impl Viewport {
    pub fn new(bounds: GeoBounds, zoom: f64) -> Result<Self, ViewportError> {
        if !bounds.is_valid() {
            return Err(ViewportError::InvalidBounds(bounds));
        }
        if !zoom.is_finite() {
            return Err(ViewportError::InvalidZoom(zoom));
        }
        Ok(Self { bounds, zoom })
    }

    /// Bounds padded outward so markers near the edge do not pop in.
    pub fn extended(&self, pad: f64) -> GeoBounds {
        self.bounds.pad(pad)
    }

    pub fn lod(&self) -> LodLevel {
        LodLevel::for_zoom(self.zoom)
    }
}

/// Zoom-dependent level of detail.
///
/// Also used as the zoom bucket that invalidates cached marker visuals.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LodLevel {
    Far,
    Medium,
    Close,
}

impl LodLevel {
    pub fn for_zoom(zoom: f64) -> Self {
        if zoom <= 4.0 {
            LodLevel::Far
        } else if zoom <= 8.0 {
            LodLevel::Medium
        } else {
            LodLevel::Close
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LodLevel::Far => "far",
            LodLevel::Medium => "medium",
            LodLevel::Close => "close",
        }
    }

    /// Worst rank still considered at this level, `None` for no limit.
    pub fn max_rank(self) -> Option<u32> {
        match self {
            LodLevel::Far => Some(100),
            LodLevel::Medium => Some(500),
            LodLevel::Close => None,
        }
    }

    pub fn admits(self, rank: u32) -> bool {
        self.max_rank().is_none_or(|max| rank <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_geometry() {
        let good = GeoBounds::new(0.0, 0.0, 1.0, 1.0);
        assert!(Viewport::new(good, 3.0).is_ok());
        assert_eq!(
            Viewport::new(good, f64::NAN).unwrap_err().to_string(),
            "viewport zoom NaN is not finite"
        );
        let inverted = GeoBounds::new(1.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            Viewport::new(inverted, 3.0),
            Err(ViewportError::InvalidBounds(_))
        ));
    }

    #[test]
    fn lod_thresholds() {
        assert_eq!(LodLevel::for_zoom(0.0), LodLevel::Far);
        assert_eq!(LodLevel::for_zoom(4.0), LodLevel::Far);
        assert_eq!(LodLevel::for_zoom(4.5), LodLevel::Medium);
        assert_eq!(LodLevel::for_zoom(8.0), LodLevel::Medium);
        assert_eq!(LodLevel::for_zoom(12.0), LodLevel::Close);

        assert!(LodLevel::Far.admits(100));
        assert!(!LodLevel::Far.admits(101));
        assert!(LodLevel::Medium.admits(500));
        assert!(LodLevel::Close.admits(u32::MAX));
    }

    #[test]
    fn extended_bounds_pad_half() {
        let v = Viewport::new(GeoBounds::new(0.0, 0.0, 10.0, 10.0), 5.0).unwrap();
        assert_eq!(v.extended(0.5), GeoBounds::new(-5.0, -5.0, 15.0, 15.0));
    }
}
