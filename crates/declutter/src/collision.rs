use foundation::math::Vec2;
use thiserror::Error;
use tracing::warn;

use crate::config::CollisionFallback;
use crate::footprint::Footprint;

/// Center spacing used by the degraded test at close zoom.
pub const MIN_PIXEL_DISTANCE: f64 = 25.0;

#[derive(Debug, Error, PartialEq)]
pub enum CollisionError {
    #[error("collision geometry is not finite: distance={distance} required={required}")]
    NonFinite { distance: f64, required: f64 },
}

/// Footprint-based overlap test.
///
/// Circles collide when their centers are closer than the sum of radii.
/// When the label bands overlap vertically the required separation grows to
/// the larger of the half-sum of band widths and the sum of radii.
pub fn footprints_collide(
    a: Vec2,
    fa: &Footprint,
    b: Vec2,
    fb: &Footprint,
) -> Result<bool, CollisionError> {
    let distance = a.distance(b);
    let radii = fa.radius + fb.radius;
    let vertical = (b.y - a.y).abs();

    let required = if vertical < fa.label_band_height + fb.label_band_height {
        ((fa.label_band_width + fb.label_band_width) * 0.5).max(radii)
    } else {
        radii
    };

    if !distance.is_finite() || !required.is_finite() {
        return Err(CollisionError::NonFinite { distance, required });
    }
    Ok(distance < required)
}

/// Degraded test: plain center distance against a zoom-scaled constant.
pub fn centers_collide(a: Vec2, b: Vec2, zoom: f64) -> bool {
    let scale = if zoom <= 4.0 {
        0.7
    } else if zoom <= 8.0 {
        0.85
    } else {
        1.0
    };
    a.distance(b) < MIN_PIXEL_DISTANCE * scale
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CollisionMode {
    Footprint,
    CenterDistance,
}

/// Collision test with a one-way switch to the degraded mode.
///
/// The first failing footprint evaluation flips the mode to
/// `CenterDistance`. With [`CollisionFallback::Session`] it stays there for
/// the lifetime of this value; with [`CollisionFallback::Pass`] every
/// [`CollisionTester::begin_pass`] goes back to footprints.
#[derive(Debug, Clone)]
pub struct CollisionTester {
    mode: CollisionMode,
    fallback: CollisionFallback,
    failures: u64,
}

impl CollisionTester {
    pub fn new(fallback: CollisionFallback) -> Self {
        Self {
            mode: CollisionMode::Footprint,
            fallback,
            failures: 0,
        }
    }

    pub fn mode(&self) -> CollisionMode {
        self.mode
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn begin_pass(&mut self) {
        if self.fallback == CollisionFallback::Pass {
            self.mode = CollisionMode::Footprint;
        }
    }

    pub fn collide(&mut self, a: Vec2, fa: &Footprint, b: Vec2, fb: &Footprint, zoom: f64) -> bool {
        if self.mode == CollisionMode::CenterDistance {
            return centers_collide(a, b, zoom);
        }
        match footprints_collide(a, fa, b, fb) {
            Ok(hit) => hit,
            Err(err) => {
                self.failures += 1;
                self.mode = CollisionMode::CenterDistance;
                warn!(
                    "footprint collision test failed ({err}); falling back to center distance ({:?} scope)",
                    self.fallback
                );
                centers_collide(a, b, zoom)
            }
        }
    }
}
