use crate::tier::RenderTier;

/// On-screen collision shape of a marker: a circle plus the rank label band
/// drawn under it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Footprint {
    pub radius: f64,
    pub label_band_height: f64,
    pub label_band_width: f64,
}

/// Marker diameter before tier scaling, stepped by zoom.
pub fn base_marker_size(zoom: f64) -> f64 {
    if zoom <= 3.0 {
        20.0
    } else if zoom <= 6.0 {
        24.0
    } else {
        28.0
    }
}

fn tier_multiplier(tier: RenderTier) -> f64 {
    match tier {
        RenderTier::Top => 2.0,
        RenderTier::High => 1.5,
        RenderTier::Normal => 1.0,
    }
}

fn tier_padding(tier: RenderTier) -> f64 {
    match tier {
        RenderTier::Top => 4.0,
        RenderTier::High => 3.0,
        RenderTier::Normal => 2.0,
    }
}

/// Rendered marker diameter in whole pixels.
pub fn marker_size(tier: RenderTier, zoom: f64) -> f64 {
    (base_marker_size(zoom) * tier_multiplier(tier)).round()
}

impl Footprint {
    pub fn for_tier(tier: RenderTier, zoom: f64) -> Self {
        let size = marker_size(tier, zoom);
        Self {
            radius: size * 0.5 + tier_padding(tier),
            label_band_height: (size * 0.4).round(),
            label_band_width: size * 1.2,
        }
    }

    /// Largest center separation this footprint can demand from `other`.
    pub fn max_separation(&self, other: &Footprint) -> f64 {
        let radii = self.radius + other.radius;
        let bands = (self.label_band_width + other.label_band_width) * 0.5;
        radii.max(bands)
    }

    pub fn is_finite(&self) -> bool {
        self.radius.is_finite()
            && self.label_band_height.is_finite()
            && self.label_band_width.is_finite()
    }
}

/// Upper bound on required separation between any two markers at `zoom`.
pub fn max_separation_at(zoom: f64) -> f64 {
    let top = Footprint::for_tier(RenderTier::Top, zoom);
    top.max_separation(&top)
}
