use std::collections::HashMap;

use serde::Serialize;

use crate::event::Appearance;
use crate::footprint::marker_size;
use crate::resolve::Placement;
use crate::tier::RenderTier;
use crate::viewport::LodLevel;

/// Everything a rendered marker visual depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IconKey {
    pub category: Option<String>,
    pub severity: Option<String>,
    pub verified: bool,
    /// Zoom bucket, as used for the cache itself.
    pub lod: LodLevel,
    /// Marker diameter at the exact zoom, matching the collision footprint.
    pub size_px: u32,
    pub rank: u32,
    pub tier: RenderTier,
}

impl IconKey {
    pub fn new(appearance: &Appearance, zoom: f64, rank: u32, tier: RenderTier) -> Self {
        Self {
            category: appearance.category.clone(),
            severity: appearance.severity.clone(),
            verified: appearance.verified,
            lod: LodLevel::for_zoom(zoom),
            size_px: marker_size(tier, zoom) as u32,
            rank,
            tier,
        }
    }

    pub fn for_placement(placement: &Placement, zoom: f64) -> Self {
        Self::new(
            &placement.event.appearance,
            zoom,
            placement.event.rank,
            placement.tier,
        )
    }
}

/// Renderer-facing marker description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerIcon {
    pub class_name: String,
    /// Diameter of the circular marker.
    pub size_px: f64,
    /// Height of the rank banner below the marker.
    pub banner_px: f64,
    pub label: String,
}

impl MarkerIcon {
    pub fn describe(key: &IconKey) -> Self {
        let size = f64::from(key.size_px);
        let mut class_name = format!(
            "category-marker-wrapper {} severity-{}",
            key.lod.as_str(),
            key.severity.as_deref().unwrap_or("unknown"),
        );
        if key.verified {
            class_name.push_str(" verified");
        }
        class_name.push_str(" rank-");
        class_name.push_str(key.tier.as_str());
        Self {
            class_name,
            size_px: size,
            banner_px: (size * 0.4).round(),
            label: format!("#{}", key.rank),
        }
    }
}

/// Process-lifetime visual cache, dropped whenever the zoom bucket changes.
#[derive(Debug, Clone)]
pub struct IconCache<V> {
    entries: HashMap<IconKey, V>,
    bucket: Option<LodLevel>,
    hits: u64,
    misses: u64,
}

impl<V> Default for IconCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            bucket: None,
            hits: 0,
            misses: 0,
        }
    }
}

impl<V> IconCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Returns `true` if the cache was cleared.
    pub fn clear_if_bucket_changed(&mut self, zoom: f64) -> bool {
        let bucket = LodLevel::for_zoom(zoom);
        if self.bucket == Some(bucket) {
            return false;
        }
        let had_entries = !self.entries.is_empty();
        self.entries.clear();
        self.bucket = Some(bucket);
        had_entries
    }

    pub fn get(&self, key: &IconKey) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_or_insert_with(&mut self, key: IconKey, make: impl FnOnce(&IconKey) -> V) -> &V {
        if self.entries.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        self.entries.entry(key).or_insert_with_key(make)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(zoom: f64, rank: u32) -> IconKey {
        let appearance = Appearance {
            category: Some("protest".into()),
            severity: Some("high".into()),
            verified: true,
        };
        IconKey::new(&appearance, zoom, rank, RenderTier::High)
    }

    #[test]
    fn builds_once_per_key() {
        let mut cache = IconCache::new();
        let mut built = 0;
        for _ in 0..3 {
            cache.get_or_insert_with(key(5.0, 7), |k| {
                built += 1;
                MarkerIcon::describe(k)
            });
        }
        assert_eq!(built, 1);
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn clears_only_on_bucket_change() {
        let mut cache: IconCache<MarkerIcon> = IconCache::new();
        cache.clear_if_bucket_changed(5.0);
        cache.get_or_insert_with(key(5.0, 1), MarkerIcon::describe);
        assert!(!cache.clear_if_bucket_changed(7.5));
        assert_eq!(cache.len(), 1);
        assert!(cache.clear_if_bucket_changed(9.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn describes_marker_visual() {
        let icon = MarkerIcon::describe(&key(5.0, 12));
        assert_eq!(
            icon.class_name,
            "category-marker-wrapper medium severity-high verified rank-high"
        );
        assert_eq!(icon.size_px, 36.0);
        assert_eq!(icon.banner_px, 14.0);
        assert_eq!(icon.label, "#12");
    }

    #[test]
    fn fractional_zoom_matches_footprint_and_bucket() {
        // 3.4 is past the 20px step, 4.4 is past the far/medium boundary.
        for zoom in [3.4, 4.4, 6.6, 8.2] {
            let k = key(zoom, 3);
            let icon = MarkerIcon::describe(&k);
            assert_eq!(icon.size_px, marker_size(RenderTier::High, zoom), "zoom {zoom}");
            assert!(
                icon.class_name.contains(LodLevel::for_zoom(zoom).as_str()),
                "zoom {zoom}: {}",
                icon.class_name
            );
        }
        assert_eq!(MarkerIcon::describe(&key(3.4, 1)).size_px, 36.0);
        assert!(MarkerIcon::describe(&key(4.4, 1)).class_name.contains(" medium "));
        assert_ne!(key(3.0, 1), key(3.4, 1));
        assert_eq!(key(4.4, 1), key(5.9, 1));
    }
}
