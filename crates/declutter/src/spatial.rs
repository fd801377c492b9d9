use std::collections::HashMap;

use foundation::bounds::Aabb2;
use foundation::math::Vec2;

use crate::event::EventId;
use crate::viewport::Viewport;

/// Zoom change (in levels) that forces a rebuild.
pub const ZOOM_REBUILD_THRESHOLD: f64 = 1.0;

/// Integer grid cell coordinate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub x: i64,
    pub y: i64,
}

impl CellKey {
    pub fn of(p: Vec2, cell_px: f64) -> Self {
        Self {
            x: (p.x / cell_px).floor() as i64,
            y: (p.y / cell_px).floor() as i64,
        }
    }

    /// Pixel box this cell covers.
    pub fn bounds(self, cell_px: f64) -> Aabb2 {
        Aabb2::square(Vec2::new(self.x as f64, self.y as f64).scale(cell_px), cell_px)
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// What the cached positions were computed for.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IndexKey {
    pub viewport: Viewport,
    /// Candidate pool generation; bumps whenever the pool is replaced.
    pub generation: u64,
}

impl IndexKey {
    /// Sub-threshold jitter keeps the index: same pool, zoom within one level,
    /// and bounds either inside or around the indexed bounds.
    pub fn covers(&self, viewport: &Viewport, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        if (viewport.zoom - self.viewport.zoom).abs() >= ZOOM_REBUILD_THRESHOLD {
            return false;
        }
        let old = &self.viewport.bounds;
        let new = &viewport.bounds;
        old.contains_bounds(new) || new.contains_bounds(old)
    }
}

/// Uniform pixel grid for broad-phase neighbor lookup.
///
/// Positions are cached per event and are only meaningful for the viewport
/// in [`SpatialIndex::key`]; callers project through that viewport so every
/// position in one pass lives in the same pixel space.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_px: f64,
    cells: HashMap<CellKey, Vec<EventId>>,
    positions: HashMap<EventId, Vec2>,
    key: Option<IndexKey>,
}

impl SpatialIndex {
    /// Non-positive or non-finite cell sizes fall back to 1px.
    pub fn new(cell_px: f64) -> Self {
        let cell_px = if cell_px.is_finite() && cell_px > 0.0 {
            cell_px
        } else {
            1.0
        };
        Self {
            cell_px,
            cells: HashMap::new(),
            positions: HashMap::new(),
            key: None,
        }
    }

    pub fn build(cell_px: f64, points: impl IntoIterator<Item = (EventId, Vec2)>) -> Self {
        let mut index = Self::new(cell_px);
        for (id, p) in points {
            index.insert(id, p);
        }
        index
    }

    pub fn cell_px(&self) -> f64 {
        self.cell_px
    }

    pub fn key(&self) -> Option<&IndexKey> {
        self.key.as_ref()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.positions.clear();
        self.key = None;
    }

    pub fn needs_rebuild(&self, viewport: &Viewport, generation: u64) -> bool {
        self.key
            .as_ref()
            .is_none_or(|k| !k.covers(viewport, generation))
    }

    /// Drops everything and stamps the index for `key`.
    ///
    /// Returns `false` when the current key already covers it and nothing
    /// was cleared.
    pub fn prepare(&mut self, viewport: &Viewport, generation: u64) -> bool {
        if !self.needs_rebuild(viewport, generation) {
            return false;
        }
        self.clear();
        self.key = Some(IndexKey {
            viewport: *viewport,
            generation,
        });
        true
    }

    /// Inserts or moves `id`. Non-finite points are ignored.
    pub fn insert(&mut self, id: EventId, p: Vec2) {
        if !p.is_finite() {
            return;
        }
        if let Some(old) = self.positions.get(&id).copied() {
            if old == p {
                return;
            }
            let old_key = CellKey::of(old, self.cell_px);
            if let Some(cell) = self.cells.get_mut(&old_key) {
                cell.retain(|e| e != &id);
            }
        }
        self.cells
            .entry(CellKey::of(p, self.cell_px))
            .or_default()
            .push(id.clone());
        self.positions.insert(id, p);
    }

    pub fn position(&self, id: &EventId) -> Option<Vec2> {
        self.positions.get(id).copied()
    }

    /// Ids in the cells around `p` that could lie within `radius`.
    ///
    /// The scan covers `max(1, ceil(radius / cell))` cells in every
    /// direction, i.e. the 3x3 block whenever `radius <= cell`. The result is
    /// a superset; exact distance is the caller's job. Order is deterministic:
    /// column by column, then insertion order within a cell.
    pub fn neighbors(&self, p: Vec2, radius: f64) -> Vec<&EventId> {
        let mut out = Vec::new();
        if !p.is_finite() {
            return out;
        }
        let ring = if radius.is_finite() && radius > self.cell_px {
            (radius / self.cell_px).ceil() as i64
        } else {
            1
        };
        let center = CellKey::of(p, self.cell_px);
        for dx in -ring..=ring {
            for dy in -ring..=ring {
                let key = CellKey {
                    x: center.x + dx,
                    y: center.y + dy,
                };
                if let Some(ids) = self.cells.get(&key) {
                    out.extend(ids.iter());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::bounds::GeoBounds;

    fn id(s: &str) -> EventId {
        EventId::new(s)
    }

    fn names(v: Vec<&EventId>) -> Vec<&str> {
        v.into_iter().map(|e| e.as_str()).collect()
    }

    #[test]
    fn neighbors_scan_the_surrounding_block() {
        let index = SpatialIndex::build(
            50.0,
            [
                (id("center"), Vec2::new(75.0, 75.0)),
                (id("adjacent"), Vec2::new(120.0, 30.0)),
                (id("two_away"), Vec2::new(180.0, 75.0)),
            ],
        );
        let near = names(index.neighbors(Vec2::new(60.0, 60.0), 10.0));
        assert!(near.contains(&"center"));
        assert!(near.contains(&"adjacent"));
        assert!(!near.contains(&"two_away"));

        let wide = names(index.neighbors(Vec2::new(60.0, 60.0), 70.0));
        assert!(wide.contains(&"two_away"));
    }

    #[test]
    fn negative_coordinates_use_floor_cells() {
        assert_eq!(
            CellKey::of(Vec2::new(-0.5, -50.0), 50.0),
            CellKey { x: -1, y: -1 }
        );
        let index = SpatialIndex::build(50.0, [(id("a"), Vec2::new(-10.0, -10.0))]);
        assert_eq!(names(index.neighbors(Vec2::new(5.0, 5.0), 1.0)), vec!["a"]);
    }

    #[test]
    fn insert_moves_existing_entries() {
        let mut index = SpatialIndex::new(50.0);
        index.insert(id("a"), Vec2::new(10.0, 10.0));
        index.insert(id("a"), Vec2::new(500.0, 500.0));
        assert_eq!(index.len(), 1);
        assert!(index.neighbors(Vec2::new(10.0, 10.0), 1.0).is_empty());
        assert_eq!(index.position(&id("a")), Some(Vec2::new(500.0, 500.0)));

        index.insert(id("bad"), Vec2::new(f64::NAN, 0.0));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn rebuild_policy_skips_jitter_only() {
        let base = Viewport::new(GeoBounds::new(0.0, 0.0, 10.0, 10.0), 6.0).unwrap();
        let mut index = SpatialIndex::new(50.0);
        assert!(index.prepare(&base, 1));
        index.insert(id("a"), Vec2::new(1.0, 1.0));

        let inside = Viewport::new(GeoBounds::new(1.0, 1.0, 9.0, 9.0), 6.5).unwrap();
        assert!(!index.needs_rebuild(&inside, 1));
        assert!(!index.prepare(&inside, 1));
        assert_eq!(index.len(), 1);

        let around = Viewport::new(GeoBounds::new(-1.0, -1.0, 11.0, 11.0), 6.0).unwrap();
        assert!(!index.needs_rebuild(&around, 1));

        let panned = Viewport::new(GeoBounds::new(5.0, 5.0, 15.0, 15.0), 6.0).unwrap();
        assert!(index.needs_rebuild(&panned, 1));

        let zoomed = Viewport::new(GeoBounds::new(0.0, 0.0, 10.0, 10.0), 7.0).unwrap();
        assert!(index.needs_rebuild(&zoomed, 1));

        assert!(index.needs_rebuild(&base, 2));
        assert!(index.prepare(&base, 2));
        assert!(index.is_empty());
    }
}
