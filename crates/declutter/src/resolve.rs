use std::collections::HashMap;

use foundation::math::{LatLng, Vec2};
use thiserror::Error;
use tracing::{debug, warn};

use crate::collision::CollisionTester;
use crate::config::{CollisionFallback, DeclutterConfig};
use crate::event::{Event, EventId};
use crate::footprint::{Footprint, max_separation_at};
use crate::projector::Projector;
use crate::spatial::SpatialIndex;
use crate::tier::{RenderTier, TierAssigner};
use crate::viewport::Viewport;

/// Why a candidate was left out of placement.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("event {0} has no screen position")]
    Unprojectable(EventId),
    #[error("event {id} has a non-finite footprint at zoom {zoom}")]
    Footprint { id: EventId, zoom: f64 },
}

/// An event together with the tier it should be drawn at.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub event: Event,
    pub tier: RenderTier,
}

impl Placement {
    pub fn id(&self) -> &EventId {
        &self.event.id
    }

    pub fn rank(&self) -> u32 {
        self.event.rank
    }

    pub fn location(&self) -> LatLng {
        self.event.location
    }
}

/// Visible/hidden partition of one pass, both sorted by rank then input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub visible: Vec<Placement>,
    pub hidden: Vec<Placement>,
}

impl Resolution {
    pub fn len(&self) -> usize {
        self.visible.len() + self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.hidden.is_empty()
    }

    pub fn visible_ids(&self) -> Vec<&EventId> {
        self.visible.iter().map(Placement::id).collect()
    }

    pub fn hidden_ids(&self) -> Vec<&EventId> {
        self.hidden.iter().map(Placement::id).collect()
    }

    pub fn is_visible(&self, id: &EventId) -> bool {
        self.visible.iter().any(|p| p.id() == id)
    }
}

/// Counters for one pass.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ResolveStats {
    /// Candidates inside the extended bounds.
    pub considered: usize,
    /// Candidates outside the extended bounds, dropped entirely.
    pub outside: usize,
    /// In-bounds candidates past the budget slice.
    pub over_budget: usize,
    pub placed: usize,
    pub evicted: usize,
    pub collided: usize,
    /// Candidates without usable geometry, reported as hidden.
    pub excluded: usize,
}

struct Slot<'a> {
    order: usize,
    event: &'a Event,
    position: Vec2,
    footprint: Footprint,
}

/// Greedy rank-priority placement with eviction.
#[derive(Debug, Clone)]
pub struct DeclutterResolver {
    tiers: TierAssigner,
    extended_pad: f64,
    cell_px: f64,
}

impl DeclutterResolver {
    pub fn new(config: &DeclutterConfig) -> Self {
        Self {
            tiers: config.tier_assigner(),
            extended_pad: config.extended_bounds_pad,
            cell_px: config.grid_cell_size_px,
        }
    }

    pub fn tier_assigner(&self) -> &TierAssigner {
        &self.tiers
    }

    pub fn cell_px(&self) -> f64 {
        self.cell_px
    }

    /// One-off pass with a fresh spatial index and collision tester.
    pub fn resolve<P: Projector>(
        &self,
        candidates: &[Event],
        viewport: &Viewport,
        budget: usize,
        projector: &P,
    ) -> Resolution {
        let mut index = SpatialIndex::new(self.cell_px);
        index.prepare(viewport, 0);
        let mut tester = CollisionTester::new(CollisionFallback::Session);
        self.resolve_with(candidates, viewport, budget, projector, &mut index, &mut tester)
            .0
    }

    /// Runs one pass against caches owned by the caller.
    ///
    /// `index` must already be prepared for `viewport`. It only answers the
    /// broad phase: cell membership lives in the indexed viewport's pixel
    /// space, and candidates it has not seen yet are projected through that
    /// viewport and inserted. Collision geometry is always projected at
    /// `viewport`, so a reused index gives the same partition as a fresh one.
    /// Candidates outside the extended bounds appear in neither list.
    pub fn resolve_with<P: Projector>(
        &self,
        candidates: &[Event],
        viewport: &Viewport,
        budget: usize,
        projector: &P,
        index: &mut SpatialIndex,
        tester: &mut CollisionTester,
    ) -> (Resolution, ResolveStats) {
        debug_assert!(
            index
                .key()
                .is_some_and(|k| k.covers(viewport, k.generation)),
            "spatial index is stale for viewport {viewport:?}"
        );
        tester.begin_pass();

        let mut stats = ResolveStats::default();
        let zoom = viewport.zoom;
        let extended = viewport.extended(self.extended_pad);
        let indexed_view = index.key().map(|k| k.viewport).unwrap_or(*viewport);

        let mut ordered: Vec<&Event> = candidates
            .iter()
            .filter(|e| extended.contains(e.location))
            .collect();
        stats.considered = ordered.len();
        stats.outside = candidates.len() - ordered.len();
        ordered.sort_by_key(|e| e.rank);

        let working = budget.min(ordered.len());
        let reach = max_separation_at(zoom);
        // Index pixels are at the indexed zoom; widen the lookup when that
        // zoom was finer than this one.
        let broad_reach = reach * (indexed_view.zoom - zoom).exp2().max(1.0);

        let mut slots: Vec<Option<Slot>> = Vec::with_capacity(working);
        let mut placed: HashMap<EventId, usize> = HashMap::with_capacity(working);
        let mut visible_count = 0usize;
        let mut hidden: Vec<(usize, &Event)> = Vec::new();

        for (order, &event) in ordered[..working].iter().enumerate() {
            if visible_count >= budget {
                hidden.push((order, event));
                continue;
            }

            let tier = self.tiers.seed_tier(event.rank);
            let Located {
                indexed,
                position,
                footprint,
            } = match locate(event, tier, viewport, &indexed_view, projector, index) {
                Ok(found) => found,
                Err(err) => {
                    warn!("excluding candidate from placement: {err}");
                    stats.excluded += 1;
                    hidden.push((order, event));
                    continue;
                }
            };

            let mut hit = None;
            for other in index.neighbors(indexed, broad_reach) {
                let Some(&slot) = placed.get(other) else {
                    continue;
                };
                let Some(s) = &slots[slot] else {
                    continue;
                };
                let d = position - s.position;
                if d.x.abs() > reach || d.y.abs() > reach {
                    continue;
                }
                if tester.collide(position, &footprint, s.position, &s.footprint, zoom) {
                    hit = Some(slot);
                    break;
                }
            }

            let candidate = Slot {
                order,
                event,
                position,
                footprint,
            };
            match hit {
                None => {}
                // Never taken while candidates arrive in ascending rank.
                Some(slot) if slots[slot].as_ref().is_some_and(|s| s.event.rank > event.rank) => {
                    if let Some(old) = slots[slot].take() {
                        placed.remove(&old.event.id);
                        hidden.push((old.order, old.event));
                        visible_count -= 1;
                        stats.evicted += 1;
                    }
                }
                Some(_) => {
                    stats.collided += 1;
                    hidden.push((order, event));
                    continue;
                }
            }
            placed.insert(event.id.clone(), slots.len());
            slots.push(Some(candidate));
            visible_count += 1;
        }

        for (offset, &event) in ordered[working..].iter().enumerate() {
            hidden.push((working + offset, event));
        }
        stats.over_budget = ordered.len() - working;

        let mut visible: Vec<Slot> = slots.into_iter().flatten().collect();
        visible.sort_by_key(|s| s.order);
        stats.placed = visible.len();

        let members: Vec<(u32, LatLng)> = visible
            .iter()
            .map(|s| (s.event.rank, s.event.location))
            .collect();
        let final_tiers = self.tiers.finalize_tiers(&members, &viewport.bounds);

        hidden.sort_by_key(|&(order, _)| order);
        let resolution = Resolution {
            visible: visible
                .into_iter()
                .zip(final_tiers)
                .map(|(s, tier)| Placement {
                    event: s.event.clone(),
                    tier,
                })
                .collect(),
            hidden: hidden
                .into_iter()
                .map(|(_, e)| Placement {
                    event: e.clone(),
                    tier: self.tiers.global_tier(e.rank),
                })
                .collect(),
        };

        debug!(
            "declutter pass z={zoom:.2}: {} visible, {} hidden ({} evicted, {} collided, {} over budget, {} excluded, {} outside)",
            resolution.visible.len(),
            resolution.hidden.len(),
            stats.evicted,
            stats.collided,
            stats.over_budget,
            stats.excluded,
            stats.outside,
        );
        (resolution, stats)
    }
}

struct Located {
    /// Position in the index's pixel space.
    indexed: Vec2,
    /// Position at the viewport being resolved.
    position: Vec2,
    footprint: Footprint,
}

fn locate<P: Projector>(
    event: &Event,
    tier: RenderTier,
    viewport: &Viewport,
    indexed_view: &Viewport,
    projector: &P,
    index: &mut SpatialIndex,
) -> Result<Located, GeometryError> {
    let zoom = viewport.zoom;
    let footprint = Footprint::for_tier(tier, zoom);
    if !footprint.is_finite() {
        return Err(GeometryError::Footprint {
            id: event.id.clone(),
            zoom,
        });
    }
    let project = |view: &Viewport| {
        projector
            .project(event.location, view)
            .filter(|p| p.is_finite())
            .ok_or_else(|| GeometryError::Unprojectable(event.id.clone()))
    };
    let position = project(viewport)?;
    let indexed = match index.position(&event.id) {
        Some(p) => p,
        None => {
            let p = if indexed_view == viewport {
                position
            } else {
                project(indexed_view)?
            };
            index.insert(event.id.clone(), p);
            p
        }
    };
    Ok(Located {
        indexed,
        position,
        footprint,
    })
}
