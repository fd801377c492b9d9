use std::collections::HashMap;

use foundation::bounds::GeoBounds;
use foundation::time::Millis;
use runtime::{Debouncer, IntervalTimer, Metrics};
use tracing::{debug, info};

use crate::cluster::{Cluster, ClusterAggregator, ClusterClick, ClusterId};
use crate::collision::{CollisionMode, CollisionTester};
use crate::config::{ConfigError, DeclutterConfig};
use crate::event::{Event, EventId};
use crate::icon_cache::{IconCache, IconKey, MarkerIcon};
use crate::projector::Projector;
use crate::rank::{Interaction, ScorePolicy, apply_ranks};
use crate::resolve::{DeclutterResolver, Placement};
use crate::spatial::SpatialIndex;
use crate::viewport::{Viewport, ViewportError};

/// Output of one resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclutterFrame {
    /// 1-based pass counter.
    pub pass: u64,
    pub viewport: Viewport,
    pub visible: Vec<Placement>,
    /// Everything inside the extended bounds that is not drawn, clustered
    /// members excluded.
    pub hidden: Vec<Placement>,
    pub clusters: Vec<Cluster>,
}

impl DeclutterFrame {
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }
}

/// Single-threaded driver around the resolver.
///
/// The host feeds it viewport, pool and score notifications and calls
/// [`DeclutterEngine::poll`] from its loop with the current time. All timing
/// (viewport debounce, score decay, rank recompute) is evaluated inside
/// `poll`; nothing runs in the background.
pub struct DeclutterEngine<P: Projector> {
    config: DeclutterConfig,
    projector: P,
    resolver: DeclutterResolver,
    aggregator: ClusterAggregator,
    policy: ScorePolicy,

    events: Vec<Event>,
    by_id: HashMap<EventId, usize>,
    generation: u64,

    viewport: Option<Viewport>,
    pending_viewport: Debouncer<Viewport>,
    decay: IntervalTimer,
    rerank: IntervalTimer,

    index: SpatialIndex,
    tester: CollisionTester,
    icons: IconCache<MarkerIcon>,

    frame: Option<DeclutterFrame>,
    dirty: bool,
    metrics: Metrics,
}

impl<P: Projector> DeclutterEngine<P> {
    pub fn new(config: DeclutterConfig, projector: P, now: Millis) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            resolver: DeclutterResolver::new(&config),
            aggregator: ClusterAggregator::new(&config),
            policy: config.score_policy(),
            pending_viewport: Debouncer::new(config.debounce_ms),
            decay: IntervalTimer::new(config.decay_interval_ms, now),
            rerank: IntervalTimer::new(config.rank_recompute_interval_ms, now),
            index: SpatialIndex::new(config.grid_cell_size_px),
            tester: CollisionTester::new(config.collision_fallback),
            icons: IconCache::new(),
            projector,
            events: Vec::new(),
            by_id: HashMap::new(),
            generation: 0,
            viewport: None,
            frame: None,
            dirty: false,
            metrics: Metrics::new(),
            config,
        })
    }

    pub fn config(&self) -> &DeclutterConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, id: &EventId) -> Option<&Event> {
        self.by_id.get(id).map(|&i| &self.events[i])
    }

    /// Viewport of the last settled notification.
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn frame(&self) -> Option<&DeclutterFrame> {
        self.frame.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn collision_mode(&self) -> CollisionMode {
        self.tester.mode()
    }

    /// Queues a viewport; rapid successive calls collapse into one pass.
    pub fn on_viewport_changed(
        &mut self,
        bounds: GeoBounds,
        zoom: f64,
        now: Millis,
    ) -> Result<(), ViewportError> {
        let viewport = Viewport::new(bounds, zoom)?;
        self.pending_viewport.submit(viewport, now);
        self.metrics.incr("viewport.notifications", 1);
        Ok(())
    }

    /// Replaces the candidate pool and ranks it.
    ///
    /// Later duplicates of an id are dropped.
    pub fn on_events_changed(&mut self, events: Vec<Event>) {
        let mut by_id = HashMap::with_capacity(events.len());
        let mut pool = Vec::with_capacity(events.len());
        for e in events {
            if by_id.contains_key(&e.id) {
                self.metrics.incr("events.duplicates", 1);
                continue;
            }
            by_id.insert(e.id.clone(), pool.len());
            pool.push(e);
        }
        apply_ranks(&mut pool);

        self.events = pool;
        self.by_id = by_id;
        self.generation += 1;
        self.dirty = true;
        self.metrics.incr("events.replaced", 1);
        info!(
            "candidate pool replaced: {} events (generation {})",
            self.events.len(),
            self.generation
        );
    }

    /// Adjusts one score. Ranks follow on the next recompute tick.
    ///
    /// Returns `false` for unknown ids.
    pub fn on_score_mutation(&mut self, id: &EventId, delta: f64) -> bool {
        let Some(&i) = self.by_id.get(id) else {
            self.metrics.incr("score.unknown_id", 1);
            return false;
        };
        let e = &mut self.events[i];
        e.score = self.policy.apply(e.score, delta);
        self.metrics.incr("score.mutations", 1);
        true
    }

    pub fn interact(&mut self, id: &EventId, interaction: Interaction) -> bool {
        self.on_score_mutation(id, self.policy.bonus(interaction))
    }

    /// Advances every clock to `now` and runs a pass if anything changed.
    ///
    /// Returns the new frame when a pass ran.
    pub fn poll(&mut self, now: Millis) -> Option<&DeclutterFrame> {
        let ticks = self.decay.poll(now);
        if ticks > 0 {
            self.policy.decay(&mut self.events, ticks);
            self.metrics.incr("score.decay_ticks", ticks);
        }

        if self.rerank.poll(now) > 0 {
            let changed = apply_ranks(&mut self.events);
            self.metrics.incr("rank.recomputes", 1);
            if changed > 0 {
                debug!("rank recompute moved {changed} events");
                self.dirty = true;
            }
        }

        if let Some(viewport) = self.pending_viewport.poll(now) {
            self.settle_viewport(viewport);
        }

        if self.dirty && self.viewport.is_some() {
            self.run_pass();
            return self.frame.as_ref();
        }
        None
    }

    /// Settles any pending viewport and runs a pass right away.
    pub fn resolve_now(&mut self) -> Option<&DeclutterFrame> {
        if let Some(viewport) = self.pending_viewport.flush() {
            self.settle_viewport(viewport);
        }
        if self.viewport.is_none() {
            return None;
        }
        self.run_pass();
        self.frame.as_ref()
    }

    /// Expands or zooms to a cluster of the current frame.
    pub fn on_cluster_clicked(&mut self, id: ClusterId) -> Option<ClusterClick> {
        let frame = self.frame.as_ref()?;
        let cluster = frame.cluster(id)?;
        self.metrics.incr("cluster.clicks", 1);
        Some(self.aggregator.click(
            cluster,
            &frame.viewport,
            &self.resolver,
            &self.projector,
            &mut self.tester,
        ))
    }

    /// Cached visual for a placement at the current zoom.
    pub fn icon(&mut self, placement: &Placement) -> Option<&MarkerIcon> {
        let zoom = self.viewport?.zoom;
        self.icons.clear_if_bucket_changed(zoom);
        Some(
            self.icons
                .get_or_insert_with(IconKey::for_placement(placement, zoom), MarkerIcon::describe),
        )
    }

    fn settle_viewport(&mut self, viewport: Viewport) {
        if self.viewport == Some(viewport) {
            return;
        }
        if self.icons.clear_if_bucket_changed(viewport.zoom) {
            self.metrics.incr("icons.cleared", 1);
        }
        self.viewport = Some(viewport);
        self.dirty = true;
    }

    fn run_pass(&mut self) {
        let Some(viewport) = self.viewport else {
            return;
        };
        self.dirty = false;

        let tiers = *self.resolver.tier_assigner();
        let extended = viewport.extended(self.config.extended_bounds_pad);
        let lod = viewport.lod();

        let mut candidates = Vec::new();
        let mut culled = Vec::new();
        for e in &self.events {
            if !extended.contains(e.location) {
                continue;
            }
            if self.config.lod_enabled && !lod.admits(e.rank) {
                culled.push(Placement {
                    event: e.clone(),
                    tier: tiers.global_tier(e.rank),
                });
                continue;
            }
            candidates.push(e.clone());
        }

        let (clusters, candidates) = if self.config.clustering_enabled {
            self.aggregator
                .cluster(candidates, &viewport, &self.projector)
        } else {
            (Vec::new(), candidates)
        };

        if self.index.prepare(&viewport, self.generation) {
            self.metrics.incr("index.rebuilds", 1);
        } else {
            self.metrics.incr("index.reuses", 1);
        }

        let budget = self.config.effective_budget();
        let (resolution, stats) = self.resolver.resolve_with(
            &candidates,
            &viewport,
            budget,
            &self.projector,
            &mut self.index,
            &mut self.tester,
        );

        let mut hidden = resolution.hidden;
        if !culled.is_empty() {
            hidden.extend(culled);
            hidden.sort_by_key(|p| p.event.rank);
        }

        let pass = self.frame.as_ref().map_or(1, |f| f.pass + 1);
        self.metrics.incr("passes", 1);
        self.metrics.incr("pass.evicted", stats.evicted as u64);
        self.metrics.incr("pass.excluded", stats.excluded as u64);
        self.metrics.record("pass.visible", resolution.visible.len() as u64);
        self.metrics.record("pass.hidden", hidden.len() as u64);
        self.metrics.record("pass.clusters", clusters.len() as u64);
        debug!(
            "pass {pass}: {} visible, {} hidden, {} clusters, lod {}",
            resolution.visible.len(),
            hidden.len(),
            clusters.len(),
            lod.as_str()
        );

        self.frame = Some(DeclutterFrame {
            pass,
            viewport,
            visible: resolution.visible,
            hidden,
            clusters,
        });
    }
}
