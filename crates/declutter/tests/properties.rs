//! Property tests for the resolution pass.
//!
//! For arbitrary pools, viewports and budgets:
//! - the visible set never exceeds the budget,
//! - every candidate inside the extended bounds lands in exactly one list,
//! - no two visible markers collide at their final tiers,
//! - identical inputs give identical partitions,
//! - a spatial index reused across a fractional zoom change resolves like a
//!   fresh one,
//! - ranks follow scores (competition ranking, monotone in score).

use std::collections::{HashMap, HashSet};

use declutter::collision::{CollisionTester, footprints_collide};
use declutter::config::CollisionFallback;
use declutter::rank::apply_ranks;
use declutter::{
    DeclutterConfig, DeclutterResolver, Event, EventId, Footprint, Projector, SpatialIndex,
    Viewport, WebMercatorProjector, compute_ranks,
};
use foundation::bounds::GeoBounds;
use foundation::math::LatLng;
use proptest::prelude::*;

const PAD: f64 = 0.5;

fn pool(points: &[(f64, f64, u32)]) -> Vec<Event> {
    let mut events: Vec<Event> = points
        .iter()
        .enumerate()
        .map(|(i, &(lat, lng, score))| {
            Event::new(format!("e{i}"), LatLng::new(lat, lng), score as f64)
        })
        .collect();
    apply_ranks(&mut events);
    events
}

fn viewport(zoom: f64) -> Viewport {
    Viewport::new(GeoBounds::new(-30.0, -60.0, 30.0, 60.0), zoom).unwrap()
}

fn points() -> impl Strategy<Value = Vec<(f64, f64, u32)>> {
    prop::collection::vec((-70.0f64..70.0, -150.0f64..150.0, 0u32..40), 0..80)
}

proptest! {
    #[test]
    fn visible_set_respects_budget(pts in points(), zoom in 1.0f64..14.0, budget in 0usize..40) {
        let events = pool(&pts);
        let r = DeclutterResolver::new(&DeclutterConfig::default())
            .resolve(&events, &viewport(zoom), budget, &WebMercatorProjector);
        prop_assert!(r.visible.len() <= budget);
    }

    #[test]
    fn partition_is_complete(pts in points(), zoom in 1.0f64..14.0, budget in 0usize..40) {
        let events = pool(&pts);
        let v = viewport(zoom);
        let r = DeclutterResolver::new(&DeclutterConfig::default())
            .resolve(&events, &v, budget, &WebMercatorProjector);

        let extended = v.extended(PAD);
        let expected: HashSet<&EventId> = events
            .iter()
            .filter(|e| extended.contains(e.location))
            .map(|e| &e.id)
            .collect();

        let mut seen: HashSet<&EventId> = HashSet::new();
        for p in r.visible.iter().chain(r.hidden.iter()) {
            prop_assert!(seen.insert(&p.event.id), "duplicate {}", p.event.id);
        }
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn visible_markers_never_collide(pts in points(), zoom in 1.0f64..14.0) {
        let events = pool(&pts);
        let v = viewport(zoom);
        let r = DeclutterResolver::new(&DeclutterConfig::default())
            .resolve(&events, &v, 300, &WebMercatorProjector);

        let placed: Vec<_> = r
            .visible
            .iter()
            .map(|p| {
                let at = WebMercatorProjector.project(p.event.location, &v).unwrap();
                (p.event.id.clone(), at, Footprint::for_tier(p.tier, zoom))
            })
            .collect();
        for (i, (ia, a, fa)) in placed.iter().enumerate() {
            for (ib, b, fb) in &placed[i + 1..] {
                let hit = footprints_collide(*a, fa, *b, fb).unwrap();
                prop_assert!(!hit, "{} and {} overlap", ia, ib);
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(pts in points(), zoom in 1.0f64..14.0, budget in 0usize..40) {
        let events = pool(&pts);
        let v = viewport(zoom);
        let resolver = DeclutterResolver::new(&DeclutterConfig::default());
        let first = resolver.resolve(&events, &v, budget, &WebMercatorProjector);
        let second = resolver.resolve(&events, &v, budget, &WebMercatorProjector);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn reused_index_resolves_like_a_fresh_one(
        pts in points(),
        zoom in 1.5f64..13.5,
        shift in -0.99f64..0.99,
        budget in 0usize..40,
    ) {
        let events = pool(&pts);
        let v = viewport(zoom);
        let resolver = DeclutterResolver::new(&DeclutterConfig::default());

        let mut index = SpatialIndex::new(resolver.cell_px());
        index.prepare(&viewport(zoom + shift), 0);
        let mut tester = CollisionTester::new(CollisionFallback::Session);
        let (warm, _) = resolver.resolve_with(
            &events,
            &viewport(zoom + shift),
            budget,
            &WebMercatorProjector,
            &mut index,
            &mut tester,
        );
        prop_assert!(warm.visible.len() <= budget);
        let (reused, _) = resolver.resolve_with(
            &events,
            &v,
            budget,
            &WebMercatorProjector,
            &mut index,
            &mut tester,
        );

        let fresh = resolver.resolve(&events, &v, budget, &WebMercatorProjector);
        prop_assert_eq!(reused, fresh);
    }

    #[test]
    fn ranks_follow_scores(scores in prop::collection::vec(0u32..20, 1..60), bump in 0usize..60) {
        let ids: Vec<EventId> = (0..scores.len()).map(|i| EventId::new(format!("e{i}"))).collect();
        let ranks = compute_ranks(ids.iter().zip(scores.iter().map(|&s| s as f64)));

        for (i, a) in ids.iter().enumerate() {
            // Rank is one plus the number of strictly better scores.
            let better = scores.iter().filter(|&&s| s > scores[i]).count() as u32;
            prop_assert_eq!(ranks[a], better + 1);
        }

        let target = bump % scores.len();
        let mut raised = scores.clone();
        raised[target] += 5;
        let after: HashMap<EventId, u32> =
            compute_ranks(ids.iter().zip(raised.iter().map(|&s| s as f64)));
        prop_assert!(after[&ids[target]] <= ranks[&ids[target]]);
    }
}
