use std::collections::BTreeMap;

use foundation::bounds::{Aabb2, GeoBounds};
use foundation::math::{LatLng, Vec2};

use crate::collision::CollisionTester;
use crate::config::DeclutterConfig;
use crate::event::{Event, EventId};
use crate::projector::Projector;
use crate::resolve::{DeclutterResolver, Resolution};
use crate::spatial::{CellKey, SpatialIndex};
use crate::viewport::Viewport;

/// Clusters are keyed by the grid cell they were formed in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub CellKey);

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cluster:{}", self.0)
    }
}

/// Dense group of candidates shown as a single marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Centroid of member screen positions, back in geographic coordinates.
    pub center: LatLng,
    /// Members in candidate order.
    pub members: Vec<Event>,
    pub bounds: GeoBounds,
    /// Pixel box around the members at the viewport the cluster was formed in.
    pub extent: Aabb2,
    /// Best-ranked member; the first one on ties.
    pub representative: EventId,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.members.iter().any(|e| &e.id == id)
    }
}

/// Outcome of clicking a cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterClick {
    /// Small cluster or fine zoom: its members laid out in place.
    Expand(Resolution),
    /// Ask the host to fit the viewport to these bounds.
    ZoomTo(GeoBounds),
}

/// Grid-cell density clustering ahead of placement.
#[derive(Debug, Clone)]
pub struct ClusterAggregator {
    pub cell_px: f64,
    pub min_size: usize,
    pub expand_max_members: usize,
    pub expand_zoom: f64,
}

impl ClusterAggregator {
    pub fn new(config: &DeclutterConfig) -> Self {
        Self {
            cell_px: config.grid_cell_size_px,
            min_size: config.cluster_min_size.max(1),
            expand_max_members: config.cluster_expand_max_members,
            expand_zoom: config.cluster_expand_zoom,
        }
    }

    /// Splits `candidates` into clusters and the remaining standalone events.
    ///
    /// Candidates without a screen position are never clustered; they pass
    /// through to the remainder. Both outputs keep candidate order, and
    /// clusters come out in cell order.
    pub fn cluster<P: Projector>(
        &self,
        candidates: Vec<Event>,
        viewport: &Viewport,
        projector: &P,
    ) -> (Vec<Cluster>, Vec<Event>) {
        let mut cells: BTreeMap<CellKey, Vec<(usize, Vec2)>> = BTreeMap::new();
        for (i, e) in candidates.iter().enumerate() {
            if let Some(p) = projector.project(e.location, viewport)
                && p.is_finite()
            {
                cells
                    .entry(CellKey::of(p, self.cell_px))
                    .or_default()
                    .push((i, p));
            }
        }

        let mut owner: Vec<Option<usize>> = vec![None; candidates.len()];
        let mut groups: Vec<(CellKey, Vec<Vec2>)> = Vec::new();
        for (key, entries) in cells {
            if entries.len() < self.min_size {
                continue;
            }
            for &(i, _) in &entries {
                owner[i] = Some(groups.len());
            }
            groups.push((key, entries.into_iter().map(|(_, p)| p).collect()));
        }

        let mut members: Vec<Vec<Event>> = vec![Vec::new(); groups.len()];
        let mut rest = Vec::with_capacity(candidates.len());
        for (event, slot) in candidates.into_iter().zip(owner) {
            match slot {
                Some(g) => members[g].push(event),
                None => rest.push(event),
            }
        }

        let clusters = groups
            .into_iter()
            .zip(members)
            .filter_map(|((key, points), members)| {
                build_cluster(ClusterId(key), points, members, viewport, projector)
            })
            .collect();
        (clusters, rest)
    }

    pub fn should_expand(&self, cluster: &Cluster, zoom: f64) -> bool {
        cluster.len() <= self.expand_max_members || zoom >= self.expand_zoom
    }

    /// Expands small clusters (budget = member count) or asks for a zoom.
    ///
    /// The expansion pass runs through `tester`, so it sees the same
    /// collision mode as regular passes.
    pub fn click<P: Projector>(
        &self,
        cluster: &Cluster,
        viewport: &Viewport,
        resolver: &DeclutterResolver,
        projector: &P,
        tester: &mut CollisionTester,
    ) -> ClusterClick {
        if !self.should_expand(cluster, viewport.zoom) {
            return ClusterClick::ZoomTo(cluster.bounds);
        }
        let mut index = SpatialIndex::new(resolver.cell_px());
        index.prepare(viewport, 0);
        let (resolution, _) = resolver.resolve_with(
            &cluster.members,
            viewport,
            cluster.len(),
            projector,
            &mut index,
            tester,
        );
        ClusterClick::Expand(resolution)
    }
}

fn build_cluster<P: Projector>(
    id: ClusterId,
    points: Vec<Vec2>,
    members: Vec<Event>,
    viewport: &Viewport,
    projector: &P,
) -> Option<Cluster> {
    let bounds = GeoBounds::from_points(members.iter().map(|e| e.location))?;
    let representative = members
        .iter()
        .min_by_key(|e| e.rank)
        .map(|e| e.id.clone())?;

    let extent = Aabb2::from_points(points.iter().copied())?;
    let n = points.len() as f64;
    let sum = points.iter().fold(Vec2::ZERO, |acc, &p| acc + p);
    let center = projector
        .unproject(sum.scale(1.0 / n), viewport)
        .unwrap_or_else(|| bounds.center());

    Some(Cluster {
        id,
        center,
        members,
        bounds,
        extent,
        representative,
    })
}
