//! Viewport-adaptive declutter and priority ranking for geolocated events.
//!
//! A resolution pass turns a ranked candidate pool plus the current viewport
//! into a bounded set of non-overlapping visible markers (each tagged with a
//! render tier) and a hidden remainder:
//!
//! `viewport filter -> LOD -> cluster (optional) -> resolve -> finalize tiers`
//!
//! [`DeclutterEngine`] drives passes from the host's viewport, pool and score
//! notifications; the individual stages are usable on their own.

pub mod cluster;
pub mod collision;
pub mod config;
pub mod engine;
pub mod event;
pub mod footprint;
pub mod icon_cache;
pub mod projector;
pub mod rank;
pub mod resolve;
pub mod spatial;
pub mod tier;
pub mod viewport;

pub use cluster::{Cluster, ClusterAggregator, ClusterClick, ClusterId};
pub use collision::{CollisionError, CollisionMode, CollisionTester};
pub use config::{CollisionFallback, ConfigError, DeclutterConfig};
pub use engine::{DeclutterEngine, DeclutterFrame};
pub use event::{Appearance, Event, EventId, IngestError, RawEvent, load_events_json};
pub use footprint::Footprint;
pub use icon_cache::{IconCache, IconKey, MarkerIcon};
pub use projector::{Projector, WebMercatorProjector};
pub use rank::{Interaction, ScorePolicy, compute_ranks};
pub use resolve::{DeclutterResolver, GeometryError, Placement, Resolution, ResolveStats};
pub use spatial::{IndexKey, SpatialIndex};
pub use tier::{RenderTier, TierAssigner};
pub use viewport::{LodLevel, Viewport, ViewportError};
