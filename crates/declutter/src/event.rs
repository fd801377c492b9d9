use std::collections::HashSet;

use foundation::math::LatLng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque, stable event identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attributes that only affect how a marker looks, never where it goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Appearance {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawLocation {
    pub lat: f64,
    pub lng: f64,
}

/// Event record as it arrives from upstream, before validation.
///
/// Fields the core does not use (title, articles, comments, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub location: RawLocation,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(flatten)]
    pub appearance: Appearance,
}

/// Validated event.
///
/// `rank` is 0 until the pool has been ranked (see [`crate::rank::apply_ranks`]);
/// ranked events always carry a rank >= 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub location: LatLng,
    pub score: f64,
    pub rank: u32,
    pub appearance: Appearance,
}

impl Event {
    pub fn new(id: impl Into<EventId>, location: LatLng, score: f64) -> Self {
        Self {
            id: id.into(),
            location,
            score,
            rank: 0,
            appearance: Appearance::default(),
        }
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("event id must not be empty")]
    EmptyId,
    #[error("event {id}: invalid location ({lat}, {lng})")]
    InvalidLocation { id: EventId, lat: f64, lng: f64 },
    #[error("event {id}: score {score} is not finite")]
    NonFiniteScore { id: EventId, score: f64 },
    #[error("duplicate event id {0}")]
    DuplicateId(EventId),
    #[error("malformed events json: {0}")]
    Json(#[from] serde_json::Error),
}

impl TryFrom<RawEvent> for Event {
    type Error = IngestError;

    fn try_from(raw: RawEvent) -> Result<Self, Self::Error> {
        if raw.id.trim().is_empty() {
            return Err(IngestError::EmptyId);
        }
        let id = EventId::new(raw.id);

        let location = LatLng::new(raw.location.lat, raw.location.lng);
        if !location.is_valid() {
            return Err(IngestError::InvalidLocation {
                id,
                lat: location.lat,
                lng: location.lng,
            });
        }

        let score = raw.score.unwrap_or(0.0);
        if !score.is_finite() {
            return Err(IngestError::NonFiniteScore { id, score });
        }

        Ok(Event {
            id,
            location,
            score: score.max(0.0),
            rank: raw.rank.unwrap_or(0),
            appearance: raw.appearance,
        })
    }
}

/// Validates a batch, rejecting the first invalid record or repeated id.
pub fn ingest(raw: impl IntoIterator<Item = RawEvent>) -> Result<Vec<Event>, IngestError> {
    let mut seen: HashSet<EventId> = HashSet::new();
    let mut out = Vec::new();
    for r in raw {
        let event = Event::try_from(r)?;
        if !seen.insert(event.id.clone()) {
            return Err(IngestError::DuplicateId(event.id));
        }
        out.push(event);
    }
    Ok(out)
}

/// Parses and validates a JSON array of event records.
pub fn load_events_json(json: &str) -> Result<Vec<Event>, IngestError> {
    let raw: Vec<RawEvent> = serde_json::from_str(json)?;
    ingest(raw)
}
