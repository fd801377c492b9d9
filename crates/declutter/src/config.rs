use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rank::ScorePolicy;
use crate::tier::TierAssigner;

/// Smallest visible budget the engine will ever use.
pub const MIN_VISIBLE_BUDGET: usize = 5;

/// What happens after the footprint-based collision test fails once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionFallback {
    /// Stay on the center-distance test for the rest of the session.
    #[default]
    Session,
    /// Retry the footprint test at the start of every pass.
    Pass,
}

/// Process-wide tuning, set once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclutterConfig {
    pub visible_budget: usize,
    pub max_visible_budget: usize,
    pub grid_cell_size_px: f64,
    pub decay_interval_ms: u64,
    pub decay_amount: f64,
    pub hover_bonus: f64,
    pub click_bonus: f64,
    pub like_bonus: f64,
    pub comment_bonus: f64,
    pub min_score: f64,
    pub rank_recompute_interval_ms: u64,
    pub cluster_min_size: usize,
    pub clustering_enabled: bool,
    pub debounce_ms: u64,
    pub extended_bounds_pad: f64,
    pub lod_enabled: bool,
    pub top_rank_cutoff: u32,
    pub local_high_count: usize,
    pub cluster_expand_max_members: usize,
    pub cluster_expand_zoom: f64,
    pub collision_fallback: CollisionFallback,
}

impl Default for DeclutterConfig {
    fn default() -> Self {
        Self {
            visible_budget: 300,
            max_visible_budget: 300,
            grid_cell_size_px: 50.0,
            decay_interval_ms: 10_000,
            decay_amount: 3.0,
            hover_bonus: 5.0,
            click_bonus: 10.0,
            like_bonus: 25.0,
            comment_bonus: 15.0,
            min_score: 0.0,
            rank_recompute_interval_ms: 60_000,
            cluster_min_size: 3,
            clustering_enabled: false,
            debounce_ms: 100,
            extended_bounds_pad: 0.5,
            lod_enabled: true,
            top_rank_cutoff: 5,
            local_high_count: 10,
            cluster_expand_max_members: 5,
            cluster_expand_zoom: 12.0,
            collision_fallback: CollisionFallback::Session,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite number >= 0, got {value}")]
    NotNonNegative { field: &'static str, value: f64 },
    #[error("gridCellSizePx must be > 0, got {0}")]
    CellSize(f64),
    #[error("{0} must be > 0")]
    ZeroInterval(&'static str),
    #[error("maxVisibleBudget {0} is below the minimum budget of 5")]
    BudgetCeiling(usize),
    #[error("clusterMinSize must be >= 2, got {0}")]
    ClusterMinSize(usize),
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeclutterConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid_cell_size_px.is_finite() && self.grid_cell_size_px > 0.0) {
            return Err(ConfigError::CellSize(self.grid_cell_size_px));
        }
        if self.decay_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("decayIntervalMs"));
        }
        if self.rank_recompute_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("rankRecomputeIntervalMs"));
        }
        if self.max_visible_budget < MIN_VISIBLE_BUDGET {
            return Err(ConfigError::BudgetCeiling(self.max_visible_budget));
        }
        if self.cluster_min_size < 2 {
            return Err(ConfigError::ClusterMinSize(self.cluster_min_size));
        }
        for (field, value) in [
            ("decayAmount", self.decay_amount),
            ("hoverBonus", self.hover_bonus),
            ("clickBonus", self.click_bonus),
            ("likeBonus", self.like_bonus),
            ("commentBonus", self.comment_bonus),
            ("minScore", self.min_score),
            ("extendedBoundsPad", self.extended_bounds_pad),
            ("clusterExpandZoom", self.cluster_expand_zoom),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NotNonNegative { field, value });
            }
        }
        Ok(())
    }

    /// Requested budget clamped to `[MIN_VISIBLE_BUDGET, max_visible_budget]`.
    pub fn effective_budget(&self) -> usize {
        self.visible_budget
            .clamp(MIN_VISIBLE_BUDGET, self.max_visible_budget.max(MIN_VISIBLE_BUDGET))
    }

    pub fn score_policy(&self) -> ScorePolicy {
        ScorePolicy {
            hover_bonus: self.hover_bonus,
            click_bonus: self.click_bonus,
            like_bonus: self.like_bonus,
            comment_bonus: self.comment_bonus,
            decay_amount: self.decay_amount,
            min_score: self.min_score,
        }
    }

    pub fn tier_assigner(&self) -> TierAssigner {
        TierAssigner {
            top_rank_cutoff: self.top_rank_cutoff,
            local_high_count: self.local_high_count,
        }
    }
}
