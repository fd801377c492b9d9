use foundation::bounds::GeoBounds;
use foundation::math::LatLng;
use serde::{Deserialize, Serialize};

/// Discrete marker size category, largest first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderTier {
    Top,
    High,
    Normal,
}

impl RenderTier {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderTier::Top => "top",
            RenderTier::High => "high",
            RenderTier::Normal => "normal",
        }
    }
}

/// Two-tier size assignment: global rank first, then rank within the local
/// visible set.
///
/// Tier feeds the collision footprint while the visible set feeds the tier,
/// so assignment happens in two named phases instead of iterating to a fixed
/// point:
///
/// - [`TierAssigner::seed_tier`] runs before placement and only looks at the
///   global rank. Anything not globally top is seeded as `High`, the largest
///   tier it could still end up with.
/// - [`TierAssigner::finalize_tiers`] runs once on the final visible set. It
///   can keep or demote a seed tier but never promote one, so the placement
///   stays overlap-free without another collision pass. Demoted markers may
///   leave a little more room around them than strictly needed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TierAssigner {
    /// Ranks at or below this are always `Top`.
    pub top_rank_cutoff: u32,
    /// Size of the local top list that earns `High`.
    pub local_high_count: usize,
}

impl Default for TierAssigner {
    fn default() -> Self {
        Self {
            top_rank_cutoff: 5,
            local_high_count: 10,
        }
    }
}

impl TierAssigner {
    pub fn is_global_top(&self, rank: u32) -> bool {
        rank <= self.top_rank_cutoff
    }

    /// Tier for an event with no local context (hidden events).
    pub fn global_tier(&self, rank: u32) -> RenderTier {
        if self.is_global_top(rank) {
            RenderTier::Top
        } else {
            RenderTier::Normal
        }
    }

    /// Provisional tier used while placing markers.
    pub fn seed_tier(&self, rank: u32) -> RenderTier {
        if self.is_global_top(rank) {
            RenderTier::Top
        } else {
            RenderTier::High
        }
    }

    /// `local_position` is the event's 0-based position among the locally
    /// visible events sorted by rank, `None` if it is not locally visible.
    pub fn tier(&self, rank: u32, local_position: Option<usize>) -> RenderTier {
        if self.is_global_top(rank) {
            return RenderTier::Top;
        }
        match local_position {
            Some(pos) if pos < self.local_high_count => RenderTier::High,
            _ => RenderTier::Normal,
        }
    }

    /// Final tiers for a visible set, index-aligned with `members`.
    ///
    /// Only members inside `viewport_bounds` (not the extended bounds) compete
    /// for the local list; globally top events take local slots as well. Equal
    /// ranks keep their order in `members`.
    pub fn finalize_tiers(
        &self,
        members: &[(u32, LatLng)],
        viewport_bounds: &GeoBounds,
    ) -> Vec<RenderTier> {
        let mut local: Vec<usize> = (0..members.len())
            .filter(|&i| viewport_bounds.contains(members[i].1))
            .collect();
        local.sort_by_key(|&i| members[i].0);

        let mut position: Vec<Option<usize>> = vec![None; members.len()];
        for (pos, &i) in local.iter().enumerate() {
            position[i] = Some(pos);
        }

        members
            .iter()
            .zip(position)
            .map(|(&(rank, _), pos)| self.tier(rank, pos))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_ranks_are_top_regardless_of_viewport() {
        let t = TierAssigner::default();
        assert_eq!(t.tier(1, None), RenderTier::Top);
        assert_eq!(t.tier(5, None), RenderTier::Top);
        assert_eq!(t.tier(6, None), RenderTier::Normal);
        assert_eq!(t.tier(6, Some(9)), RenderTier::High);
        assert_eq!(t.tier(6, Some(10)), RenderTier::Normal);
    }

    #[test]
    fn seed_is_never_smaller_than_final() {
        let t = TierAssigner::default();
        for rank in 1..50 {
            for pos in [None, Some(0), Some(20)] {
                assert!(t.seed_tier(rank) <= t.tier(rank, pos));
            }
        }
        assert_eq!(t.global_tier(3), RenderTier::Top);
        assert_eq!(t.global_tier(30), RenderTier::Normal);
    }

    #[test]
    fn local_top_list_only_counts_events_in_view() {
        let t = TierAssigner {
            top_rank_cutoff: 1,
            local_high_count: 2,
        };
        let inside = LatLng::new(1.0, 1.0);
        let outside = LatLng::new(50.0, 50.0);
        let members = vec![
            (1, inside),
            (40, outside),
            (30, inside),
            (20, inside),
            (10, outside),
        ];
        let bounds = GeoBounds::new(0.0, 0.0, 2.0, 2.0);
        let tiers = t.finalize_tiers(&members, &bounds);
        // In view, by rank: 1 (top, takes a slot), 20 (high), 30 (normal).
        assert_eq!(
            tiers,
            vec![
                RenderTier::Top,
                RenderTier::Normal,
                RenderTier::Normal,
                RenderTier::High,
                RenderTier::Normal,
            ]
        );
    }
}
