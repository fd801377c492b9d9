use std::collections::HashMap;

use crate::event::{Event, EventId};

/// Competition ranking over a score snapshot.
///
/// Highest score gets rank 1. Equal scores share a rank and the next lower
/// score jumps to its 1-based position, so `[50, 50, 40, 10]` ranks as
/// `[1, 1, 3, 4]`. The sort is stable, so ties keep input order wherever the
/// ranks are later consumed.
pub fn compute_ranks<'a, I>(scores: I) -> HashMap<EventId, u32>
where
    I: IntoIterator<Item = (&'a EventId, f64)>,
{
    let mut sorted: Vec<(&EventId, f64)> = scores.into_iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut ranks = HashMap::with_capacity(sorted.len());
    let mut rank = 1u32;
    let mut prev: Option<f64> = None;
    for (i, (id, score)) in sorted.into_iter().enumerate() {
        if let Some(p) = prev
            && score < p
        {
            rank = i as u32 + 1;
        }
        ranks.insert(id.clone(), rank);
        prev = Some(score);
    }
    ranks
}

/// Recomputes every event's rank in place.
///
/// Returns how many events changed rank.
pub fn apply_ranks(events: &mut [Event]) -> usize {
    let ranks = compute_ranks(events.iter().map(|e| (&e.id, e.score)));
    let mut changed = 0;
    for e in events.iter_mut() {
        let Some(&r) = ranks.get(&e.id) else {
            continue;
        };
        if e.rank != r {
            e.rank = r;
            changed += 1;
        }
    }
    changed
}

/// Stable ascending-rank order; equal ranks keep their relative order.
pub fn sort_by_rank(events: &mut [Event]) {
    events.sort_by_key(|e| e.rank);
}

/// User interactions that bump an event's score.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Interaction {
    Hover,
    Click,
    Like,
    Comment,
}

/// Score mutation rules: fixed interaction bonuses, fixed periodic decay,
/// a floor and no ceiling.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScorePolicy {
    pub hover_bonus: f64,
    pub click_bonus: f64,
    pub like_bonus: f64,
    pub comment_bonus: f64,
    pub decay_amount: f64,
    pub min_score: f64,
}

impl ScorePolicy {
    pub fn bonus(&self, interaction: Interaction) -> f64 {
        match interaction {
            Interaction::Hover => self.hover_bonus,
            Interaction::Click => self.click_bonus,
            Interaction::Like => self.like_bonus,
            Interaction::Comment => self.comment_bonus,
        }
    }

    /// `score + delta`, floored at `min_score`. Non-finite deltas are ignored.
    pub fn apply(&self, score: f64, delta: f64) -> f64 {
        if !delta.is_finite() {
            return score;
        }
        (score + delta).max(self.min_score)
    }

    /// Applies `ticks` decay periods to every event.
    pub fn decay(&self, events: &mut [Event], ticks: u64) {
        if ticks == 0 {
            return;
        }
        let delta = -(self.decay_amount * ticks as f64);
        for e in events {
            e.score = self.apply(e.score, delta);
        }
    }
}
