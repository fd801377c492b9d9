use std::collections::BTreeMap;

/// Deterministic counters and distributions for resolution passes.
///
/// Keys are static names and stored in sorted maps, so snapshots come out in
/// a stable order regardless of recording order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    distributions: BTreeMap<&'static str, Distribution>,
}

/// Running summary of recorded samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Distribution {
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
    /// Most recent sample.
    pub last: u64,
}

impl Distribution {
    pub fn record(&mut self, value: u64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
        self.last = value;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
    pub distributions: Vec<(&'static str, Distribution)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn incr(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn record(&mut self, name: &'static str, value: u64) {
        self.distributions.entry(name).or_default().record(value);
    }

    pub fn distribution(&self, name: &str) -> Option<Distribution> {
        self.distributions.get(name).copied()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (*k, *v)).collect(),
            distributions: self.distributions.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Distribution, Metrics};

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.incr("passes", 1);
        m.incr("passes", 2);
        assert_eq!(m.counter("passes"), 3);
        assert_eq!(m.counter("missing"), 0);
    }

    #[test]
    fn distribution_tracks_min_max_last() {
        let mut d = Distribution::default();
        assert_eq!(d.mean(), None);
        d.record(5);
        d.record(2);
        d.record(8);
        assert_eq!((d.count, d.sum, d.min, d.max, d.last), (3, 15, 2, 8, 8));
        assert_eq!(d.mean(), Some(5.0));
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let mut m = Metrics::new();
        m.incr("b", 1);
        m.incr("a", 1);
        m.record("visible", 3);
        m.record("hidden", 4);
        let snap = m.snapshot();
        assert_eq!(snap.counters, vec![("a", 1), ("b", 1)]);
        assert_eq!(snap.distributions[0].0, "hidden");
        assert_eq!(snap.distributions[1].0, "visible");
    }
}
