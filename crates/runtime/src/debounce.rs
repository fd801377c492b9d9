use foundation::time::Millis;

/// Trailing-edge debouncer with latest-wins semantics.
///
/// Every `submit` replaces the pending value and pushes the deadline out by
/// `delay_ms`. `poll` hands the value back once the deadline has passed.
/// There is no cancellation: a newer submission simply supersedes the older
/// one.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay_ms: u64,
    pending: Option<(Millis, T)>,
    superseded: u64,
}

impl<T> Debouncer<T> {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
            superseded: 0,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn submit(&mut self, value: T, now: Millis) {
        if self.pending.is_some() {
            self.superseded += 1;
        }
        self.pending = Some((now.plus(self.delay_ms), value));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Instant at which the pending value settles.
    pub fn deadline(&self) -> Option<Millis> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    /// Number of submissions dropped because a newer one arrived first.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    pub fn poll(&mut self, now: Millis) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns the pending value immediately, ignoring the deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }
}
