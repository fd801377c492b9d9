use foundation::time::Millis;

/// Fixed-period tick source for a cooperative host loop.
///
/// The timer never fires by itself; the host calls [`IntervalTimer::poll`]
/// with the current instant and receives the number of whole periods that
/// elapsed since the last firing. Late polls therefore catch up instead of
/// silently dropping ticks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IntervalTimer {
    period_ms: u64,
    next_due: Millis,
}

impl IntervalTimer {
    /// A zero period is bumped to 1ms so the timer always advances.
    pub fn new(period_ms: u64, start: Millis) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_due: start.plus(period_ms),
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn next_due(&self) -> Millis {
        self.next_due
    }

    pub fn poll(&mut self, now: Millis) -> u64 {
        if now < self.next_due {
            return 0;
        }
        let fired = now.since(self.next_due) / self.period_ms + 1;
        self.next_due = self.next_due.plus(fired * self.period_ms);
        fired
    }

    /// Restarts the period from `now`.
    pub fn reset(&mut self, now: Millis) {
        self.next_due = now.plus(self.period_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::IntervalTimer;
    use foundation::time::Millis;

    #[test]
    fn fires_once_per_period() {
        let mut t = IntervalTimer::new(10, Millis(0));
        assert_eq!(t.poll(Millis(9)), 0);
        assert_eq!(t.poll(Millis(10)), 1);
        assert_eq!(t.poll(Millis(15)), 0);
        assert_eq!(t.poll(Millis(20)), 1);
    }

    #[test]
    fn late_poll_catches_up() {
        let mut t = IntervalTimer::new(10, Millis(0));
        assert_eq!(t.poll(Millis(35)), 3);
        assert_eq!(t.next_due(), Millis(40));
    }

    #[test]
    fn reset_restarts_period() {
        let mut t = IntervalTimer::new(10, Millis(0));
        t.reset(Millis(7));
        assert_eq!(t.poll(Millis(16)), 0);
        assert_eq!(t.poll(Millis(17)), 1);
    }
}
