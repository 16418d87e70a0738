// Timer-based coalescing for live search input
use std::time::{Duration, Instant};

/// Default quiet period before live input fires a search
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds back a value until no newer one has arrived for `window`.
///
/// The caller owns the clock: `push` on every input event, `poll` from the
/// event loop. Only the last value of a burst ever comes out of `poll`.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace whatever is pending and restart the window
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            deadline: now + self.window,
        });
    }

    /// Take the pending value if its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// Drop the pending value, e.g. when an explicit search supersedes it
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// How long the event loop may sleep before the next `poll` matters
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| p.deadline.saturating_duration_since(now))
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_only_fires_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));
        let mut fired = Vec::new();

        // "c", "ca", "cat" typed 100ms apart, polling every 50ms
        let inputs = [(0, "c"), (100, "ca"), (200, "cat")];
        for t in (0..=1000).step_by(50) {
            for (at, value) in inputs {
                if at == t {
                    debouncer.push(value, start + ms(at));
                }
            }
            if let Some(value) = debouncer.poll(start + ms(t)) {
                fired.push((t, value));
            }
        }

        assert_eq!(fired, vec![(500, "cat")]);
    }

    #[test]
    fn test_separate_bursts_each_fire() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));

        debouncer.push("dogs", start);
        assert_eq!(debouncer.poll(start + ms(299)), None);
        assert_eq!(debouncer.poll(start + ms(300)), Some("dogs"));
        assert_eq!(debouncer.poll(start + ms(301)), None);

        debouncer.push("cats", start + ms(400));
        assert_eq!(debouncer.poll(start + ms(700)), Some("cats"));
    }

    #[test]
    fn test_cancel_suppresses_pending() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));

        debouncer.push("cat", start);
        assert_eq!(debouncer.cancel(), Some("cat"));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(start + ms(1000)), None);
    }

    #[test]
    fn test_time_until_ready() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));
        assert_eq!(debouncer.time_until_ready(start), None);

        debouncer.push(1, start);
        assert_eq!(debouncer.time_until_ready(start + ms(100)), Some(ms(200)));
        assert_eq!(debouncer.time_until_ready(start + ms(500)), Some(Duration::ZERO));
    }
}
