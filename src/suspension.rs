//! Suspension backoff.
//!
//! After a failure a port refuses I/O and reconnect attempts until its
//! suspension window has elapsed. Repeated failures inside an open window do
//! not push the deadline forward.

use std::time::{Duration, Instant};

/// Default backoff after a failed operation.
pub const DEFAULT_SUSPEND_DELAY: Duration = Duration::from_secs(5);

/// Tracks the "suspended until" deadline of one port.
#[derive(Debug, Clone)]
pub struct Suspension {
    delay: Duration,
    until: Option<Instant>,
}

impl Default for Suspension {
    fn default() -> Self {
        Self::new(DEFAULT_SUSPEND_DELAY)
    }
}

impl Suspension {
    /// Create an active (not suspended) policy with the given backoff.
    pub fn new(delay: Duration) -> Self {
        Self { delay, until: None }
    }

    /// Configured backoff.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Start a suspension window unless one is already running.
    ///
    /// Returns `true` if a new window was started.
    pub fn suspend(&mut self) -> bool {
        self.suspend_at(Instant::now())
    }

    fn suspend_at(&mut self, now: Instant) -> bool {
        if self.is_suspended_at(now) {
            return false;
        }
        self.until = Some(now + self.delay);
        true
    }

    /// Whether the port is inside a suspension window.
    pub fn is_suspended(&self) -> bool {
        self.is_suspended_at(Instant::now())
    }

    fn is_suspended_at(&self, now: Instant) -> bool {
        self.until.map(|until| now < until).unwrap_or(false)
    }

    /// Time left in the current window, zero when active.
    pub fn remaining(&self) -> Duration {
        self.until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// Back to active, called after a successful reconnect.
    pub fn clear(&mut self) {
        self.until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_active() {
        let s = Suspension::new(Duration::from_secs(5));
        assert!(!s.is_suspended());
        assert_eq!(s.remaining(), Duration::ZERO);
    }

    #[test]
    fn test_suspend_and_clear() {
        let mut s = Suspension::new(Duration::from_secs(5));
        assert!(s.suspend());
        assert!(s.is_suspended());
        assert!(s.remaining() > Duration::from_secs(4));

        s.clear();
        assert!(!s.is_suspended());
    }

    #[test]
    fn test_second_suspend_does_not_extend_window() {
        let start = Instant::now();
        let mut s = Suspension::new(Duration::from_secs(5));
        assert!(s.suspend_at(start));
        let deadline = s.until;

        assert!(!s.suspend_at(start + Duration::from_secs(3)));
        assert_eq!(s.until, deadline);
    }

    #[test]
    fn test_suspend_after_expiry_starts_new_window() {
        let start = Instant::now();
        let mut s = Suspension::new(Duration::from_secs(5));
        s.suspend_at(start);

        let later = start + Duration::from_secs(6);
        assert!(!s.is_suspended_at(later));
        assert!(s.suspend_at(later));
        assert_eq!(s.until, Some(later + Duration::from_secs(5)));
    }

    #[test]
    fn test_window_lasts_at_least_delay() {
        let mut s = Suspension::new(Duration::from_millis(60));
        s.suspend();
        thread::sleep(Duration::from_millis(20));
        assert!(s.is_suspended());
        thread::sleep(Duration::from_millis(60));
        assert!(!s.is_suspended());
    }
}
