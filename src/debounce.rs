use std::time::{Duration, Instant};

pub const DEFAULT_RESIZE_QUIET: Duration = Duration::from_millis(300);

/// Trailing-edge debounce. Each `trigger` replaces the pending deadline;
/// `poll` fires once after the quiet period.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Applies to the next `trigger`; a pending deadline keeps its time.
    pub fn set_quiet(&mut self, quiet: Duration) {
        self.quiet = quiet;
    }

    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Time left before the pending action is due, zero if overdue.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(now))
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_RESIZE_QUIET)
    }
}
