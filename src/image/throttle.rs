use std::time::Duration;
use tokio::time::Instant;

/// Gap that must be exceeded between two progress events of one pull
pub const PROGRESS_GAP: Duration = Duration::from_millis(500);

/// Lets an event through only when more than `gap` passed since the last one.
/// The first event always passes.
#[derive(Debug)]
pub struct ProgressThrottle {
    gap: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub fn new(gap: Duration) -> Self {
        Self { gap, last: None }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) <= self.gap => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(PROGRESS_GAP)
    }
}
