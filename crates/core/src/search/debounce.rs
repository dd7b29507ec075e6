//! Trailing debounce timer. Every restart pushes the deadline out by the full
//! delay; only a quiet period of `delay` lets the value settle.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Cancel any pending deadline and start a new one from `now`
    pub fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and return true if the deadline has passed
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Resolve at `deadline`, or never when there is none
pub async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_pushes_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        debouncer.restart(start);
        debouncer.restart(start + Duration::from_millis(400));

        assert!(!debouncer.fire_if_due(start + Duration::from_millis(600)));
        assert!(debouncer.fire_if_due(start + Duration::from_millis(900)));
        assert_eq!(debouncer.deadline(), None);
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.restart(start);
        debouncer.cancel();
        assert!(!debouncer.fire_if_due(start + Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until() {
        let deadline = Instant::now() + Duration::from_millis(500);
        wait_until(Some(deadline)).await;
        assert!(Instant::now() >= deadline);

        let never = tokio::time::timeout(Duration::from_secs(60), wait_until(None)).await;
        assert!(never.is_err());
    }
}
