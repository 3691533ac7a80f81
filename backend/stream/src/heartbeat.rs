//! Liveness deadline for one connection.
//!
//! Any inbound activity pushes the deadline out. There is only ever one
//! deadline: re-arming replaces it, and [`HeartbeatMonitor::expired`] builds
//! a fresh sleep from the current deadline each time it is polled anew.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(45_000);

#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl HeartbeatMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start (or restart) the deadline from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    /// Record inbound activity. No-op while disarmed.
    pub fn touch(&mut self) {
        if self.deadline.is_some() {
            self.arm();
        }
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves when the current deadline passes. Never resolves while
    /// disarmed.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expires_after_timeout() {
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(45));
        let start = Instant::now();
        hb.arm();
        hb.expired().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(45) && elapsed < Duration::from_secs(46));
    }

    #[tokio::test(start_paused = true)]
    async fn touch_pushes_deadline_out() {
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(45));
        let start = Instant::now();
        hb.arm();
        tokio::time::sleep(Duration::from_secs(30)).await;
        hb.touch();
        hb.expired().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(75) && elapsed < Duration::from_secs(76));
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_monitor_never_fires() {
        let mut hb = HeartbeatMonitor::default();
        hb.arm();
        hb.disarm();
        let fired = tokio::time::timeout(Duration::from_secs(3600), hb.expired()).await;
        assert!(fired.is_err());
    }

    #[test]
    fn touch_does_not_arm() {
        let mut hb = HeartbeatMonitor::default();
        hb.touch();
        assert!(!hb.is_armed());
    }
}
