//! Settlement latency
//!
//! The wait between escrow and resolution models network confirmation time.
//! It sits behind a trait so tests run without sleeping.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait SettlementDelay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the tokio timer
pub struct TokioDelay;

#[async_trait]
impl SettlementDelay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Returns immediately
pub struct NoDelay;

#[async_trait]
impl SettlementDelay for NoDelay {
    async fn wait(&self, _duration: Duration) {}
}

/// Returns immediately and remembers every requested wait
#[derive(Default)]
pub struct RecordingDelay {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SettlementDelay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_delay() {
        let delay = RecordingDelay::new();
        delay.wait(Duration::from_millis(1500)).await;
        delay.wait(Duration::ZERO).await;
        assert_eq!(delay.waits(), vec![Duration::from_millis(1500), Duration::ZERO]);
    }

    #[tokio::test]
    async fn test_tokio_delay_sleeps() {
        let start = std::time::Instant::now();
        TokioDelay.wait(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
