//! Background expiry of stale pending reservations

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::BookingService;

/// Periodic sweep moving old pending reservations to `wygasła`
///
/// The sweep is a single conditional update, so it can overlap with the
/// lazy expiry done by request handlers.
pub struct ExpirySweeper {
    service: Arc<BookingService>,
    interval: Duration,
}

impl ExpirySweeper {
    /// Create a sweeper running every `interval`
    pub fn new(service: Arc<BookingService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Run one sweep on the blocking pool; returns how many expired
    pub async fn sweep_once(&self) -> crate::error::Result<usize> {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || service.expire_stale())
            .await
            .map_err(|e| crate::error::Error::with_source("expiry sweep task failed", e))?
    }

    /// Spawn the sweep loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            loop {
                interval.tick().await;
                match self.sweep_once().await {
                    Ok(0) => {}
                    Ok(expired) => tracing::debug!(expired, "Expiry sweep finished"),
                    Err(e) => tracing::warn!(error = %e, "Expiry sweep failed"),
                }
            }
        })
    }
}
