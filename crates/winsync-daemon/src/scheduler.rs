//! Broadcast scheduler.
//!
//! Drives the sampling cadence. Ticks never overlap: a sample that
//! runs long simply delays the next tick, and `MissedTickBehavior::
//! Delay` keeps the daemon from firing a burst of catch-up ticks
//! afterwards.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::ConnectionRegistry;
use crate::sampler::Sampler;

/// Sample-and-broadcast loop. Runs until `shutdown` fires.
pub async fn run(
    sampler: Sampler,
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("broadcast scheduler running at {interval:?}");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = shutdown.cancelled() => {
                debug!("scheduler stopping");
                return;
            }
        }

        let sample = sampler.sample().await;
        if sample.unreachable {
            warn!("environment unreachable, broadcasting empty state");
        }
        registry.broadcast_state(&Arc::new(sample.state));
    }
}
