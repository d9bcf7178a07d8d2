//! State sampling.
//!
//! Each tick asks the adapter for windows, desktops and monitors with
//! an independent timeout per category. A failing category degrades to
//! an empty list; sampling itself never fails, so the broadcast cadence
//! is unaffected by a wedged compositor.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use winsync_types::State;

use crate::adapter::EnvironmentAdapter;

/// Default per-category query timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// One sampling result.
#[derive(Debug, Clone)]
pub struct Sample {
    pub state: State,
    /// At least one category failed or timed out this tick.
    pub degraded: bool,
    /// Every category failed; the environment is likely gone entirely.
    pub unreachable: bool,
}

/// Samples the environment into wire-ready [`State`] snapshots.
pub struct Sampler {
    adapter: Arc<dyn EnvironmentAdapter>,
    filter_pid: Option<i32>,
    query_timeout: Duration,
}

impl Sampler {
    #[must_use]
    pub fn new(adapter: Arc<dyn EnvironmentAdapter>, filter_pid: Option<i32>) -> Self {
        Self {
            adapter,
            filter_pid,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Take one snapshot. Infallible: failed categories come back
    /// empty and are reported through the degraded flags.
    pub async fn sample(&self) -> Sample {
        let (windows, desktops, monitors) = tokio::join!(
            tokio::time::timeout(self.query_timeout, self.adapter.list_windows(self.filter_pid)),
            tokio::time::timeout(self.query_timeout, self.adapter.list_desktops()),
            tokio::time::timeout(self.query_timeout, self.adapter.list_monitors()),
        );

        let mut failures = 0u8;
        let mut windows = unwrap_category("windows", windows, &mut failures);
        let desktops = unwrap_category("desktops", desktops, &mut failures);
        let monitors = unwrap_category("monitors", monitors, &mut failures);

        // Deterministic serialization order
        windows.sort_by(|a, b| a.id.cmp(&b.id));

        Sample {
            state: State {
                windows,
                desktops,
                monitors,
                timestamp: now_unix(),
            },
            degraded: failures > 0,
            unreachable: failures == 3,
        }
    }
}

fn unwrap_category<T>(
    name: &str,
    result: Result<crate::adapter::Result<Vec<T>>, tokio::time::error::Elapsed>,
    failures: &mut u8,
) -> Vec<T> {
    match result {
        Ok(Ok(list)) => list,
        Ok(Err(e)) => {
            warn!("sampling {name} failed: {e}");
            *failures += 1;
            Vec::new()
        }
        Err(_) => {
            warn!("sampling {name} timed out");
            *failures += 1;
            Vec::new()
        }
    }
}

/// Seconds since the Unix epoch, rounded to centiseconds to keep the
/// serialized form short.
fn now_unix() -> f64 {
    let now = chrono::Utc::now();
    #[allow(clippy::cast_precision_loss)]
    let secs = now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0;
    (secs * 100.0).round() / 100.0
}
