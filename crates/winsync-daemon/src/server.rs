//! TCP server wiring.
//!
//! Owns the listener, the broadcast scheduler and the set of session
//! tasks. Binding is the only operation allowed to fail the daemon;
//! everything after that degrades per-session or per-tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::adapter::EnvironmentAdapter;
use crate::error::{DaemonError, Result};
use crate::executor::Executor;
use crate::registry::ConnectionRegistry;
use crate::sampler::Sampler;
use crate::{scheduler, session};

/// Bound on the graceful-shutdown drain.
pub const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Broadcast cadence.
    pub interval: Duration,
    /// Restrict the window list to one process.
    pub filter_pid: Option<i32>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            interval: Duration::from_secs(1),
            filter_pid: None,
        }
    }
}

/// A bound, not-yet-serving daemon instance.
pub struct Server {
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
    executor: Arc<Executor>,
    sampler: Sampler,
    interval: Duration,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Bind`] if the endpoint cannot be bound.
    /// This is the daemon's only fatal startup error.
    pub async fn bind(config: &ServerConfig, adapter: Arc<dyn EnvironmentAdapter>) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| DaemonError::Bind { addr: addr.clone(), source })?;
        info!("listening on {addr}");

        let registry = Arc::new(ConnectionRegistry::new());
        let executor = Arc::new(Executor::new(Arc::clone(&adapter), Arc::clone(&registry)));
        let sampler = Sampler::new(adapter, config.filter_pid);

        Ok(Self {
            listener,
            registry,
            executor,
            sampler,
            interval: config.interval,
        })
    }

    /// Actual bound address, useful when the port was 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket's local address cannot be read.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` fires, then drain.
    ///
    /// On shutdown the listener closes first (no new sessions), then
    /// the scheduler and every session get up to [`TEARDOWN_TIMEOUT`]
    /// to finish flushing.
    ///
    /// # Errors
    ///
    /// Currently infallible after bind; the `Result` leaves room for
    /// accept-loop failures to become fatal if that ever changes.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let tracker = TaskTracker::new();
        tracker.spawn(scheduler::run(
            self.sampler,
            Arc::clone(&self.registry),
            self.interval,
            shutdown.clone(),
        ));

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracker.spawn(session::run_session(
                            stream,
                            peer.to_string(),
                            Arc::clone(&self.registry),
                            Arc::clone(&self.executor),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!("accept failed: {e}");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }

        // Stop accepting before draining sessions.
        drop(self.listener);
        tracker.close();
        if tokio::time::timeout(TEARDOWN_TIMEOUT, tracker.wait())
            .await
            .is_err()
        {
            warn!("teardown timed out with sessions still draining");
        }
        info!("server stopped");
        Ok(())
    }
}
