//! Winsync daemon entry point.
//!
//! Without `--serve` the daemon takes a single snapshot and prints it
//! to stdout. With `--serve` it runs the broadcast server until
//! interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use winsync_daemon::{KwinAdapter, Sampler, Server, ServerConfig};

/// Winsync daemon - KWin state broadcaster and command server
#[derive(Parser, Debug)]
#[command(name = "winsync-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to bind in --serve mode
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind in --serve mode
    #[arg(long, default_value_t = 8765)]
    port: u16,

    /// Broadcast interval in seconds
    #[arg(long, default_value_t = 1.0)]
    interval: f64,

    /// Only include windows belonging to this process id
    #[arg(long)]
    pid: Option<i32>,

    /// Run the broadcast server instead of printing one snapshot
    #[arg(long)]
    serve: bool,

    /// Pretty-print the snapshot in one-shot mode
    #[arg(long)]
    pretty: bool,

    /// KWin systemd user unit to read script output from
    #[arg(long, default_value = "auto")]
    service: String,
}

/// Set up logging with file output for debugging.
/// In debug builds, defaults to debug level and logs to timestamped file.
/// In release builds, defaults to info level and logs to stderr.
fn setup_logging() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("winsync={default_level}")));

    if cfg!(debug_assertions) {
        let temp_dir = std::env::temp_dir();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let log_filename = format!("winsync-daemon-{timestamp}.log");
        let log_path = temp_dir.join(&log_filename);

        #[cfg(unix)]
        {
            let symlink_path = temp_dir.join("winsync-daemon.log");
            let _ = std::fs::remove_file(&symlink_path);
            let _ = std::os::unix::fs::symlink(&log_path, &symlink_path);
        }

        let file_appender = tracing_appender::rolling::never(&temp_dir, &log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        std::mem::forget(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer)
            .with(filter)
            .init();

        eprintln!("Logging to: {} (and stderr)", log_path.display());
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    setup_logging();

    let adapter = Arc::new(KwinAdapter::new(Some(&args.service)).await);

    if args.serve {
        anyhow::ensure!(
            args.interval.is_finite() && args.interval > 0.0,
            "--interval must be a positive number of seconds"
        );

        info!("Starting winsync daemon...");
        let config = ServerConfig {
            host: args.host,
            port: args.port,
            interval: Duration::from_secs_f64(args.interval),
            filter_pid: args.pid,
        };
        let server = Server::bind(&config, adapter).await?;

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                signal_token.cancel();
            }
        });

        server.serve(shutdown).await?;
        info!("Winsync daemon stopped");
    } else {
        let sampler = Sampler::new(adapter, args.pid);
        let sample = sampler.sample().await;
        if sample.unreachable {
            anyhow::bail!("could not reach the windowing environment");
        }
        let json = if args.pretty {
            serde_json::to_string_pretty(&sample.state)?
        } else {
            serde_json::to_string(&sample.state)?
        };
        println!("{json}");
    }

    Ok(())
}
