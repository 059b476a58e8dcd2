//! worker-gateway
//!
//! ```text
//!   caller ──▶ GuardedService ──▶ primary breaker ──▶ AI worker
//!                   │                                   ▲
//!                   └──▶ HealthMonitor ──▶ health breaker ┘ (/healthz)
//!
//!   operator ──▶ admin API (/admin/breaker/*, /metrics)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use worker_gateway::admin::{self, AdminState};
use worker_gateway::config::loader::parse_config;
use worker_gateway::config::load_config;
use worker_gateway::health::HealthMonitor;
use worker_gateway::lifecycle::{shutdown_signal, Shutdown};
use worker_gateway::observability::{logging, metrics};
use worker_gateway::worker;

#[derive(Parser)]
#[command(name = "worker-gateway")]
#[command(about = "Circuit-breaking gateway for the AI worker", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        // Defaults plus environment overrides.
        None => parse_config("", |key| std::env::var(key).ok())?,
    };
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        worker = %config.worker.base_url,
        enabled = config.enabled,
        "worker-gateway starting"
    );

    let prometheus = if config.observability.metrics_enabled {
        Some(metrics::init_metrics()?)
    } else {
        None
    };

    let service = Arc::new(worker::guarded_worker(&config)?);
    let shutdown = Shutdown::new();

    let monitor = HealthMonitor::new(service.clone(), config.health_check.clone());
    let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let mut state = AdminState::new(service.clone(), &config.admin.api_key);
        if let Some(handle) = prometheus {
            state = state.with_prometheus(handle);
        }
        Some(tokio::spawn(admin::serve(listener, state, shutdown.subscribe())))
    } else {
        tracing::info!("Admin API disabled");
        None
    };

    shutdown_signal().await;
    shutdown.trigger();

    let probes = monitor_task.await?;
    tracing::debug!(probes, "Health monitor stopped");
    if let Some(task) = admin_task {
        task.await??;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
