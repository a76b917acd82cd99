use anyhow::Context;
use ci_orchestrator::config::OrchestratorConfig;
use ci_orchestrator::dispatch::notification::TracingSender;
use ci_orchestrator::server::Orchestrator;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ci-orchestrator", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// TOML configuration file
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long = "bind", value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Base URL workers use to reach this process
    #[arg(long = "public-url", value_name = "URL")]
    public_url: Option<String>,

    /// Seconds between reconciliation passes
    #[arg(long = "poll-interval", value_name = "SECS")]
    poll_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = OrchestratorConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind = bind;
        // Follow the bind address unless a public URL was given somewhere.
        if args.public_url.is_none() && args.config.is_none() {
            config.public_url = format!("http://{}", bind);
        }
    }
    if let Some(public_url) = args.public_url {
        config.public_url = public_url;
    }
    if let Some(secs) = args.poll_interval {
        config.poll_interval_secs = secs;
    }
    config.validate()?;

    tracing::info!("Starting orchestrator on {}", config.bind);
    tracing::info!("Workers report to {}", config.public_url);
    tracing::info!(
        "Work: {} attempts, {}s timeout; notifications: {} attempts, {}s timeout",
        config.work.max_attempts,
        config.work.attempt_timeout_secs,
        config.notifications.max_attempts,
        config.notifications.attempt_timeout_secs
    );

    // 1. Components:
    let orchestrator = Orchestrator::in_memory(&config, Arc::new(TracingSender));

    // 2. Reconciliation loops:
    let _loops = orchestrator.start(config.poll_interval());

    // 3. HTTP server:
    let app = orchestrator.router();
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;

    tracing::info!("Press Ctrl+C to shutdown");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
