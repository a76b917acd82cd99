use anyhow::Context;
use ci_orchestrator::config::WorkerConfig;
use ci_orchestrator::queue::WorkerQueues;
use ci_orchestrator::rpc::HttpRpcClient;
use ci_orchestrator::rpc::protocol::Empty;
use ci_orchestrator::server::worker_router;
use ci_orchestrator::tracker::protocol::*;
use ci_orchestrator::tracker::types::{LeaseKey, Platform, WorkerKind};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ci-worker", version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// TOML configuration file
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long = "bind", value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Base URL the orchestrator uses to reach this worker
    #[arg(long = "public-url", value_name = "URL")]
    public_url: Option<String>,

    /// Base URL of the orchestrator's tracker
    #[arg(long = "tracker", value_name = "URL")]
    tracker: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = WorkerConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind = bind;
        if args.public_url.is_none() && args.config.is_none() {
            config.public_url = format!("http://{}", bind);
        }
    }
    if let Some(public_url) = args.public_url {
        config.public_url = public_url;
    }
    if let Some(tracker) = args.tracker {
        config.tracker_url = tracker;
    }

    let platform = Platform::new(config.os.clone(), config.arch.clone());
    tracing::info!("Starting {} worker on {}", platform, config.bind);

    // 1. Queues and RPC server. The tracker pings us during announce, so the
    //    server must be up first.
    let queues = WorkerQueues::new(config.rpc.pop_wait());
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    let server = tokio::spawn(async move { axum::serve(listener, worker_router(queues)).await });

    // 2. Announce both kinds:
    let client = HttpRpcClient::new(&config.rpc);
    let mut leases = Vec::new();
    for kind in [WorkerKind::Builder, WorkerKind::Runner] {
        let reply: AnnounceReply = client
            .call(
                &config.tracker_url,
                ENDPOINT_ANNOUNCE,
                &AnnounceArgs {
                    platform: platform.clone(),
                    kind: kind.to_string(),
                    url: config.public_url.clone(),
                },
            )
            .await
            .with_context(|| format!("announcing {} to {}", kind, config.tracker_url))?;

        tracing::info!("Announced as {} with key {}", kind, reply.key);
        leases.push((kind, reply.key));
    }

    // 3. Serve until Ctrl-C, then leave the pool:
    tracing::info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    for (kind, key) in leases {
        remove(&client, &config.tracker_url, kind, key).await;
    }

    server.abort();
    Ok(())
}

/// Cleanup is best effort: a record that is already gone is fine.
async fn remove(client: &HttpRpcClient, tracker: &str, kind: WorkerKind, key: LeaseKey) {
    let args = RemoveArgs {
        key: key.clone(),
        kind: kind.to_string(),
    };

    match client.call::<_, Empty>(tracker, ENDPOINT_REMOVE, &args).await {
        Ok(_) => tracing::info!("Removed {} {}", kind, key),
        Err(e) => tracing::warn!("Could not remove {} {}: {}", kind, key, e),
    }
}
