//! likecast server
//!
//! Likes every post a source account publishes through a given client on
//! behalf of every registered subscriber, and serves the registration flow.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use likecast_core::config::ClientCredentials;
use likecast_core::pipeline::{Pipeline, PipelineContext};
use likecast_core::store::{CredentialStore, RedisCredentialStore, connect_redis};
use likecast_core::upstream::HttpUpstream;
use server::{build_router, run_server};
use shutdown::{spawn_shutdown_handler, wait_for_shutdown};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// likecast - like a source account's posts for every subscriber
#[derive(Parser)]
#[command(name = "likecast-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./likecast.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    log_json: bool,

    /// Run the pipeline without the registration HTTP surface
    #[arg(long, default_value = "false")]
    skip_registration: bool,

    /// OAuth2 client id
    #[arg(long, env = "CLIENT_ID", hide_env_values = true)]
    client_id: String,

    /// OAuth2 client secret
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// App-only bearer token for rule management and the stream
    #[arg(long, env = "BEARER_TOKEN", hide_env_values = true)]
    bearer_token: String,

    /// Overrides `[store].redis_url`
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting likecast-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.listen, args.redis_url.clone());
    let config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Connect to the credential store
    tracing::info!("Connecting to Redis...");
    let conn = connect_redis(&config.store.redis_url).await.map_err(|e| {
        tracing::error!("Failed to connect to Redis: {}", e);
        e
    })?;
    let store: Arc<dyn CredentialStore> =
        Arc::new(RedisCredentialStore::new(conn, config.store.hash_key.clone()));
    tracing::info!("Redis connection established");

    let upstream = HttpUpstream::new(
        &config.upstream,
        &ClientCredentials::new(args.client_id, args.client_secret),
        args.bearer_token,
    )
    .map_err(|e| {
        tracing::error!("Failed to build HTTP clients: {}", e);
        e
    })?;
    let upstream = Arc::new(upstream);

    let context = PipelineContext::from_upstream(
        store.clone(),
        upstream.clone(),
        config.feed.clone(),
        config.dispatch.clone(),
    );
    let counters = context.counters.clone();
    let pipeline = Pipeline::new(context);

    // Shutdown is signaled by SIGTERM/SIGINT or by the pipeline stopping
    let shutdown_tx = spawn_shutdown_handler();

    let server_handle = if args.skip_registration {
        tracing::info!("Registration surface disabled");
        None
    } else {
        let state = AppState::new(
            store,
            upstream,
            config.server.redirect_uri.clone(),
            counters.clone(),
        )
        .with_success_redirect(config.server.success_redirect.clone());
        let router = build_router(state);
        let listen_addr = config.server.listen;
        let shutdown = wait_for_shutdown(shutdown_tx.subscribe());
        tracing::info!("Starting HTTP server on {}", listen_addr);
        Some(tokio::spawn(run_server(router, listen_addr, shutdown)))
    };

    let result = pipeline.run(shutdown_tx.subscribe()).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Pipeline stopped");
    }
    shutdown_tx.send_replace(true);

    if let Some(handle) = server_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
            Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
        }
    }

    let totals = counters.snapshot();
    tracing::info!(
        events_queued = totals.events_queued,
        events_dropped = totals.events_dropped,
        events_dispatched = totals.events_dispatched,
        likes_sent = totals.likes_sent,
        like_failures = totals.like_failures,
        refreshes = totals.refreshes,
        refresh_failures = totals.refresh_failures,
        "Server shutdown complete"
    );

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,likecast_core=info,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
