//! capgate server
//!
//! Serves per-identity capability listings and invocations over HTTP.
//! Schemas come from the form-schema API configured in `capgate.toml`, or,
//! for local runs, from a JSON file mapping identities to schemas.
//!
//! The cache admin endpoints listen on a separate address, loopback by
//! default.
//!
//! Usage:
//!   capgate-server --config capgate.toml --port 9092 --admin-port 9093
//!   capgate-server --static-schemas schemas.json

use anyhow::{Context, Result};
use capgate_gateway::{Gateway, GatewayConfig, GatewayContext};
use capgate_model::RawSchema;
use capgate_server::{build_admin_router, build_router};
use capgate_source::{HttpSchemaSource, SchemaSource, StaticSchemaSource};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Key of the schema served to identities not listed in a static schema file.
const FALLBACK_KEY: &str = "*";

#[derive(Parser, Debug)]
#[command(name = "capgate-server")]
#[command(about = "Per-identity capability gateway")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "CAPGATE_CONFIG", default_value = "capgate.toml")]
    config: PathBuf,

    /// Address to bind (overrides config)
    #[arg(long, env = "CAPGATE_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "CAPGATE_PORT")]
    port: Option<u16>,

    /// Address for the cache admin endpoints (overrides config)
    #[arg(long, env = "CAPGATE_ADMIN_HOST")]
    admin_host: Option<String>,

    /// Port for the cache admin endpoints (overrides config)
    #[arg(long, env = "CAPGATE_ADMIN_PORT")]
    admin_port: Option<u16>,

    /// Form-schema API URL (overrides config)
    #[arg(long, env = "CAPGATE_SCHEMA_URL")]
    schema_url: Option<String>,

    /// Serve schemas from a JSON file (`{"<identity>": {"fieldList": [..]}}`,
    /// `"*"` for everyone else) instead of the form-schema API
    #[arg(long)]
    static_schemas: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let mut config = GatewayConfig::load_from(&args.config).context("Failed to load config")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.admin_host {
        config.server.admin_host = host;
    }
    if let Some(port) = args.admin_port {
        config.server.admin_port = port;
    }
    if let Some(url) = args.schema_url {
        config.schema_source.url = url;
    }

    let source: Arc<dyn SchemaSource> = match &args.static_schemas {
        Some(path) => Arc::new(load_static_schemas(path)?),
        None => Arc::new(
            HttpSchemaSource::new(config.schema_source.clone())
                .context("Failed to build schema API client")?,
        ),
    };
    info!("Schema source: {}", source.source_name());

    let gateway = Arc::new(Gateway::new(GatewayContext::new(source, &config)));
    let app = build_router(Arc::clone(&gateway));
    let admin = build_admin_router(gateway);

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let admin_addr = config.server.admin_bind_addr();
    let admin_listener = TcpListener::bind(&admin_addr)
        .await
        .with_context(|| format!("Failed to bind admin listener {admin_addr}"))?;
    info!("capgate listening on {} (admin on {})", addr, admin_addr);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    tokio::try_join!(
        async {
            axum::serve(listener, app)
                .with_graceful_shutdown(stopped(stop_rx.clone()))
                .await
        },
        async {
            axum::serve(admin_listener, admin)
                .with_graceful_shutdown(stopped(stop_rx.clone()))
                .await
        },
    )
    .context("HTTP server failed")?;

    info!("capgate stopped");
    Ok(())
}

fn load_static_schemas(path: &Path) -> Result<StaticSchemaSource> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read static schemas {:?}", path))?;
    let mut schemas: BTreeMap<String, RawSchema> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to decode static schemas {:?}", path))?;

    let mut source = StaticSchemaSource::new();
    if let Some(fallback) = schemas.remove(FALLBACK_KEY) {
        source = source.with_fallback(fallback);
    }
    if schemas.is_empty() {
        warn!("Static schema file {:?} lists no identities", path);
    }
    for (identity, schema) in schemas {
        source = source.with_schema(&identity, schema);
    }
    info!("Loaded static schemas from {:?}", path);
    Ok(source)
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
