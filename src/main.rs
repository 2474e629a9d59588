use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use stay_booking::adapters::cache::MemoryUnitCache;
use stay_booking::adapters::clock::SystemClock;
use stay_booking::adapters::rest_store::RestRecordStore;
use stay_booking::adapters::stripe::StripeGateway;
use stay_booking::config::{load_config, secret_from_env};
use stay_booking::engine::BookingEngine;
use stay_booking::mcp::server::{BookingMcpServer, SelectionSessions};

fn find_config_path() -> PathBuf {
    let candidates = [PathBuf::from("config.yaml"), binary_dir().join("config.yaml")];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries MCP JSON-RPC.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting stay-booking server");

    let config_path = find_config_path();
    let config = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let store_key = secret_from_env(&config.store.api_key_env)?;
    let gateway_key = secret_from_env(&config.gateway.secret_key_env)?;

    let store = Arc::new(RestRecordStore::new(
        &config.store,
        store_key,
        config.pricing.extra_bed_units.clone(),
    )?);
    let gateway = Arc::new(StripeGateway::new(&config.gateway, gateway_key)?);
    let cache = Arc::new(MemoryUnitCache::new(config.cache.max_entries));

    let engine = BookingEngine::new(store, gateway, cache, Arc::new(SystemClock), &config)?;
    tracing::info!(
        store = %config.store.base_url,
        currency = %config.gateway.currency,
        "Booking engine ready"
    );

    let sessions = SelectionSessions::from(&config.cache);
    let service = BookingMcpServer::with_sessions(engine, sessions)
        .serve(stdio())
        .await?;
    service.waiting().await?;

    Ok(())
}
