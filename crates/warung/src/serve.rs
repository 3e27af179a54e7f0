// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `warung serve` command implementation.
//!
//! Wires the persistence facade, credential pool, NLU client, Atlantic
//! client, dialog engine, settlement processor, and gateway together,
//! then runs until a shutdown signal. The IM wire binding is external;
//! without one, outbound traffic goes through the logging transport and
//! the webhook/admin surfaces stay fully functional.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use warung_atlantic::{Client as AtlanticClient, ClientConfig, WebhookGate};
use warung_config::WarungConfig;
use warung_core::{Cache, MemoryCache, WarungError};
use warung_engine::{Engine, EngineConfig};
use warung_gemini::{NluClient, NluConfig};
use warung_keypool::KeyPool;
use warung_storage::Store;
use warung_transport::{LogTransport, Transport};

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

pub async fn run(config: WarungConfig) -> Result<(), WarungError> {
    init_tracing(&config.agent.log_level);
    info!(env = %config.agent.app_env, "starting warung");

    if !config.http.public_base_url.is_empty() {
        let webhook_url = format!(
            "{}/webhook/atlantic",
            config.http.public_base_url.trim_end_matches('/')
        );
        info!(base_url = %config.http.public_base_url, webhook_url = %webhook_url, "public base url configured");
    }

    let prometheus = warung_metrics::install(&config.agent.metrics_namespace)?;

    let store = Arc::new(Store::open(&config.database.path).await?);
    info!(path = %config.database.path, "database ready");

    if config.gemini.api_keys.is_empty() {
        warn!("no gemini api keys configured; classification will fail");
    } else {
        store.sync_keys("gemini", &config.gemini.api_keys).await?;
        info!(count = config.gemini.api_keys.len(), "gemini keys synced");
    }

    // In-process cache; a Redis binding can replace this behind the
    // same trait when cache.addr is set.
    if !config.cache.addr.is_empty() {
        warn!(addr = %config.cache.addr, "external cache binding not linked, using in-process cache");
    }
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());

    let pool = Arc::new(KeyPool::new(
        Arc::clone(&store),
        "gemini",
        chrono::Duration::hours(config.gemini.cooldown_hours),
    ));
    let _sweeper = pool.spawn_sweeper(SWEEP_INTERVAL);

    let nlu = Arc::new(NluClient::new(
        Arc::clone(&pool),
        NluConfig {
            model: config.gemini.model.clone(),
            timeout: Duration::from_secs(config.gemini.timeout_secs),
        },
    )?);

    let atlantic = Arc::new(AtlanticClient::new(
        ClientConfig {
            base_url: config.atlantic.base_url.clone(),
            api_key: config.atlantic.api_key.clone(),
            timeout: Duration::from_secs(config.atlantic.timeout_secs),
            price_ttl: Duration::from_secs(config.cache.price_ttl_secs),
        },
        Some(Arc::clone(&cache)),
    )?);

    let transport: Arc<dyn Transport> = Arc::new(LogTransport);

    let engine = Arc::new(Engine::new(
        Arc::clone(&store),
        Arc::clone(&atlantic),
        nlu,
        Arc::clone(&transport),
        EngineConfig {
            deposit_method: config.atlantic.deposit_method.clone(),
            deposit_type: config.atlantic.deposit_type.clone(),
            deposit_fee_fixed: config.atlantic.deposit_fee_fixed,
            deposit_fee_percent: config.atlantic.deposit_fee_percent,
            ..Default::default()
        },
    ));

    let processor = Arc::new(engine.settlement_processor());
    let gate = Arc::new(WebhookGate::new(
        &config.atlantic.webhook_username_md5,
        &config.atlantic.webhook_password_md5,
    ));

    let state = warung_gateway::GatewayState {
        atlantic: Arc::clone(&atlantic),
        gate,
        processor,
        prometheus_render: Some(Arc::new(move || prometheus.render())),
    };
    let app = warung_gateway::router(state, &config.http.public_base_path);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let listen_addr = config.http.listen_addr.clone();
    let server = tokio::spawn(async move {
        warung_gateway::serve(&listen_addr, app, async {
            let _ = shutdown_rx.await;
        })
        .await
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(());

    // Bounded drain: connections get this long to finish.
    match tokio::time::timeout(SHUTDOWN_DRAIN, server).await {
        Ok(joined) => joined.map_err(|e| WarungError::Internal(format!("server task: {e}")))??,
        Err(_) => warn!("drain deadline exceeded, abandoning listener"),
    }

    store.close().await?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
