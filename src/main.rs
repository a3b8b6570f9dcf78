mod actor_framework;
mod app_system;
mod catalog;
mod checkout;
mod clients;
mod domain;
mod fulfillment;
mod http;
mod integrations;
mod inventory_actor;
mod order_actor;
mod price_decay;
mod product_actor;
mod webhooks;

#[cfg(test)]
mod mock_framework;

use std::time::Duration;

use tracing::{error, info, Instrument};

use crate::app_system::{setup_tracing, AppConfig, StoreSystem};
use crate::price_decay::run_price_decay;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = AppConfig::load().map_err(|e| e.to_string())?;
    info!(bind_addr = %config.server.bind_addr, "Starting storefront");

    let system = StoreSystem::from_config(&config).map_err(|e| e.to_string())?;

    if let Some(path) = &config.catalog_seed {
        let span = tracing::info_span!("catalog_seed", path = %path);
        let listed = system
            .seed_catalog(path)
            .instrument(span)
            .await
            .map_err(|e| e.to_string())?;
        info!(listed, "Catalog seeded");
    }

    let decay_task = config.pricing.decay_enabled.then(|| {
        tokio::spawn(run_price_decay(
            system.product_client.clone(),
            config.pricing.decay.clone(),
            Duration::from_secs(config.pricing.decay_interval_secs),
        ))
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", config.server.bind_addr, e))?;
    info!(addr = %config.server.bind_addr, "Listening");

    let served = axum::serve(listener, http::router(system.app_state()))
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(e) = &served {
        error!(error = %e, "Server stopped with an error");
    }

    if let Some(task) = decay_task {
        task.abort();
        let _ = task.await;
    }
    system.shutdown().await.map_err(|e| e.to_string())?;

    served.map_err(|e| e.to_string())?;
    info!("Storefront stopped");
    Ok(())
}
