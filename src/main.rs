use anyhow::Result;
use std::future::IntoFuture;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use quicklink::config::Config;
use quicklink::shortener::{ClickRecorderConfig, LinkService, UrlValidator};
use quicklink::{api, redirect, storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage = storage::connect(&config.database, Some(&config.cache)).await?;
    info!("Database initialized successfully");

    if config.restrict_private_hosts {
        info!("🔒 Private and loopback targets are rejected");
    }

    let service = Arc::new(LinkService::new(
        storage,
        UrlValidator::new(config.restrict_private_hosts),
        ClickRecorderConfig {
            max_in_flight: config.clicks.max_in_flight,
        },
    ));

    // Create routers
    let api_router = api::create_api_router(Arc::clone(&service), &config.redirect_base_url);
    let redirect_router =
        redirect::create_redirect_router(Arc::clone(&service), config.redirect_status);

    // Start API server
    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 API server listening on http://{}", api_addr);
    info!("   - API endpoints available at http://{}/api/...", api_addr);

    // Start redirect server
    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("🚀 Redirect server listening on http://{}", redirect_addr);
    info!("   - Short links are issued as {}/<code>", config.redirect_base_url);

    // Run both servers until Ctrl-C
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", err);
            return;
        }
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let served = tokio::try_join!(
        axum::serve(api_listener, api_router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()))
            .into_future(),
        axum::serve(redirect_listener, redirect_router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .into_future(),
    );

    // Servers are down; let queued click updates land before exiting
    service.shutdown().await;
    info!("Shutdown complete");

    served?;
    Ok(())
}

async fn wait_for_shutdown(mut rx: tokio::sync::watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Signal listener is gone, keep serving
            std::future::pending::<()>().await;
        }
    }
}
