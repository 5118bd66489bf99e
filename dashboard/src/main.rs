use axum::{routing::get, Router};
use dashboard::{config::Config, http::HttpSource, metrics, rest, Dashboard};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting irrigation dashboard");
    info!("Remote source: {}", config.api_base_url);
    info!("HTTP server: {}", config.http_addr);

    if let Err(e) = metrics::init_metrics() {
        error!("Failed to register metrics: {}", e);
        std::process::exit(1);
    }

    let source = match HttpSource::new(&config.api_base_url) {
        Ok(source) => source,
        Err(e) => {
            error!("Invalid remote source URL {}: {}", config.api_base_url, e);
            std::process::exit(1);
        }
    };

    let dashboard = Dashboard::start(Arc::new(source), config.poll);
    info!("Dashboard session {}", dashboard.session_id());

    // Log the status line whenever the view model changes
    let mut snapshots = dashboard.handle().subscribe();
    let status_handle = tokio::spawn(async move {
        let mut last_connected = true;
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            if snapshot.connected != last_connected {
                if snapshot.connected {
                    info!("Remote source reachable again");
                } else {
                    error!("Remote source unreachable: {}", snapshot.summary());
                }
                last_connected = snapshot.connected;
            }
        }
    });

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(|| async { "ok" }))
        .merge(rest::create_router(dashboard.handle().clone()));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    dashboard.stop().await;
    status_handle.abort();

    info!("Shutting down");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
