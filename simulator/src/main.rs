mod api;
mod telemetry;

use chrono::Utc;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use telemetry::Field;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let http_addr = env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let tick_ms: u64 = env::var("TICK_MS")
        .unwrap_or_else(|_| "2000".to_string())
        .parse()
        .unwrap_or(2000)
        .max(1);
    let initial_moisture: f64 = env::var("INITIAL_MOISTURE")
        .unwrap_or_else(|_| "55.0".to_string())
        .parse()
        .unwrap_or(55.0);

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting irrigation controller simulator");
    info!("Tick: {}ms, initial moisture: {:.1}%", tick_ms, initial_moisture);

    let field = Arc::new(Mutex::new(Field::new()));

    // Sensor and pump physics
    let sim_field = field.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(tick_ms));
        let mut counter = 0u64;
        loop {
            ticker.tick().await;
            let record = {
                let mut rng = rand::thread_rng();
                let mut field = sim_field
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                field.step(&mut rng, Utc::now(), initial_moisture)
            };

            counter += 1;
            if counter % 30 == 0 {
                info!(
                    "Moisture {:.1}%, pump {}",
                    record.moisture,
                    if record.pump { "ON" } else { "OFF" }
                );
            }
        }
    });

    let app = api::create_router(field);

    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", http_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("HTTP server error: {}", e);
    }
}
