use axum::{http::StatusCode, routing::get, Json, Router};
use dashboard::http::HttpSource;
use dashboard::{CommandRequest, PumpState, RemoteSource, TransportError};
use serde_json::json;

/// Serves `app` on an ephemeral port and returns the API base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_non_success_replies_become_transport_errors() {
    let app = Router::new()
        .route(
            "/api/latest/",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "message": "No sensor data available" })),
                )
            }),
        )
        .route(
            "/api/pump/",
            get(|| async {
                Json(json!({
                    "id": 1,
                    "pump_status": true,
                    "override": true,
                    "override_until": null,
                    "override_remaining": -1
                }))
            })
            .post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "message": "Invalid override_seconds",
                        "errors": { "override_seconds": "Must be a positive integer." }
                    })),
                )
            }),
        );
    let source = HttpSource::new(&serve(app).await).unwrap();

    assert!(matches!(
        source.latest_sensor().await,
        Err(TransportError::Status(404))
    ));
    assert!(matches!(
        source.send_pump_command(CommandRequest::new(true, Some(60))).await,
        Err(TransportError::Status(400))
    ));

    assert_eq!(
        source.pump_status().await.unwrap(),
        PumpState {
            is_on: true,
            override_remaining: -1
        }
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reading_with_local_timestamp() {
    let app = Router::new().route(
        "/api/latest/",
        get(|| async {
            Json(json!({
                "id": 3,
                "moisture": 38.4,
                "pump": false,
                "timestamp": "2025-12-16T10:30:00"
            }))
        }),
    );
    let source = HttpSource::new(&serve(app).await).unwrap();

    let reading = source.latest_sensor().await.unwrap();
    assert_eq!(reading.value, 38.4);
    assert_eq!(reading.observed_at.to_rfc3339(), "2025-12-16T10:30:00+00:00");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_remote_is_unavailable() {
    // Grab a free port, then close it again
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = HttpSource::new(&format!("http://{}/api", addr)).unwrap();

    assert!(matches!(
        source.pump_status().await,
        Err(TransportError::Unavailable(_))
    ));
}
