use axum::response::IntoResponse;

pub async fn root_handler() -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        r#"Door Control
Version: {version}

Available endpoints:
  - POST     /register/begin   - Start passkey registration
  - POST     /register/finish  - Complete passkey registration
  - POST     /login/begin      - Start passkey login
  - POST     /login/finish     - Complete passkey login
  - GET|POST /logout           - End the session
  - POST     /booking/create   - Reserve a time window
  - GET      /bookings         - List your bookings
  - POST     /unlock           - Open the door (booking and location required)
  - GET      /health           - Light health check
  - GET      /health?mode=full - Full health check (includes storage)
  - GET      /metrics          - Prometheus metrics
"#
    )
}
