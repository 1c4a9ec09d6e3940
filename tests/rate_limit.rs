use axum::http::StatusCode;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;

mod common;
use common::{test_config, TestApp};

fn limited_app(burst: u32) -> TestApp {
    // ---
    let mut config = test_config();
    config.rate_limit.burst = burst;
    // Effectively no refill while the test runs.
    config.rate_limit.per_second = 0.001;
    TestApp::with_config(config)
}

#[tokio::test]
async fn burst_is_admitted_then_refused() {
    // ---
    let app = limited_app(5);
    let mut client = app.client().from_ip("198.51.100.1");

    for attempt in 0..5 {
        let response = client.post("/login/begin", json!({ "username": "nobody" })).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "attempt {attempt}");
    }

    let refused = client.post("/login/begin", json!({ "username": "nobody" })).await;
    assert_eq!(refused.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(refused.text(), "Too many requests. Please try again later.");

    // Every ceremony route draws from the same bucket.
    let refused = client
        .post("/register/begin", json!({ "username": "a", "displayName": "A" }))
        .await;
    assert_eq!(refused.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn clients_are_limited_independently() {
    // ---
    let app = limited_app(2);
    let mut noisy = app.client().from_ip("198.51.100.2");
    let mut quiet = app.client().from_ip("198.51.100.3");

    for _ in 0..2 {
        noisy.post("/login/begin", json!({ "username": "x" })).await;
    }
    assert_eq!(
        noisy.post("/login/begin", json!({ "username": "x" })).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
        quiet.post("/login/begin", json!({ "username": "x" })).await.status,
        StatusCode::NOT_FOUND
    );
    assert_eq!(app.state.rate_limiter().tracked_keys(), 2);
}

#[tokio::test]
async fn only_ceremony_routes_are_limited() {
    // ---
    let app = limited_app(1);
    let mut client = app.client().from_ip("198.51.100.4");

    for _ in 0..5 {
        assert_eq!(client.get("/health").await.status, StatusCode::OK);
        assert_eq!(client.get("/bookings").await.status, StatusCode::UNAUTHORIZED);
        assert_eq!(client.get("/logout").await.status, StatusCode::SEE_OTHER);
    }

    assert_ne!(
        client.post("/login/begin", json!({ "username": "x" })).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(
        client.post("/login/begin", json!({ "username": "x" })).await.status,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn peer_address_is_the_key_over_a_real_socket() {
    // ---
    let mut config = test_config();
    config.rate_limit.burst = 2;
    config.rate_limit.per_second = 0.001;
    config.rate_limit.trust_forwarded_for = false;
    let app = TestApp::with_config(config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/login/begin");
    let mut statuses = Vec::new();
    for n in 0..3 {
        // A spoofed header must not buy a fresh bucket.
        let response = client
            .post(&url)
            .header("x-forwarded-for", format!("203.0.113.{n}"))
            .json(&json!({ "username": "x" }))
            .send()
            .await
            .unwrap();
        statuses.push(response.status().as_u16());
    }

    assert_eq!(statuses, vec![404, 404, 429]);
    assert_eq!(app.state.rate_limiter().tracked_keys(), 1);
}
