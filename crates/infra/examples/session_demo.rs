//! Example: A session that survives access token expiry
//!
//! Starts a local mock backend, signs in, lets the access token expire and
//! shows the client renewing it without the caller noticing. Finally the
//! refresh token is revoked and the session ends.
//!
//! Run with:
//! ```bash
//! RUST_LOG=carelink=debug cargo run -p carelink-infra --example session_demo
//! ```

use std::sync::Arc;

use carelink_common::auth::MemoryCredentialStore;
use carelink_domain::ClientConfig;
use carelink_infra::{ApiClient, AuthApi};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let backend = MockServer::start().await;
    mount_backend(&backend).await;

    let store = Arc::new(MemoryCredentialStore::new());
    let client = ApiClient::new(ClientConfig::with_base_url(format!("{}/api", backend.uri())), store)?;
    let auth = AuthApi::new(client.clone());
    let mut events = client.subscribe();

    auth.login("dr.lee", "hunter2").await?;
    tracing::info!("signed in");

    // The backend rejects A1 as expired; the client renews it to A2.
    let appointments: Value = client.get("/appointments/").await?;
    tracing::info!(%appointments, "appointments fetched");

    // A2 expires too, and the backend no longer accepts R1.
    backend.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/appointments/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token is blacklisted"})))
        .mount(&backend)
        .await;

    match client.get::<Value>("/appointments/").await {
        Ok(_) => tracing::warn!("request unexpectedly succeeded"),
        Err(err) => tracing::info!(error = %err, category = ?err.category(), "request failed"),
    }

    let event = events.recv().await?;
    tracing::info!(?event, authenticated = auth.is_authenticated().await?, "session over");
    Ok(())
}

async fn mount_backend(backend: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A1", "refresh": "R1"})))
        .mount(backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .mount(backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/appointments/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/appointments/"))
        .and(header("Authorization", "Bearer A2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "doctor": "Dr. Okafor"}])),
        )
        .mount(backend)
        .await;
}
