//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! building a working client from it.

use std::io::Write;
use std::path::PathBuf;

use carelink_common::auth::CredentialStore;
use carelink_domain::{CareLinkError, CredentialPair, CredentialStoreConfig};
use carelink_infra::{config, ApiClient};
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_config(contents: &str, extension: &str) -> PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_config(
        r#"{
            "client": {
                "base_url": "https://carelink.example.com/api",
                "login_path": "/token/",
                "refresh_path": "/token/refresh/",
                "request_timeout_secs": 20,
                "renewal_timeout_secs": null,
                "max_attempts": 2
            },
            "store": {
                "kind": "keychain",
                "service": "CareLink.session",
                "account": "clinic-frontdesk"
            }
        }"#,
        "json",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();
    let config = result.expect("Failed to load config from JSON file");

    assert_eq!(config.client.base_url, "https://carelink.example.com/api");
    assert_eq!(config.client.request_timeout_secs, 20);
    assert_eq!(config.client.renewal_timeout(), None);
    assert_eq!(config.client.max_attempts, 2);
    assert_eq!(
        config.store,
        CredentialStoreConfig::Keychain {
            service: "CareLink.session".into(),
            account: "clinic-frontdesk".into()
        }
    );
}

#[test]
fn test_load_config_from_toml_file_with_defaults() {
    let path = write_config(
        r#"
[client]
base_url = "http://localhost:8000/api"
"#,
        "toml",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();
    let config = result.expect("Failed to load config from TOML file");

    assert_eq!(config.client.login_url(), "http://localhost:8000/api/token/");
    assert_eq!(config.client.refresh_url(), "http://localhost:8000/api/token/refresh/");
    assert_eq!(config.store, CredentialStoreConfig::default());
}

#[test]
fn test_load_config_rejects_unknown_store_kind() {
    let path = write_config(
        r#"{ "client": { "base_url": "http://localhost:8000/api" }, "store": { "kind": "cookie" } }"#,
        "json",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(CareLinkError::Config(_))));
}

#[tokio::test]
async fn test_client_from_file_config_uses_file_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/profile/"))
        .and(header("Authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let credentials = dir.path().join("credentials.json");
    let path = write_config(
        &format!(
            "[client]\nbase_url = \"{}/api\"\n\n[store]\nkind = \"file\"\npath = \"{}\"\n",
            server.uri(),
            credentials.display()
        ),
        "toml",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(&path).ok();
    let config = result.expect("config");

    let client = ApiClient::from_config(&config).expect("client");
    client.store().save(&CredentialPair::new("A1", "R1")).await.unwrap();
    assert!(credentials.exists());

    let profile: Value = client.get("/profile/").await.expect("profile");
    assert_eq!(profile, json!({"id": 42}));
}
