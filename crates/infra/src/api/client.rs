//! API client with transparent credential renewal
//!
//! Every outbound request is decorated with the stored access token. A 401
//! response triggers at most one renewal (shared with any concurrent
//! requests) followed by exactly one replay.

use std::sync::Arc;

use carelink_common::auth::{
    CredentialStore, RefreshCoordinator, RenewalExchange, SessionEvent, SessionTerminator,
};
use carelink_domain::{ClientConfig, Config, CredentialPair, SessionEndReason};
use reqwest::header::AUTHORIZATION;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::auth::HttpRenewalClient;
use super::errors::ApiError;
use super::request::RequestEnvelope;
use crate::http::HttpClient;
use crate::store::build_store;

/// Session-aware API client
///
/// Cheap to clone; clones share the credential store, the renewal
/// coordinator and the session terminator.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    config: Arc<ClientConfig>,
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    terminator: Arc<SessionTerminator>,
}

impl ApiClient {
    /// Create a client that renews credentials against the configured
    /// refresh endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the HTTP transport cannot be built
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        Self::builder().config(config).store(store).build()
    }

    /// Create a client and its credential store from a loaded configuration
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the HTTP transport cannot be built
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.client.clone(), build_store(&config.store))
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Credential store shared with the coordinator
    pub const fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Renewal coordinator
    pub const fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Session terminator
    pub const fn terminator(&self) -> &Arc<SessionTerminator> {
        &self.terminator
    }

    /// Receive a [`SessionEvent`] each time the session ends.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.terminator.subscribe()
    }

    /// Send a request, renewing the access token once if the server rejects
    /// it.
    ///
    /// Responses other than 401 are returned as-is, whatever their status.
    ///
    /// # Errors
    ///
    /// - `ApiError::Renewal` if the request was rejected and renewal failed
    /// - `ApiError::Unauthorized` if the request was rejected after a replay,
    ///   or with no credentials to renew (the session is ended first)
    /// - `ApiError::Storage` if the credential store could not be read
    /// - `ApiError::Network` / `ApiError::Timeout` for transport failures
    #[instrument(skip_all, fields(method = %envelope.method(), path = %envelope.path()))]
    pub async fn send(&self, mut envelope: RequestEnvelope) -> Result<Response, ApiError> {
        loop {
            let presented = self.store.load().await?;
            let response = self.dispatch(&envelope, presented.as_ref()).await?;

            let status = response.status();
            if status != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            let url = self.config.endpoint(envelope.path());
            let body = response.text().await.unwrap_or_default();
            let failure = Self::map_status_error(status, &url, body);

            self.recover(&mut envelope, presented, failure).await?;
            debug!("replaying request after authorization failure");
        }
    }

    /// Send a request and deserialize its JSON response
    ///
    /// 204 and 205 responses deserialize from `null`, so `()` and `Option<_>`
    /// work as response types for endpoints without a body.
    ///
    /// # Errors
    ///
    /// Everything [`Self::send`] returns, plus a status-classified error for
    /// non-success responses and `ApiError::Decode` for unexpected bodies
    pub async fn execute<T: DeserializeOwned>(&self, envelope: RequestEnvelope) -> Result<T, ApiError> {
        let url = self.config.endpoint(envelope.path());
        let method = envelope.method().clone();
        let response = self.send(envelope).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, &url, body));
        }

        let result: T = if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Decode(format!(
                    "No content response ({}), but response type cannot be deserialized from empty body",
                    status.as_u16()
                ))
            })?
        } else {
            response
                .json()
                .await
                .map_err(|e| ApiError::Decode(format!("Failed to parse response: {e}")))?
        };

        info!(%method, url = %url, "request successful");
        Ok(result)
    }

    /// Execute a GET request
    ///
    /// # Errors
    ///
    /// See [`Self::execute`]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(RequestEnvelope::get(path)).await
    }

    /// Execute a POST request with a JSON body
    ///
    /// # Errors
    ///
    /// See [`Self::execute`]
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(RequestEnvelope::post(path).json(body)?).await
    }

    /// Execute a PUT request with a JSON body
    ///
    /// # Errors
    ///
    /// See [`Self::execute`]
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(RequestEnvelope::put(path).json(body)?).await
    }

    /// Execute a DELETE request
    ///
    /// # Errors
    ///
    /// See [`Self::execute`]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(RequestEnvelope::delete(path)).await
    }

    async fn dispatch(
        &self,
        envelope: &RequestEnvelope,
        credentials: Option<&CredentialPair>,
    ) -> Result<Response, ApiError> {
        let url = self.config.endpoint(envelope.path());
        let mut request = self
            .http
            .request(envelope.method().clone(), url.as_str())
            .headers(envelope.headers().clone());

        if let Some(pair) = credentials {
            request = request.header(AUTHORIZATION, pair.bearer());
        }
        if let Some(body) = envelope.body() {
            request = request.json(body);
        }

        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, self.http.send(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(ApiError::from(err)),
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    }

    /// Decide what follows a 401. `Ok` means replay the request.
    async fn recover(
        &self,
        envelope: &mut RequestEnvelope,
        presented: Option<CredentialPair>,
        failure: ApiError,
    ) -> Result<(), ApiError> {
        if envelope.is_retried() {
            warn!("request rejected again after renewal, ending session");
            self.end_session(SessionEndReason::Unauthorized).await?;
            return Err(failure);
        }

        let Some(current) = self.store.load().await? else {
            debug!("request rejected without stored credentials, ending session");
            self.end_session(SessionEndReason::Unauthorized).await?;
            return Err(failure);
        };

        envelope.mark_retried();

        // Another request already renewed the token this one was sent with.
        let presented_access = presented.as_ref().map(|pair| pair.access_token.as_str());
        if presented_access != Some(current.access_token.as_str()) {
            debug!("stored access token changed while in flight, skipping renewal");
            return Ok(());
        }

        self.coordinator.renew(&current.refresh_token).await?;
        Ok(())
    }

    async fn end_session(&self, reason: SessionEndReason) -> Result<(), ApiError> {
        self.terminator.terminate(reason).await.map_err(ApiError::from)
    }

    fn map_status_error(status: StatusCode, url: &str, body: String) -> ApiError {
        let message = if body.is_empty() {
            format!("{url} returned status {status}")
        } else {
            format!("{url} returned status {status}: {body}")
        };

        if status == StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized(message)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            ApiError::RateLimit(message)
        } else if status.is_server_error() {
            ApiError::Server(message)
        } else if status.is_client_error() {
            ApiError::Client(message)
        } else {
            ApiError::Network(message)
        }
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    store: Option<Arc<dyn CredentialStore>>,
    exchange: Option<Arc<dyn RenewalExchange>>,
}

impl ApiClientBuilder {
    /// Set the client configuration
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credential store
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the HTTP renewal exchange
    #[must_use]
    pub fn exchange(mut self, exchange: Arc<dyn RenewalExchange>) -> Self {
        self.exchange = Some(exchange);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns error if no credential store was set or the HTTP transport
    /// cannot be built
    pub fn build(self) -> Result<ApiClient, ApiError> {
        let config = self.config.unwrap_or_default();
        let store =
            self.store.ok_or_else(|| ApiError::Config("Credential store not set".to_string()))?;

        let http = HttpClient::from_config(&config)?;
        let exchange = match self.exchange {
            Some(exchange) => exchange,
            None => Arc::new(HttpRenewalClient::new(
                HttpClient::for_renewal(&config)?,
                config.refresh_url(),
            )),
        };

        let terminator = Arc::new(SessionTerminator::new(store.clone()));
        let coordinator = Arc::new(
            RefreshCoordinator::new(exchange, store.clone(), terminator.clone())
                .with_wait_timeout(config.renewal_timeout()),
        );

        Ok(ApiClient { http, config: Arc::new(config), store, coordinator, terminator })
    }
}

#[cfg(test)]
mod tests {
    use carelink_common::auth::MemoryCredentialStore;
    use carelink_common::testing::MockRenewalExchange;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
    struct TestResponse {
        message: String,
    }

    fn client_for(
        server: &MockServer,
        store: Arc<MemoryCredentialStore>,
        exchange: Arc<MockRenewalExchange>,
    ) -> ApiClient {
        ApiClient::builder()
            .config(ClientConfig::with_base_url(server.uri()))
            .store(store)
            .exchange(exchange)
            .build()
            .unwrap()
    }

    fn signed_in() -> Arc<MemoryCredentialStore> {
        Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new("A1", "R1")))
    }

    #[tokio::test]
    async fn test_builder_missing_store() {
        let result = ApiClient::builder().build();
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[tokio::test]
    async fn test_get_attaches_bearer_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/appointments/"))
            .and(header("Authorization", "Bearer A1"))
            .and(header("Content-Type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(TestResponse { message: "success".to_string() }),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let exchange = Arc::new(MockRenewalExchange::succeeding("A2"));
        let client = client_for(&mock_server, signed_in(), exchange.clone());

        let result: TestResponse = client.get("/appointments/").await.unwrap();
        assert_eq!(result.message, "success");
        assert_eq!(exchange.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_without_credentials_has_no_authorization_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/doctors/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let client = client_for(
            &mock_server,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MockRenewalExchange::succeeding("A2")),
        );

        let doctors: Vec<serde_json::Value> = client.get("/doctors/").await.unwrap();
        assert!(doctors.is_empty());

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_get_with_204_no_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/no-content"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let client =
            client_for(&mock_server, signed_in(), Arc::new(MockRenewalExchange::succeeding("A2")));

        let result: Result<(), ApiError> = client.get("/no-content").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_with_205_reset_content() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/messages/3/"))
            .respond_with(ResponseTemplate::new(205))
            .mount(&mock_server)
            .await;

        let client =
            client_for(&mock_server, signed_in(), Arc::new(MockRenewalExchange::succeeding("A2")));

        let result: Result<(), ApiError> = client.delete("/messages/3/").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_post_and_put_send_json_bodies() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/appointments/"))
            .and(body_json(json!({"doctor": 4, "date": "2025-03-01"})))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(TestResponse { message: "created".to_string() }),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/appointments/9/"))
            .and(body_json(json!({"status": "cancelled"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(TestResponse { message: "updated".to_string() }),
            )
            .mount(&mock_server)
            .await;

        let client =
            client_for(&mock_server, signed_in(), Arc::new(MockRenewalExchange::succeeding("A2")));

        let created: TestResponse = client
            .post("/appointments/", &json!({"doctor": 4, "date": "2025-03-01"}))
            .await
            .unwrap();
        assert_eq!(created.message, "created");

        let updated: TestResponse =
            client.put("/appointments/9/", &json!({"status": "cancelled"})).await.unwrap();
        assert_eq!(updated.message, "updated");
    }

    #[tokio::test]
    async fn test_status_classification_without_renewal() {
        let mock_server = MockServer::start().await;

        for (route, status) in [("/limited", 429), ("/error", 500), ("/missing", 404), ("/forbidden", 403)] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&mock_server)
                .await;
        }

        let store = signed_in();
        let exchange = Arc::new(MockRenewalExchange::succeeding("A2"));
        let client = client_for(&mock_server, store.clone(), exchange.clone());

        let limited: Result<TestResponse, ApiError> = client.get("/limited").await;
        assert!(matches!(limited, Err(ApiError::RateLimit(_))));

        let error: Result<TestResponse, ApiError> = client.get("/error").await;
        assert!(matches!(error, Err(ApiError::Server(_))));

        let missing: Result<TestResponse, ApiError> = client.get("/missing").await;
        assert!(matches!(missing, Err(ApiError::Client(_))));

        let forbidden: Result<TestResponse, ApiError> = client.get("/forbidden").await;
        assert!(matches!(forbidden, Err(ApiError::Client(_))));

        assert_eq!(exchange.calls(), 0);
        assert_eq!(store.snapshot(), Some(CredentialPair::new("A1", "R1")));
    }

    #[tokio::test]
    async fn test_send_passes_non_401_responses_through() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/error"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client =
            client_for(&mock_server, signed_in(), Arc::new(MockRenewalExchange::succeeding("A2")));

        let response = client.send(RequestEnvelope::get("/error")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/profile/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&mock_server)
            .await;

        let client =
            client_for(&mock_server, signed_in(), Arc::new(MockRenewalExchange::succeeding("A2")));

        let result: Result<TestResponse, ApiError> = client.get("/profile/").await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_401_renews_and_replays_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data"))
            .and(header("Authorization", "Bearer A2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(TestResponse { message: "success".to_string() }),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = signed_in();
        let exchange = Arc::new(MockRenewalExchange::succeeding("A2"));
        let client = client_for(&mock_server, store.clone(), exchange.clone());

        let result: TestResponse = client.get("/data").await.unwrap();
        assert_eq!(result.message, "success");
        assert_eq!(exchange.received_tokens(), vec!["R1".to_string()]);
        assert_eq!(store.snapshot(), Some(CredentialPair::new("A2", "R1")));
    }

    #[tokio::test]
    async fn test_401_after_concurrent_renewal_replays_without_exchange() {
        let mock_server = MockServer::start().await;
        let store = signed_in();

        // The stale request's 401 arrives after another request already
        // stored A2.
        let renewed_elsewhere = store.clone();
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                futures::executor::block_on(
                    renewed_elsewhere.save(&CredentialPair::new("A2", "R1")),
                )
                .unwrap();
                ResponseTemplate::new(401)
            })
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/data"))
            .and(header("Authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let exchange = Arc::new(MockRenewalExchange::succeeding("A3"));
        let client = client_for(&mock_server, store.clone(), exchange.clone());

        let result: TestResponse = client.get("/data").await.unwrap();
        assert_eq!(result.message, "ok");
        assert_eq!(exchange.calls(), 0);
        assert_eq!(store.snapshot(), Some(CredentialPair::new("A2", "R1")));
    }

    #[tokio::test]
    async fn test_401_without_credentials_ends_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let exchange = Arc::new(MockRenewalExchange::succeeding("A2"));
        let client = client_for(&mock_server, Arc::new(MemoryCredentialStore::new()), exchange.clone());
        let mut events = client.subscribe();

        let result: Result<TestResponse, ApiError> = client.get("/data").await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
        assert_eq!(exchange.calls(), 0);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::Ended { reason: SessionEndReason::Unauthorized }
        );
    }
}
