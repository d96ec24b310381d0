//! Authentication endpoints
//!
//! [`HttpRenewalClient`] talks to the refresh endpoint on behalf of the
//! renewal coordinator. [`AuthApi`] covers sign-in and sign-out for the host.

use async_trait::async_trait;
use carelink_common::auth::{decode_claims, RenewalError, RenewalExchange, RenewedCredential};
use carelink_domain::{CredentialPair, SessionEndReason, TokenClaims};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::client::ApiClient;
use super::errors::ApiError;
use super::request::RequestEnvelope;
use crate::http::HttpClient;

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
}

/// Renewal exchange against `POST {base}/token/refresh/`
///
/// Uses the bare transport: the renewal call is never decorated with the
/// expired access token and never triggers renewal itself.
#[derive(Clone)]
pub struct HttpRenewalClient {
    http: HttpClient,
    url: String,
}

impl HttpRenewalClient {
    /// Exchange refresh tokens at `url` over `http`.
    ///
    /// `http` should make a single attempt; see [`HttpClient::for_renewal`].
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    /// Renewal endpoint
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RenewalExchange for HttpRenewalClient {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn exchange(&self, refresh_token: &str) -> Result<RenewedCredential, RenewalError> {
        let request = self
            .http
            .request(Method::POST, self.url.as_str())
            .json(&RefreshRequest { refresh: refresh_token });

        let response =
            self.http.send(request).await.map_err(|e| RenewalError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "refresh token rejected");
            return Err(RenewalError::Rejected { status: status.as_u16(), body });
        }

        let body: RefreshResponse =
            response.json().await.map_err(|e| RenewalError::Malformed(e.to_string()))?;

        debug!(rotated = body.refresh.is_some(), "access token renewed");
        Ok(RenewedCredential { access_token: body.access, refresh_token: body.refresh })
    }
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// The pair now held by the credential store
    pub credentials: CredentialPair,
    /// Claims read from the access token, if it is a readable JWT
    pub claims: Option<TokenClaims>,
}

impl LoginOutcome {
    /// User id claim of the new access token
    pub fn user_id(&self) -> Option<i64> {
        self.claims.as_ref().and_then(|claims| claims.user_id)
    }
}

/// Sign-in and sign-out on top of an [`ApiClient`]
#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    /// Wrap `client`
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Underlying API client
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Exchange username and password for a credential pair and store it.
    ///
    /// The call goes through the regular decorated pipeline. A successful
    /// login re-arms session-end notification.
    ///
    /// # Errors
    ///
    /// - Status-classified `ApiError` if the server refuses the credentials
    /// - `ApiError::Decode` if the response lacks either token
    /// - `ApiError::Storage` if the pair cannot be persisted
    #[instrument(skip_all)]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let envelope = RequestEnvelope::post(self.client.config().login_path.as_str())
            .json(&LoginRequest { username, password })?;
        let tokens: LoginResponse = self.client.execute(envelope).await?;

        let credentials = CredentialPair::try_new(tokens.access, tokens.refresh)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        // Arm first so a renewal left over from an earlier session cannot
        // overwrite the new pair.
        self.client.terminator().arm();
        self.client.store().save(&credentials).await?;

        let claims = match decode_claims(&credentials.access_token) {
            Ok(claims) => Some(claims),
            Err(err) => {
                debug!(error = %err, "access token claims unreadable");
                None
            }
        };

        info!(user_id = ?claims.as_ref().and_then(|c| c.user_id), "login successful");
        Ok(LoginOutcome { credentials, claims })
    }

    /// Clear stored credentials and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Storage` if the credential store cannot be cleared
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.client.terminator().terminate(SessionEndReason::Logout).await?;
        Ok(())
    }

    /// Whether a credential pair is currently stored
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Storage` if the credential store cannot be read
    pub async fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.client.store().load().await?.is_some())
    }

    /// Claims of the stored access token, without verifying it
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Storage` if the store cannot be read, or
    /// `ApiError::Decode` if the stored token is not a readable JWT
    pub async fn current_claims(&self) -> Result<Option<TokenClaims>, ApiError> {
        let Some(pair) = self.client.store().load().await? else {
            return Ok(None);
        };
        decode_claims(&pair.access_token).map(Some).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
