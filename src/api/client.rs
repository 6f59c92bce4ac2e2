//! API client for the case-management backend.
//!
//! This module provides the `ApiClient` for making authenticated requests.
//! The backend uses JWT bearer authentication: `login` obtains a token which
//! is held by the `SessionStore`, and every subsequent call reads the token
//! from the store at send time — nothing caches it.
//!
//! Responses are classified uniformly: a status from the configured
//! session-invalidating set clears the store and surfaces `AuthExpired`; a
//! transport failure surfaces `Network` and leaves the session untouched;
//! any other failure status is an `Application` error the caller presents.
//! The client never navigates and never retries.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::{header, Client, Method, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::config::Config;
use crate::models::{
    CaseNote, Employer, EnrollmentPoint, NewCaseNote, Participant, Provider, Referral,
    ReferralOutcome, ServiceRecord, ServiceTypeCount,
};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Login response. The backend has answered with either `access_token`
/// (current) or `token` (older deployments); accept both.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(alias = "token")]
    access_token: Option<String>,
}

/// API client for the drop-in center backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    /// Fixed origin + prefix every relative path is joined with
    base: String,
    store: SessionStore,
    /// Statuses that terminate the session client-side
    invalidating: HashSet<u16>,
}

impl ApiClient {
    pub fn new(config: &Config, store: SessionStore) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base: config.api_base(),
            store,
            invalidating: config.invalidating_statuses.iter().copied().collect(),
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in and return the issued token. The store is not touched here:
    /// on success the session gate decides where the token lives, and a
    /// failed login must never disturb an existing session.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let url = format!("{}/login", self.base);
        let body = serde_json::json!({ "email": email, "password": password });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::Network)?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::Network)?;

        if !status.is_success() {
            debug!(%status, "Login rejected");
            return Err(ApiError::application(status, &text));
        }

        let parsed: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Malformed login response: {e}")))?;

        parsed.access_token.ok_or_else(|| {
            ApiError::InvalidResponse("Login succeeded but no token was returned".to_string())
        })
    }

    // =========================================================================
    // Request pipeline
    // =========================================================================

    /// Perform one authenticated call against `base + path` and classify the
    /// outcome. Success and ordinary failure statuses return the raw
    /// response; session-invalidating statuses clear the store first.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base, path);

        let mut request = self
            .http
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json");

        // Token is read per call, so a sign-out between calls takes effect
        // immediately and a fresh login needs no client rebuild.
        if let Some(token) = self.store.get() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            debug!(url = %url, error = %e, "Request failed without a response");
            ApiError::Network(e)
        })?;

        let status = response.status();
        if self.invalidating.contains(&status.as_u16()) {
            warn!(%status, url = %url, "Session-invalidating response, clearing session");
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear session after auth failure");
            }
            return Err(ApiError::AuthExpired);
        }

        Ok(response)
    }

    /// GET a JSON resource, mapping non-success statuses to `Application`.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, None).await?;
        Self::parse_json(response).await
    }

    /// POST a JSON body and parse the JSON reply.
    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Unserializable body: {e}")))?;
        let response = self.send(Method::POST, path, Some(&body)).await?;
        Self::parse_json(response).await
    }

    async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await.map_err(ApiError::Network)?;

        if !status.is_success() {
            return Err(ApiError::application(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response ({status}): {e}"))
        })
    }

    // =========================================================================
    // Case-management endpoints
    // =========================================================================

    pub async fn fetch_participants(&self) -> Result<Vec<Participant>, ApiError> {
        self.get_json("/participants").await
    }

    pub async fn fetch_case_notes(&self, participant_id: i64) -> Result<Vec<CaseNote>, ApiError> {
        self.get_json(&format!("/participants/{participant_id}/notes"))
            .await
    }

    pub async fn create_case_note(
        &self,
        participant_id: i64,
        note: &NewCaseNote,
    ) -> Result<CaseNote, ApiError> {
        self.post_json(&format!("/participants/{participant_id}/notes"), note)
            .await
    }

    pub async fn fetch_services(
        &self,
        participant_id: i64,
    ) -> Result<Vec<ServiceRecord>, ApiError> {
        self.get_json(&format!("/participants/{participant_id}/services"))
            .await
    }

    pub async fn fetch_referrals(&self, participant_id: i64) -> Result<Vec<Referral>, ApiError> {
        self.get_json(&format!("/participants/{participant_id}/referrals"))
            .await
    }

    pub async fn fetch_employers(&self) -> Result<Vec<Employer>, ApiError> {
        self.get_json("/employers").await
    }

    pub async fn fetch_providers(&self) -> Result<Vec<Provider>, ApiError> {
        self.get_json("/providers").await
    }

    pub async fn fetch_enrollment_report(&self) -> Result<Vec<EnrollmentPoint>, ApiError> {
        self.get_json("/v1/reports/enrollments").await
    }

    pub async fn fetch_service_report(&self) -> Result<Vec<ServiceTypeCount>, ApiError> {
        self.get_json("/v1/reports/services").await
    }

    pub async fn fetch_referral_report(&self) -> Result<Vec<ReferralOutcome>, ApiError> {
        self.get_json("/v1/reports/referrals").await
    }
}
