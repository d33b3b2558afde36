use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::credentials::Credentials;
use crate::error::DashError;

pub const TOKEN_URL: &str = "https://www.strava.com/oauth/token";

const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);
/// Fallback lifetime when the token endpoint omits `expires_at`.
const DEFAULT_TOKEN_TTL: TimeDelta = TimeDelta::hours(1);
/// Renew slightly early so an in-flight fetch never runs into a 401.
const EXPIRY_MARGIN: TimeDelta = TimeDelta::minutes(5);

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

pub trait TokenClient: Send + Sync {
    /// One exchange of the refresh token for a short-lived access token.
    /// A single failure surfaces immediately; the caller decides whether to
    /// abort the pipeline. No retry.
    fn refresh(&self, credentials: &Credentials) -> Result<TokenResponse, DashError>;
}

#[derive(Clone)]
pub struct StravaTokenClient {
    client: Client,
    token_url: String,
}

impl StravaTokenClient {
    pub fn new() -> Result<Self, DashError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("rundash/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DashError::TokenHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(TOKEN_TIMEOUT)
            .build()
            .map_err(|err| DashError::TokenHttp(err.to_string()))?;

        Ok(Self {
            client,
            token_url: TOKEN_URL.to_string(),
        })
    }

    pub fn with_token_url(token_url: &str) -> Result<Self, DashError> {
        let mut client = Self::new()?;
        client.token_url = token_url.to_string();
        Ok(client)
    }
}

impl TokenClient for StravaTokenClient {
    fn refresh(&self, credentials: &Credentials) -> Result<TokenResponse, DashError> {
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", credentials.refresh_token.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .map_err(|err| DashError::TokenHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "token exchange failed".to_string());
            return Err(DashError::TokenStatus { status, message });
        }

        let token: TokenResponse = response
            .json()
            .map_err(|err| DashError::TokenMalformed(err.to_string()))?;
        Ok(token)
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Explicitly-scoped token state. Holds at most one access token and its
/// expiry; every operation takes the clock as an argument so tests can
/// simulate expiry without waiting.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    current: Option<CachedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token if it is still valid at `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|token| token.expires_at > now + EXPIRY_MARGIN)
            .map(|token| token.access_token.as_str())
    }

    pub fn store(&mut self, response: &TokenResponse, now: DateTime<Utc>) {
        let expires_at = response
            .expires_at
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .unwrap_or(now + DEFAULT_TOKEN_TTL);
        self.current = Some(CachedToken {
            access_token: response.access_token.clone(),
            expires_at,
        });
    }

    pub fn invalidate(&mut self) {
        self.current = None;
    }
}
