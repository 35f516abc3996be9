//! Google OAuth 2.0 authorization-code flow.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{CalendarError, CalendarResult};
use crate::session::Credential;
use crate::settings::{GoogleSettings, SyncSettings};

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/calendar"];

/// The redirect half of a connect: where to send the user, and how to turn
/// the code they come back with into a credential.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    fn authorization_url(&self, state: &str) -> CalendarResult<String>;

    async fn exchange_code(&self, code: &str) -> CalendarResult<Credential>;
}

pub struct OAuthClient {
    http: Client,
    settings: GoogleSettings,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl OAuthClient {
    pub fn new(settings: GoogleSettings, sync: &SyncSettings) -> CalendarResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = sync.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CalendarError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(OAuthClient { http, settings })
    }
}

#[async_trait]
impl AuthorizationFlow for OAuthClient {
    fn authorization_url(&self, state: &str) -> CalendarResult<String> {
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &self.settings.auth_url,
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| {
            CalendarError::Config(format!("invalid auth_url '{}': {}", self.settings.auth_url, e))
        })?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> CalendarResult<Credential> {
        let response = self
            .http
            .post(&self.settings.token_url)
            .form(&[
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CalendarError::Auth(format!(
                "token exchange failed ({}): {}",
                status, error_text
            )));
        }

        let tokens: TokenResponse = response.json().await?;

        Ok(Credential {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}
