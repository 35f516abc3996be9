//! Google Calendar v3 REST client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::date_range::SyncWindow;
use crate::error::{CalendarError, CalendarResult};
use crate::remote::{CalendarProvider, RawEvent, RawEventDraft};
use crate::session::CredentialSource;
use crate::settings::{GoogleSettings, SyncSettings};

pub struct GoogleCalendarClient {
    http: Client,
    base_url: Url,
    calendar_id: String,
    credentials: Arc<dyn CredentialSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<RawEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl GoogleCalendarClient {
    pub fn new(
        google: &GoogleSettings,
        sync: &SyncSettings,
        credentials: Arc<dyn CredentialSource>,
    ) -> CalendarResult<Self> {
        let base_url = Url::parse(&google.api_base_url).map_err(|e| {
            CalendarError::Config(format!("invalid api_base_url '{}': {}", google.api_base_url, e))
        })?;

        let mut builder = Client::builder();
        if let Some(timeout) = sync.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CalendarError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(GoogleCalendarClient {
            http,
            base_url,
            calendar_id: google.calendar_id.clone(),
            credentials,
        })
    }

    async fn token(&self) -> CalendarResult<String> {
        self.credentials
            .access_token()
            .await
            .ok_or_else(|| CalendarError::Auth("no Google access token found".into()))
    }

    /// `{base}/calendars/{calendar_id}[/events]`, with the calendar id escaped.
    fn calendar_url(&self, events: bool) -> CalendarResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CalendarError::Config(format!("api_base_url '{}' cannot be a base", self.base_url))
            })?;
            segments.pop_if_empty().push("calendars").push(&self.calendar_id);
            if events {
                segments.push("events");
            }
        }
        Ok(url)
    }

    async fn error_for_status(response: Response) -> CalendarResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(CalendarError::Provider {
            status: status.as_u16(),
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                body
            },
        })
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    async fn list_events(&self, window: &SyncWindow) -> CalendarResult<Vec<RawEvent>> {
        let token = self.token().await?;
        let url = self.calendar_url(true)?;

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", window.time_min()),
                ("timeMax", window.time_max()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ];
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            debug!(url = %url, page = ?page_token, "listing Google Calendar events");

            let response = self
                .http
                .get(url.clone())
                .bearer_auth(&token)
                .query(&query)
                .send()
                .await?;
            let page: EventsPage = Self::error_for_status(response).await?.json().await?;

            events.extend(page.items);
            page_token = page.next_page_token;

            if page_token.is_none() {
                break;
            }
        }

        Ok(events)
    }

    async fn create_event(&self, draft: &RawEventDraft) -> CalendarResult<RawEvent> {
        let token = self.token().await?;
        let url = self.calendar_url(true)?;

        debug!(url = %url, summary = %draft.summary, "creating Google Calendar event");

        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(draft)
            .send()
            .await?;

        Ok(Self::error_for_status(response).await?.json().await?)
    }

    async fn check_connection(&self) -> CalendarResult<bool> {
        let token = self.token().await?;
        let url = self.calendar_url(false)?;

        let response = self.http.get(url).bearer_auth(&token).send().await?;
        Ok(response.status().is_success())
    }
}
