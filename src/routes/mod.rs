pub mod appointments;
pub mod auth;
pub mod calendar;
pub mod notifications;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clinic_calendar_core::CalendarError;
use serde::Serialize;

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert errors to HTTP responses
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<CalendarError>() {
            Some(CalendarError::Auth(_)) => StatusCode::UNAUTHORIZED,
            Some(CalendarError::Provider { .. } | CalendarError::Transport(_)) => StatusCode::BAD_GATEWAY,
            Some(CalendarError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(CalendarError::AlreadySyncing | CalendarError::ReadOnly(_)) => StatusCode::CONFLICT,
            Some(CalendarError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, Router};
    use clinic_calendar_core::auth::AuthorizationFlow;
    use clinic_calendar_core::date_range::SyncWindow;
    use clinic_calendar_core::remote::{CalendarProvider, EventDateTime, RawEvent, RawEventDraft};
    use clinic_calendar_core::session::{Credential, Session};
    use clinic_calendar_core::{CalendarResult, Dashboard, SyncSettings};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::state::AppState;

    /// One timed event on 2024-03-15, and every insert succeeds
    pub(crate) struct StubProvider;

    #[async_trait]
    impl CalendarProvider for StubProvider {
        async fn list_events(&self, _window: &SyncWindow) -> CalendarResult<Vec<RawEvent>> {
            Ok(vec![RawEvent {
                id: "1".to_string(),
                summary: Some("Reunião".to_string()),
                start: EventDateTime {
                    date_time: Some("2024-03-15T10:00:00".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }])
        }

        async fn create_event(&self, draft: &RawEventDraft) -> CalendarResult<RawEvent> {
            Ok(RawEvent {
                id: "created".to_string(),
                summary: Some(draft.summary.clone()),
                ..Default::default()
            })
        }

        async fn check_connection(&self) -> CalendarResult<bool> {
            Ok(true)
        }
    }

    pub(crate) struct StubFlow;

    #[async_trait]
    impl AuthorizationFlow for StubFlow {
        fn authorization_url(&self, state: &str) -> CalendarResult<String> {
            Ok(format!("https://consent.example/?state={state}"))
        }

        async fn exchange_code(&self, code: &str) -> CalendarResult<Credential> {
            if code == "good" {
                Ok(Credential::bearer("tok"))
            } else {
                Err(CalendarError::Auth("invalid_grant".into()))
            }
        }
    }

    pub(crate) fn test_state() -> AppState {
        let dashboard = Dashboard::with_parts(
            Arc::new(StubProvider),
            Arc::new(StubFlow),
            Session::new(),
            SyncSettings::default(),
        )
        .unwrap();
        AppState::new(dashboard)
    }

    pub(crate) fn app(state: AppState) -> Router {
        crate::router(state)
    }

    pub(crate) async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // HTML pages and empty bodies come back as Null
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[test]
    fn test_calendar_errors_map_to_status_codes() {
        let cases = [
            (CalendarError::Auth("x".into()), StatusCode::UNAUTHORIZED),
            (CalendarError::Provider { status: 500, message: "x".into() }, StatusCode::BAD_GATEWAY),
            (CalendarError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CalendarError::AlreadySyncing, StatusCode::CONFLICT),
            (CalendarError::ReadOnly("x".into()), StatusCode::CONFLICT),
            (CalendarError::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
