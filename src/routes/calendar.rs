//! Google Calendar connection and sync endpoints

use axum::{
    Router,
    extract::State,
    routing::{get, post},
    Json,
};
use chrono::{DateTime, Utc};
use clinic_calendar_core::{SyncPhase, SyncReport};
use serde::Serialize;
use tracing::warn;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/calendar/connection", get(connection))
        .route("/calendar/connect", post(connect))
        .route("/calendar/disconnect", post(disconnect))
        .route("/calendar/sync", post(sync))
        .route("/calendar/status", get(status))
}

#[derive(Serialize)]
pub struct ConnectionResponse {
    pub connected: bool,
    pub loading: bool,
}

#[derive(Serialize)]
pub struct ConnectResponse {
    pub authorization_url: String,
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub removed: usize,
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub phase: SyncPhase,
    pub connected: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

/// GET /calendar/connection - Validate the stored credential with Google
async fn connection(State(state): State<AppState>) -> Json<ConnectionResponse> {
    let connection = state.dashboard().connection();
    let connected = connection.check_connection().await;

    Json(ConnectionResponse {
        connected,
        loading: connection.status().is_loading,
    })
}

/// POST /calendar/connect - Start the consent handshake
///
/// The handshake finishes when Google redirects to /auth/callback.
async fn connect(State(state): State<AppState>) -> Result<Json<ConnectResponse>, AppError> {
    let orchestrator = state.dashboard().orchestrator().clone();
    let pending = orchestrator.connect()?;
    let authorization_url = pending.authorization_url.clone();

    tokio::spawn(async move {
        if let Err(e) = orchestrator.finish_connect(pending).await {
            warn!(error = %e, "authorization handshake did not complete");
        }
    });

    Ok(Json(ConnectResponse { authorization_url }))
}

/// POST /calendar/disconnect - Forget the credential and imported events
async fn disconnect(State(state): State<AppState>) -> Json<DisconnectResponse> {
    let removed = state.dashboard().orchestrator().disconnect().await;
    Json(DisconnectResponse { removed })
}

/// POST /calendar/sync - Pull the upcoming window from Google
async fn sync(State(state): State<AppState>) -> Result<Json<SyncReport>, AppError> {
    let report = state.dashboard().orchestrator().sync().await?;
    Ok(Json(report))
}

/// GET /calendar/status - Current sync phase
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let dashboard = state.dashboard();

    Json(StatusResponse {
        phase: dashboard.orchestrator().phase(),
        connected: dashboard.connection().is_connected(),
        last_sync: dashboard.orchestrator().last_sync().await,
    })
}
