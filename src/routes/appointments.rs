//! Appointment endpoints

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json,
};
use chrono::NaiveDate;
use clinic_calendar_core::{Appointment, AppointmentDraft, MirrorOutcome};
use serde::Deserialize;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list).post(create))
        .route("/appointments/{id}", put(update).delete(remove))
}

#[derive(Deserialize)]
pub struct ListParams {
    /// Only appointments on this day (YYYY-MM-DD)
    pub date: Option<NaiveDate>,
}

/// GET /appointments - Every appointment, by date and time
async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Json<Vec<Appointment>> {
    let store = state.dashboard().store().read().await;

    let appointments = match params.date {
        Some(date) => store.on_date(date).into_iter().cloned().collect(),
        None => store.sorted(),
    };
    Json(appointments)
}

/// POST /appointments - Create locally and mirror to Google
async fn create(
    State(state): State<AppState>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<(StatusCode, Json<MirrorOutcome>), AppError> {
    let outcome = state.dashboard().orchestrator().create_and_mirror(&draft).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// PUT /appointments/{id} - Edit a local appointment
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<AppointmentDraft>,
) -> Result<Json<Appointment>, AppError> {
    let updated = state.dashboard().orchestrator().update_local(&id, &draft).await?;
    Ok(Json(updated))
}

/// DELETE /appointments/{id} - Remove a local appointment
async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let deleted = state.dashboard().orchestrator().delete_local(&id).await?;
    Ok(Json(deleted))
}
