//! Notification feed endpoint

use axum::{Router, extract::State, routing::get, Json};
use clinic_calendar_core::notify::Notification;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", get(drain))
}

/// GET /notifications - Take every pending notification, oldest first
async fn drain(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.dashboard().notifications().drain())
}
