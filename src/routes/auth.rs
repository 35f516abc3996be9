//! OAuth redirect endpoint

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use serde::Deserialize;

use crate::routes::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/callback", get(callback))
}

/// Query string Google appends when redirecting back
#[derive(Deserialize)]
pub struct CallbackParams {
    pub state: String,
    pub code: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/callback - Finish the handshake started by POST /calendar/connect
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>, AppError> {
    let connection = state.dashboard().connection();

    match (params.code, params.error) {
        (Some(code), None) => {
            connection.complete_authorization(&params.state, &code).await?;
            Ok(Html(
                "<html><body><h1>Google Calendar connected</h1><p>You can close this window.</p></body></html>",
            ))
        }
        (_, reason) => {
            let reason = reason.unwrap_or_else(|| "missing authorization code".to_string());
            connection.fail_authorization(&params.state, &reason)?;
            Ok(Html(
                "<html><body><h1>Authorization failed</h1><p>You can close this window and try again.</p></body></html>",
            ))
        }
    }
}
