use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use crate::server::types::{ApiErrorType, AppState};
use crate::session::GuardOutcome;

/// Runs the session guard before a protected route.
///
/// A valid session is renewed and attached to the request. A missing or
/// expired one is cleared and the client is redirected to the login page,
/// searched for from the dashboard page's location rather than the API route.
pub async fn require_session(
    State(s): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    match s.guard.check(Utc::now(), &s.site_path).await {
        Ok(GuardOutcome::Valid(session)) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Ok(GuardOutcome::Redirect { location, reason }) => {
            warn!(path = %path, reason = %reason, "Rejecting request without a valid session");
            s.dashboards.clear();
            (
                StatusCode::TEMPORARY_REDIRECT,
                [(header::LOCATION, location.clone())],
                Json(json!({
                    "error": reason.user_message(),
                    "location": location,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(path = %path, error = %e, "Session guard failed");
            ApiErrorType::from(&e).into_response()
        }
    }
}
