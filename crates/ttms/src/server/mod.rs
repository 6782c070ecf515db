//! Local HTTP service exposing the role dashboards as JSON.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware as mw, Router};

use crate::server::endpoints::{dashboard, status};
use crate::server::middleware::require_session;

mod endpoints;
mod middleware;
mod types;

pub use types::{ApiErrorType, AppState};

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Router whose endpoints require a valid local session
    let guarded_router = Router::new()
        .route("/sessions", get(dashboard::get_sessions))
        .route("/courses", get(dashboard::get_courses))
        .route("/courses/:code/sections", get(dashboard::get_sections))
        .route(
            "/courses/:code/sections/:section/students",
            get(dashboard::get_section_students),
        )
        .route("/lecturers", get(dashboard::get_lecturers))
        .route("/students", get(dashboard::get_students))
        .route("/me/courses", get(dashboard::get_my_courses))
        .route("/me/classes", get(dashboard::get_my_classes))
        .route("/analytics", get(dashboard::get_analytics))
        .route("/logout", post(dashboard::post_logout))
        .layer(mw::from_fn_with_state(app_state.clone(), require_session));

    Router::new()
        .route("/health", get(status::get_health))
        .merge(guarded_router)
        .with_state(app_state)
}
