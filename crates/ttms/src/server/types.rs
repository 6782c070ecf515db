use crate::api::ApiClient;
use crate::config::TtmsConfig;
use crate::dashboard::{Dashboard, Term};
use crate::error::TtmsError;
use crate::session::{Session, SessionGuard, SessionKey};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Shared state of the dashboard service.
pub struct AppState {
    pub config: TtmsConfig,
    pub client: ApiClient,
    pub guard: SessionGuard,
    /// Path of the configured dashboard page; login discovery climbs from it
    pub site_path: String,
    /// One dashboard per session, keyed by session fingerprint
    pub dashboards: DashMap<SessionKey, Arc<Mutex<Dashboard>>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: TtmsConfig, client: ApiClient, guard: SessionGuard) -> Self {
        Self {
            site_path: config.session.site_path(),
            config,
            client,
            guard,
            dashboards: DashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the dashboard of `session`, creating it on first use.
    pub fn dashboard_for(&self, session: &Session) -> Arc<Mutex<Dashboard>> {
        self.dashboards
            .entry(session.key())
            .or_insert_with(|| {
                Arc::new(Mutex::new(Dashboard::new(
                    self.client.clone(),
                    session.clone(),
                    Term::new(&self.config.term.sesi, &self.config.term.semester),
                    &self.config.pagination,
                    self.config.roster.clone(),
                )))
            })
            .clone()
    }

    /// Drops the dashboard of `session`, if any.
    pub fn forget(&self, session: &Session) {
        self.dashboards.remove(&session.key());
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ApiErrorType {
    #[serde(skip)]
    status: StatusCode,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl From<(StatusCode, &str, Option<String>)> for ApiErrorType {
    fn from((status, error, context): (StatusCode, &str, Option<String>)) -> Self {
        Self {
            status,
            error: error.to_string(),
            context,
        }
    }
}

impl From<&TtmsError> for ApiErrorType {
    fn from(error: &TtmsError) -> Self {
        let (status, message) = match error {
            e if e.needs_reauth() => (StatusCode::UNAUTHORIZED, "Re-authentication required"),
            TtmsError::Network { .. } => (StatusCode::BAD_GATEWAY, "Upstream unreachable"),
            TtmsError::HttpStatus { .. }
            | TtmsError::Malformed { .. }
            | TtmsError::UnexpectedShape { .. } => {
                (StatusCode::BAD_GATEWAY, "Upstream answered unexpectedly")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };
        Self::from((status, message, Some(error.user_message())))
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let auth = ApiErrorType::from(&TtmsError::AuthRequired {
            message: "page".to_string(),
        });
        assert_eq!(auth.status, StatusCode::UNAUTHORIZED);
        assert!(auth.context.unwrap().contains("log in again"));

        let upstream = ApiErrorType::from(&TtmsError::HttpStatus {
            entity: "subjek".to_string(),
            status: 500,
        });
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
    }
}
