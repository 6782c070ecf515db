//! Error types for the timetable client.

use thiserror::Error;

/// Errors that can occur while talking to the timetable service or managing
/// the local session.
#[derive(Debug, Error, Clone)]
pub enum TtmsError {
    /// Network/HTTP transport failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Upstream answered with a non-2xx status
    #[error("Upstream returned status {status} for entity {entity}")]
    HttpStatus { entity: String, status: u16 },

    /// Body was neither JSON nor a recognisable error page
    #[error("Malformed response for entity {entity}: {message}")]
    Malformed { entity: String, message: String },

    /// Body was JSON but held no record array in any known position
    #[error("Unexpected response shape for entity {entity}")]
    UnexpectedShape { entity: String },

    /// Upstream served its documentation/error page instead of data. This is
    /// what an invalid or expired `session_id` looks like server side.
    #[error("Authentication required: {message}")]
    AuthRequired { message: String },

    /// No session is stored locally
    #[error("No active session: {message}")]
    NoSession { message: String },

    /// The stored session is older than the sliding window
    #[error("Session expired after {idle_secs}s of inactivity")]
    SessionExpired { idle_secs: i64 },

    /// Local session storage failed
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },
}

impl TtmsError {
    /// Returns true if the user has to log in again to recover.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            TtmsError::AuthRequired { .. }
                | TtmsError::NoSession { .. }
                | TtmsError::SessionExpired { .. }
        )
    }

    /// Returns true if the error degrades to an empty result instead of
    /// failing the view.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            TtmsError::Network { .. }
                | TtmsError::HttpStatus { .. }
                | TtmsError::Malformed { .. }
                | TtmsError::UnexpectedShape { .. }
        )
    }

    /// Message shown to the user when this error reaches a view.
    pub fn user_message(&self) -> String {
        if self.needs_reauth() {
            "Your session is no longer valid. Please log out and log in again.".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<reqwest::Error> for TtmsError {
    fn from(err: reqwest::Error) -> Self {
        TtmsError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for TtmsError {
    fn from(err: url::ParseError) -> Self {
        TtmsError::UrlError {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for TtmsError {
    fn from(err: rusqlite::Error) -> Self {
        TtmsError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TtmsError {
    fn from(err: serde_json::Error) -> Self {
        TtmsError::Storage {
            message: format!("invalid stored session: {}", err),
        }
    }
}

impl From<std::io::Error> for TtmsError {
    fn from(err: std::io::Error) -> Self {
        TtmsError::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reauth_classification() {
        assert!(TtmsError::AuthRequired {
            message: "doc page".to_string()
        }
        .needs_reauth());
        assert!(TtmsError::SessionExpired { idle_secs: 9000 }.needs_reauth());
        assert!(!TtmsError::UnexpectedShape {
            entity: "subjek".to_string()
        }
        .needs_reauth());
    }

    #[test]
    fn test_soft_failures_do_not_need_reauth() {
        let soft = [
            TtmsError::Network {
                message: "reset".to_string(),
            },
            TtmsError::HttpStatus {
                entity: "pelajar".to_string(),
                status: 500,
            },
            TtmsError::Malformed {
                entity: "pelajar".to_string(),
                message: "eof".to_string(),
            },
        ];
        for err in soft {
            assert!(err.is_soft());
            assert!(!err.needs_reauth());
        }
    }
}
