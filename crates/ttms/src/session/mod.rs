//! Local session handling: the stored session record, the sliding-expiry
//! guard, and login page discovery.

pub mod login;
pub mod store;

pub use login::{candidate_paths, LoginLocator, FALLBACK_LOGIN_LOCATION};
pub use store::{MemoryStore, SessionStore, SqliteStore};

use crate::config::SessionConfig;
use crate::error::TtmsError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session record written at login and read on every guarded access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub login_name: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Role label as reported at login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Session {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.login_name)
    }

    pub fn role(&self) -> Role {
        self.description
            .as_deref()
            .map(Role::from_label)
            .unwrap_or(Role::Admin)
    }

    /// True when the record carries a `session_id` usable for protected
    /// entities.
    pub fn has_session_id(&self) -> bool {
        !self.session_id.trim().is_empty()
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::from_session_id(&self.session_id)
    }
}

/// Which dashboard a session gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Lecturer,
    Student,
}

impl Role {
    /// Maps a login role label (English or Malay) onto a role. Unknown
    /// labels get the admin view.
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("pelajar") || lower.contains("student") {
            Role::Student
        } else if lower.contains("pensyarah") || lower.contains("lecturer") {
            Role::Lecturer
        } else {
            Role::Admin
        }
    }
}

/// Fingerprint of a session id, safe to log.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn from_session_id(session_id: &str) -> Self {
        let digest = Sha256::digest(session_id.as_bytes());
        Self(digest[..8].iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}...", &self.0[..8.min(self.0.len())])
    }
}

/// Returns true iff a session issued (or last renewed) at `issued_at_ms` is
/// still inside the window at `now_ms`.
pub fn is_session_valid(issued_at_ms: Option<i64>, now_ms: i64, ttl_ms: i64) -> bool {
    match issued_at_ms {
        Some(issued) => now_ms.saturating_sub(issued) < ttl_ms,
        None => false,
    }
}

/// Result of guarding a protected access.
#[derive(Debug, Clone)]
pub enum GuardOutcome {
    /// Session is valid and its timestamp has been renewed
    Valid(Session),
    /// Session was missing or expired; it has been cleared and the caller
    /// should send the user to `location`
    Redirect { location: String, reason: TtmsError },
}

/// Validates the stored session with a sliding expiry window.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<dyn SessionStore>,
    locator: LoginLocator,
    session_key: String,
    timestamp_key: String,
    ttl_ms: i64,
}

impl SessionGuard {
    pub fn new(
        store: Arc<dyn SessionStore>,
        locator: LoginLocator,
        config: &SessionConfig,
    ) -> Self {
        Self {
            store,
            locator,
            session_key: config.session_key.clone(),
            timestamp_key: config.timestamp_key.clone(),
            ttl_ms: config.ttl_secs.saturating_mul(1000),
        }
    }

    /// Builds a guard whose login discovery starts from `config.site_url`.
    pub fn from_config(
        store: Arc<dyn SessionStore>,
        config: &SessionConfig,
    ) -> Result<Self, TtmsError> {
        let site = url::Url::parse(&config.site_url)?;
        let locator = LoginLocator::new(&site, &config.login_page)?;
        Ok(Self::new(store, locator, config))
    }

    /// Reads the stored session without checking or renewing it.
    pub fn current(&self) -> Result<Option<Session>, TtmsError> {
        match self.store.get(&self.session_key)? {
            Some(blob) => Ok(serde_json::from_str(&blob).ok()),
            None => Ok(None),
        }
    }

    /// Validates the stored session at `now` and renews its timestamp.
    ///
    /// Does not clear anything on failure; see [`SessionGuard::check`].
    pub fn validate(&self, now: DateTime<Utc>) -> Result<Session, TtmsError> {
        let session = self.current()?.ok_or_else(|| TtmsError::NoSession {
            message: "no session stored".to_string(),
        })?;

        let issued_at = self
            .store
            .get(&self.timestamp_key)?
            .and_then(|raw| raw.trim().parse::<i64>().ok());
        let issued_at = issued_at.ok_or_else(|| TtmsError::NoSession {
            message: "no login timestamp stored".to_string(),
        })?;

        let now_ms = now.timestamp_millis();
        if !is_session_valid(Some(issued_at), now_ms, self.ttl_ms) {
            let idle_secs = now_ms.saturating_sub(issued_at) / 1000;
            warn!(session = %session.key(), idle_secs, "Session expired");
            return Err(TtmsError::SessionExpired { idle_secs });
        }

        self.store.set(&self.timestamp_key, &now_ms.to_string())?;
        debug!(session = %session.key(), "Session renewed");
        Ok(session)
    }

    /// Guards a protected access made from `current_path`.
    ///
    /// On a missing or expired session both stored entries are removed before
    /// the login location is discovered, so a stale token is never reused.
    pub async fn check(
        &self,
        now: DateTime<Utc>,
        current_path: &str,
    ) -> Result<GuardOutcome, TtmsError> {
        match self.validate(now) {
            Ok(session) => Ok(GuardOutcome::Valid(session)),
            Err(reason) if reason.needs_reauth() => {
                self.logout()?;
                let location = self.locator.discover(current_path).await;
                info!(location = %location, reason = %reason, "Redirecting to login");
                Ok(GuardOutcome::Redirect { location, reason })
            }
            Err(e) => Err(e),
        }
    }

    /// Stores a freshly issued session.
    pub fn login(&self, session: &Session, now: DateTime<Utc>) -> Result<(), TtmsError> {
        let blob = serde_json::to_string(session)?;
        self.store.set(&self.session_key, &blob)?;
        self.store
            .set(&self.timestamp_key, &now.timestamp_millis().to_string())?;
        info!(session = %session.key(), login = %session.login_name, "Session stored");
        Ok(())
    }

    /// Removes the stored session and its timestamp.
    pub fn logout(&self) -> Result<(), TtmsError> {
        self.store.clear(&self.session_key)?;
        self.store.clear(&self.timestamp_key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const TWO_HOURS_MS: i64 = 7_200_000;

    fn guard(store: Arc<MemoryStore>) -> SessionGuard {
        let config = SessionConfig::default();
        let site = url::Url::parse(&config.site_url).unwrap();
        let locator = LoginLocator::new(&site, &config.login_page).unwrap();
        SessionGuard::new(store, locator, &config)
    }

    fn session() -> Session {
        Session {
            login_name: "A20EC0001".to_string(),
            session_id: "abc123".to_string(),
            full_name: Some("Ali bin Abu".to_string()),
            description: Some("Pelajar".to_string()),
        }
    }

    #[test]
    fn test_validity_window() {
        let now = 10 * TWO_HOURS_MS;
        assert!(is_session_valid(Some(now), now, TWO_HOURS_MS));
        assert!(is_session_valid(Some(now - TWO_HOURS_MS + 1), now, TWO_HOURS_MS));
        assert!(!is_session_valid(Some(now - TWO_HOURS_MS), now, TWO_HOURS_MS));
        assert!(!is_session_valid(None, now, TWO_HOURS_MS));
    }

    #[test]
    fn test_validate_renews_timestamp() {
        let store = Arc::new(MemoryStore::new());
        let guard = guard(store.clone());
        let start = Utc::now();
        guard.login(&session(), start).unwrap();

        let later = start + Duration::minutes(90);
        assert_eq!(guard.validate(later).unwrap(), session());
        assert_eq!(
            store.get("TTMSFC_loginTimestamp").unwrap(),
            Some(later.timestamp_millis().to_string())
        );

        // Sliding: another 90 minutes from the renewal is still inside.
        let again = later + Duration::minutes(90);
        assert!(guard.validate(again).is_ok());
        assert!(guard.validate(again).is_ok());
        assert_eq!(
            store.get("TTMSFC_loginTimestamp").unwrap(),
            Some(again.timestamp_millis().to_string())
        );
    }

    #[test]
    fn test_validate_rejects_expired() {
        let store = Arc::new(MemoryStore::new());
        let guard = guard(store);
        let start = Utc::now();
        guard.login(&session(), start).unwrap();

        let err = guard.validate(start + Duration::hours(3)).unwrap_err();
        assert!(matches!(err, TtmsError::SessionExpired { idle_secs: 10800 }));
    }

    #[test]
    fn test_unparseable_timestamp_is_no_session() {
        let store = Arc::new(MemoryStore::new());
        let guard = guard(store.clone());
        guard.login(&session(), Utc::now()).unwrap();
        store.set("TTMSFC_loginTimestamp", "yesterday").unwrap();

        assert!(matches!(
            guard.validate(Utc::now()),
            Err(TtmsError::NoSession { .. })
        ));
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(session().role(), Role::Student);
        assert_eq!(Role::from_label("Pensyarah"), Role::Lecturer);
        assert_eq!(Role::from_label("Pentadbir Sistem"), Role::Admin);
        let mut s = session();
        s.description = None;
        assert_eq!(s.role(), Role::Admin);
        s.full_name = Some("  ".to_string());
        assert_eq!(s.display_name(), "A20EC0001");
    }

    #[test]
    fn test_session_key_hides_id() {
        let key = session().key();
        assert_eq!(key, SessionKey::from_session_id("abc123"));
        assert!(!key.to_string().contains("abc123"));
        assert_eq!(key.as_str().len(), 16);
    }
}
