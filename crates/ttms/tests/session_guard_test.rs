//! Session guard with file-backed storage and login page discovery.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ttms::config::SessionConfig;
use ttms::session::{
    GuardOutcome, Session, SessionGuard, SessionStore, SqliteStore, FALLBACK_LOGIN_LOCATION,
};
use ttms::TtmsError;

fn session() -> Session {
    Session {
        login_name: "S42".to_string(),
        session_id: "f00dfeed".to_string(),
        full_name: Some("Dr. Siti".to_string()),
        description: Some("Pensyarah".to_string()),
    }
}

fn config(site_url: String) -> SessionConfig {
    SessionConfig {
        site_url,
        ..Default::default()
    }
}

fn open_store(dir: &TempDir) -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open(&dir.path().join("session.db")).expect("store opens"))
}

#[tokio::test]
async fn test_expired_session_redirects_to_discovered_login() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/ttms/Login.html"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let config = config(format!("{}/ttms/admin/index.html", server.uri()));
    let guard = SessionGuard::from_config(store.clone(), &config).unwrap();

    let now = Utc::now();
    guard.login(&session(), now - Duration::hours(3)).unwrap();

    let outcome = guard.check(now, "/ttms/admin/index.html").await.unwrap();
    match outcome {
        GuardOutcome::Redirect { location, reason } => {
            assert_eq!(location, format!("{}/ttms/Login.html", server.uri()));
            assert!(matches!(reason, TtmsError::SessionExpired { .. }));
        }
        other => panic!("Expected redirect, got {:?}", other),
    }

    assert_eq!(store.get(&config.session_key).unwrap(), None);
    assert_eq!(store.get(&config.timestamp_key).unwrap(), None);
}

#[tokio::test]
async fn test_missing_session_falls_back_when_no_login_page_answers() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = config(format!("{}/ttms/admin/index.html", server.uri()));
    let guard = SessionGuard::from_config(open_store(&dir), &config).unwrap();

    let outcome = guard
        .check(Utc::now(), "/ttms/admin/index.html")
        .await
        .unwrap();
    match outcome {
        GuardOutcome::Redirect { location, reason } => {
            assert_eq!(location, FALLBACK_LOGIN_LOCATION);
            assert!(matches!(reason, TtmsError::NoSession { .. }));
        }
        other => panic!("Expected redirect, got {:?}", other),
    }
}

#[tokio::test]
async fn test_valid_session_is_renewed_and_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = config("http://127.0.0.1:9/index.html".to_string());
    let now = Utc::now();

    {
        let guard = SessionGuard::from_config(open_store(&dir), &config).unwrap();
        guard.login(&session(), now - Duration::minutes(110)).unwrap();
    }

    let store = open_store(&dir);
    let guard = SessionGuard::from_config(store.clone(), &config).unwrap();
    match guard.check(now, "/index.html").await.unwrap() {
        GuardOutcome::Valid(s) => assert_eq!(s, session()),
        other => panic!("Expected a valid session, got {:?}", other),
    }
    assert_eq!(
        store.get(&config.timestamp_key).unwrap(),
        Some(now.timestamp_millis().to_string())
    );

    // Renewed at `now`, so 110 minutes later it is still inside the window.
    assert!(guard.validate(now + Duration::minutes(110)).is_ok());
}

#[tokio::test]
async fn test_logout_clears_both_entries() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let config = config("http://127.0.0.1:9/index.html".to_string());
    let guard = SessionGuard::from_config(store.clone(), &config).unwrap();

    guard.login(&session(), Utc::now()).unwrap();
    assert!(guard.current().unwrap().is_some());

    guard.logout().unwrap();
    assert!(guard.current().unwrap().is_none());
    assert_eq!(store.get(&config.timestamp_key).unwrap(), None);
}
