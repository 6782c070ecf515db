//! Dashboard endpoints. Each one turns its request into dashboard events,
//! settles them against the upstream service and returns the rendered view.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::dashboard::render::render;
use crate::dashboard::{Event, LecturerFilter, Term, View};
use crate::error::TtmsError;
use crate::server::types::{ApiErrorType, AppState};
use crate::session::Session;

/// Runs `events` on the session's dashboard, which must end up showing
/// `view`.
async fn show(s: &AppState, session: &Session, view: View, events: Vec<Event>) -> Response {
    if !view.allowed_for(session.role()) {
        return ApiErrorType::from((
            StatusCode::FORBIDDEN,
            "View not available for this role",
            Some(view.name().to_string()),
        ))
        .into_response();
    }

    let dashboard = s.dashboard_for(session);
    let mut dashboard = dashboard.lock().await;
    for event in events {
        dashboard.dispatch(event).await;
    }

    let state = dashboard.state();
    if state.reauth_required {
        warn!(session = %session.key(), view = view.name(), "Upstream rejected the session");
        let error = TtmsError::AuthRequired {
            message: state.notice.clone().unwrap_or_default(),
        };
        return ApiErrorType::from(&error).into_response();
    }
    (StatusCode::OK, Json(render(state))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CourseQuery {
    pub sesi: Option<String>,
    pub semester: Option<String>,
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct StudentQuery {
    pub direction: Option<Direction>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

/// GET /sessions
pub async fn get_sessions(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    info!("GET /sessions");
    show(&s, &session, View::Sessions, vec![Event::Navigate(View::Sessions)]).await
}

/// GET /courses
///
/// Query parameters:
/// - `sesi`, `semester` (optional): switch term; both are needed
/// - `q` (optional): case-insensitive filter over code and name
pub async fn get_courses(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(params): Query<CourseQuery>,
) -> Response {
    info!("GET /courses (q={:?})", params.q);

    let mut events = Vec::new();
    if let (Some(sesi), Some(semester)) = (params.sesi, params.semester) {
        events.push(Event::SetTerm(Term::new(sesi, semester)));
    }
    events.push(Event::FilterCourses(params.q));
    events.push(Event::Navigate(View::Courses));
    show(&s, &session, View::Courses, events).await
}

/// GET /courses/:code/sections
pub async fn get_sections(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(course_code): Path<String>,
) -> Response {
    info!("GET /courses/{}/sections", course_code);

    let view = View::Sections { course_code };
    show(&s, &session, view.clone(), vec![Event::Navigate(view)]).await
}

/// GET /courses/:code/sections/:section/students
pub async fn get_section_students(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((course_code, section)): Path<(String, String)>,
) -> Response {
    info!("GET /courses/{}/sections/{}/students", course_code, section);

    let view = View::SectionStudents {
        course_code,
        section,
    };
    show(&s, &session, view.clone(), vec![Event::Navigate(view)]).await
}

/// GET /lecturers
///
/// Query parameters `q`, `course` and `department` narrow the roster.
pub async fn get_lecturers(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(filter): Query<LecturerFilterQuery>,
) -> Response {
    info!("GET /lecturers");

    let filter = LecturerFilter {
        search: filter.q,
        course: filter.course,
        department: filter.department,
    };
    let events = vec![
        Event::FilterLecturers(filter),
        Event::Navigate(View::Lecturers),
    ];
    show(&s, &session, View::Lecturers, events).await
}

#[derive(Debug, Deserialize)]
pub struct LecturerFilterQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub department: String,
}

/// GET /students
///
/// Query parameters:
/// - `limit` (optional): page size; changing it returns to the first page
/// - `direction` (optional): `next` or `prev`
pub async fn get_students(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(params): Query<StudentQuery>,
) -> Response {
    info!(
        "GET /students (direction={:?}, limit={:?})",
        params.direction, params.limit
    );

    let mut events = Vec::new();
    if let Some(limit) = params.limit {
        let current = s
            .dashboard_for(&session)
            .lock()
            .await
            .state()
            .student_page
            .limit();
        if limit != current {
            events.push(Event::SetPageLimit(limit));
        }
    }
    events.push(Event::Navigate(View::Students));
    match params.direction {
        Some(Direction::Next) => events.push(Event::NextPage),
        Some(Direction::Prev) => events.push(Event::PrevPage),
        None => {}
    }
    show(&s, &session, View::Students, events).await
}

/// GET /me/courses
pub async fn get_my_courses(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    info!("GET /me/courses");
    show(&s, &session, View::MyCourses, vec![Event::Navigate(View::MyCourses)]).await
}

/// GET /me/classes
pub async fn get_my_classes(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    info!("GET /me/classes");
    show(&s, &session, View::MyClasses, vec![Event::Navigate(View::MyClasses)]).await
}

/// GET /analytics
pub async fn get_analytics(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    info!("GET /analytics");
    show(&s, &session, View::Analytics, vec![Event::Navigate(View::Analytics)]).await
}

/// POST /logout
pub async fn post_logout(
    State(s): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    info!(session = %session.key(), "POST /logout");

    s.forget(&session);
    match s.guard.logout() {
        Ok(()) => (StatusCode::OK, Json(json!({ "logged_out": true }))).into_response(),
        Err(e) => ApiErrorType::from(&e).into_response(),
    }
}
