//! Role dashboards as explicit state machines.
//!
//! A view change, filter or page turn is an [`Event`]. [`update`] applies it
//! to a [`DashboardState`] and returns the fetches it calls for as
//! [`Command`]s. The [`Dashboard`] controller runs those commands against
//! the service and feeds the results back in as [`Event::Loaded`]. Rendering
//! a state is a separate step (see [`render`]).

pub mod catalog;
mod controller;
pub mod render;
mod state;

pub use catalog::{LecturerFilter, ScheduleEntry, SectionRow};
pub use controller::Dashboard;
pub use state::{update, Analytics, DashboardState};

use crate::error::TtmsError;
use crate::models::{Course, Registration, Section, SessionSemester, Student};
use crate::roster::Roster;
use crate::session::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Academic session and semester the dashboard is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub sesi: String,
    pub semester: String,
}

impl Term {
    pub fn new(sesi: impl Into<String>, semester: impl Into<String>) -> Self {
        Self {
            sesi: sesi.into(),
            semester: semester.into(),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.sesi, self.semester)
    }
}

/// Screens of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// Term totals
    Analytics,
    /// Session/semester list
    Sessions,
    /// Course list for the term
    Courses,
    /// Sections of one course with their lecturers
    Sections { course_code: String },
    /// Lecturer roster
    Lecturers,
    /// Paginated student directory
    Students,
    /// Students registered in one section
    SectionStudents { course_code: String, section: String },
    /// Courses the logged-in student registered for
    MyCourses,
    /// Classes the logged-in lecturer teaches
    MyClasses,
}

impl View {
    /// First view shown to `role`.
    pub fn home(role: Role) -> Self {
        match role {
            Role::Admin => View::Analytics,
            Role::Lecturer => View::MyClasses,
            Role::Student => View::MyCourses,
        }
    }

    /// Whether `role` may open this view.
    pub fn allowed_for(&self, role: Role) -> bool {
        match self {
            View::Sessions | View::Courses | View::Sections { .. } => true,
            View::Analytics | View::Lecturers | View::Students => role == Role::Admin,
            View::SectionStudents { .. } => role != Role::Student,
            View::MyCourses => role != Role::Lecturer,
            View::MyClasses => role == Role::Lecturer,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            View::Analytics => "analytics",
            View::Sessions => "sessions",
            View::Courses => "courses",
            View::Sections { .. } => "sections",
            View::Lecturers => "lecturers",
            View::Students => "students",
            View::SectionStudents { .. } => "section_students",
            View::MyCourses => "my_courses",
            View::MyClasses => "my_classes",
        }
    }
}

/// Inputs to [`update`].
#[derive(Debug, Clone)]
pub enum Event {
    Navigate(View),
    SetTerm(Term),
    FilterCourses(String),
    FilterLecturers(LecturerFilter),
    NextPage,
    PrevPage,
    SetPageLimit(u32),
    /// Position the student pager at `offset` with page size `limit`
    /// before the students view is opened
    OpenPage { limit: u32, offset: u32 },
    /// Refetch the current view regardless of what is loaded
    Refresh,
    Loaded(Loaded),
}

/// Results of a [`Command`].
#[derive(Debug, Clone)]
pub enum Loaded {
    Sessions(Result<Vec<SessionSemester>, TtmsError>),
    Courses(Term, Result<Vec<Course>, TtmsError>),
    /// Sections and assignments are fetched together; either may fail alone
    Sections {
        course_code: String,
        term: Term,
        sections: Result<Vec<Section>, TtmsError>,
        assignments: Result<Vec<Value>, TtmsError>,
    },
    Roster(Term, Result<Roster, TtmsError>),
    /// One page of the student directory, tagged with the request it answers
    Students {
        term: Term,
        offset: u32,
        result: Result<Vec<Student>, TtmsError>,
    },
    SectionStudents {
        course_code: String,
        section: String,
        term: Term,
        result: Result<Vec<Student>, TtmsError>,
    },
    Registrations(Result<Vec<Registration>, TtmsError>),
    Classes(Result<Vec<Value>, TtmsError>),
    Analytics {
        students: Result<usize, TtmsError>,
        courses: Result<usize, TtmsError>,
    },
}

/// Fetches requested by [`update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchSessions,
    FetchCourses(Term),
    FetchSections { course_code: String, term: Term },
    BuildRoster(Term),
    FetchStudents { term: Term, limit: u32, offset: u32 },
    FetchSectionStudents {
        course_code: String,
        section: String,
        term: Term,
    },
    FetchRegistrations,
    FetchClasses(Term),
    FetchAnalytics(Term),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(View::Students.allowed_for(Role::Admin));
        assert!(!View::Students.allowed_for(Role::Lecturer));
        assert!(View::MyClasses.allowed_for(Role::Lecturer));
        assert!(!View::MyClasses.allowed_for(Role::Student));
        assert!(View::Courses.allowed_for(Role::Student));
        for role in [Role::Admin, Role::Lecturer, Role::Student] {
            assert!(View::home(role).allowed_for(role));
        }
    }
}
