use super::catalog::{self, LecturerFilter, SectionRow};
use super::{Command, Event, Loaded, Term, View};
use crate::error::TtmsError;
use crate::models::{Course, Registration, SessionSemester, Student};
use crate::pagination::{PageOutcome, Paginator};
use crate::roster::{AssignmentSchema, Roster};
use crate::session::Role;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Term totals for the analytics view. `None` means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Analytics {
    pub students: Option<usize>,
    pub courses: Option<usize>,
    pub lecturers: Option<usize>,
}

/// Everything a dashboard shows, for one user.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub role: Role,
    pub view: View,
    pub term: Term,
    pub sessions: Vec<SessionSemester>,
    pub courses: Vec<Course>,
    pub course_filter: String,
    pub sections: Vec<SectionRow>,
    pub roster: Option<Roster>,
    pub lecturer_filter: LecturerFilter,
    pub students: Vec<Student>,
    pub student_page: Paginator,
    pub section_students: Vec<Student>,
    pub registrations: Vec<Registration>,
    pub classes: Vec<Value>,
    pub analytics: Option<Analytics>,
    /// Message for the user about the last failure
    pub notice: Option<String>,
    /// The service rejected the session; the user must log in again
    pub reauth_required: bool,
    schema: AssignmentSchema,
}

impl DashboardState {
    pub fn new(role: Role, term: Term, page_limit: u32, schema: AssignmentSchema) -> Self {
        Self {
            role,
            view: View::home(role),
            term,
            sessions: Vec::new(),
            courses: Vec::new(),
            course_filter: String::new(),
            sections: Vec::new(),
            roster: None,
            lecturer_filter: LecturerFilter::default(),
            students: Vec::new(),
            student_page: Paginator::new(page_limit),
            section_students: Vec::new(),
            registrations: Vec::new(),
            classes: Vec::new(),
            analytics: None,
            notice: None,
            reauth_required: false,
            schema,
        }
    }

    /// Courses passing the current filter.
    pub fn visible_courses(&self) -> Vec<&Course> {
        catalog::filter_courses(&self.courses, &self.course_filter)
    }

    /// Roster entries passing the current filter.
    pub fn visible_lecturers(&self) -> Vec<&crate::roster::RosterEntry> {
        self.roster
            .iter()
            .flat_map(|r| r.entries.iter())
            .filter(|e| self.lecturer_filter.matches(e))
            .collect()
    }

    /// Fetches needed to show `view`. With `force` unset, already-loaded data
    /// is reused; analytics and the lecturer's classes always refresh.
    fn fetches_for(&self, view: &View, force: bool) -> Vec<Command> {
        let term = self.term.clone();
        let needed = match view {
            View::Analytics => Some(Command::FetchAnalytics(term)),
            View::Sessions => (force || self.sessions.is_empty()).then_some(Command::FetchSessions),
            View::Courses => (force || self.courses.is_empty()).then(|| Command::FetchCourses(term)),
            View::Sections { course_code } => Some(Command::FetchSections {
                course_code: course_code.clone(),
                term,
            }),
            View::Lecturers => (force || self.roster.is_none()).then(|| Command::BuildRoster(term)),
            View::Students => (force || self.students.is_empty()).then(|| Command::FetchStudents {
                term,
                limit: self.student_page.limit(),
                offset: self.student_page.offset(),
            }),
            View::SectionStudents {
                course_code,
                section,
            } => Some(Command::FetchSectionStudents {
                course_code: course_code.clone(),
                section: section.clone(),
                term,
            }),
            View::MyCourses => {
                (force || self.registrations.is_empty()).then_some(Command::FetchRegistrations)
            }
            View::MyClasses => Some(Command::FetchClasses(term)),
        };
        needed.into_iter().collect()
    }

    fn students_command(&self) -> Command {
        Command::FetchStudents {
            term: self.term.clone(),
            limit: self.student_page.limit(),
            offset: self.student_page.offset(),
        }
    }

    /// Whether the sections of `course_code` are on screen.
    fn shows_course(&self, course_code: &str) -> bool {
        match &self.view {
            View::Sections { course_code: c } | View::SectionStudents { course_code: c, .. } => {
                c == course_code
            }
            _ => false,
        }
    }

    /// Clears what belongs to the view being left.
    fn leave(&mut self, next: &View) {
        match (&self.view, next) {
            (View::Sections { .. }, View::SectionStudents { .. }) => {}
            (View::Sections { .. }, _) | (View::SectionStudents { .. }, _) => {
                self.sections.clear();
                self.section_students.clear();
            }
            (View::Students, View::Students) => {}
            (View::Students, _) => {
                self.students.clear();
                self.student_page.reset();
            }
            _ => {}
        }
    }

    /// Records a failed load. Session problems flag re-authentication; other
    /// failures leave a notice only when the view cannot do without the data.
    fn fail(&mut self, what: &str, error: &TtmsError, required: bool) {
        warn!(what, error = %error, "Load failed");
        if error.needs_reauth() {
            self.reauth_required = true;
            self.notice = Some(error.user_message());
        } else if required {
            self.notice = Some(format!("Failed to load {}: {}", what, error));
        }
    }

    fn apply_loaded(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Sessions(result) => match result {
                Ok(sessions) => self.sessions = sessions,
                Err(e) => {
                    self.sessions.clear();
                    self.fail("sessions", &e, true);
                }
            },
            Loaded::Courses(term, result) => {
                if term != self.term {
                    debug!(%term, "Dropping courses for a previous term");
                    return;
                }
                match result {
                    Ok(courses) => self.courses = courses,
                    Err(e) => {
                        self.courses.clear();
                        self.fail("courses", &e, true);
                    }
                }
            }
            Loaded::Sections {
                course_code,
                term,
                sections,
                assignments,
            } => {
                if term != self.term || !self.shows_course(&course_code) {
                    debug!(%term, course_code, "Dropping sections no longer shown");
                    return;
                }
                let sections = sections.unwrap_or_else(|e| {
                    self.fail(&format!("sections of {}", course_code), &e, true);
                    Vec::new()
                });
                let assignments = assignments.unwrap_or_else(|e| {
                    self.fail(&format!("lecturers of {}", course_code), &e, false);
                    Vec::new()
                });
                self.sections =
                    catalog::merge_section_lecturers(sections, &assignments, &self.schema);
            }
            Loaded::Roster(term, result) => {
                if term != self.term {
                    debug!(%term, "Dropping roster for a previous term");
                    return;
                }
                match result {
                    Ok(roster) => {
                        if let Some(analytics) = self.analytics.as_mut() {
                            analytics.lecturers = Some(roster.entries.len());
                        }
                        self.roster = Some(roster);
                    }
                    Err(e) => self.fail("lecturers", &e, true),
                }
            }
            Loaded::Students {
                term,
                offset,
                result,
            } => {
                if term != self.term || offset != self.student_page.offset() {
                    debug!(%term, offset, "Dropping a student page no longer shown");
                    return;
                }
                let (items, error) = match result {
                    Ok(items) => (items, None),
                    Err(e) => (Vec::new(), Some(e)),
                };
                if let Some(e) = &error {
                    self.fail("students", e, true);
                }
                match self.student_page.record(items.len()) {
                    PageOutcome::Accepted => self.students = items,
                    PageOutcome::RolledBack => {
                        if error.is_none() {
                            self.notice = Some("No more students.".to_string());
                        }
                    }
                }
            }
            Loaded::SectionStudents {
                course_code,
                section,
                term,
                result,
            } => {
                let current = matches!(
                    &self.view,
                    View::SectionStudents { course_code: c, section: s }
                        if *c == course_code && *s == section
                );
                if term != self.term || !current {
                    debug!(%term, course_code, section, "Dropping section students no longer shown");
                    return;
                }
                match result {
                    Ok(students) => self.section_students = students,
                    Err(e) => {
                        self.section_students.clear();
                        self.fail("section students", &e, true);
                    }
                }
            }
            Loaded::Registrations(result) => match result {
                Ok(registrations) => self.registrations = registrations,
                Err(e) => {
                    self.registrations.clear();
                    self.fail("registered courses", &e, true);
                }
            },
            Loaded::Classes(result) => match result {
                Ok(classes) => self.classes = classes,
                Err(e) => {
                    self.classes.clear();
                    self.fail("classes", &e, false);
                }
            },
            Loaded::Analytics { students, courses } => {
                let students = students
                    .map_err(|e| self.fail("student count", &e, false))
                    .ok();
                let courses = courses
                    .map_err(|e| self.fail("course count", &e, false))
                    .ok();
                self.analytics = Some(Analytics {
                    students,
                    courses,
                    lecturers: self.roster.as_ref().map(|r| r.entries.len()),
                });
            }
        }
    }
}

/// Applies `event` to `state` and returns the fetches it calls for.
pub fn update(mut state: DashboardState, event: Event) -> (DashboardState, Vec<Command>) {
    let commands = match event {
        Event::Navigate(view) => {
            if !view.allowed_for(state.role) {
                state.notice = Some(format!("The {} view is not available.", view.name()));
                Vec::new()
            } else {
                state.notice = None;
                state.reauth_required = false;
                state.leave(&view);
                let commands = state.fetches_for(&view, false);
                state.view = view;
                commands
            }
        }
        Event::SetTerm(term) => {
            if term == state.term {
                Vec::new()
            } else {
                state.term = term;
                state.courses.clear();
                state.sections.clear();
                state.section_students.clear();
                state.roster = None;
                state.students.clear();
                state.student_page.reset();
                state.classes.clear();
                state.analytics = None;
                state.fetches_for(&state.view, true)
            }
        }
        Event::FilterCourses(filter) => {
            state.course_filter = filter;
            Vec::new()
        }
        Event::FilterLecturers(filter) => {
            state.lecturer_filter = filter;
            Vec::new()
        }
        Event::NextPage => {
            if state.student_page.next() {
                vec![state.students_command()]
            } else {
                Vec::new()
            }
        }
        Event::PrevPage => {
            if state.student_page.prev() {
                vec![state.students_command()]
            } else {
                Vec::new()
            }
        }
        Event::SetPageLimit(limit) => {
            state.student_page.set_limit(limit);
            vec![state.students_command()]
        }
        Event::OpenPage { limit, offset } => {
            state.students.clear();
            state.student_page.seek(limit, offset);
            if state.view == View::Students {
                vec![state.students_command()]
            } else {
                Vec::new()
            }
        }
        Event::Refresh => {
            state.notice = None;
            state.reauth_required = false;
            state.fetches_for(&state.view, true)
        }
        Event::Loaded(loaded) => {
            state.apply_loaded(loaded);
            Vec::new()
        }
    };
    (state, commands)
}
