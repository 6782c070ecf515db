use super::catalog::classes_for_lecturer;
use super::state::{update, DashboardState};
use super::{Command, Event, Loaded, Term};
use crate::api::{ApiClient, Entity, Params};
use crate::config::{PaginationConfig, RosterConfig};
use crate::error::TtmsError;
use crate::models::sections_for_course;
use crate::roster::{AssignmentSchema, LecturerAggregator};
use crate::session::Session;
use tracing::{debug, info};

/// Drives one user's [`DashboardState`] against the service.
pub struct Dashboard {
    state: DashboardState,
    client: ApiClient,
    roster_config: RosterConfig,
    session: Session,
}

impl Dashboard {
    pub fn new(
        client: ApiClient,
        session: Session,
        term: Term,
        pagination: &PaginationConfig,
        roster_config: RosterConfig,
    ) -> Self {
        let state = DashboardState::new(
            session.role(),
            term,
            pagination.default_limit,
            AssignmentSchema::from_config(&roster_config),
        );
        Self {
            state,
            client,
            roster_config,
            session,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Applies `event`, runs every fetch it calls for and applies the
    /// results. Returns the settled state.
    pub async fn dispatch(&mut self, event: Event) -> &DashboardState {
        let mut pending = self.apply(event);
        while let Some(command) = pending.pop() {
            let loaded = self.run(command).await;
            pending.extend(self.apply(Event::Loaded(loaded)));
        }
        &self.state
    }

    fn apply(&mut self, event: Event) -> Vec<Command> {
        let (state, commands) = update(self.state.clone(), event);
        self.state = state;
        commands
    }

    fn require_session_id(&self) -> Result<&str, TtmsError> {
        if self.session.has_session_id() {
            Ok(self.session.session_id.as_str())
        } else {
            Err(TtmsError::NoSession {
                message: "this list requires a session_id".to_string(),
            })
        }
    }

    /// Executes one fetch.
    async fn run(&self, command: Command) -> Loaded {
        debug!(command = ?command, "Running dashboard command");
        match command {
            Command::FetchSessions => Loaded::Sessions(
                self.client
                    .fetch_as(Entity::SesiSemester, &Params::new())
                    .await,
            ),
            Command::FetchCourses(term) => {
                let params = Params::new().term(&term.sesi, &term.semester);
                let courses = self.client.fetch_as(Entity::Subjek, &params).await;
                Loaded::Courses(term, courses)
            }
            Command::FetchSections { course_code, term } => {
                let params = Params::new()
                    .with("kod_subjek", &course_code)
                    .term(&term.sesi, &term.semester);
                let (sections, assignments) = futures::join!(
                    self.client.fetch(Entity::SubjekSeksyen, &params),
                    self.client.request(Entity::SubjekPensyarah, &params),
                );
                Loaded::Sections {
                    sections: sections.map(|records| sections_for_course(&records, &course_code)),
                    assignments: assignments.into_result(),
                    course_code,
                    term,
                }
            }
            Command::BuildRoster(term) => {
                let roster = LecturerAggregator::new(&self.client, &self.roster_config)
                    .build(&term.sesi, &term.semester)
                    .await;
                Loaded::Roster(term, roster)
            }
            Command::FetchStudents {
                term,
                limit,
                offset,
            } => {
                let result = match self.require_session_id() {
                    Ok(session_id) => {
                        let params = Params::new()
                            .with("session_id", session_id)
                            .term(&term.sesi, &term.semester)
                            .with("limit", limit)
                            .with("offset", offset);
                        self.client.fetch_as(Entity::Pelajar, &params).await
                    }
                    Err(e) => Err(e),
                };
                Loaded::Students {
                    term,
                    offset,
                    result,
                }
            }
            Command::FetchSectionStudents {
                course_code,
                section,
                term,
            } => {
                let result = match self.require_session_id() {
                    Ok(session_id) => {
                        let params = Params::new()
                            .with("session_id", session_id)
                            .term(&term.sesi, &term.semester)
                            .with("kod_subjek", &course_code)
                            .with("seksyen", &section);
                        self.client.fetch_as(Entity::SubjekPelajar, &params).await
                    }
                    Err(e) => Err(e),
                };
                Loaded::SectionStudents {
                    course_code,
                    section,
                    term,
                    result,
                }
            }
            Command::FetchRegistrations => {
                let params = Params::new()
                    .with("no_matrik", &self.session.login_name)
                    .with("session_id", &self.session.session_id);
                Loaded::Registrations(self.client.fetch_as(Entity::PelajarSubjek, &params).await)
            }
            Command::FetchClasses(term) => {
                let params = Params::new().term(&term.sesi, &term.semester);
                let classes = self
                    .client
                    .request(Entity::SubjekPensyarah, &params)
                    .await
                    .into_result()
                    .map(|records| classes_for_lecturer(records, &self.session.login_name));
                Loaded::Classes(classes)
            }
            Command::FetchAnalytics(term) => {
                let params = Params::new().term(&term.sesi, &term.semester);
                let (students, courses) = futures::join!(
                    self.client.fetch(Entity::Pelajar, &params),
                    self.client.fetch(Entity::Subjek, &params),
                );
                let students = students.map(|r| r.len());
                let courses = courses.map(|r| r.len());
                info!(
                    term = %term,
                    students = ?students.as_ref().ok(),
                    courses = ?courses.as_ref().ok(),
                    "Analytics refreshed"
                );
                Loaded::Analytics { students, courses }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::dashboard::View;

    fn dashboard(session_id: &str, role: &str) -> Dashboard {
        let client = ApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:9/ttms/ws.cgi".to_string(),
            ..Default::default()
        })
        .unwrap();
        let session = Session {
            login_name: "A20EC0001".to_string(),
            session_id: session_id.to_string(),
            full_name: None,
            description: Some(role.to_string()),
        };
        Dashboard::new(
            client,
            session,
            Term::new("2025/2026", "1"),
            &PaginationConfig::default(),
            RosterConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_students_without_session_id() {
        let mut dashboard = dashboard("", "Pentadbir");
        let state = dashboard.dispatch(Event::Navigate(View::Students)).await;
        assert!(state.reauth_required);
        assert!(state.students.is_empty());
    }

    #[test]
    fn test_home_view_follows_role() {
        assert_eq!(dashboard("x", "Pensyarah").state().view, View::MyClasses);
        assert_eq!(dashboard("x", "Pelajar").state().view, View::MyCourses);
    }
}
