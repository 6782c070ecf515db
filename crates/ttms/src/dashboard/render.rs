//! JSON rendering of dashboard state.

use super::catalog::schedule_from_classes;
use super::{DashboardState, View};
use serde_json::{json, Value};

/// Renders what the current view shows. Filters and pagination are applied;
/// other views' data is left out.
pub fn render(state: &DashboardState) -> Value {
    let body = match &state.view {
        View::Analytics => json!({ "analytics": state.analytics }),
        View::Sessions => json!({ "sessions": state.sessions }),
        View::Courses => json!({
            "filter": state.course_filter,
            "total": state.courses.len(),
            "courses": state.visible_courses(),
        }),
        View::Sections { course_code } => json!({
            "course_code": course_code,
            "sections": state.sections,
        }),
        View::Lecturers => {
            let lecturers: Vec<Value> = state
                .visible_lecturers()
                .into_iter()
                .map(|e| {
                    json!({
                        "name": e.name,
                        "staff_id": e.staff_id,
                        "subjects": e.subjects(),
                        "department": e.department,
                    })
                })
                .collect();
            json!({
                "filter": state.lecturer_filter,
                "total": state.roster.as_ref().map(|r| r.entries.len()),
                "lecturers": lecturers,
            })
        }
        View::Students => json!({
            "students": state.students,
            "limit": state.student_page.limit(),
            "offset": state.student_page.offset(),
            "has_next": state.student_page.has_next(),
            "has_prev": state.student_page.has_prev(),
        }),
        View::SectionStudents {
            course_code,
            section,
        } => json!({
            "course_code": course_code,
            "section": section,
            "students": state.section_students,
        }),
        View::MyCourses => json!({ "courses": state.registrations }),
        View::MyClasses => json!({
            "classes": state.classes,
            "schedule": schedule_from_classes(&state.classes),
        }),
    };

    json!({
        "view": state.view.name(),
        "role": state.role,
        "term": state.term,
        "notice": state.notice,
        "reauth_required": state.reauth_required,
        "data": body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterConfig;
    use crate::dashboard::Term;
    use crate::roster::AssignmentSchema;
    use crate::session::Role;

    #[test]
    fn test_render_students_page() {
        let mut state = DashboardState::new(
            Role::Admin,
            Term::new("2025/2026", "1"),
            20,
            AssignmentSchema::from_config(&RosterConfig::default()),
        );
        state.view = View::Students;
        state.student_page.record(20);

        let rendered = render(&state);
        assert_eq!(rendered["view"], "students");
        assert_eq!(rendered["role"], "admin");
        assert_eq!(rendered["data"]["has_next"], true);
        assert_eq!(rendered["data"]["has_prev"], false);
        assert_eq!(rendered["term"]["sesi"], "2025/2026");
    }
}
