//! Pure list helpers behind the course, section and lecturer views.

use crate::models::{field_text, Course, Section};
use crate::roster::{AssignmentSchema, RosterEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Label for a section nobody is assigned to.
pub const UNASSIGNED: &str = "Unassigned";

/// A section with the lecturers assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRow {
    #[serde(flatten)]
    pub section: Section,
    pub lecturers: String,
}

/// Courses whose code or name contains `term`, case-insensitively.
pub fn filter_courses<'a>(courses: &'a [Course], term: &str) -> Vec<&'a Course> {
    courses.iter().filter(|c| c.matches(term)).collect()
}

/// Joins sections with the lecturer names of their assignments and sorts
/// them by section number. Non-numeric section numbers sort last.
pub fn merge_section_lecturers(
    sections: Vec<Section>,
    assignments: &[Value],
    schema: &AssignmentSchema,
) -> Vec<SectionRow> {
    let mut by_section: HashMap<String, Vec<String>> = HashMap::new();
    for record in assignments {
        let key = field_text(record, "seksyen").unwrap_or_else(|| "0".to_string());
        if let Some(name) = schema.lecturer_name(record) {
            let names = by_section.entry(key).or_default();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    let mut rows: Vec<SectionRow> = sections
        .into_iter()
        .map(|section| {
            let lecturers = by_section
                .get(section.section_number.trim())
                .map(|names| names.join(", "))
                .unwrap_or_else(|| UNASSIGNED.to_string());
            SectionRow { section, lecturers }
        })
        .collect();

    rows.sort_by(|a, b| compare_section_numbers(&a.section, &b.section));
    rows
}

fn compare_section_numbers(a: &Section, b: &Section) -> Ordering {
    match (a.numeric(), b.numeric()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Roster narrowing: name search plus exact course and department filters.
/// Blank fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LecturerFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub department: String,
}

impl LecturerFilter {
    pub fn matches(&self, entry: &RosterEntry) -> bool {
        let search = self.search.trim().to_lowercase();
        let course = self.course.trim();
        let department = self.department.trim();

        (search.is_empty() || entry.name.to_lowercase().contains(&search))
            && (course.is_empty() || entry.courses.contains(course))
            && (department.is_empty() || entry.department == department)
    }
}

/// Term-wide assignment rows belonging to the lecturer logged in as
/// `login_name` (matched against staff number fields).
pub fn classes_for_lecturer(records: Vec<Value>, login_name: &str) -> Vec<Value> {
    records
        .into_iter()
        .filter(|r| {
            ["no_pekerja", "id_staf"]
                .iter()
                .any(|f| field_text(r, f).as_deref() == Some(login_name))
        })
        .collect()
}

/// Placeholder for schedule details the assignment rows do not carry.
pub const TO_BE_ANNOUNCED: &str = "TBA";

/// One line of a lecturer's teaching schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// `<course code>-<section>`
    pub id: String,
    pub kod_subjek: String,
    pub nama_subjek: String,
    pub seksyen: String,
    pub hari: String,
    pub masa_mula: String,
    pub masa_tamat: String,
    pub bilik: String,
    pub bil_pelajar: u64,
}

/// Projects the lecturer's assignment rows into schedule entries.
pub fn schedule_from_classes(classes: &[Value]) -> Vec<ScheduleEntry> {
    classes
        .iter()
        .map(|record| {
            let text = |field: &str| field_text(record, field).unwrap_or_default();
            let or_tba =
                |field: &str| field_text(record, field).unwrap_or_else(|| TO_BE_ANNOUNCED.to_string());
            let kod_subjek = text("kod_subjek");
            let seksyen = text("seksyen");
            ScheduleEntry {
                id: format!("{}-{}", kod_subjek, seksyen),
                nama_subjek: field_text(record, "nama_subjek").unwrap_or_else(|| "N/A".to_string()),
                hari: or_tba("hari"),
                masa_mula: or_tba("masa_mula"),
                masa_tamat: or_tba("masa_tamat"),
                bilik: or_tba("bilik"),
                bil_pelajar: field_text(record, "bil_pelajar")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0),
                kod_subjek,
                seksyen,
            }
        })
        .collect()
}
