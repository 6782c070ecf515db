//! Lecturer roster aggregation.
//!
//! The service only answers "who teaches course X", so the directory is
//! built by asking once per course and merging the answers by display name.
//! Two different lecturers with the same display name end up as one entry;
//! the service offers no better key.

use crate::api::{ApiClient, Entity, Params};
use crate::config::RosterConfig;
use crate::error::TtmsError;
use crate::models::field_text;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Staff id used until a record reports a real one.
pub const UNKNOWN_STAFF_ID: &str = "unknown";

/// Ordered list of field names for one logical value. The first field
/// holding non-blank text wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLookup {
    fields: Vec<String>,
}

impl FieldLookup {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn first(&self, record: &Value) -> Option<String> {
        self.fields.iter().find_map(|f| field_text(record, f))
    }
}

/// How lecturer assignment records are read.
#[derive(Debug, Clone)]
pub struct AssignmentSchema {
    pub name: FieldLookup,
    pub staff_id: FieldLookup,
    pub department: FieldLookup,
    placeholders: HashSet<String>,
}

impl AssignmentSchema {
    pub fn from_config(config: &RosterConfig) -> Self {
        Self {
            name: FieldLookup::new(config.name_fields.iter().cloned()),
            staff_id: FieldLookup::new(config.staff_id_fields.iter().cloned()),
            department: FieldLookup::new(config.department_fields.iter().cloned()),
            placeholders: config.placeholders.iter().cloned().collect(),
        }
    }

    fn real(&self, value: Option<String>) -> Option<String> {
        value.filter(|v| !self.placeholders.contains(v))
    }

    /// Display name of the lecturer in `record`, unless missing or a
    /// placeholder.
    pub fn lecturer_name(&self, record: &Value) -> Option<String> {
        self.real(self.name.first(record))
    }

    pub fn staff_id(&self, record: &Value) -> Option<String> {
        self.real(self.staff_id.first(record))
    }

    pub fn department(&self, record: &Value) -> Option<String> {
        self.real(self.department.first(record))
    }
}

/// One lecturer in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub staff_id: String,
    pub courses: BTreeSet<String>,
    pub department: String,
    /// False while `department` is only inferred from a course code
    #[serde(default)]
    pub department_reported: bool,
}

impl RosterEntry {
    /// Course codes joined for display.
    pub fn subjects(&self) -> String {
        self.courses
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_staff_id(&self) -> bool {
        self.staff_id != UNKNOWN_STAFF_ID
    }
}

/// Accumulates assignment records into roster entries.
#[derive(Debug, Clone)]
pub struct RosterBuilder {
    schema: AssignmentSchema,
    department_prefixes: BTreeMap<String, String>,
    default_department: String,
    entries: HashMap<String, RosterEntry>,
}

impl RosterBuilder {
    pub fn new(config: &RosterConfig) -> Self {
        Self {
            schema: AssignmentSchema::from_config(config),
            department_prefixes: config.department_prefixes.clone(),
            default_department: config.default_department.clone(),
            entries: HashMap::new(),
        }
    }

    /// Department implied by a course code prefix.
    pub fn infer_department(&self, course_code: &str) -> String {
        self.department_prefixes
            .iter()
            .filter(|(prefix, _)| course_code.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, department)| department.clone())
            .unwrap_or_else(|| self.default_department.clone())
    }

    /// Merges one assignment record for `course_code`.
    ///
    /// Returns false when the record names no lecturer.
    pub fn add_assignment(&mut self, course_code: &str, record: &Value) -> bool {
        let Some(name) = self.schema.lecturer_name(record) else {
            return false;
        };
        let staff_id = self.schema.staff_id(record);
        let reported_department = self.schema.department(record);
        let inferred_department = self.infer_department(course_code);

        let entry = self
            .entries
            .entry(name.clone())
            .or_insert_with(|| RosterEntry {
                name,
                staff_id: UNKNOWN_STAFF_ID.to_string(),
                courses: BTreeSet::new(),
                department: inferred_department,
                department_reported: false,
            });

        entry.courses.insert(course_code.to_string());

        // First real value wins for each field.
        if !entry.has_staff_id() {
            if let Some(id) = staff_id {
                entry.staff_id = id;
            }
        }
        if !entry.department_reported {
            if let Some(department) = reported_department {
                entry.department = department;
                entry.department_reported = true;
            }
        }
        true
    }

    /// Merges every record of one course's assignment response and returns
    /// how many named a lecturer.
    pub fn add_course(&mut self, course_code: &str, records: &[Value]) -> usize {
        records
            .iter()
            .filter(|record| self.add_assignment(course_code, record))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by display name.
    pub fn finish(self) -> Vec<RosterEntry> {
        let mut entries: Vec<RosterEntry> = self.entries.into_values().collect();
        entries.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        entries
    }
}

/// Result of one aggregation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub entries: Vec<RosterEntry>,
    /// Courses whose assignment request succeeded
    pub processed: usize,
    /// Courses whose assignment request failed and were skipped
    pub failed: usize,
    pub total: usize,
}

/// Builds the roster for a term by querying each course in turn.
pub struct LecturerAggregator<'a> {
    client: &'a ApiClient,
    config: &'a RosterConfig,
}

impl<'a> LecturerAggregator<'a> {
    pub fn new(client: &'a ApiClient, config: &'a RosterConfig) -> Self {
        Self { client, config }
    }

    /// Builds the roster for `sesi`/`semester`.
    ///
    /// Requests are sequential with `throttle_ms` between them. A failing
    /// course is logged and skipped; only a failure to list the courses
    /// fails the run.
    pub async fn build(&self, sesi: &str, semester: &str) -> Result<Roster, TtmsError> {
        let start = Instant::now();
        let courses = self
            .client
            .fetch(Entity::Subjek, &Params::new().term(sesi, semester))
            .await?;
        let codes = unique_course_codes(&courses);

        info!(sesi, semester, courses = codes.len(), "Building lecturer roster");

        let mut builder = RosterBuilder::new(self.config);
        let mut roster = Roster {
            total: codes.len(),
            ..Default::default()
        };
        let throttle = Duration::from_millis(self.config.throttle_ms);

        for (i, code) in codes.iter().enumerate() {
            if i > 0 && !throttle.is_zero() {
                tokio::time::sleep(throttle).await;
            }

            let params = Params::new()
                .with("kod_subjek", code)
                .term(sesi, semester);
            match self.client.fetch(Entity::SubjekPensyarah, &params).await {
                Ok(records) => {
                    let named = builder.add_course(code, &records);
                    debug!(course = %code, records = records.len(), named, "Merged assignments");
                    roster.processed += 1;
                }
                Err(e) => {
                    warn!(course = %code, error = %e, "Skipping course");
                    roster.failed += 1;
                }
            }
        }

        roster.entries = builder.finish();
        info!(
            lecturers = roster.entries.len(),
            processed = roster.processed,
            total = roster.total,
            duration_ms = start.elapsed().as_millis() as u64,
            "Lecturer roster built"
        );
        Ok(roster)
    }
}

/// Course codes in listing order, without duplicates or blanks.
fn unique_course_codes(courses: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    courses
        .iter()
        .filter_map(|c| field_text(c, "kod_subjek"))
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> RosterBuilder {
        RosterBuilder::new(&RosterConfig::default())
    }

    #[test]
    fn test_same_name_merges_courses() {
        let mut b = builder();
        b.add_course("C1", &[json!({"nama": "A", "kod": "C1"})]);
        b.add_course("C2", &[json!({"nama": "A", "kod": "C2"})]);

        let roster = b.finish();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].name, "A");
        assert_eq!(
            roster[0].courses,
            BTreeSet::from(["C1".to_string(), "C2".to_string()])
        );
        assert_eq!(roster[0].subjects(), "C1, C2");
    }

    #[test]
    fn test_placeholder_names_are_skipped() {
        let mut b = builder();
        let named = b.add_course(
            "C1",
            &[
                json!({"nama": "-"}),
                json!({"nama": "TBA"}),
                json!({"nama": "  "}),
                json!({"jabatan": "X"}),
            ],
        );
        assert_eq!(named, 0);
        assert!(b.is_empty());
    }

    #[test]
    fn test_name_field_priority() {
        let mut b = builder();
        b.add_assignment("C1", &json!({"nama_pensyarah": "Dr. Lee", "pensyarah": "Lee"}));
        b.add_assignment("C1", &json!({"name": "", "pensyarah": "Dr. Wong"}));
        let names: Vec<_> = b.finish().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Dr. Lee", "Dr. Wong"]);
    }

    #[test]
    fn test_first_real_staff_id_wins() {
        let mut b = builder();
        b.add_assignment("C1", &json!({"nama": "A"}));
        b.add_assignment("C2", &json!({"nama": "A", "id_staf": "S100"}));
        b.add_assignment("C3", &json!({"nama": "A", "no_pekerja": "S200"}));

        let roster = b.finish();
        assert_eq!(roster[0].staff_id, "S100");
    }

    #[test]
    fn test_reported_department_backfills_inferred() {
        let mut b = builder();
        b.add_assignment("SCSJ1013", &json!({"nama": "A"}));
        {
            let roster = b.clone().finish();
            assert_eq!(roster[0].department, "JABATAN SAINS KOMPUTER");
            assert!(!roster[0].department_reported);
        }
        b.add_assignment("SCSI1113", &json!({"nama": "A", "jabatan": "JABATAN X"}));
        b.add_assignment("SCSR2043", &json!({"nama": "A", "department": "JABATAN Y"}));

        let roster = b.finish();
        assert_eq!(roster[0].department, "JABATAN X");
        assert!(roster[0].department_reported);
    }

    #[test]
    fn test_unknown_prefix_uses_default_department() {
        let b = builder();
        assert_eq!(b.infer_department("MATH1001"), "FAKULTI SAINS KOMPUTER");
        assert_eq!(b.infer_department("SCSK3103"), "JABATAN KEJURUTERAAN PERISIAN");
    }

    #[test]
    fn test_sorted_by_name() {
        let mut b = builder();
        for name in ["zaki", "Ahmad", "Siti", "ali"] {
            b.add_assignment("C1", &json!({ "nama": name }));
        }
        let names: Vec<_> = b.finish().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Ahmad", "ali", "Siti", "zaki"]);
    }

    #[test]
    fn test_unique_course_codes() {
        let courses = vec![
            json!({"kod_subjek": "C2"}),
            json!({"kod_subjek": "C1"}),
            json!({"kod_subjek": "C2"}),
            json!({"nama_subjek": "no code"}),
        ];
        assert_eq!(unique_course_codes(&courses), vec!["C2", "C1"]);
    }
}
