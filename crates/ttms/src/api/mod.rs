//! Client for the timetable web service.
//!
//! The service is a single CGI endpoint; the `entity` query parameter picks
//! the dataset and the remaining parameters narrow it.

mod client;
mod shape;

pub use client::{ApiClient, Records};
pub use shape::{classify_body, extract_records, looks_like_error_page};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Datasets served by the upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    /// Academic sessions and semesters
    SesiSemester,
    /// Courses offered in a term
    Subjek,
    /// Sections of a course
    SubjekSeksyen,
    /// Lecturer assignments for a course (or a whole term)
    SubjekPensyarah,
    /// Student directory, paginated, requires `session_id`
    Pelajar,
    /// Courses a student is registered for
    PelajarSubjek,
    /// Students registered in a section, requires `session_id`
    SubjekPelajar,
}

impl Entity {
    /// Value sent as the `entity` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::SesiSemester => "sesisemester",
            Entity::Subjek => "subjek",
            Entity::SubjekSeksyen => "subjek_seksyen",
            Entity::SubjekPensyarah => "subjek_pensyarah",
            Entity::Pelajar => "pelajar",
            Entity::PelajarSubjek => "pelajar_subjek",
            Entity::SubjekPelajar => "subjek_pelajar",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered query parameters. Empty values are dropped when the request URL
/// is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key=value`.
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds `sesi` and `semester`.
    pub fn term(self, sesi: &str, semester: &str) -> Self {
        self.with("sesi", sesi).with("semester", semester)
    }

    /// Pairs whose value is not blank, in insertion order.
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
