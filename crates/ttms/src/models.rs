//! Records returned by the timetable web service.
//!
//! Field names follow the upstream schema. Numeric fields arrive as either
//! JSON numbers or strings depending on the entity, so they are decoded
//! leniently. Fields this crate does not interpret are kept in `extra`.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One academic session/semester pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSemester {
    #[serde(deserialize_with = "string_or_number")]
    pub sesi: String,
    #[serde(deserialize_with = "string_or_number")]
    pub semester: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A course offered in a term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "kod_subjek", deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(rename = "nama_subjek", default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(rename = "bil_seksyen", default, deserialize_with = "lenient_count")]
    pub section_count: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Course {
    /// Case-insensitive substring match over code and name.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.code.to_lowercase().contains(&term)
            || self.name.to_lowercase().contains(&term)
    }
}

/// A section of a course; scheduling fields are passed through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "seksyen", deserialize_with = "string_or_number")]
    pub section_number: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    /// Section number as an integer, if it is one.
    pub fn numeric(&self) -> Option<i64> {
        self.section_number.trim().parse().ok()
    }
}

/// A course a student is registered for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "kod_subjek", deserialize_with = "string_or_number")]
    pub course_code: String,
    #[serde(rename = "nama_subjek", default, deserialize_with = "string_or_number")]
    pub course_name: String,
    #[serde(rename = "seksyen", default, deserialize_with = "string_or_number")]
    pub section_number: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A student record; the upstream schema varies so only the matric number
/// and name are interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(default, deserialize_with = "string_or_number")]
    pub no_matrik: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub nama: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Renders a scalar JSON value as text: strings as-is, numbers and bools
/// via their display form, anything else as `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads `field` of a record as trimmed, non-empty text.
pub fn field_text(record: &Value, field: &str) -> Option<String> {
    record
        .get(field)
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Finds the sections of `code` in a `subjek_seksyen` response.
///
/// Two shapes exist: course records nesting a `seksyen_list`, or a flat list
/// of section records each carrying `kod_subjek` and `seksyen`. The nested
/// shape is preferred when the course record has a non-empty list.
pub fn sections_for_course(records: &[Value], code: &str) -> Vec<Section> {
    let is_course = |r: &&Value| field_text(r, "kod_subjek").as_deref() == Some(code);

    let nested = records
        .iter()
        .filter(is_course)
        .find_map(|r| r.get("seksyen_list").and_then(Value::as_array))
        .filter(|list| !list.is_empty());

    let candidates: Vec<Value> = match nested {
        Some(list) => list.clone(),
        None => records
            .iter()
            .filter(is_course)
            .filter(|r| r.get("seksyen").is_some())
            .cloned()
            .collect(),
    };

    candidates
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(String::new()),
        other => scalar_text(&other)
            .ok_or_else(|| serde::de::Error::custom("expected a string or number")),
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value)
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0))
}
