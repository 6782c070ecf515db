//! Response body classification.
//!
//! A response is one of: a JSON array, a JSON object nesting the array, an
//! empty body, or the service's HTML/prose documentation page. The last one
//! is what the service returns when it rejects the `session_id`.

use super::Entity;
use crate::error::TtmsError;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

static MARKUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<(?:!doctype|html|head|body|\?xml)").unwrap());
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

/// Turns a successful (2xx) response body into records.
///
/// - blank body: no records
/// - JSON: the record array, see [`extract_records`]
/// - markup or a known error-page prefix: [`TtmsError::AuthRequired`]
/// - anything else: [`TtmsError::Malformed`]
pub fn classify_body(
    entity: Entity,
    body: &str,
    error_page_markers: &[String],
) -> Result<Vec<Value>, TtmsError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if looks_like_error_page(trimmed, error_page_markers) {
        let detail = page_title(trimmed).unwrap_or_else(|| preview(trimmed));
        return Err(TtmsError::AuthRequired {
            message: format!(
                "{} returned its documentation page ({}); log in again to refresh the session id",
                entity, detail
            ),
        });
    }

    let value: Value = serde_json::from_str(trimmed).map_err(|e| TtmsError::Malformed {
        entity: entity.to_string(),
        message: format!("{} (body starts with {:?})", e, preview(trimmed)),
    })?;

    extract_records(entity.as_str(), value).ok_or_else(|| TtmsError::UnexpectedShape {
        entity: entity.to_string(),
    })
}

/// Finds the record array in a parsed response.
///
/// Tried in order: the value itself, the member named after the entity, the
/// member named `data`. The first that is an array wins.
pub fn extract_records(entity: &str, value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => [entity, "data"]
            .into_iter()
            .find(|key| map.get(*key).is_some_and(Value::is_array))
            .and_then(|key| map.remove(key))
            .and_then(|nested| match nested {
                Value::Array(items) => Some(items),
                _ => None,
            }),
        _ => None,
    }
}

/// True if `body` is markup or starts with one of the known error-page
/// prefixes.
pub fn looks_like_error_page(body: &str, error_page_markers: &[String]) -> bool {
    let body = body.trim_start();
    MARKUP_REGEX.is_match(body)
        || error_page_markers
            .iter()
            .any(|marker| !marker.is_empty() && body.starts_with(marker.as_str()))
}

fn page_title(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn preview(body: &str) -> String {
    body.chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn markers() -> Vec<String> {
        vec!["The most simple".to_string()]
    }

    #[test]
    fn test_bare_array() {
        let records = classify_body(Entity::Subjek, "[1,2,3]", &markers()).unwrap();
        assert_eq!(records, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_blank_body_is_empty() {
        assert!(classify_body(Entity::Subjek, "", &markers()).unwrap().is_empty());
        assert!(classify_body(Entity::Subjek, "  \n", &markers()).unwrap().is_empty());
    }

    #[test]
    fn test_html_page_needs_reauth() {
        let body = "<html><head><title>TTMS Web Service</title></head><body>usage</body></html>";
        let err = classify_body(Entity::SubjekPelajar, body, &markers()).unwrap_err();
        assert!(err.needs_reauth());
        assert!(err.to_string().contains("TTMS Web Service"));
    }

    #[test]
    fn test_documentation_prose_needs_reauth() {
        let body = "The most simple way to call this service is ...";
        let err = classify_body(Entity::Pelajar, body, &markers()).unwrap_err();
        assert!(matches!(err, TtmsError::AuthRequired { .. }));
    }

    #[test]
    fn test_other_garbage_is_malformed() {
        let err = classify_body(Entity::Pelajar, "{not json", &markers()).unwrap_err();
        assert!(matches!(err, TtmsError::Malformed { .. }));
        assert!(err.is_soft());
    }

    #[test]
    fn test_nested_shapes_in_priority_order() {
        let by_entity = json!({"subjek_pelajar": [{"nama": "A"}], "data": [{"nama": "B"}]});
        assert_eq!(
            extract_records("subjek_pelajar", by_entity),
            Some(vec![json!({"nama": "A"})])
        );

        let by_data = json!({"subjek_pelajar": "none", "data": [{"nama": "B"}]});
        assert_eq!(
            extract_records("subjek_pelajar", by_data),
            Some(vec![json!({"nama": "B"})])
        );

        assert_eq!(extract_records("subjek", json!({"count": 3})), None);
        assert_eq!(extract_records("subjek", json!("text")), None);
    }

    #[test]
    fn test_object_without_array_is_unexpected_shape() {
        let err = classify_body(Entity::Subjek, r#"{"error": "none"}"#, &markers()).unwrap_err();
        assert!(matches!(err, TtmsError::UnexpectedShape { .. }));
    }
}
