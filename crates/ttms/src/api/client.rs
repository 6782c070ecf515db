//! HTTP client for the timetable web service.

use super::shape::classify_body;
use super::{Entity, Params};
use crate::config::ApiConfig;
use crate::error::TtmsError;
use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Records from a soft request, plus the re-authentication condition if the
/// service served its error page instead of data.
#[derive(Debug, Clone, Default)]
pub struct Records {
    pub items: Vec<Value>,
    pub auth_error: Option<TtmsError>,
}

impl Records {
    pub fn needs_reauth(&self) -> bool {
        self.auth_error.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The items, or the re-authentication error if one was seen.
    pub fn into_result(self) -> Result<Vec<Value>, TtmsError> {
        match self.auth_error {
            Some(e) => Err(e),
            None => Ok(self.items),
        }
    }
}

/// Client for the single upstream CGI endpoint.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    error_page_markers: Vec<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, TtmsError> {
        let base_url = Url::parse(&config.base_url)?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtmsError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            error_page_markers: config.error_page_markers.clone(),
        })
    }

    /// Builds the GET URL: base, then `entity`, then every non-empty
    /// parameter, percent-encoded.
    pub fn request_url(&self, entity: Entity, params: &Params) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("entity", entity.as_str());
            for (key, value) in params.non_empty() {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// Fetches `entity` and returns its records, or the classified failure.
    pub async fn fetch(&self, entity: Entity, params: &Params) -> Result<Vec<Value>, TtmsError> {
        let correlation_id = generate_correlation_id();
        let url = self.request_url(entity, params);
        let start = Instant::now();

        debug!(
            correlation_id = %correlation_id,
            entity = %entity,
            "Requesting {}",
            redact(&url)
        );

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TtmsError::HttpStatus {
                entity: entity.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let records = classify_body(entity, &body, &self.error_page_markers)?;

        info!(
            correlation_id = %correlation_id,
            entity = %entity,
            records = records.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetched records"
        );
        Ok(records)
    }

    /// Fetches `entity`, never failing.
    ///
    /// Transport errors, bad statuses, empty and malformed bodies all come
    /// back as no records with a warning logged. An error page comes back as
    /// no records with [`Records::auth_error`] set.
    pub async fn request(&self, entity: Entity, params: &Params) -> Records {
        match self.fetch(entity, params).await {
            Ok(items) => Records {
                items,
                auth_error: None,
            },
            Err(e) if e.needs_reauth() => {
                warn!(entity = %entity, error = %e, "Upstream rejected the session");
                Records {
                    items: Vec::new(),
                    auth_error: Some(e),
                }
            }
            Err(e) => {
                warn!(entity = %entity, error = %e, "Request failed, using empty result");
                Records::default()
            }
        }
    }

    /// Fetches `entity` and deserializes each record into `T`.
    ///
    /// Records that do not fit `T` are skipped.
    pub async fn fetch_as<T: DeserializeOwned>(
        &self,
        entity: Entity,
        params: &Params,
    ) -> Result<Vec<T>, TtmsError> {
        let records = self.fetch(entity, params).await?;
        Ok(decode_records(entity, records))
    }
}

/// Deserializes records into `T`, dropping those that do not fit.
pub(crate) fn decode_records<T: DeserializeOwned>(entity: Entity, records: Vec<Value>) -> Vec<T> {
    let total = records.len();
    let decoded: Vec<T> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(entity = %entity, error = %e, "Skipping record");
                None
            }
        })
        .collect();

    if decoded.len() < total {
        warn!(
            entity = %entity,
            skipped = total - decoded.len(),
            "Some records did not match the expected shape"
        );
    }
    decoded
}

/// Hides the `session_id` query value in logged URLs.
fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "session_id" {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

/// Generates a short correlation ID for request tracing.
fn generate_correlation_id() -> String {
    let random: u32 = rand::thread_rng().gen();
    format!("{:08x}", random)
}
