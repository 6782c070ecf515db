//! Login page discovery.
//!
//! The dashboard may be deployed under any sub-path, so the login page is
//! found by climbing from the current path towards the root and probing
//! `<prefix>/Login.html` at each level with a HEAD request.

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Location used when no probe succeeds.
pub const FALLBACK_LOGIN_LOCATION: &str = "../Login.html";

/// Lists the login page candidates for `path`, nearest first.
///
/// The last segment of `path` (the current page) is dropped before the first
/// candidate is formed, and one more segment is dropped per step.
pub fn candidate_paths(path: &str, login_page: &str) -> Vec<String> {
    let mut parts: Vec<&str> = path.split('/').collect();
    parts.pop();

    let mut candidates = Vec::with_capacity(parts.len());
    while !parts.is_empty() {
        candidates.push(format!("{}/{}", parts.join("/"), login_page));
        parts.pop();
    }
    candidates
}

/// Finds the login page by probing candidates on the site origin.
#[derive(Debug, Clone)]
pub struct LoginLocator {
    client: Client,
    origin: Url,
    login_page: String,
}

impl LoginLocator {
    /// Creates a locator probing against the origin of `site_url`.
    pub fn new(site_url: &Url, login_page: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()?;

        let mut origin = site_url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Self {
            client,
            origin,
            login_page: login_page.to_string(),
        })
    }

    /// Returns the first candidate that answers a HEAD probe successfully,
    /// or [`FALLBACK_LOGIN_LOCATION`].
    ///
    /// Probe failures of any kind count as "not found".
    pub async fn discover(&self, current_path: &str) -> String {
        for candidate in candidate_paths(current_path, &self.login_page) {
            let url = match self.origin.join(&candidate) {
                Ok(url) => url,
                Err(e) => {
                    debug!(candidate = %candidate, error = %e, "Skipping unparseable login candidate");
                    continue;
                }
            };

            match self.client.head(url.clone()).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(location = %url, "Discovered login page");
                    return url.to_string();
                }
                Ok(response) => {
                    debug!(location = %url, status = %response.status(), "Login probe missed");
                }
                Err(e) => {
                    debug!(location = %url, error = %e, "Login probe failed");
                }
            }
        }

        info!("No login page found by probing, falling back to {FALLBACK_LOGIN_LOCATION}");
        FALLBACK_LOGIN_LOCATION.to_string()
    }
}
