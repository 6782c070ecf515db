//! Configuration for the timetable client, roster builder and local server
use crate::error::TtmsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TtmsConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub roster: RosterConfig,
    pub pagination: PaginationConfig,
    pub term: TermConfig,
    pub server: ServerConfig,
}

/// Upstream web service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    /// Leading prose of the service's documentation page, which it serves in
    /// place of data when the `session_id` is rejected
    pub error_page_markers: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://web.fc.utm.my/ttms/web_man_webservice_json.cgi".to_string(),
            user_agent: concat!("ttms/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_secs: 10,
            timeout_secs: 30,
            error_page_markers: vec!["The most simple".to_string()],
        }
    }
}

/// Local session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sliding expiry window
    pub ttl_secs: i64,
    pub storage_path: String,
    /// Page the dashboard is served from; login discovery climbs from here
    pub site_url: String,
    pub login_page: String,
    pub session_key: String,
    pub timestamp_key: String,
}

impl SessionConfig {
    /// Path of [`Self::site_url`]; `/` if it does not parse.
    pub fn site_path(&self) -> String {
        url::Url::parse(&self.site_url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 2 * 60 * 60,
            storage_path: "ttms.db".to_string(),
            site_url: "http://127.0.0.1:8080/dashboard/index.html".to_string(),
            login_page: "Login.html".to_string(),
            session_key: "TTMSFC_userSession".to_string(),
            timestamp_key: "TTMSFC_loginTimestamp".to_string(),
        }
    }
}

/// Lecturer roster aggregation settings.
///
/// The field lists are tried in order; upstream entities disagree on naming
/// so these stay data rather than code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub throttle_ms: u64,
    pub name_fields: Vec<String>,
    pub staff_id_fields: Vec<String>,
    pub department_fields: Vec<String>,
    pub placeholders: Vec<String>,
    /// Course code prefix -> department, used when a record reports none
    pub department_prefixes: BTreeMap<String, String>,
    pub default_department: String,
}

impl Default for RosterConfig {
    fn default() -> Self {
        let strings = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let department_prefixes = [
            ("SCSJ", "JABATAN SAINS KOMPUTER"),
            ("SCSI", "JABATAN SISTEM MAKLUMAT"),
            ("SCSR", "JABATAN RANGKAIAN KOMPUTER"),
            ("SCSK", "JABATAN KEJURUTERAAN PERISIAN"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            throttle_ms: 30,
            name_fields: strings(&["nama", "name", "nama_pensyarah", "pensyarah"]),
            staff_id_fields: strings(&["no_pekerja", "id_staf", "staff_id", "no_kakitangan"]),
            department_fields: strings(&["jabatan", "department"]),
            placeholders: strings(&["-", "TBA"]),
            department_prefixes,
            default_department: "FAKULTI SAINS KOMPUTER".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { default_limit: 50 }
    }
}

/// Academic session and semester used until the user picks another
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TermConfig {
    pub sesi: String,
    pub semester: String,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            sesi: "2025/2026".to_string(),
            semester: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl TtmsConfig {
    /// Loads configuration from a JSON file.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: &Path) -> Result<Self, TtmsError> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: TtmsConfig =
            serde_json::from_str(&content).map_err(|e| TtmsError::Config {
                message: format!("{}: {}", path.display(), e),
            })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Rejects settings the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<(), TtmsError> {
        url::Url::parse(&self.api.base_url)?;
        url::Url::parse(&self.session.site_url)?;

        if self.session.ttl_secs <= 0 {
            return Err(TtmsError::Config {
                message: "session.ttl_secs must be positive".to_string(),
            });
        }
        if self.pagination.default_limit == 0 {
            return Err(TtmsError::Config {
                message: "pagination.default_limit must be at least 1".to_string(),
            });
        }
        if self.roster.name_fields.is_empty() {
            return Err(TtmsError::Config {
                message: "roster.name_fields must name at least one field".to_string(),
            });
        }
        Ok(())
    }
}
