//! Command-line interface definition.

use crate::config::TtmsConfig;
use clap::{Parser, Subcommand};

/// Client and local dashboard service for the FC timetable web service
#[derive(Parser, Debug, Clone)]
#[command(name = "ttms")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "ttms.json", env = "TTMS_CONFIG")]
    pub config: String,

    /// Session storage database, overriding the configured path
    #[arg(long, env = "TTMS_STORAGE")]
    pub storage: Option<String>,

    /// Upstream web service URL, overriding the configured one
    #[arg(long, env = "TTMS_BASE_URL")]
    pub base_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Store a session issued by the login service
    Login {
        #[arg(long)]
        login_name: String,

        #[arg(long)]
        session_id: String,

        #[arg(long)]
        full_name: Option<String>,

        /// Role label as reported at login (e.g. Pelajar, Pensyarah)
        #[arg(long)]
        role: Option<String>,
    },

    /// Remove the stored session
    Logout,

    /// Show whether the stored session is still valid
    Status,

    /// List academic sessions and semesters
    Sessions,

    /// List courses of the configured term
    Courses {
        /// Case-insensitive filter over course code and name
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// List the sections of a course with their lecturers
    Sections {
        /// Course code, e.g. SCSJ1013
        code: String,
    },

    /// Build the lecturer roster for the configured term
    Lecturers {
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,
    },

    /// List one page of the student directory
    Students {
        #[arg(long)]
        limit: Option<u32>,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Serve the dashboards over HTTP
    Serve {
        /// Port, overriding the configured one
        #[arg(short, long)]
        port: Option<u16>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Writes command-line overrides into `config`.
    pub fn apply_overrides(&self, config: &mut TtmsConfig) {
        if let Some(storage) = &self.storage {
            config.session.storage_path = storage.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
        if let Commands::Serve { port: Some(port) } = self.command {
            config.server.port = port;
        }
    }
}
