//! Client, roster builder and local dashboard service for the FC timetable
//! web service (TTMS).
//!
//! The upstream service is a single CGI endpoint that answers JSON for a
//! handful of entities. This crate wraps it with a typed client
//! ([`api::ApiClient`]), a sliding-expiry local session
//! ([`session::SessionGuard`]), the lecturer roster aggregation
//! ([`roster::LecturerAggregator`]), limit/offset paging
//! ([`pagination::Paginator`]) and role dashboards served over HTTP.

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod pagination;
pub mod roster;
pub mod server;
pub mod session;

pub use error::TtmsError;
