//! HTTP server exposing the padel zones engine as JSON endpoints.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
