//! adk-utils: command-line helpers for ADK agents on Google Cloud
//!
//! Wraps the Discovery Engine (Gemini Enterprise) and Vertex AI Agent Engine
//! REST APIs: paginated listings, create/update/delete of agents,
//! authorizations and deployments, and following long running operations.

pub mod commands;
pub mod config;
pub mod error;
pub mod gcp;
pub mod operation;
pub mod output;
pub mod pagination;
pub mod source;

pub use error::{Error, Result};

/// Version injected at compile time via ADK_UTILS_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("ADK_UTILS_VERSION") {
    Some(v) => v,
    None => "dev",
};
