//! GCP API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - bearer tokens from `ADK_UTILS_ACCESS_TOKEN` or Application Default Credentials
//! - [`endpoint`] - base URLs for Discovery Engine and Vertex AI
//! - [`params`] - typed query parameters
//! - [`http`] - HTTP utilities for REST API calls
//! - [`client`] - authenticated request client bound to one endpoint
//!
//! # Example
//!
//! ```ignore
//! use adk_utils::gcp::{auth::Credentials, client::RequestClient, endpoint::Endpoint};
//!
//! async fn example() -> adk_utils::Result<()> {
//!     let creds = Credentials::from_environment().await?;
//!     let client = RequestClient::new(Endpoint::ai_platform("my-project", "us-central1"), creds, "my-project")?;
//!     let engines = client.get("reasoningEngines", None).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod http;
pub mod params;
