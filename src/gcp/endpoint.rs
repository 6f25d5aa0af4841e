//! API endpoints
//!
//! Base URLs for the two API families this tool talks to. The host rule is
//! picked when the endpoint is built and never changes afterwards.

use std::fmt;

/// Location value that selects the non-prefixed discovery engine host
pub const GLOBAL_LOCATION: &str = "global";

const DISCOVERY_ENGINE_HOST: &str = "discoveryengine.googleapis.com";
const DISCOVERY_ENGINE_VERSION: &str = "v1alpha";
const AI_PLATFORM_HOST: &str = "aiplatform.googleapis.com";
const AI_PLATFORM_VERSION: &str = "v1beta1";
const RESOURCE_MANAGER_URL: &str = "https://cloudresourcemanager.googleapis.com/v1/";

/// How the hostname relates to the location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRule {
    /// `global` uses the bare host, every other location is prefixed `{location}-`
    GlobalOrRegional,
    /// Fixed host; the location only appears in the path
    FixedHost,
}

/// An immutable API base URL. Always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Endpoint {
    /// Build a `projects/{project}/locations/{location}/` base URL.
    ///
    /// The location is interpolated verbatim; the server decides whether it
    /// is legal.
    pub fn build(
        rule: HostRule,
        host: &str,
        version: &str,
        project_id: &str,
        location: &str,
    ) -> Self {
        let host = match rule {
            HostRule::GlobalOrRegional if location != GLOBAL_LOCATION => {
                format!("{}-{}", location, host)
            }
            _ => host.to_string(),
        };

        Self {
            base_url: format!(
                "https://{}/{}/projects/{}/locations/{}/",
                host, version, project_id, location
            ),
        }
    }

    /// Discovery Engine (Gemini Enterprise apps, agents, authorizations)
    pub fn discovery_engine(project_id: &str, location: &str) -> Self {
        Self::build(
            HostRule::GlobalOrRegional,
            DISCOVERY_ENGINE_HOST,
            DISCOVERY_ENGINE_VERSION,
            project_id,
            location,
        )
    }

    /// Vertex AI platform (reasoning engines and their operations)
    pub fn ai_platform(project_id: &str, location: &str) -> Self {
        Self::build(
            HostRule::FixedHost,
            AI_PLATFORM_HOST,
            AI_PLATFORM_VERSION,
            project_id,
            location,
        )
    }

    /// Cloud Resource Manager, used to resolve project numbers
    pub fn resource_manager() -> Self {
        Self::from_base_url(RESOURCE_MANAGER_URL)
    }

    /// Wrap an explicit base URL (API emulators, tests)
    pub fn from_base_url(base_url: &str) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a relative path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_engine_global_has_no_prefix() {
        let endpoint = Endpoint::discovery_engine("p", "global");
        assert_eq!(
            endpoint.base_url(),
            "https://discoveryengine.googleapis.com/v1alpha/projects/p/locations/global/"
        );
    }

    #[test]
    fn test_discovery_engine_regional_prefix() {
        let endpoint = Endpoint::discovery_engine("p", "us");
        assert_eq!(
            endpoint.base_url(),
            "https://us-discoveryengine.googleapis.com/v1alpha/projects/p/locations/us/"
        );
    }

    #[test]
    fn test_ai_platform_host_is_fixed() {
        let endpoint = Endpoint::ai_platform("p", "us");
        assert_eq!(
            endpoint.base_url(),
            "https://aiplatform.googleapis.com/v1beta1/projects/p/locations/us/"
        );
    }

    #[test]
    fn test_url_joins_relative_path() {
        let endpoint = Endpoint::from_base_url("http://127.0.0.1:8080/api");
        assert_eq!(endpoint.url("authorizations"), "http://127.0.0.1:8080/api/authorizations");
        assert_eq!(endpoint.url("/operations"), "http://127.0.0.1:8080/api/operations");
    }
}
