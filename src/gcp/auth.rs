//! GCP Authentication
//!
//! Bearer tokens come from `ADK_UTILS_ACCESS_TOKEN` when set, otherwise from
//! Application Default Credentials (service account key, metadata server or
//! `gcloud auth application-default login`).

use crate::error::{Error, Result};
use gcp_auth::TokenProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Environment variable holding a pre-minted access token
pub const ACCESS_TOKEN_ENV: &str = "ADK_UTILS_ACCESS_TOKEN";

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Conservative TTL, ADC tokens usually live an hour
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
enum TokenSource {
    Adc(Arc<dyn TokenProvider>),
    Static(String),
}

/// Credentials holder. Tokens are cached in memory only, for the lifetime
/// of the process.
#[derive(Clone)]
pub struct Credentials {
    source: TokenSource,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl Credentials {
    /// Resolve credentials from the environment: an explicit token wins over ADC
    pub async fn from_environment() -> Result<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                Ok(Self::from_token(token.trim()))
            }
            _ => Self::application_default().await,
        }
    }

    /// Application Default Credentials
    pub async fn application_default() -> Result<Self> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            Error::Auth(format!(
                "{}. Run 'gcloud auth application-default login' or set {}",
                e, ACCESS_TOKEN_ENV
            ))
        })?;

        Ok(Self {
            source: TokenSource::Adc(provider),
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// A fixed bearer token, never refreshed
    pub fn from_token(token: &str) -> Self {
        Self {
            source: TokenSource::Static(token.to_string()),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String> {
        let provider = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Adc(provider) => provider,
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = provider.token(DEFAULT_SCOPES).await?;
        let token_str = token.as_str().to_string();
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        Ok(token_str)
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    match project.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }

    if project.ends_with('-') {
        return false;
    }

    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Read the default project from the environment or gcloud configuration
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    let config_dir = get_gcloud_config_dir()?;
    read_gcloud_project(&config_dir)
}

/// Look up `key` in `[section]` of the legacy `properties` file, then of the
/// active named configuration.
pub fn read_gcloud_property(config_dir: &std::path::Path, section: &str, key: &str) -> Option<String> {
    gcloud_property_values(config_dir, section, key).into_iter().next()
}

/// First well-formed `core/project`; a malformed value falls through to the
/// next configuration source
pub fn read_gcloud_project(config_dir: &std::path::Path) -> Option<String> {
    gcloud_property_values(config_dir, "core", "project")
        .into_iter()
        .find(|project| {
            let valid = validate_project_id(project);
            if !valid {
                tracing::warn!("Ignoring invalid project ID format in gcloud configuration");
            }
            valid
        })
}

/// Values of `key` in every configuration source, legacy file first
fn gcloud_property_values(config_dir: &std::path::Path, section: &str, key: &str) -> Vec<String> {
    let mut values = Vec::new();

    if let Ok(content) = std::fs::read_to_string(config_dir.join("properties")) {
        values.extend(find_ini_value(&content, section, key));
    }

    let Ok(active_config) = std::fs::read_to_string(config_dir.join("active_config")) else {
        return values;
    };
    let config_name = active_config.trim();

    // Reject anything that could escape the configurations directory
    if !config_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Invalid characters in active_config name");
        return values;
    }

    let config_path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));
    if let Ok(content) = std::fs::read_to_string(config_path) {
        values.extend(find_ini_value(&content, section, key));
    }
    values
}

fn find_ini_value(content: &str, section: &str, key: &str) -> Option<String> {
    let header = format!("[{}]", section);
    let mut in_section = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                let value = v.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}
