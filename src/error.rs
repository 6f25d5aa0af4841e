//! Error types
//!
//! Every fallible operation in the library returns [`Error`]. The binary
//! reports it once at the command boundary and maps it to an exit code.

use serde_json::Value;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the request layer and the commands built on it
#[derive(Debug, Error)]
pub enum Error {
    /// The API answered with a non-2xx status
    #[error("API request failed with status {status}")]
    Http { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connection reset...)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// No usable credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A 2xx body that is not the JSON we expected
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Bad local input: missing file, malformed URL, missing project...
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Terminal interaction failed (no tty, interrupted read)
    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Process exit code for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Http { .. } => 3,
            Self::Transport(_) => 4,
            Self::Auth(_) => 5,
            Self::Decode(_) => 9,
            Self::Validation(_) => 6,
            Self::Io(_) => 7,
            Self::Prompt(_) => 8,
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<gcp_auth::Error> for Error {
    fn from(err: gcp_auth::Error) -> Self {
        Self::Auth(err.to_string())
    }
}

/// Format an error for the operator.
///
/// HTTP failures show the server's own message when the body is a Google
/// error envelope (`{"error": {"message": ...}}`), otherwise the raw body,
/// followed by a hint for the common status codes.
pub fn format_error(error: &Error) -> String {
    match error {
        Error::Http { status, body } => {
            let detail = server_message(body).unwrap_or_else(|| body.trim().to_string());
            let mut out = format!("HTTP {}: {}", status, detail);
            if let Some(hint) = status_hint(*status) {
                out.push_str("\nhint: ");
                out.push_str(hint);
            }
            out
        }
        other => other.to_string(),
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    let message = error.get("message")?.as_str()?;
    match error.get("status").and_then(|s| s.as_str()) {
        Some(status) => Some(format!("{} ({})", message, status)),
        None => Some(message.to_string()),
    }
}

fn status_hint(status: u16) -> Option<&'static str> {
    match status {
        400 => Some("Invalid request. Check your parameters."),
        401 => Some("Authentication failed. Run 'gcloud auth application-default login'."),
        403 => Some("Permission denied. Check your IAM permissions and the quota project."),
        404 => Some("Resource not found. Check the project, location and IDs."),
        409 => Some("Resource conflict. The resource may already exist or be in use."),
        429 => Some("Rate limit exceeded. Please try again later."),
        500..=599 => Some("Service temporarily unavailable. Please try again."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let http = Error::Http {
            status: 404,
            body: String::new(),
        };
        let validation = Error::validation("missing insights.yaml file");
        let auth = Error::Auth("no credentials".into());
        let io = Error::Io(std::io::Error::other("disk"));

        assert_eq!(http.exit_code(), 3);
        assert_eq!(auth.exit_code(), 5);
        assert_eq!(validation.exit_code(), 6);
        assert_eq!(io.exit_code(), 7);

        let decode = Error::Decode(serde_json::from_str::<Value>("{").unwrap_err());
        assert_eq!(decode.exit_code(), 9);
        assert_ne!(decode.exit_code(), http.exit_code());
    }

    #[test]
    fn test_format_error_uses_google_envelope() {
        let err = Error::Http {
            status: 403,
            body: r#"{"error":{"code":403,"message":"Caller lacks permission","status":"PERMISSION_DENIED"}}"#
                .to_string(),
        };
        let msg = format_error(&err);
        assert!(msg.starts_with("HTTP 403: Caller lacks permission (PERMISSION_DENIED)"));
        assert!(msg.contains("hint: Permission denied"));
    }

    #[test]
    fn test_format_error_falls_back_to_raw_body() {
        let err = Error::Http {
            status: 418,
            body: "  teapot  ".to_string(),
        };
        assert_eq!(format_error(&err), "HTTP 418: teapot");
        assert_eq!(err.status(), Some(418));
    }
}
