//! HTTP utilities for GCP REST API calls

use super::params::QueryParams;
use crate::error::{Error, Result};
use futures::StreamExt;
use reqwest::{Client, Method, Response};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header naming the project billed for the request
pub const USER_PROJECT_HEADER: &str = "x-goog-user-project";

/// Truncate long bodies and strip non-printables before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// One authenticated API call
pub struct ApiRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub token: &'a str,
    pub user_project: Option<&'a str>,
    pub query: Option<&'a QueryParams>,
    pub body: Option<&'a Value>,
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("adk-utils/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    fn build(&self, request: &ApiRequest<'_>) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url)
            .bearer_auth(request.token);

        if let Some(project) = request.user_project {
            builder = builder.header(USER_PROJECT_HEADER, project);
        }
        if let Some(query) = request.query.filter(|q| !q.is_empty()) {
            builder = builder.query(&query.to_pairs());
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }
        builder
    }

    /// Send a request and parse the JSON answer
    pub async fn send(&self, request: ApiRequest<'_>) -> Result<Value> {
        tracing::debug!("{} {}", request.method, request.url);

        let response = self.build(&request).send().await?;
        read_json(response).await
    }

    /// Send a request whose answer is a stream of newline-delimited JSON
    /// chunks; `on_line` sees every non-empty line as it arrives.
    pub async fn send_streaming<F>(&self, request: ApiRequest<'_>, mut on_line: F) -> Result<usize>
    where
        F: FnMut(&str) -> Result<()>,
    {
        tracing::debug!("{} {} (streaming)", request.method, request.url);

        let response = self.build(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut lines = 0;

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                lines += emit_line(&line, &mut on_line)?;
            }
        }
        lines += emit_line(&buffer, &mut on_line)?;

        Ok(lines)
    }

    /// POST an `application/x-www-form-urlencoded` body without bearer auth
    /// (OAuth token endpoints)
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!("POST {} (form)", url);

        let response = self.client.post(url).form(form).send().await?;
        read_json(response).await
    }
}

fn emit_line<F>(raw: &[u8], on_line: &mut F) -> Result<usize>
where
    F: FnMut(&str) -> Result<()>,
{
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    if line.is_empty() {
        return Ok(0);
    }
    on_line(line)?;
    Ok(1)
}

/// Map a response to JSON, or to `Error::Http` on non-2xx
async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
        return Err(Error::Http {
            status: status.as_u16(),
            body,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_str(&body)?)
}
