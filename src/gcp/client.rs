//! Request client
//!
//! Binds an [`Endpoint`] to credentials and a quota project. Every call
//! fetches a bearer token (cached in memory by [`Credentials`]), sends one
//! request and fails with [`Error::Http`] on any non-2xx answer. There is
//! no retry.

use super::auth::Credentials;
use super::endpoint::Endpoint;
use super::http::{ApiRequest, GcpHttpClient};
use super::params::QueryParams;
use crate::error::{Error, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Authenticated client for one API endpoint
#[derive(Clone)]
pub struct RequestClient {
    endpoint: Endpoint,
    credentials: Credentials,
    http: GcpHttpClient,
    project_id: String,
}

impl RequestClient {
    pub fn new(endpoint: Endpoint, credentials: Credentials, project_id: &str) -> Result<Self> {
        Ok(Self {
            endpoint,
            credentials,
            http: GcpHttpClient::new()?,
            project_id: project_id.to_string(),
        })
    }

    /// Same credentials and project against another endpoint
    pub fn with_endpoint(&self, endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            credentials: self.credentials.clone(),
            http: self.http.clone(),
            project_id: self.project_id.clone(),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn http(&self) -> &GcpHttpClient {
        &self.http
    }

    /// Send one request relative to the endpoint's base URL
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        let url = self.endpoint.url(path);

        self.http
            .send(ApiRequest {
                method,
                url: &url,
                token: &token,
                user_project: Some(&self.project_id),
                query,
                body,
            })
            .await
    }

    pub async fn get(&self, path: &str, params: Option<&QueryParams>) -> Result<Value> {
        self.request(Method::GET, path, params, None).await
    }

    /// GET and deserialize into `T`
    pub async fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.get(path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post(&self, path: &str, data: Option<&Value>) -> Result<Value> {
        self.request(Method::POST, path, None, data).await
    }

    pub async fn patch(&self, path: &str, data: &Value) -> Result<Value> {
        self.request(Method::PATCH, path, None, Some(data)).await
    }

    pub async fn delete(&self, path: &str, params: Option<&QueryParams>) -> Result<Value> {
        self.request(Method::DELETE, path, params, None).await
    }

    /// POST and hand every streamed JSON line to `on_line`
    pub async fn post_streaming<F>(&self, path: &str, data: &Value, on_line: F) -> Result<usize>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let token = self.credentials.get_token().await?;
        let url = self.endpoint.url(path);

        self.http
            .send_streaming(
                ApiRequest {
                    method: Method::POST,
                    url: &url,
                    token: &token,
                    user_project: Some(&self.project_id),
                    query: None,
                    body: Some(data),
                },
                on_line,
            )
            .await
    }

    /// Resolve the numeric project number through Cloud Resource Manager
    pub async fn project_number(&self) -> Result<String> {
        let resource_manager = self.with_endpoint(Endpoint::resource_manager());
        let project = resource_manager
            .get(&format!("projects/{}", self.project_id), None)
            .await?;
        project_number_from(&project)
    }
}

/// Extract `projectNumber` from a Resource Manager project
pub fn project_number_from(project: &Value) -> Result<String> {
    match project.get("projectNumber") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::validation("projectNumber missing from project resource")),
    }
}
