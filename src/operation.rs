//! Long-running operations
//!
//! Typed view of `google.longrunning.Operation` and the driver that follows
//! one until it completes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Default delay between two polls of a followed operation
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Error reported by a finished operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
    Running,
    Succeeded,
    Failed { code: i32, message: String },
}

impl Operation {
    pub fn state(&self) -> OperationState {
        if !self.done {
            return OperationState::Running;
        }
        match &self.error {
            Some(err) => OperationState::Failed {
                code: err.code,
                message: err.message.clone(),
            },
            None => OperationState::Succeeded,
        }
    }

    /// Short metadata type, e.g. `CreateReasoningEngine` for
    /// `type.googleapis.com/google.cloud.aiplatform.v1beta1.CreateReasoningEngineOperationMetadata`
    pub fn kind(&self) -> Option<String> {
        let full = self.metadata.as_ref()?.get("@type")?.as_str()?;
        let last = full.rsplit('.').next().unwrap_or(full);
        Some(last.replace("OperationMetadata", ""))
    }

    /// `metadata.genericMetadata.{createTime, updateTime}`
    pub fn times(&self) -> (Option<&str>, Option<&str>) {
        let generic = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("genericMetadata"));
        let pick = |key: &str| generic.and_then(|g| g.get(key)).and_then(|v| v.as_str());
        (pick("createTime"), pick("updateTime"))
    }
}

/// Pieces of `projects/{p}/locations/{l}/{collection}/{id}/.../operations/{op}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationName {
    pub project: String,
    pub location: String,
    /// Path between the location and `/operations/`, e.g. `reasoningEngines/123`
    pub parent: String,
    pub operation_id: String,
}

impl OperationName {
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("unexpected operation name: {}", name));

        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() < 6 || parts[0] != "projects" || parts[2] != "locations" {
            return Err(invalid());
        }
        let ops_idx = parts.iter().rposition(|p| *p == "operations").ok_or_else(invalid)?;
        if ops_idx + 2 != parts.len() || ops_idx <= 4 {
            return Err(invalid());
        }

        Ok(Self {
            project: parts[1].to_string(),
            location: parts[3].to_string(),
            parent: parts[4..ops_idx].join("/"),
            operation_id: parts[ops_idx + 1].to_string(),
        })
    }

    /// Last segment of the parent, e.g. the reasoning engine ID
    pub fn parent_id(&self) -> &str {
        self.parent.rsplit('/').next().unwrap_or(&self.parent)
    }
}

/// Polls one operation until it is done.
///
/// There is no attempt ceiling; the loop ends on `done == true` or when
/// the process is interrupted. A failed fetch aborts the loop and the error
/// is returned to the caller.
#[derive(Debug, Clone)]
pub struct Follower {
    interval: Duration,
}

impl Default for Follower {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Follower {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Follow with `tokio::time::sleep` between polls
    pub async fn follow<F, Fut, R>(&self, fetch: F, render: R) -> Result<Operation>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Operation>>,
        R: FnMut(&Operation, u32) -> Result<()>,
    {
        self.follow_with_sleep(fetch, render, tokio::time::sleep).await
    }

    /// Follow with an injected sleep. `render` gets the operation and the
    /// 1-based poll count.
    pub async fn follow_with_sleep<F, Fut, R, S, SFut>(
        &self,
        mut fetch: F,
        mut render: R,
        mut sleep: S,
    ) -> Result<Operation>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Operation>>,
        R: FnMut(&Operation, u32) -> Result<()>,
        S: FnMut(Duration) -> SFut,
        SFut: Future<Output = ()>,
    {
        let mut polls = 0u32;
        loop {
            let operation = fetch().await?;
            polls += 1;
            render(&operation, polls)?;

            if operation.done {
                tracing::info!("Operation {} done after {} poll(s)", operation.name, polls);
                return Ok(operation);
            }

            tracing::debug!("Operation {} still running, sleeping {:?}", operation.name, self.interval);
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn op(value: Value) -> Operation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_state_running_by_default() {
        let operation = op(json!({"name": "operations/1"}));
        assert!(!operation.done);
        assert_eq!(operation.state(), OperationState::Running);
    }

    #[test]
    fn test_state_failed_and_succeeded() {
        let failed = op(json!({
            "name": "operations/1",
            "done": true,
            "error": {"code": 3, "message": "bad requirements"}
        }));
        assert_eq!(
            failed.state(),
            OperationState::Failed {
                code: 3,
                message: "bad requirements".to_string()
            }
        );

        let ok = op(json!({"name": "operations/2", "done": true, "response": {}}));
        assert_eq!(ok.state(), OperationState::Succeeded);
    }

    #[test]
    fn test_kind_strips_metadata_suffix() {
        let operation = op(json!({
            "name": "operations/1",
            "metadata": {
                "@type": "type.googleapis.com/google.cloud.aiplatform.v1beta1.UpdateReasoningEngineOperationMetadata",
                "genericMetadata": {"createTime": "2025-01-01T00:00:00Z"}
            }
        }));
        assert_eq!(operation.kind().as_deref(), Some("UpdateReasoningEngine"));
        assert_eq!(operation.times(), (Some("2025-01-01T00:00:00Z"), None));
    }

    #[test]
    fn test_parse_reasoning_engine_operation_name() {
        let name = OperationName::parse(
            "projects/123/locations/us-central1/reasoningEngines/456/operations/789",
        )
        .unwrap();
        assert_eq!(name.project, "123");
        assert_eq!(name.location, "us-central1");
        assert_eq!(name.parent, "reasoningEngines/456");
        assert_eq!(name.parent_id(), "456");
        assert_eq!(name.operation_id, "789");
    }

    #[test]
    fn test_parse_nested_agent_operation_name() {
        let name = OperationName::parse(
            "projects/1/locations/global/collections/default_collection/engines/app/assistants/default_assistant/agents/a1/operations/op1",
        )
        .unwrap();
        assert_eq!(name.parent_id(), "a1");
        assert_eq!(name.operation_id, "op1");
    }

    #[test]
    fn test_parse_rejects_non_operation_names() {
        assert!(OperationName::parse("projects/1/locations/us/reasoningEngines/2").is_err());
        assert!(OperationName::parse("operations/1").is_err());
        assert!(OperationName::parse("projects/1/locations/us/operations/1").is_err());
    }
}
