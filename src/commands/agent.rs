//! `agent` commands: ADK agents registered with a Gemini Enterprise app

use super::{list_paginated, Context};
use crate::error::Result;
use crate::output;
use clap::{Args, Subcommand};
use serde_json::{json, Value};

#[derive(Subcommand, Debug)]
pub enum AgentCommand {
    /// Register an ADK agent with a Gemini Enterprise app, or update it
    CreateOrUpdate(CreateOrUpdateArgs),

    /// Delete an agent
    Delete {
        /// Gemini Enterprise app (engine) ID
        gemini_app_id: String,
        agent_id: String,
    },

    /// List agents of an app
    List {
        /// Gemini Enterprise app (engine) ID
        #[arg(long)]
        app_id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CreateOrUpdateArgs {
    /// Gemini Enterprise app (engine) ID
    pub gemini_app_id: String,
    /// Name shown to users
    pub display_name: String,
    /// Description shown to users
    pub description: String,
    /// Description given to the LLM
    pub tool_description: String,
    /// Agent Engine (reasoning engine) ID
    pub reasoning_engine_id: String,
    /// Location of the Agent Engine deployment
    pub reasoning_engine_location: String,
    /// Authorization IDs the agent may use
    #[arg(long = "auth-id")]
    pub auth_ids: Vec<String>,
    /// Public URI of the agent icon
    #[arg(long)]
    pub icon_uri: Option<String>,
    /// Update this agent instead of creating a new one
    #[arg(long)]
    pub existing_agent_id: Option<String>,
}

/// `collections/default_collection/engines/{app}/assistants/default_assistant/agents`
pub fn agents_path(app_id: &str) -> String {
    format!(
        "collections/default_collection/engines/{}/assistants/default_assistant/agents",
        app_id
    )
}

pub fn agent_path(app_id: &str, agent_id: &str) -> String {
    format!("{}/{}", agents_path(app_id), agent_id)
}

/// Tool authorization resource names are keyed by project number
pub fn tool_authorizations(project_number: &str, location: &str, auth_ids: &[String]) -> Vec<String> {
    auth_ids
        .iter()
        .map(|id| format!("projects/{}/locations/{}/authorizations/{}", project_number, location, id))
        .collect()
}

pub fn agent_payload(args: &CreateOrUpdateArgs, project_id: &str, project_number: &str, location: &str) -> Value {
    let mut payload = json!({
        "displayName": args.display_name,
        "description": args.description,
        "adk_agent_definition": {
            "tool_settings": {"tool_description": args.tool_description},
            "provisioned_reasoning_engine": {
                "reasoning_engine": format!(
                    "projects/{}/locations/{}/reasoningEngines/{}",
                    project_id, args.reasoning_engine_location, args.reasoning_engine_id
                )
            }
        },
        "authorizationConfig": {
            "toolAuthorizations": tool_authorizations(project_number, location, &args.auth_ids)
        }
    });

    if let Some(icon) = &args.icon_uri {
        payload["icon"] = json!({"uri": icon});
    }
    payload
}

pub async fn run(ctx: &Context, command: AgentCommand) -> Result<()> {
    let client = ctx.discovery_engine()?;

    match command {
        AgentCommand::CreateOrUpdate(args) => {
            let project_number = client.project_number().await?;
            let payload = agent_payload(&args, &ctx.project_id, &project_number, &ctx.location);

            let response = match &args.existing_agent_id {
                Some(agent_id) => {
                    client
                        .patch(&agent_path(&args.gemini_app_id, agent_id), &payload)
                        .await?
                }
                None => {
                    client
                        .post(&agents_path(&args.gemini_app_id), Some(&payload))
                        .await?
                }
            };

            let name = response.get("name").and_then(|v| v.as_str()).unwrap_or("-");
            ctx.report(&response, &format!("Agent registered. Name: {}", name))
        }
        AgentCommand::Delete {
            gemini_app_id,
            agent_id,
        } => {
            let response = client
                .delete(&agent_path(&gemini_app_id, &agent_id), None)
                .await?;
            ctx.report(&response, "Agent deleted")
        }
        AgentCommand::List { app_id } => {
            let path = agents_path(&app_id);
            list_paginated(ctx, &client, &path, output::render_agents).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CreateOrUpdateArgs {
        CreateOrUpdateArgs {
            gemini_app_id: "my-app".to_string(),
            display_name: "Helper".to_string(),
            description: "Helps".to_string(),
            tool_description: "Use for help".to_string(),
            reasoning_engine_id: "123".to_string(),
            reasoning_engine_location: "us-central1".to_string(),
            auth_ids: vec!["auth-a".to_string(), "auth-b".to_string()],
            icon_uri: None,
            existing_agent_id: None,
        }
    }

    #[test]
    fn test_agent_paths() {
        assert_eq!(
            agent_path("app", "a1"),
            "collections/default_collection/engines/app/assistants/default_assistant/agents/a1"
        );
    }

    #[test]
    fn test_agent_payload() {
        let payload = agent_payload(&args(), "my-project", "98765", "global");

        assert_eq!(payload["displayName"], "Helper");
        assert_eq!(
            payload["adk_agent_definition"]["provisioned_reasoning_engine"]["reasoning_engine"],
            "projects/my-project/locations/us-central1/reasoningEngines/123"
        );
        assert_eq!(
            payload["authorizationConfig"]["toolAuthorizations"][1],
            "projects/98765/locations/global/authorizations/auth-b"
        );
        assert!(payload.get("icon").is_none());
    }

    #[test]
    fn test_agent_payload_with_icon() {
        let mut args = args();
        args.icon_uri = Some("https://example.com/icon.png".to_string());
        let payload = agent_payload(&args, "p", "1", "us");
        assert_eq!(payload["icon"]["uri"], "https://example.com/icon.png");
    }
}
