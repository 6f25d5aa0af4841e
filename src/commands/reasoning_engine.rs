//! `reasoning-engine` commands: Agent Engine deployments on Vertex AI

use super::{list_paginated, Context};
use crate::error::{Error, Result};
use crate::gcp::params::QueryParams;
use crate::operation::OperationName;
use crate::output;
use crate::source::{self, SourceArchive};
use clap::{ArgAction, Args, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Method the Gemini Enterprise runtime calls on a deployed ADK app
pub const STREAM_METHOD: &str = "streaming_agent_run_with_events";

const CLASS_METHODS_JSON: &str = include_str!("../resources/class_methods.json");

static CLASS_METHODS: OnceLock<Vec<Value>> = OnceLock::new();

/// Class methods an ADK app exposes, declared on every deployment
pub fn class_methods() -> &'static [Value] {
    CLASS_METHODS.get_or_init(|| {
        serde_json::from_str(CLASS_METHODS_JSON)
            .unwrap_or_else(|e| panic!("Failed to parse embedded class methods JSON: {}", e))
    })
}

#[derive(Subcommand, Debug)]
pub enum ReasoningEngineCommand {
    /// List Agent Engine deployments
    List,

    /// Package a local ADK agent and deploy it, or redeploy an existing engine
    DeployFromSource(DeployArgs),

    /// Delete a deployment
    Delete {
        agent_engine_id: String,
        /// Also delete child resources such as sessions
        #[arg(long)]
        force: bool,
    },

    /// Send one prompt to a deployed agent and print the streamed events
    RemotePrompt {
        agent_engine_id: String,
        prompt: String,
        /// Authorization ID filled with the caller's access token
        auth_to_fill: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Directory holding the agent package
    pub source_dir: PathBuf,
    pub name: String,
    pub display_name: String,
    /// Module inside the source dir, prefixed with the dir name on deploy
    #[arg(long, default_value = "agent")]
    pub entrypoint_module: String,
    #[arg(long, default_value = "app")]
    pub entrypoint_object: String,
    /// Pinned requirements inside the source dir
    #[arg(long, default_value = "requirements.txt")]
    pub requirements_file: String,
    #[arg(long, default_value = "3.12")]
    pub python_version: String,
    /// Ship `.env` inside the archive instead of as deployment env vars
    #[arg(long = "no-process-env-file", action = ArgAction::SetFalse)]
    pub process_env_file: bool,
    /// Redeploy this engine instead of creating one
    #[arg(long)]
    pub existing_agent_engine_id: Option<String>,
    #[arg(long)]
    pub service_account: Option<String>,
}

/// Deployment body for a packaged source dir
pub fn deploy_payload(args: &DeployArgs, archive: &SourceArchive, env: Option<&[(String, String)]>) -> Value {
    let dir = &archive.module_dirname;

    let mut deployment_spec = json!({});
    if let Some(env) = env {
        deployment_spec["env"] = env
            .iter()
            .map(|(name, value)| json!({"name": name, "value": value}))
            .collect::<Vec<_>>()
            .into();
    }

    let mut payload = json!({
        "name": args.name,
        "displayName": args.display_name,
        "spec": {
            "agentFramework": "google-adk",
            "classMethods": class_methods(),
            "deploymentSpec": deployment_spec,
            "sourceCodeSpec": {
                "inlineSource": {"sourceArchive": archive.encoded},
                "pythonSpec": {
                    "version": args.python_version,
                    "entrypointModule": format!("{}.{}", dir, args.entrypoint_module),
                    "entrypointObject": args.entrypoint_object,
                    "requirementsFile": format!("{}/{}", dir, args.requirements_file),
                }
            }
        }
    });

    if let Some(account) = &args.service_account {
        payload["spec"]["serviceAccount"] = json!(account);
    }
    payload
}

/// `request_json` for `streaming_agent_run_with_events`
pub fn prompt_request(prompt: &str, auth_to_fill: &str, access_token: &str) -> Value {
    json!({
        "message": {
            "role": "user",
            "parts": [{"text": prompt}],
        },
        "authorizations": {
            auth_to_fill: {"accessToken": access_token}
        }
    })
}

/// `:streamQuery` body; `request_json` travels as a string
pub fn stream_query_body(request: &Value) -> Value {
    json!({
        "class_method": STREAM_METHOD,
        "input": {"request_json": request.to_string()}
    })
}

pub fn declared_method_count(engine: &Value) -> usize {
    output::lookup(engine, "spec.classMethods")
        .and_then(|v| v.as_array())
        .map(|methods| methods.len())
        .unwrap_or(0)
}

/// Command line that follows a deployment operation
pub fn follow_command(operation: &OperationName) -> String {
    format!(
        "adk-utils --project {} --location {} ai-lro follow {} {}",
        operation.project,
        operation.location,
        operation.parent_id(),
        operation.operation_id
    )
}

pub async fn run(ctx: &Context, command: ReasoningEngineCommand) -> Result<()> {
    let client = ctx.ai_platform()?;

    match command {
        ReasoningEngineCommand::List => {
            list_paginated(ctx, &client, "reasoningEngines", output::render_reasoning_engines).await
        }
        ReasoningEngineCommand::DeployFromSource(args) => {
            let archive = source::package_source(&args.source_dir, args.process_env_file)?;
            let env = if args.process_env_file {
                Some(source::read_env_file(&args.source_dir)?)
            } else {
                None
            };
            tracing::info!(
                "Packaged {} file(s) from {} as module {}",
                archive.file_count,
                args.source_dir.display(),
                archive.module_dirname
            );

            let payload = deploy_payload(&args, &archive, env.as_deref());

            // No updateMask: a redeploy always ships the full source
            let response = match &args.existing_agent_engine_id {
                Some(id) => client.patch(&format!("reasoningEngines/{}", id), &payload).await?,
                None => client.post("reasoningEngines", Some(&payload)).await?,
            };

            if ctx.format_raw {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }

            let name = response
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::validation("deployment response has no operation name"))?;
            let operation = OperationName::parse(name)?;

            println!("Deployment started");
            println!("To follow status of the deployment, run:\n{}", follow_command(&operation));
            Ok(())
        }
        ReasoningEngineCommand::Delete { agent_engine_id, force } => {
            let params = force.then(|| QueryParams::new().with("force", "true"));
            let response = client
                .delete(&format!("reasoningEngines/{}", agent_engine_id), params.as_ref())
                .await?;
            ctx.report(&response, "Agent deleted")
        }
        ReasoningEngineCommand::RemotePrompt {
            agent_engine_id,
            prompt,
            auth_to_fill,
        } => {
            let engine_path = format!("reasoningEngines/{}", agent_engine_id);
            let engine = client.get(&engine_path, None).await?;

            println!(
                "operation count:{}. Note: if 0, deployment was missing classMethods",
                declared_method_count(&engine)
            );
            println!("{}", "-".repeat(50));

            let access_token = client.credentials().get_token().await?;
            let body = stream_query_body(&prompt_request(&prompt, &auth_to_fill, &access_token));

            let events = client
                .post_streaming(&format!("{}:streamQuery", engine_path), &body, |line| {
                    let event: Value = serde_json::from_str(line)?;
                    println!("{}", serde_json::to_string(&event)?);
                    Ok(())
                })
                .await?;

            tracing::info!("Received {} event(s) from {}", events, engine_path);
            Ok(())
        }
    }
}
