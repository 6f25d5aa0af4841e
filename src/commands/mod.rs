//! CLI commands
//!
//! One submodule per resource family. [`Command`] is assembled once by clap
//! and [`dispatch`] routes it to the family's handler.

pub mod agent;
pub mod authorization;
pub mod data_insights;
pub mod gemini_app;
pub mod lro;
pub mod reasoning_engine;

use crate::error::{Error, Result};
use crate::gcp::auth::Credentials;
use crate::gcp::client::RequestClient;
use crate::gcp::endpoint::Endpoint;
use crate::operation::{Follower, Operation, OperationState};
use crate::output;
use crate::pagination::{Page, PageMode, Paginator, PromptContinuation};
use clap::Subcommand;
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Gemini Enterprise agent definitions (not Agent Engine agents)
    #[command(subcommand)]
    Agent(agent::AgentCommand),

    /// Gemini Enterprise OAuth authorizations
    #[command(subcommand)]
    Authorization(authorization::AuthorizationCommand),

    /// Gemini Enterprise applications
    #[command(subcommand)]
    GeminiApp(gemini_app::GeminiAppCommand),

    /// Agent Engine (reasoning engine) deployments
    #[command(subcommand)]
    ReasoningEngine(reasoning_engine::ReasoningEngineCommand),

    /// Vertex AI long running operations
    #[command(subcommand)]
    AiLro(lro::LroCommand),

    /// The pre-built data insights agent
    #[command(subcommand)]
    DataInsightsAgent(data_insights::DataInsightsCommand),
}

/// Run one command
pub async fn dispatch(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Agent(cmd) => agent::run(ctx, cmd).await,
        Command::Authorization(cmd) => authorization::run(ctx, cmd).await,
        Command::GeminiApp(cmd) => gemini_app::run(ctx, cmd).await,
        Command::ReasoningEngine(cmd) => reasoning_engine::run(ctx, cmd).await,
        Command::AiLro(cmd) => lro::run(ctx, cmd).await,
        Command::DataInsightsAgent(cmd) => data_insights::run(ctx, cmd).await,
    }
}

/// Everything a command needs, resolved once at startup
#[derive(Clone)]
pub struct Context {
    pub project_id: String,
    pub location: String,
    pub format_raw: bool,
    pub page_size: u32,
    pub poll_interval: Duration,
    /// Replaces every API base URL (emulators, tests)
    pub endpoint_override: Option<String>,
    credentials: Credentials,
}

impl Context {
    pub fn new(project_id: &str, location: &str, credentials: Credentials) -> Self {
        Self {
            project_id: project_id.to_string(),
            location: location.to_string(),
            format_raw: false,
            page_size: crate::pagination::DEFAULT_PAGE_SIZE,
            poll_interval: crate::operation::DEFAULT_POLL_INTERVAL,
            endpoint_override: None,
            credentials,
        }
    }

    fn client_for(&self, endpoint: Endpoint) -> Result<RequestClient> {
        let endpoint = match &self.endpoint_override {
            Some(url) => Endpoint::from_base_url(url),
            None => endpoint,
        };
        RequestClient::new(endpoint, self.credentials.clone(), &self.project_id)
    }

    /// Client for Discovery Engine in the context's location
    pub fn discovery_engine(&self) -> Result<RequestClient> {
        self.client_for(Endpoint::discovery_engine(&self.project_id, &self.location))
    }

    /// Client for Vertex AI in the context's location
    pub fn ai_platform(&self) -> Result<RequestClient> {
        self.client_for(Endpoint::ai_platform(&self.project_id, &self.location))
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(PageMode::from_raw_flag(self.format_raw)).with_page_size(self.page_size)
    }

    pub fn follower(&self) -> Follower {
        Follower::new(self.poll_interval)
    }

    /// Print a mutation result: the full response in raw mode, else `message`
    pub fn report(&self, response: &Value, message: &str) -> Result<()> {
        if self.format_raw {
            println!("{}", serde_json::to_string_pretty(response)?);
        } else {
            println!("{}", message);
        }
        Ok(())
    }
}

/// Paginated GET of `path`, written to stdout
pub(crate) async fn list_paginated<R>(ctx: &Context, client: &RequestClient, path: &str, render: R) -> Result<()>
where
    R: FnMut(&Page) -> String,
{
    let mut out = std::io::stdout();
    let mut prompt = PromptContinuation;

    let stats = ctx
        .paginator()
        .run(
            &mut out,
            move |params| async move { client.get(path, Some(&params)).await },
            render,
            &mut prompt,
        )
        .await?;

    tracing::info!("Listed {} page(s) of {}", stats.pages, path);
    Ok(())
}

/// Follow one operation at `path` until it is done
pub(crate) async fn follow_operation(ctx: &Context, client: &RequestClient, path: &str) -> Result<Operation> {
    let follower = ctx.follower();
    let started = Instant::now();
    let raw = ctx.format_raw;

    eprintln!(
        "Updates are made every {}s. Times are in UTC.",
        follower.interval().as_secs()
    );
    eprintln!("This will exit when the LRO is done. To stop following before that, press Ctrl+C");

    let operation = follower
        .follow(
            move || async move { client.get_as::<Operation>(path).await },
            |op, polls| {
                if raw {
                    println!("{}", serde_json::to_string(op)?);
                } else {
                    println!("{}", output::render_operations(std::slice::from_ref(op)));
                    println!("poll #{} - elapsed {}s", polls, started.elapsed().as_secs());
                }
                Ok(())
            },
        )
        .await?;

    if let OperationState::Failed { code, message } = operation.state() {
        eprintln!("Operation finished with error {}: {}", code, message);
    }
    Ok(operation)
}

/// Parse `key=value`
pub(crate) fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// Last segment of a resource name taken from a response
pub(crate) fn resource_id(response: &Value) -> Result<&str> {
    response
        .get("name")
        .and_then(|v| v.as_str())
        .map(output::after_last_slash)
        .ok_or_else(|| Error::validation("response has no resource name"))
}
