//! `data-insights-agent` commands: the pre-built data insights agent of
//! Gemini Enterprise

use super::agent::{agent_path, agents_path, tool_authorizations};
use super::{follow_operation, list_paginated, resource_id, Context};
use crate::error::{Error, Result};
use crate::output;
use clap::Subcommand;
use dialoguer::Select;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const DEFINITION_FILE: &str = "insights.yaml";

/// Starter files written by `init`
pub const INIT_FILES: &[(&str, &str)] = &[(
    DEFINITION_FILE,
    include_str!("../resources/insights_init/insights.yaml"),
)];

/// Answer to "file exists, overwrite?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    No,
    Yes,
    /// Yes, and stop asking for the remaining files
    All,
}

/// Asks on the terminal, defaulting to no
pub fn prompt_overwrite(path: &Path) -> Result<Overwrite> {
    let choice = Select::new()
        .with_prompt(format!("File {} exists, overwrite?", path.display()))
        .items(&["No", "Yes", "All"])
        .default(0)
        .interact()?;
    Ok(match choice {
        1 => Overwrite::Yes,
        2 => Overwrite::All,
        _ => Overwrite::No,
    })
}

#[derive(Subcommand, Debug)]
pub enum DataInsightsCommand {
    /// Write starter definition files
    Init {
        /// Target directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Register the agent from a definition file, or update it
    CreateOrUpdate {
        gemini_app_id: String,
        display_name: String,
        description: String,
        auth_id: String,
        #[arg(long)]
        icon_uri: Option<String>,
        #[arg(long)]
        existing_agent_id: Option<String>,
        /// Managed agent definition
        #[arg(long, default_value = DEFINITION_FILE)]
        definition_file: PathBuf,
    },

    /// Deploy a registered agent
    Deploy {
        gemini_app_id: String,
        di_agent_id: String,
    },

    /// List Discovery Engine operations as raw JSON
    ListLro,

    /// Poll a deployment operation until it is done
    FollowLro {
        gemini_app_id: String,
        di_agent_id: String,
        operation_id: String,
    },
}

/// Write every starter file into `dir`. Existing files are only replaced
/// after `confirm` agrees; `All` stops the questions. Returns the paths written.
pub fn write_init_files<C>(dir: &Path, mut confirm: C) -> Result<Vec<PathBuf>>
where
    C: FnMut(&Path) -> Result<Overwrite>,
{
    let mut ask = true;
    let mut written = Vec::new();

    for (name, content) in INIT_FILES {
        let path = dir.join(name);
        if ask && path.exists() {
            match confirm(&path)? {
                Overwrite::No => continue,
                Overwrite::Yes => {}
                Overwrite::All => ask = false,
            }
        }
        std::fs::write(&path, content)?;
        written.push(path);
    }

    Ok(written)
}

/// `init` needs neither a project nor credentials
pub fn init(dir: &Path) -> Result<()> {
    for path in write_init_files(dir, prompt_overwrite)? {
        println!("Wrote {}", path.display());
    }
    println!("Init succeeded");
    Ok(())
}

/// Read the managed agent definition
pub fn load_definition(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::validation(format!("missing {} file", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content)
        .map_err(|e| Error::validation(format!("invalid {}: {}", path.display(), e)))
}

pub fn insights_payload(
    display_name: &str,
    description: &str,
    definition: Value,
    authorizations: Vec<String>,
    icon_uri: Option<&str>,
) -> Value {
    let mut payload = json!({
        "displayName": display_name,
        "description": description,
        "managed_agent_definition": definition,
        "authorizationConfig": {"toolAuthorizations": authorizations},
    });
    if let Some(icon) = icon_uri {
        payload["icon"] = json!({"uri": icon});
    }
    payload
}

pub fn operation_path(gemini_app_id: &str, di_agent_id: &str, operation_id: &str) -> String {
    format!("{}/operations/{}", agent_path(gemini_app_id, di_agent_id), operation_id)
}

pub async fn run(ctx: &Context, command: DataInsightsCommand) -> Result<()> {
    if let DataInsightsCommand::Init { dir } = &command {
        return init(dir);
    }

    let client = ctx.discovery_engine()?;

    match command {
        DataInsightsCommand::Init { .. } => Ok(()),
        DataInsightsCommand::CreateOrUpdate {
            gemini_app_id,
            display_name,
            description,
            auth_id,
            icon_uri,
            existing_agent_id,
            definition_file,
        } => {
            let definition = load_definition(&definition_file)?;
            let project_number = client.project_number().await?;
            let payload = insights_payload(
                &display_name,
                &description,
                definition,
                tool_authorizations(&project_number, &ctx.location, &[auth_id]),
                icon_uri.as_deref(),
            );

            let response = match &existing_agent_id {
                Some(agent_id) => client.patch(&agent_path(&gemini_app_id, agent_id), &payload).await?,
                None => client.post(&agents_path(&gemini_app_id), Some(&payload)).await?,
            };

            if ctx.format_raw {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            println!("Data insights agent registered.\nTo deploy it, use:");
            println!(
                "adk-utils --project {} --location {} data-insights-agent deploy {} {}",
                ctx.project_id,
                ctx.location,
                gemini_app_id,
                resource_id(&response)?
            );
            Ok(())
        }
        DataInsightsCommand::Deploy {
            gemini_app_id,
            di_agent_id,
        } => {
            let agent = agent_path(&gemini_app_id, &di_agent_id);
            let response = client
                .post(&format!("{}:deploy", agent), Some(&json!({"name": agent})))
                .await?;

            if ctx.format_raw {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }
            println!("Data insights agent deployment started. To follow status run:");
            println!(
                "adk-utils --project {} --location {} data-insights-agent follow-lro {} {} {}",
                ctx.project_id,
                ctx.location,
                gemini_app_id,
                di_agent_id,
                resource_id(&response)?
            );
            Ok(())
        }
        DataInsightsCommand::ListLro => {
            list_paginated(ctx, &client, "operations", output::render_json_line).await
        }
        DataInsightsCommand::FollowLro {
            gemini_app_id,
            di_agent_id,
            operation_id,
        } => {
            let path = operation_path(&gemini_app_id, &di_agent_id, &operation_id);
            follow_operation(ctx, &client, &path).await?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_definition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFINITION_FILE);
        std::fs::write(
            &path,
            "data_science_agent_config:\n  bq_project_id: my-project\n  nl_query_config:\n    nl2sql_prompt: be precise\n",
        )
        .unwrap();

        let definition = load_definition(&path).unwrap();
        assert_eq!(definition["data_science_agent_config"]["bq_project_id"], "my-project");
    }

    #[test]
    fn test_init_writes_template_that_loads() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_init_files(dir.path(), |_path: &Path| -> Result<Overwrite> {
            panic!("nothing exists yet")
        })
        .unwrap();

        assert_eq!(written, vec![dir.path().join(DEFINITION_FILE)]);
        let definition = load_definition(&written[0]).unwrap();
        assert!(definition["data_science_agent_config"].is_object());
    }

    #[test]
    fn test_init_keeps_existing_file_when_declined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFINITION_FILE);
        std::fs::write(&path, "mine: true\n").unwrap();

        let mut asked = 0;
        let written = write_init_files(dir.path(), |_path: &Path| {
            asked += 1;
            Ok(Overwrite::No)
        })
        .unwrap();

        assert_eq!(asked, 1);
        assert!(written.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mine: true\n");
    }

    #[test]
    fn test_init_overwrites_when_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFINITION_FILE);
        std::fs::write(&path, "mine: true\n").unwrap();

        let written = write_init_files(dir.path(), |_path: &Path| Ok(Overwrite::All)).unwrap();
        assert_eq!(written.len(), 1);
        assert!(std::fs::read_to_string(&path).unwrap().contains("data_science_agent_config"));
    }

    #[test]
    fn test_load_definition_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_definition(&dir.path().join(DEFINITION_FILE)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().starts_with("missing "));
    }

    #[test]
    fn test_insights_payload() {
        let payload = insights_payload(
            "Insights",
            "Answers data questions",
            json!({"k": "v"}),
            tool_authorizations("42", "global", &["bq-auth".to_string()]),
            None,
        );
        assert_eq!(payload["managed_agent_definition"]["k"], "v");
        assert_eq!(
            payload["authorizationConfig"]["toolAuthorizations"],
            json!(["projects/42/locations/global/authorizations/bq-auth"])
        );
        assert!(payload.get("icon").is_none());
    }

    #[test]
    fn test_operation_path() {
        assert_eq!(
            operation_path("app", "di", "op1"),
            "collections/default_collection/engines/app/assistants/default_assistant/agents/di/operations/op1"
        );
    }
}
