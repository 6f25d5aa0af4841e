//! `ai-lro` commands: Vertex AI long running operations

use super::{follow_operation, list_paginated, Context};
use crate::error::Result;
use crate::output;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum LroCommand {
    /// List operations in the location
    List,

    /// Cancel an Agent Engine operation
    Cancel {
        reasoning_engine_id: String,
        lro_id: String,
    },

    /// Poll an Agent Engine operation until it is done
    Follow {
        reasoning_engine_id: String,
        lro_id: String,
    },
}

pub fn operation_path(reasoning_engine_id: &str, lro_id: &str) -> String {
    format!("reasoningEngines/{}/operations/{}", reasoning_engine_id, lro_id)
}

pub async fn run(ctx: &Context, command: LroCommand) -> Result<()> {
    let client = ctx.ai_platform()?;

    match command {
        LroCommand::List => {
            list_paginated(ctx, &client, "operations", output::render_operations_page).await
        }
        LroCommand::Cancel {
            reasoning_engine_id,
            lro_id,
        } => {
            let path = format!("{}:cancel", operation_path(&reasoning_engine_id, &lro_id));
            let response = client.post(&path, None).await?;
            ctx.report(&response, "Lro cancelled")
        }
        LroCommand::Follow {
            reasoning_engine_id,
            lro_id,
        } => {
            let path = operation_path(&reasoning_engine_id, &lro_id);
            follow_operation(ctx, &client, &path).await?;
            Ok(())
        }
    }
}
