//! `gemini-app` commands

use super::{list_paginated, Context};
use crate::error::Result;
use crate::output;
use clap::Subcommand;

pub const ENGINES_PATH: &str = "collections/default_collection/engines";

#[derive(Subcommand, Debug)]
pub enum GeminiAppCommand {
    /// List Gemini Enterprise apps (Discovery Engine engines)
    List,
}

pub async fn run(ctx: &Context, command: GeminiAppCommand) -> Result<()> {
    let client = ctx.discovery_engine()?;

    match command {
        GeminiAppCommand::List => list_paginated(ctx, &client, ENGINES_PATH, output::render_apps).await,
    }
}
