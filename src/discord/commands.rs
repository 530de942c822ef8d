//! Slash-command definitions and registration.

use crate::error::Result;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::http::Http;
use serenity::model::application::{Command, CommandOptionType};

/// Name of the tutoring command.
pub const LEARN: &str = "learn";

/// Option carrying the user's question.
pub const PROMPT_OPTION: &str = "prompt";

pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(LEARN)
            .description("Ask Rooivalk to explain a topic step by step")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    PROMPT_OPTION,
                    "What should be explained",
                )
                .required(true),
            ),
    ]
}

/// Upsert the global command set. Setting the full list is idempotent:
/// Discord replaces the previous definitions wholesale.
pub async fn register(http: &Http) -> Result<()> {
    let registered = Command::set_global_commands(http, definitions()).await?;
    tracing::info!(count = registered.len(), "slash commands registered");
    Ok(())
}
