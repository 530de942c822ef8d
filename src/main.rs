//! Rooivalk CLI entry point.

use anyhow::Context as _;
use clap::Parser;
use serenity::prelude::GatewayIntents;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rooivalk")]
#[command(about = "A Discord assistant with reply-chain context and LLM-backed replies")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Rooivalk...");

    let config = Arc::new(
        rooivalk::config::Config::from_env().with_context(|| "failed to load configuration")?,
    );

    tracing::info!(guild_id = %config.guild_id, "Configuration loaded");

    let responses = Arc::new(rooivalk::responses::ResponseStore::load(
        config.responses_path.clone(),
    ));

    // Keep the watcher alive for the life of the process; reloads swap the
    // catalogue atomically.
    let _watcher = match responses.watch() {
        Ok(watcher) => Some(watcher),
        Err(error) => {
            tracing::warn!(%error, "catalogue watcher unavailable, hot reload disabled");
            None
        }
    };

    let llm: Arc<dyn rooivalk::llm::LlmClientDyn> = Arc::new(
        rooivalk::llm::OpenAiClient::new(config.llm.clone())
            .with_context(|| "failed to initialize LLM client")?,
    );

    let weather = match rooivalk::weather::WeatherClient::new() {
        Ok(client) => Some(client),
        Err(error) => {
            tracing::warn!(%error, "weather client unavailable, greetings go without it");
            None
        }
    };

    let handler =
        rooivalk::discord::Handler::new(config.clone(), llm.clone(), responses.clone());

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let mut client = serenity::Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .with_context(|| "failed to create Discord client")?;

    rooivalk::cron::GreetingJob::new(
        config.clone(),
        llm,
        responses,
        weather,
        client.http.clone(),
    )
    .spawn();

    tracing::info!("Rooivalk started");

    tokio::select! {
        result = client.start() => {
            result.with_context(|| "Discord client stopped with an error")?;
            tracing::info!("Discord client stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Rooivalk stopped");
    Ok(())
}
