//! Morning-greeting scheduler.
//!
//! A single long-lived task sleeps until the next cron occurrence in the
//! configured timezone, runs the greeting prompt through the LLM, and posts
//! the result to the startup channel. Each firing is best-effort; a failed
//! run logs and waits for the next occurrence.

use crate::config::Config;
use crate::discord::reply::{self, OutboundReply};
use crate::discord::send_to_channel;
use crate::error::Result;
use crate::llm::{LlmClientDyn, Persona};
use crate::responses::ResponseStore;
use crate::weather::WeatherClient;
use serenity::http::Http;
use serenity::model::id::ChannelId;
use std::str::FromStr as _;
use std::sync::Arc;

/// The scheduled greeting job and everything it needs to fire.
pub struct GreetingJob {
    config: Arc<Config>,
    llm: Arc<dyn LlmClientDyn>,
    responses: Arc<ResponseStore>,
    weather: Option<WeatherClient>,
    http: Arc<Http>,
}

impl GreetingJob {
    pub fn new(
        config: Arc<Config>,
        llm: Arc<dyn LlmClientDyn>,
        responses: Arc<ResponseStore>,
        weather: Option<WeatherClient>,
        http: Arc<Http>,
    ) -> Self {
        Self {
            config,
            llm,
            responses,
            weather,
            http,
        }
    }

    /// Spawn the scheduler loop.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let Some(channel) = self.config.startup_channel_id else {
            tracing::warn!("no startup channel configured, greeting scheduler idle");
            return;
        };

        let schedule = match cron::Schedule::from_str(&self.config.greeting.schedule) {
            Ok(schedule) => schedule,
            Err(error) => {
                tracing::error!(
                    %error,
                    schedule = %self.config.greeting.schedule,
                    "invalid greeting cron expression, scheduler disabled"
                );
                return;
            }
        };

        let timezone: chrono_tz::Tz = match self.config.greeting.timezone.parse() {
            Ok(timezone) => timezone,
            Err(_) => {
                tracing::warn!(
                    timezone = %self.config.greeting.timezone,
                    "unknown timezone, scheduling greetings in UTC"
                );
                chrono_tz::Tz::UTC
            }
        };

        loop {
            let now = chrono::Utc::now().with_timezone(&timezone);
            let Some(next) = schedule.after(&now).next() else {
                tracing::warn!("greeting schedule has no upcoming occurrence, scheduler done");
                return;
            };

            let wait = (next - now).to_std().unwrap_or_default();
            tracing::debug!(next = %next, "sleeping until next scheduled greeting");
            tokio::time::sleep(wait).await;

            if let Err(error) = self.fire(channel).await {
                tracing::warn!(%error, "scheduled greeting failed");
            }
        }
    }

    async fn fire(&self, channel: ChannelId) -> Result<()> {
        let weather_line = match (&self.weather, self.config.greeting.coordinates) {
            (Some(client), Some((latitude, longitude))) => {
                match client.current(latitude, longitude).await {
                    Ok(report) => format!(" Mention the current weather: {report}."),
                    Err(error) => {
                        tracing::warn!(%error, "weather fetch failed, greeting without it");
                        String::new()
                    }
                }
            }
            _ => String::new(),
        };

        let prompt_text = format!(
            "Write a short good-morning message for the server, in your own voice.{weather_line}"
        );

        let text = self.llm.create_response(Persona::Rooivalk, &prompt_text).await?;
        let catalogue = self.responses.catalogue();
        let outbound = match text {
            Some(text) => reply::build_reply(&text, Vec::new(), &catalogue, &mut rand::rng()),
            None => OutboundReply::plain(catalogue.greeting(&mut rand::rng())),
        };

        send_to_channel(&self.http, channel, outbound).await?;
        tracing::info!(channel_id = %channel, "scheduled greeting delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    #[test]
    fn default_schedule_parses_and_fires_daily() {
        let schedule = cron::Schedule::from_str("0 0 7 * * *").unwrap();
        let mut upcoming = schedule.upcoming(chrono::Utc);
        let first = upcoming.next().unwrap();
        let second = upcoming.next().unwrap();
        assert_eq!(second - first, chrono::Duration::days(1));
    }
}
