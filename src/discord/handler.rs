//! Gateway event orchestration.
//!
//! Each event runs its own short decision sequence; failures are caught at
//! this boundary, logged, and converted into a user-visible reply drawn from
//! the response catalogue. Nothing here terminates the process.

use crate::config::Config;
use crate::discord::prompt::MentionPattern;
use crate::discord::reply::OutboundReply;
use crate::discord::{DiscordFetcher, MessageView, chain, commands, prompt, reply, send_as_reply};
use crate::llm::{LlmClientDyn, Persona};
use crate::responses::ResponseStore;
use serenity::async_trait;
use serenity::builder::{CreateAttachment, CreateEmbed, EditInteractionResponse};
use serenity::model::application::{CommandInteraction, Interaction};
use serenity::model::channel::{Message, Reaction, ReactionType};
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::prelude::*;
use std::sync::{Arc, OnceLock};

/// The Rooivalk event handler.
pub struct Handler {
    config: Arc<Config>,
    llm: Arc<dyn LlmClientDyn>,
    responses: Arc<ResponseStore>,
    /// Self-mention matcher, set exactly once at gateway ready.
    mention: OnceLock<MentionPattern>,
}

impl Handler {
    pub fn new(
        config: Arc<Config>,
        llm: Arc<dyn LlmClientDyn>,
        responses: Arc<ResponseStore>,
    ) -> Self {
        Self {
            config,
            llm,
            responses,
            mention: OnceLock::new(),
        }
    }

    /// Run the full respond pipeline for `message`: reconstruct context,
    /// call the model, format, and reply. Returns whether a reply was
    /// delivered. `prompt_override` replaces the chain-derived prompt (used
    /// by reaction-triggered synthetic prompts).
    async fn respond_to(
        &self,
        ctx: &Context,
        message: &Message,
        prompt_override: Option<String>,
    ) -> bool {
        let Some(mention) = self.mention.get() else {
            tracing::warn!("message received before ready, dropping");
            return false;
        };

        let fetcher = DiscordFetcher::new(ctx.http.clone());
        let view = MessageView::from(message);
        let typing = message.channel_id.start_typing(&ctx.http);

        let prompt_text = match prompt_override {
            Some(prompt_text) => prompt_text,
            None => {
                let conversation = if view.parent.is_some() {
                    chain::build_chain(&fetcher, &view, mention.user_id()).await
                } else {
                    Vec::new()
                };
                prompt::resolve_prompt(&conversation, &view.content, mention)
            }
        };

        let persona = Persona::for_channel(message.channel_id, self.config.learn_channel_id);
        tracing::debug!(
            %persona,
            message_id = %message.id,
            prompt_chars = prompt_text.chars().count(),
            "dispatching to model"
        );

        let result = self.llm.create_response(persona, &prompt_text).await;
        drop(typing);

        let catalogue = self.responses.catalogue();
        let outbound = match result {
            Ok(Some(text)) => reply::build_reply(
                &text,
                mentioned_users(message, mention.user_id()),
                &catalogue,
                &mut rand::rng(),
            ),
            Ok(None) => {
                tracing::warn!(message_id = %message.id, "model returned no text");
                OutboundReply::plain(catalogue.error_reply(&mut rand::rng()))
            }
            Err(error) => {
                tracing::error!(%error, message_id = %message.id, "model call failed");
                let notice = catalogue.error_reply(&mut rand::rng());
                OutboundReply::plain(format!("{notice}\n```\n{error}\n```"))
            }
        };

        match send_as_reply(&ctx.http, message, outbound).await {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(%error, message_id = %message.id, "failed to deliver reply");
                false
            }
        }
    }

    /// Reaction on an assistant-authored message: resolve the message it was
    /// answering, reprocess that message as if newly received, and delete the
    /// superseded answer once the replacement is delivered.
    async fn regenerate_from_reaction(&self, ctx: &Context, target: Message) {
        let Some(origin) = target
            .message_reference
            .as_ref()
            .and_then(|reference| reference.message_id.map(|id| (reference.channel_id, id)))
        else {
            tracing::warn!(message_id = %target.id, "reacted reply has no resolvable origin");
            return;
        };

        let origin = match ctx.http.get_message(origin.0, origin.1).await {
            Ok(origin) => origin,
            Err(error) => {
                tracing::warn!(%error, message_id = %target.id, "origin fetch failed");
                return;
            }
        };

        if self.respond_to(ctx, &origin, None).await {
            if let Err(error) = target.delete(&ctx.http).await {
                tracing::warn!(%error, message_id = %target.id, "failed to delete superseded reply");
            }
        }
    }

    async fn handle_learn(&self, ctx: &Context, command: &CommandInteraction) {
        if let Err(error) = command.defer(&ctx.http).await {
            tracing::warn!(%error, "failed to defer /learn");
            return;
        }

        let prompt_text = command
            .data
            .options
            .iter()
            .find(|option| option.name == commands::PROMPT_OPTION)
            .and_then(|option| option.value.as_str())
            .unwrap_or_default();

        let result = self.llm.create_response(Persona::Learn, prompt_text).await;
        let catalogue = self.responses.catalogue();
        let outbound = match result {
            Ok(Some(text)) => reply::build_reply(&text, Vec::new(), &catalogue, &mut rand::rng()),
            Ok(None) => OutboundReply::plain(catalogue.error_reply(&mut rand::rng())),
            Err(error) => {
                tracing::error!(%error, "/learn model call failed");
                OutboundReply::plain(catalogue.error_reply(&mut rand::rng()))
            }
        };

        let mut edit = EditInteractionResponse::new().content(outbound.content);
        for embed in outbound.embeds {
            edit = edit.add_embed(CreateEmbed::new().image(embed.url));
        }
        if let Some(attachment) = outbound.attachment {
            edit = edit.new_attachment(CreateAttachment::bytes(attachment.data, attachment.name));
        }

        if let Err(error) = command.edit_response(&ctx.http, edit).await {
            tracing::warn!(%error, "failed to edit /learn response");
        }
    }
}

/// Users mentioned in `message`, excluding the assistant itself. These are
/// the only ids the outbound reply is allowed to ping.
fn mentioned_users(message: &Message, assistant_id: UserId) -> Vec<UserId> {
    message
        .mentions
        .iter()
        .map(|user| user.id)
        .filter(|id| *id != assistant_id)
        .collect()
}

fn emoji_matches(emoji: &ReactionType, trigger: &str) -> bool {
    match emoji {
        ReactionType::Custom { name: Some(name), .. } => name == trigger,
        ReactionType::Unicode(symbol) => symbol == trigger,
        _ => false,
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(user = %ready.user.name, user_id = %ready.user.id, "connected to discord");

        // Reconnects re-deliver ready with the same identity; the first
        // value wins and later sets are no-ops.
        let _ = self.mention.set(MentionPattern::new(ready.user.id));

        if let Err(error) = commands::register(&ctx.http).await {
            tracing::warn!(%error, "slash command registration failed");
        }

        let Some(channel) = self.config.startup_channel_id else {
            tracing::warn!("no startup channel configured, skipping greeting");
            return;
        };

        let greeting = {
            let catalogue = self.responses.catalogue();
            catalogue.greeting(&mut rand::rng()).to_string()
        };
        if let Err(error) = channel.say(&ctx.http, greeting).await {
            tracing::warn!(%error, "startup greeting failed");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        if msg.guild_id != Some(self.config.guild_id) {
            return;
        }
        let Some(mention) = self.mention.get() else {
            return;
        };

        let eligible = if msg.mentions_user_id(mention.user_id()) {
            true
        } else {
            // Unaddressed messages still qualify when they continue a
            // conversation the assistant is part of.
            let fetcher = DiscordFetcher::new(ctx.http.clone());
            let view = MessageView::from(&msg);
            chain::is_reply_to_assistant(&fetcher, &view, mention.user_id()).await
                || chain::is_assistant_thread(&fetcher, &view, mention.user_id()).await
        };

        if !eligible {
            return;
        }

        self.respond_to(&ctx, &msg, None).await;
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        if reaction.guild_id != Some(self.config.guild_id) {
            return;
        }
        if !emoji_matches(&reaction.emoji, &self.config.trigger_emoji) {
            return;
        }
        let Some(mention) = self.mention.get() else {
            return;
        };

        let target = match ctx
            .http
            .get_message(reaction.channel_id, reaction.message_id)
            .await
        {
            Ok(target) => target,
            Err(error) => {
                tracing::warn!(%error, message_id = %reaction.message_id, "reacted message fetch failed");
                return;
            }
        };

        if target.author.id == mention.user_id() {
            self.regenerate_from_reaction(&ctx, target).await;
        } else {
            let prompt_text = format!(
                "explain the following message as context: {}",
                target.content
            );
            self.respond_to(&ctx, &target, Some(prompt_text)).await;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        match command.data.name.as_str() {
            commands::LEARN => self.handle_learn(&ctx, &command).await,
            other => tracing::warn!(command = other, "unknown slash command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_trigger_emoji_matches_by_symbol() {
        assert!(emoji_matches(&ReactionType::Unicode("🔁".into()), "🔁"));
        assert!(!emoji_matches(&ReactionType::Unicode("🔁".into()), "rooivalk"));
    }
}
