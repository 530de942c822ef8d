//! Discord surface: message views, the fetch seam, chain reconstruction,
//! prompt and reply shaping, and the gateway event handler.

pub mod chain;
pub mod commands;
pub mod handler;
pub mod prompt;
pub mod reply;

pub use handler::Handler;

use crate::error::Result;
use serenity::builder::{CreateAllowedMentions, CreateAttachment, CreateEmbed, CreateMessage};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, MessageId};
use std::sync::Arc;

/// Reference to a message's parent (the message it replies to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Platform-decoupled read-only view of a chat message.
///
/// Chain reconstruction and classification operate on this type so they can
/// be exercised without a gateway connection.
#[derive(Debug, Clone)]
pub struct MessageView {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: serenity::model::id::UserId,
    pub author_is_bot: bool,
    pub content: String,
    pub attachment_urls: Vec<String>,
    /// Parent reference, when this message is a reply.
    pub parent: Option<MessageRef>,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        let parent = message.message_reference.as_ref().and_then(|reference| {
            reference.message_id.map(|message_id| MessageRef {
                channel_id: reference.channel_id,
                message_id,
            })
        });

        Self {
            id: message.id,
            channel_id: message.channel_id,
            author_id: message.author.id,
            author_is_bot: message.author.bot,
            content: message.content.clone(),
            attachment_urls: message
                .attachments
                .iter()
                .map(|attachment| attachment.url.clone())
                .collect(),
            parent,
        }
    }
}

/// Fetch seam for chain reconstruction and ownership classification.
pub trait MessageFetcher: Send + Sync {
    /// Fetch a single message by channel and id.
    fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> impl std::future::Future<Output = Result<MessageView>> + Send;

    /// Fetch the starter message of `thread`. Returns `Ok(None)` when the
    /// channel is not a thread.
    fn starter_message(
        &self,
        thread: ChannelId,
    ) -> impl std::future::Future<Output = Result<Option<MessageView>>> + Send;
}

/// `MessageFetcher` backed by the Discord HTTP API.
#[derive(Clone)]
pub struct DiscordFetcher {
    http: Arc<Http>,
}

impl DiscordFetcher {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

impl MessageFetcher for DiscordFetcher {
    async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> Result<MessageView> {
        let message = self.http.get_message(channel, message).await?;
        Ok(MessageView::from(&message))
    }

    async fn starter_message(&self, thread: ChannelId) -> Result<Option<MessageView>> {
        let channel = self.http.get_channel(thread).await?;
        let Some(guild_channel) = channel.guild() else {
            return Ok(None);
        };
        if guild_channel.thread_metadata.is_none() {
            return Ok(None);
        }
        let Some(parent) = guild_channel.parent_id else {
            return Ok(None);
        };

        // A thread spawned from a message shares its id with the starter
        // message, which lives in the parent channel.
        let starter = self
            .http
            .get_message(parent, MessageId::new(thread.get()))
            .await?;
        Ok(Some(MessageView::from(&starter)))
    }
}

/// Deliver an [`reply::OutboundReply`] to a channel.
pub async fn send_to_channel(
    http: &Http,
    channel: ChannelId,
    outbound: reply::OutboundReply,
) -> Result<()> {
    channel
        .send_message(http, message_builder(outbound))
        .await?;
    Ok(())
}

/// Deliver an [`reply::OutboundReply`] as a reply to `message`.
pub async fn send_as_reply(
    http: &Http,
    message: &Message,
    outbound: reply::OutboundReply,
) -> Result<()> {
    message
        .channel_id
        .send_message(http, message_builder(outbound).reference_message(message))
        .await?;
    Ok(())
}

fn message_builder(outbound: reply::OutboundReply) -> CreateMessage {
    let mut builder = CreateMessage::new()
        .content(outbound.content)
        .allowed_mentions(CreateAllowedMentions::new().users(outbound.allowed_mentions));

    for embed in outbound.embeds {
        builder = builder.add_embed(CreateEmbed::new().image(embed.url));
    }

    if let Some(attachment) = outbound.attachment {
        builder = builder.add_file(CreateAttachment::bytes(attachment.data, attachment.name));
    }

    builder
}
