//! Outbound reply shaping: image extraction and length-limit handling.

use crate::responses::ResponseCatalogue;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serenity::model::id::UserId;
use std::sync::LazyLock;

/// Discord's hard per-message character limit.
pub const DISCORD_MAX_MESSAGE_LEN: usize = 2_000;

/// Filename used when an oversized body is demoted to an attachment.
pub const OVERFLOW_ATTACHMENT_NAME: &str = "response.md";

/// Markdown image markup whose URL ends in a known image extension,
/// optionally followed by a query string.
static IMAGE_MARKDOWN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)!\[[^\]]*\]\((https?://[^)\s]+?\.(?:png|jpe?g|gif|webp)(?:\?[^)\s]*)?)\)")
        .expect("image markup pattern compiles")
});

/// An image pulled out of the model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEmbed {
    pub url: String,
}

/// File attachment carrying an oversized reply body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttachment {
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// A platform-valid outbound message.
///
/// `attachment` is populated exactly when the candidate body exceeded
/// [`DISCORD_MAX_MESSAGE_LEN`]; in that case `content` holds a canned
/// limit-exceeded notice instead of the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundReply {
    pub content: String,
    pub embeds: Vec<ImageEmbed>,
    pub attachment: Option<FileAttachment>,
    pub allowed_mentions: Vec<UserId>,
}

impl OutboundReply {
    /// A bare text reply with no embeds, attachment, or mention targets.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embeds: Vec::new(),
            attachment: None,
            allowed_mentions: Vec::new(),
        }
    }
}

/// Serde helper for encoding `Vec<u8>` as base64 in JSON.
mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(&s)
            .map_err(serde::de::Error::custom)
    }
}

/// Shape model output into a platform-valid reply.
///
/// Embedded image markup becomes embeds and is removed from the text. A body
/// that still exceeds the message limit is attached as a file and replaced
/// by a canned notice. `allowed_mentions` passes through verbatim so the
/// platform only pings the intended recipients.
pub fn build_reply<R: Rng + ?Sized>(
    model_output: &str,
    allowed_mentions: Vec<UserId>,
    catalogue: &ResponseCatalogue,
    rng: &mut R,
) -> OutboundReply {
    let embeds: Vec<ImageEmbed> = IMAGE_MARKDOWN
        .captures_iter(model_output)
        .map(|capture| ImageEmbed {
            url: capture[1].to_string(),
        })
        .collect();

    let body = IMAGE_MARKDOWN
        .replace_all(model_output, "")
        .trim()
        .to_string();

    if body.chars().count() > DISCORD_MAX_MESSAGE_LEN {
        return OutboundReply {
            content: catalogue.limit_notice(rng).to_string(),
            embeds,
            attachment: Some(FileAttachment {
                name: OVERFLOW_ATTACHMENT_NAME.to_string(),
                data: body.into_bytes(),
            }),
            allowed_mentions,
        };
    }

    OutboundReply {
        content: body,
        embeds,
        attachment: None,
        allowed_mentions,
    }
}
