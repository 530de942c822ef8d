//! LLM backend: persona definitions and the client trait.

pub mod openai;

pub use openai::OpenAiClient;

use crate::error::Result;
use serenity::model::id::ChannelId;
use std::pin::Pin;

/// Instruction context sent with every completion request.
///
/// A closed enum with a total channel mapping, so adding a persona is a
/// compile-checked match arm rather than a string compared at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    /// Default conversational persona.
    Rooivalk,
    /// Tutoring persona used in the learn channel and the `/learn` command.
    Learn,
}

impl Persona {
    /// Select the persona for a message's channel. Pure function of channel
    /// identity; chain contents never influence the choice.
    pub fn for_channel(channel: ChannelId, learn_channel: Option<ChannelId>) -> Self {
        match learn_channel {
            Some(learn) if channel == learn => Persona::Learn,
            _ => Persona::Rooivalk,
        }
    }

    /// The system instructions for this persona.
    pub fn instructions(&self) -> &'static str {
        match self {
            Persona::Rooivalk => {
                "You are Rooivalk, a dry-witted assistant in a Discord server. \
                 Answer conversationally and keep replies short unless the \
                 question genuinely needs depth. Use Discord-flavoured markdown."
            }
            Persona::Learn => {
                "You are Rooivalk in tutoring mode. Explain the topic step by \
                 step for a motivated beginner, with one concrete example. \
                 Use Discord-flavoured markdown."
            }
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Persona::Rooivalk => write!(f, "rooivalk"),
            Persona::Learn => write!(f, "learn"),
        }
    }
}

/// Static trait for LLM backends.
/// Use this for type-safe implementations.
pub trait LlmClient: Send + Sync + 'static {
    /// Run a completion. `Ok(None)` means the backend answered with no
    /// usable text; the orchestrator turns that into a canned error reply.
    fn create_response(
        &self,
        persona: Persona,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
}

/// Dynamic trait for runtime polymorphism.
/// Use this when you need `Arc<dyn LlmClientDyn>` for storing a backend.
pub trait LlmClientDyn: Send + Sync + 'static {
    fn create_response<'a>(
        &'a self,
        persona: Persona,
        prompt: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<String>>> + Send + 'a>>;
}

/// Blanket implementation: any type implementing LlmClient automatically
/// implements LlmClientDyn.
impl<T: LlmClient> LlmClientDyn for T {
    fn create_response<'a>(
        &'a self,
        persona: Persona,
        prompt: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(LlmClient::create_response(self, persona, prompt))
    }
}
