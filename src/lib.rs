//! Rooivalk: a Discord assistant that reconstructs reply-chain context,
//! dispatches prompts to an LLM backend, and posts platform-valid replies.

pub mod config;
pub mod cron;
pub mod discord;
pub mod error;
pub mod llm;
pub mod responses;
pub mod weather;

pub use error::{Error, Result};
