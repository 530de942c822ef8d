//! Prompt rendering: turn a reconstructed chain into the linear transcript
//! sent to the language model.

use crate::discord::chain::{ChainAuthor, ChainEntry};
use regex::Regex;
use serenity::model::id::UserId;

/// Display label used for assistant-authored transcript lines.
pub const ASSISTANT_LABEL: &str = "Rooivalk";

/// The bot's self-mention matcher, computed once after gateway ready.
///
/// Discord renders mentions as `<@id>` or `<@!id>` in raw content; both
/// forms are stripped.
#[derive(Debug, Clone)]
pub struct MentionPattern {
    user_id: UserId,
    regex: Regex,
}

impl MentionPattern {
    pub fn new(user_id: UserId) -> Self {
        let regex = Regex::new(&format!(r"<@!?{}>", user_id.get()))
            .expect("mention pattern compiles for a numeric id");
        Self { user_id, regex }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Remove every occurrence of the mention token and trim the result.
    pub fn strip(&self, text: &str) -> String {
        self.regex.replace_all(text, "").trim().to_string()
    }
}

/// Render a chain as a newline-joined transcript, oldest first.
///
/// Returns `None` for an empty chain; the caller falls back to the raw
/// message content. The mention token is stripped only from the final line,
/// and only when a user authored it.
pub fn build_prompt(chain: &[ChainEntry], mention: &MentionPattern) -> Option<String> {
    if chain.is_empty() {
        return None;
    }

    let last = chain.len() - 1;
    let lines: Vec<String> = chain
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let label = match entry.author {
                ChainAuthor::User => "User",
                ChainAuthor::Assistant => ASSISTANT_LABEL,
            };
            let content = if index == last && entry.author == ChainAuthor::User {
                mention.strip(&entry.content)
            } else {
                entry.content.clone()
            };
            format!("{label}: {content}")
        })
        .collect();

    Some(lines.join("\n"))
}

/// Chain-derived prompt when a conversation exists, otherwise the raw
/// message content with the mention token stripped.
pub fn resolve_prompt(chain: &[ChainEntry], raw_content: &str, mention: &MentionPattern) -> String {
    build_prompt(chain, mention).unwrap_or_else(|| mention.strip(raw_content))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: UserId = UserId::new(1000);

    fn entry(author: ChainAuthor, content: &str) -> ChainEntry {
        ChainEntry {
            author,
            content: content.to_string(),
            attachment_urls: Vec::new(),
        }
    }

    #[test]
    fn empty_chain_yields_no_prompt() {
        let mention = MentionPattern::new(BOT);
        assert_eq!(build_prompt(&[], &mention), None);
    }

    #[test]
    fn transcript_is_oldest_first_with_labels() {
        let mention = MentionPattern::new(BOT);
        let chain = vec![
            entry(ChainAuthor::User, "what is a borrow checker?"),
            entry(ChainAuthor::Assistant, "it enforces ownership rules"),
            entry(ChainAuthor::User, "give me an example <@1000>"),
        ];

        let prompt = build_prompt(&chain, &mention).unwrap();
        let lines: Vec<&str> = prompt.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "User: what is a borrow checker?");
        assert_eq!(lines[1], "Rooivalk: it enforces ownership rules");
        assert_eq!(lines[2], "User: give me an example");
    }

    #[test]
    fn mention_is_stripped_only_from_the_final_user_line() {
        let mention = MentionPattern::new(BOT);
        let chain = vec![
            entry(ChainAuthor::User, "<@1000> earlier mention stays"),
            entry(ChainAuthor::User, "<@!1000> final mention goes"),
        ];

        let prompt = build_prompt(&chain, &mention).unwrap();
        let lines: Vec<&str> = prompt.lines().collect();

        assert_eq!(lines[0], "User: <@1000> earlier mention stays");
        assert_eq!(lines[1], "User: final mention goes");
    }

    #[test]
    fn assistant_final_line_is_left_untouched() {
        let mention = MentionPattern::new(BOT);
        let chain = vec![entry(ChainAuthor::Assistant, "contains <@1000> mention")];

        let prompt = build_prompt(&chain, &mention).unwrap();
        assert_eq!(prompt, "Rooivalk: contains <@1000> mention");
    }

    #[test]
    fn bare_mention_message_falls_back_to_stripped_content() {
        let mention = MentionPattern::new(BOT);
        // "hi <@BOT>" with no reply chain: prompt is the raw content minus
        // the mention token.
        assert_eq!(resolve_prompt(&[], "hi <@1000>", &mention), "hi");
    }

    #[test]
    fn strip_handles_both_mention_forms_and_trims() {
        let mention = MentionPattern::new(BOT);
        assert_eq!(mention.strip("hi <@1000>"), "hi");
        assert_eq!(mention.strip("<@!1000> hi"), "hi");
        assert_eq!(mention.strip("<@1000>"), "");
        // Other ids are untouched.
        assert_eq!(mention.strip("hi <@2000>"), "hi <@2000>");
    }
}
