//! Reply-chain reconstruction and conversation-ownership classification.
//!
//! Both are best-effort context enrichment: any fetch failure degrades to
//! "no relationship found" or a shorter chain, logged and never surfaced.
//! A missing ancestor must never block a reply.

use crate::discord::{MessageFetcher, MessageView};
use serenity::model::id::UserId;

/// Upper bound on ancestors collected by a backward walk. Bounds both fetch
/// fan-out latency and the context size sent to the language model.
pub const MAX_CHAIN_DEPTH: usize = 10;

/// Who authored a chain entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainAuthor {
    User,
    Assistant,
}

/// One message in a reconstructed conversation, oldest first in the chain.
#[derive(Debug, Clone)]
pub struct ChainEntry {
    pub author: ChainAuthor,
    pub content: String,
    pub attachment_urls: Vec<String>,
}

fn classify(author_id: UserId, assistant_id: UserId) -> ChainAuthor {
    if author_id == assistant_id {
        ChainAuthor::Assistant
    } else {
        ChainAuthor::User
    }
}

fn entry_for(message: &MessageView, assistant_id: UserId) -> ChainEntry {
    ChainEntry {
        author: classify(message.author_id, assistant_id),
        content: message.content.clone(),
        attachment_urls: message.attachment_urls.clone(),
    }
}

/// Walk the reply chain backward from `current` and return the conversation
/// oldest-first, ending with `current` itself.
///
/// The walk stops at the first message without a parent reference, at the
/// first failed fetch (partial chain retained), or once [`MAX_CHAIN_DEPTH`]
/// ancestors have been collected.
pub async fn build_chain<F: MessageFetcher>(
    fetcher: &F,
    current: &MessageView,
    assistant_id: UserId,
) -> Vec<ChainEntry> {
    let mut ancestors = Vec::new();
    let mut next = current.parent.clone();

    while let Some(parent) = next {
        if ancestors.len() >= MAX_CHAIN_DEPTH {
            break;
        }

        match fetcher
            .fetch_message(parent.channel_id, parent.message_id)
            .await
        {
            Ok(message) => {
                next = message.parent.clone();
                ancestors.push(entry_for(&message, assistant_id));
            }
            Err(error) => {
                tracing::debug!(
                    %error,
                    message_id = %parent.message_id,
                    collected = ancestors.len(),
                    "chain walk ended early"
                );
                break;
            }
        }
    }

    ancestors.reverse();
    ancestors.push(entry_for(current, assistant_id));
    ancestors
}

/// True iff `message` is a direct reply to a message authored by the
/// assistant. Fetch failures yield `false`.
pub async fn is_reply_to_assistant<F: MessageFetcher>(
    fetcher: &F,
    message: &MessageView,
    assistant_id: UserId,
) -> bool {
    let Some(parent) = &message.parent else {
        return false;
    };

    match fetcher
        .fetch_message(parent.channel_id, parent.message_id)
        .await
    {
        Ok(parent) => parent.author_id == assistant_id,
        Err(error) => {
            tracing::debug!(%error, message_id = %parent.message_id, "parent fetch failed");
            false
        }
    }
}

/// True iff `message` sits in a thread whose starter message is itself a
/// reply to an assistant-authored message. Fetch failures anywhere along the
/// two-hop path yield `false`.
pub async fn is_assistant_thread<F: MessageFetcher>(
    fetcher: &F,
    message: &MessageView,
    assistant_id: UserId,
) -> bool {
    let starter = match fetcher.starter_message(message.channel_id).await {
        Ok(Some(starter)) => starter,
        Ok(None) => return false,
        Err(error) => {
            tracing::debug!(%error, channel_id = %message.channel_id, "starter fetch failed");
            return false;
        }
    };

    let Some(origin) = &starter.parent else {
        return false;
    };

    match fetcher
        .fetch_message(origin.channel_id, origin.message_id)
        .await
    {
        Ok(origin) => origin.author_id == assistant_id,
        Err(error) => {
            tracing::debug!(%error, message_id = %origin.message_id, "thread origin fetch failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::MessageRef;
    use serenity::model::id::{ChannelId, MessageId};
    use std::collections::{HashMap, HashSet};

    const ASSISTANT: UserId = UserId::new(1000);
    const ALICE: UserId = UserId::new(2000);
    const CHANNEL: ChannelId = ChannelId::new(1);

    /// In-memory fetcher: a message table plus sets of ids that fail.
    #[derive(Default)]
    struct MockFetcher {
        messages: HashMap<u64, MessageView>,
        failing: HashSet<u64>,
        starters: HashMap<u64, MessageView>,
        failing_starters: HashSet<u64>,
    }

    impl MockFetcher {
        fn insert(&mut self, message: MessageView) {
            self.messages.insert(message.id.get(), message);
        }
    }

    impl MessageFetcher for MockFetcher {
        async fn fetch_message(
            &self,
            _channel: ChannelId,
            message: MessageId,
        ) -> crate::error::Result<MessageView> {
            if self.failing.contains(&message.get()) {
                return Err(anyhow::anyhow!("message {message} unavailable").into());
            }
            self.messages
                .get(&message.get())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("message {message} not found").into())
        }

        async fn starter_message(
            &self,
            thread: ChannelId,
        ) -> crate::error::Result<Option<MessageView>> {
            if self.failing_starters.contains(&thread.get()) {
                return Err(anyhow::anyhow!("thread {thread} unavailable").into());
            }
            Ok(self.starters.get(&thread.get()).cloned())
        }
    }

    fn message(id: u64, author: UserId, content: &str, parent: Option<u64>) -> MessageView {
        MessageView {
            id: MessageId::new(id),
            channel_id: CHANNEL,
            author_id: author,
            author_is_bot: author == ASSISTANT,
            content: content.to_string(),
            attachment_urls: Vec::new(),
            parent: parent.map(|message_id| MessageRef {
                channel_id: CHANNEL,
                message_id: MessageId::new(message_id),
            }),
        }
    }

    #[test]
    fn chain_is_oldest_first_with_current_last() {
        let mut fetcher = MockFetcher::default();
        fetcher.insert(message(1, ALICE, "first question", None));
        fetcher.insert(message(2, ASSISTANT, "first answer", Some(1)));
        let current = message(3, ALICE, "follow-up", Some(2));

        let chain = tokio_test::block_on(build_chain(&fetcher, &current, ASSISTANT));

        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].author, ChainAuthor::User);
        assert_eq!(chain[0].content, "first question");
        assert_eq!(chain[1].author, ChainAuthor::Assistant);
        assert_eq!(chain[2].content, "follow-up");
    }

    #[test]
    fn reconstructed_chain_renders_a_three_line_transcript() {
        let mut fetcher = MockFetcher::default();
        fetcher.insert(message(1, ALICE, "what is rust?", None));
        fetcher.insert(message(2, ASSISTANT, "a systems language", Some(1)));
        let current = message(3, ALICE, "and the borrow checker?", Some(2));

        let chain = tokio_test::block_on(build_chain(&fetcher, &current, ASSISTANT));
        let mention = crate::discord::prompt::MentionPattern::new(ASSISTANT);
        let prompt = crate::discord::prompt::build_prompt(&chain, &mention).unwrap();

        assert_eq!(
            prompt,
            "User: what is rust?\nRooivalk: a systems language\nUser: and the borrow checker?"
        );
    }

    #[test]
    fn chain_without_parent_is_just_the_current_message() {
        let fetcher = MockFetcher::default();
        let current = message(3, ALICE, "hello", None);

        let chain = tokio_test::block_on(build_chain(&fetcher, &current, ASSISTANT));

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].content, "hello");
    }

    #[test]
    fn failed_fetch_truncates_instead_of_erroring() {
        let mut fetcher = MockFetcher::default();
        fetcher.insert(message(1, ALICE, "lost to history", None));
        fetcher.insert(message(2, ASSISTANT, "reachable answer", Some(1)));
        fetcher.failing.insert(1);
        let current = message(3, ALICE, "follow-up", Some(2));

        let chain = tokio_test::block_on(build_chain(&fetcher, &current, ASSISTANT));

        // One fetched ancestor plus the current message.
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].content, "reachable answer");
        assert_eq!(chain[1].content, "follow-up");
    }

    #[test]
    fn chain_depth_is_bounded() {
        let mut fetcher = MockFetcher::default();
        for id in 1..=30u64 {
            let parent = (id > 1).then(|| id - 1);
            fetcher.insert(message(id, ALICE, &format!("msg {id}"), parent));
        }
        let current = message(31, ALICE, "latest", Some(30));

        let chain = tokio_test::block_on(build_chain(&fetcher, &current, ASSISTANT));

        assert_eq!(chain.len(), MAX_CHAIN_DEPTH + 1);
        assert_eq!(chain.last().unwrap().content, "latest");
    }

    #[test]
    fn reply_to_assistant_is_detected() {
        let mut fetcher = MockFetcher::default();
        fetcher.insert(message(2, ASSISTANT, "an answer", None));
        let current = message(3, ALICE, "thanks", Some(2));

        assert!(tokio_test::block_on(is_reply_to_assistant(
            &fetcher, &current, ASSISTANT
        )));
    }

    #[test]
    fn reply_to_user_is_not_ours() {
        let mut fetcher = MockFetcher::default();
        fetcher.insert(message(2, ALICE, "someone else", None));
        let current = message(3, ALICE, "reply", Some(2));

        assert!(!tokio_test::block_on(is_reply_to_assistant(
            &fetcher, &current, ASSISTANT
        )));
    }

    #[test]
    fn classifier_swallows_fetch_errors() {
        let mut fetcher = MockFetcher::default();
        fetcher.failing.insert(2);
        let current = message(3, ALICE, "reply", Some(2));

        assert!(!tokio_test::block_on(is_reply_to_assistant(
            &fetcher, &current, ASSISTANT
        )));
    }

    #[test]
    fn thread_started_from_assistant_reply_grants_ownership() {
        let mut fetcher = MockFetcher::default();
        // Assistant answer (10) -> starter replying to it (11) -> thread 11.
        fetcher.insert(message(10, ASSISTANT, "the answer", None));
        fetcher
            .starters
            .insert(1, message(11, ALICE, "continuing in a thread", Some(10)));
        let current = message(12, ALICE, "more questions", None);

        assert!(tokio_test::block_on(is_assistant_thread(
            &fetcher, &current, ASSISTANT
        )));
    }

    #[test]
    fn non_thread_channel_is_not_an_assistant_thread() {
        let fetcher = MockFetcher::default();
        let current = message(12, ALICE, "plain channel message", None);

        assert!(!tokio_test::block_on(is_assistant_thread(
            &fetcher, &current, ASSISTANT
        )));
    }

    #[test]
    fn thread_classifier_swallows_starter_fetch_errors() {
        let mut fetcher = MockFetcher::default();
        fetcher.failing_starters.insert(1);
        let current = message(12, ALICE, "thread message", None);

        assert!(!tokio_test::block_on(is_assistant_thread(
            &fetcher, &current, ASSISTANT
        )));
    }
}
