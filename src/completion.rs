use crate::message::{CHANNEL_SIGIL, ID_SIGIL};
use crate::store::ConversationStore;

pub const COMMAND_MARKER: char = '/';

pub(crate) const COMMANDS: &[(&str, &str)] = &[
    ("/channel", "switch to a channel, or back to public with no name"),
    ("/help", "show commands"),
    ("/private", "talk privately with up to 7 people"),
    ("/public", "switch back to the public feed"),
    ("/quit", "exit"),
];

/// What the last token of an input line is asking to be completed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Command,
    AuthorId,
    Channel,
    AuthorName,
}

/// Split `line` into the untouched head and the trailing token, and decide
/// what kind of token it is.
pub fn classify(line: &str) -> (&str, &str, TokenKind) {
    let start = line
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let (head, token) = line.split_at(start);

    let kind = if head.trim().is_empty() && token.starts_with(COMMAND_MARKER) {
        TokenKind::Command
    } else if token.starts_with(ID_SIGIL) {
        TokenKind::AuthorId
    } else if token.starts_with(CHANNEL_SIGIL) {
        TokenKind::Channel
    } else {
        TokenKind::AuthorName
    };
    (head, token, kind)
}

/// Cycles through the completions of one input line. Built on the first
/// tab press and discarded by any other key.
#[derive(Debug, Clone)]
pub struct Completion {
    original: String,
    head: String,
    candidates: Vec<String>,
    position: usize,
}

impl Completion {
    pub fn new(line: &str, store: &ConversationStore) -> Self {
        let (head, token, kind) = classify(line);
        let pool: Vec<String> = match kind {
            TokenKind::Command => COMMANDS.iter().map(|(name, _)| name.to_string()).collect(),
            TokenKind::AuthorId => store.known_author_ids().to_vec(),
            TokenKind::Channel => store
                .known_channels()
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            TokenKind::AuthorName => store.known_author_names().to_vec(),
        };
        Self::from_candidates(line, head, token, pool)
    }

    fn from_candidates(line: &str, head: &str, token: &str, pool: Vec<String>) -> Self {
        let candidates = pool.into_iter().filter(|c| c.starts_with(token)).collect();
        Self {
            original: line.to_string(),
            head: head.to_string(),
            candidates,
            position: 0,
        }
    }

    /// The line with the next candidate substituted for the last token.
    /// Without candidates the original line comes back unchanged.
    pub fn next_line(&mut self) -> String {
        if self.candidates.is_empty() {
            return self.original.clone();
        }
        let pick = &self.candidates[self.position % self.candidates.len()];
        self.position = (self.position + 1) % self.candidates.len();
        format!("{}{}", self.head, pick)
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChannelName, Message, Scope, test_id};

    fn store_with_people() -> ConversationStore {
        let mut store = ConversationStore::default();
        let (a, b, c) = (test_id('a'), test_id('b'), test_id('c'));
        for (i, id) in [&a, &b, &c].into_iter().enumerate() {
            store.add_message(Message::new(i as i64, id, "hi", Scope::Public));
        }
        store.resolve_identity(&a, "alice");
        store.resolve_identity(&b, "alan");
        store.resolve_identity(&c, "carol");
        store.switch_to_channel(ChannelName::canonical("dev").unwrap());
        store.switch_to_channel(ChannelName::canonical("design").unwrap());
        store.switch_to_public();
        store
    }

    #[test]
    fn classification_priority() {
        assert_eq!(classify("/pri").2, TokenKind::Command);
        assert_eq!(classify("hello /pri").2, TokenKind::AuthorName);
        assert_eq!(classify("/private @ab").2, TokenKind::AuthorId);
        assert_eq!(classify("see #de").2, TokenKind::Channel);
        assert_eq!(classify("hey al"), ("hey ", "al", TokenKind::AuthorName));
    }

    #[test]
    fn names_cycle_indefinitely() {
        let store = store_with_people();
        let mut completion = Completion::new("al", &store);
        let produced: Vec<String> = (0..5).map(|_| completion.next_line()).collect();
        assert_eq!(produced, ["alice", "alan", "alice", "alan", "alice"]);
    }

    #[test]
    fn commands_complete_by_prefix() {
        let store = ConversationStore::default();
        let mut completion = Completion::new("/p", &store);
        assert_eq!(completion.candidates(), ["/private", "/public"]);
        assert_eq!(completion.next_line(), "/private");
        assert_eq!(completion.next_line(), "/public");
        assert_eq!(completion.next_line(), "/private");
    }

    #[test]
    fn channels_and_ids_keep_the_head() {
        let store = store_with_people();
        let mut channels = Completion::new("join #d", &store);
        assert_eq!(channels.next_line(), "join #dev");
        assert_eq!(channels.next_line(), "join #design");

        let mut ids = Completion::new("/private @b", &store);
        assert_eq!(ids.next_line(), format!("/private {}", test_id('b')));
    }

    #[test]
    fn no_match_returns_the_line_unchanged() {
        let store = store_with_people();
        let mut completion = Completion::new("hello zed", &store);
        assert_eq!(completion.next_line(), "hello zed");
        assert_eq!(completion.next_line(), "hello zed");
    }

    #[test]
    fn trailing_space_completes_everything() {
        let store = store_with_people();
        let completion = Completion::new("hi ", &store);
        assert_eq!(completion.candidates(), ["alice", "alan", "carol"]);
    }
}
