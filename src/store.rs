use std::collections::HashMap;

use tracing::debug;

use crate::identity::IdentityMap;
use crate::message::{ChannelName, Message, RecipientSet, Scope};

pub const DEFAULT_HISTORY: usize = 500;

/// All conversation lists, partitioned by context, plus the identity map
/// used to display their authors.
#[derive(Debug)]
pub struct ConversationStore {
    contexts: HashMap<Scope, Vec<Message>>,
    channels: Vec<ChannelName>,
    active: Scope,
    identities: IdentityMap,
    history: usize,
}

impl ConversationStore {
    pub fn new(history: usize) -> Self {
        let mut contexts = HashMap::new();
        contexts.insert(Scope::Public, Vec::new());
        Self {
            contexts,
            channels: Vec::new(),
            active: Scope::Public,
            identities: IdentityMap::new(),
            history: history.max(1),
        }
    }

    /// File a message under its context (the active one for system notices)
    /// and keep that list ordered by send time.
    pub fn add_message(&mut self, msg: Message) {
        let key = if msg.is_system() {
            self.active.clone()
        } else {
            self.identities.observe(&msg.author);
            msg.scope.clone()
        };
        let history = self.history;
        let list = self.context_mut(key);
        list.push(msg);
        list.sort_by_key(|m| m.sent_at);
        if list.len() > history {
            let excess = list.len() - history;
            list.drain(..excess);
        }
    }

    pub fn switch_to_public(&mut self) {
        self.active = Scope::Public;
    }

    pub fn switch_to_channel(&mut self, name: ChannelName) {
        let key = Scope::Channel(name);
        self.context_mut(key.clone());
        self.active = key;
    }

    pub fn switch_to_private(&mut self, recipients: RecipientSet) {
        let key = Scope::Private(recipients);
        self.context_mut(key.clone());
        self.active = key;
    }

    /// Record a display name for `id`. Messages keep their raw author, so
    /// every list renders the new name from here on.
    pub fn resolve_identity(&mut self, id: &str, name: &str) -> bool {
        let changed = self.identities.resolve(id, name);
        if changed {
            debug!(%id, %name, "identity resolved");
        }
        changed
    }

    pub fn lookup_id(&self, name_or_id: &str) -> String {
        self.identities.lookup_id(name_or_id)
    }

    pub fn known_author_ids(&self) -> &[String] {
        self.identities.ids()
    }

    pub fn known_author_names(&self) -> &[String] {
        self.identities.names()
    }

    pub fn known_channels(&self) -> &[ChannelName] {
        &self.channels
    }

    pub fn active(&self) -> &Scope {
        &self.active
    }

    pub fn active_messages(&self) -> &[Message] {
        self.messages(&self.active)
    }

    pub fn messages(&self, scope: &Scope) -> &[Message] {
        self.contexts.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn identities(&self) -> &IdentityMap {
        &self.identities
    }

    pub fn identities_mut(&mut self) -> &mut IdentityMap {
        &mut self.identities
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    fn context_mut(&mut self, key: Scope) -> &mut Vec<Message> {
        if let Scope::Channel(name) = &key {
            if !self.channels.contains(name) {
                self.channels.push(name.clone());
            }
        }
        self.contexts.entry(key).or_default()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::test_id;

    fn channel(name: &str) -> Scope {
        Scope::Channel(ChannelName::canonical(name).unwrap())
    }

    #[test]
    fn lists_stay_sorted_after_every_insert() {
        let mut store = ConversationStore::default();
        for sent_at in [50, 10, 40, 10, 30, 60, 20] {
            store.add_message(Message::new(sent_at, test_id('a'), "hi", Scope::Public));
            let times: Vec<i64> = store.active_messages().iter().map(|m| m.sent_at).collect();
            let mut sorted = times.clone();
            sorted.sort();
            assert_eq!(times, sorted);
        }
        assert_eq!(store.active_messages().len(), 7);
    }

    #[test]
    fn messages_route_by_scope() {
        let mut store = ConversationStore::default();
        store.add_message(Message::new(1, test_id('a'), "pub", Scope::Public));
        store.add_message(Message::new(2, test_id('a'), "dev", channel("dev")));
        store.add_message(Message::new(
            3,
            test_id('a'),
            "dm",
            Scope::Private(RecipientSet::new([test_id('a'), test_id('b')])),
        ));

        assert_eq!(store.active_messages().len(), 1);
        assert_eq!(store.messages(&channel("#dev"))[0].text, "dev");
        store.switch_to_private(RecipientSet::new([test_id('b'), test_id('a'), test_id('b')]));
        assert_eq!(store.active_messages()[0].text, "dm");
        assert_eq!(store.known_channels(), [ChannelName::canonical("dev").unwrap()]);
    }

    #[test]
    fn system_notices_land_in_the_active_context() {
        let mut store = ConversationStore::default();
        store.switch_to_channel(ChannelName::canonical("ops").unwrap());
        store.add_message(Message::system(9, "Failed to post message."));
        assert_eq!(store.active_messages().len(), 1);
        assert!(store.messages(&Scope::Public).is_empty());
    }

    #[test]
    fn resolution_applies_across_all_contexts() {
        let mut store = ConversationStore::default();
        let (a, b) = (test_id('a'), test_id('b'));
        store.add_message(Message::new(1, &a, "one", Scope::Public));
        store.add_message(Message::new(2, &b, "two", Scope::Public));
        store.add_message(Message::new(3, &a, "three", channel("dev")));
        store.add_message(Message::new(4, &a, "four", Scope::Private(RecipientSet::new([&a, &b]))));

        assert!(store.resolve_identity(&a, "alice"));
        assert!(!store.resolve_identity(&a, "alice"));

        let ids = store.identities();
        let scopes = [
            Scope::Public,
            channel("dev"),
            Scope::Private(RecipientSet::new([&b, &a])),
        ];
        for scope in &scopes {
            for msg in store.messages(scope) {
                let shown = ids.display_name(&msg.author);
                if msg.author == a {
                    assert_eq!(shown, "alice");
                } else {
                    assert_eq!(shown, b);
                }
            }
        }
    }

    #[test]
    fn history_cap_evicts_oldest() {
        let mut store = ConversationStore::new(3);
        for sent_at in 1..=5 {
            store.add_message(Message::new(sent_at, test_id('a'), "x", Scope::Public));
        }
        let times: Vec<i64> = store.active_messages().iter().map(|m| m.sent_at).collect();
        assert_eq!(times, vec![3, 4, 5]);
    }

    #[test]
    fn contexts_persist_across_switches() {
        let mut store = ConversationStore::default();
        store.switch_to_channel(ChannelName::canonical("dev").unwrap());
        store.switch_to_public();
        store.switch_to_channel(ChannelName::canonical("#dev").unwrap());
        assert_eq!(store.context_count(), 2);
        assert_eq!(store.known_channels().len(), 1);
    }
}
