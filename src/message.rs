use chrono::{Local, TimeZone};

/// Content type tag carried by every message this client reads or writes.
pub const MESSAGE_TYPE: &str = "scat_message";
/// Author shown on locally generated notices.
pub const SYSTEM_AUTHOR: &str = "scat";
pub const CHANNEL_SIGIL: char = '#';
pub const ID_SIGIL: char = '@';

/// Canonical channel name, always starting with `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName(String);

impl ChannelName {
    /// `"dev"` and `"#dev"` produce the same name. Returns `None` for a name
    /// that is empty once the marker is stripped.
    pub fn canonical(raw: &str) -> Option<Self> {
        let bare = raw.trim().trim_start_matches(CHANNEL_SIGIL);
        if bare.is_empty() {
            return None;
        }
        Some(Self(format!("{CHANNEL_SIGIL}{bare}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without the leading marker, as written into published content.
    pub fn bare(&self) -> &str {
        &self.0[CHANNEL_SIGIL.len_utf8()..]
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sorted, deduplicated participant identifiers of a private conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipientSet(Vec<String>);

impl RecipientSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }
}

/// Which conversation a message belongs to. Doubles as the key of the
/// store's context map and as the session's active scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Public,
    Channel(ChannelName),
    Private(RecipientSet),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Peer,
    System,
}

/// One chat message. `author` is always the raw identifier; display names
/// are looked up at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sent_at: i64,
    pub author: String,
    pub text: String,
    pub scope: Scope,
    pub origin: Origin,
}

impl Message {
    pub fn new(sent_at: i64, author: impl Into<String>, text: impl Into<String>, scope: Scope) -> Self {
        Self {
            sent_at,
            author: author.into(),
            text: text.into(),
            scope,
            origin: Origin::Peer,
        }
    }

    /// A local notice. Its scope is irrelevant: the store files it under the
    /// active context.
    pub fn system(sent_at: i64, text: impl Into<String>) -> Self {
        Self {
            sent_at,
            author: SYSTEM_AUTHOR.to_string(),
            text: text.into(),
            scope: Scope::Public,
            origin: Origin::System,
        }
    }

    pub fn is_system(&self) -> bool {
        self.origin == Origin::System
    }

    pub fn timestamp(&self) -> String {
        format_timestamp(self.sent_at)
    }
}

/// Width in columns of every string produced by [`format_timestamp`].
pub const TIMESTAMP_WIDTH: usize = 19;

pub fn format_timestamp(sent_at: i64) -> String {
    match Local.timestamp_millis_opt(sent_at).single() {
        Some(dt) => dt.format("%m/%d/%Y %H:%M:%S").to_string(),
        None => "??/??/???? ??:??:??".to_string(),
    }
}

/// Whether `s` has the shape of a feed identifier: `@` + 44 base64
/// characters ending in `=` + `.ed25519`.
pub fn is_feed_id(s: &str) -> bool {
    let Some(rest) = s.strip_prefix(ID_SIGIL) else {
        return false;
    };
    let Some(key) = rest.strip_suffix(".ed25519") else {
        return false;
    };
    key.len() == 44
        && key.ends_with('=')
        && key
            .bytes()
            .take(43)
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
pub(crate) fn test_id(seed: char) -> String {
    format!("@{}=.ed25519", seed.to_string().repeat(43))
}
