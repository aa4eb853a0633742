//! Record shapes exchanged with the node, and the decoding of inbound
//! records into [`Message`]s.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::message::{ChannelName, MESSAGE_TYPE, Message, RecipientSet, Scope};

/// One record of the node's read stream.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub value: Option<EnvelopeValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeValue {
    pub author: String,
    pub timestamp: f64,
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub private: bool,
}

/// Message content as published by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recps: Option<Vec<RecipientRef>>,
}

/// A recipient as it appears in `recps`; peers may write either a bare id
/// or a `{ "link": id }` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipientRef {
    Link { link: String },
    Bare(String),
}

impl RecipientRef {
    pub fn id(&self) -> &str {
        match self {
            RecipientRef::Link { link } => link,
            RecipientRef::Bare(id) => id,
        }
    }
}

impl Content {
    pub fn public(text: impl Into<String>, channel: Option<&ChannelName>) -> Self {
        Self {
            kind: MESSAGE_TYPE.to_string(),
            text: text.into(),
            channel: channel.map(|c| c.bare().to_string()),
            recps: None,
        }
    }

    pub fn private(text: impl Into<String>, recipients: &RecipientSet) -> Self {
        Self {
            kind: MESSAGE_TYPE.to_string(),
            text: text.into(),
            channel: None,
            recps: Some(
                recipients
                    .ids()
                    .iter()
                    .map(|id| RecipientRef::Link { link: id.clone() })
                    .collect(),
            ),
        }
    }
}

/// Turn a raw record into a message, or `None` if it is not ours, is
/// malformed, or predates `now - window_ms`.
pub fn decode(record: &Envelope, now: i64, window_ms: i64) -> Option<Message> {
    let value = record.value.as_ref()?;
    let raw = value.content.as_ref()?;
    let content: Content = match serde_json::from_value(raw.clone()) {
        Ok(content) => content,
        Err(_) => return None,
    };
    if content.kind != MESSAGE_TYPE {
        return None;
    }

    let sent_at = value.timestamp as i64;
    if sent_at < now.saturating_sub(window_ms) {
        return None;
    }

    let recipients = content
        .recps
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(|r| RecipientSet::new(r.iter().map(RecipientRef::id)));

    let scope = match (recipients, content.channel.as_deref()) {
        (Some(set), _) => Scope::Private(set),
        (None, _) if value.private => {
            warn!(author = %value.author, "private record without recipients dropped");
            return None;
        }
        (None, Some(channel)) => match ChannelName::canonical(channel) {
            Some(name) => Scope::Channel(name),
            None => Scope::Public,
        },
        (None, None) => Scope::Public,
    };

    Some(Message::new(sent_at, value.author.clone(), content.text, scope))
}
