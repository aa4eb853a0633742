use tracing::debug;

use crate::app::{App, Effect};
use crate::completion::{COMMAND_MARKER, COMMANDS};
use crate::message::{ChannelName, RecipientSet, Scope, is_feed_id};
use crate::wire::Content;

/// Most people a private message may be addressed to, besides ourselves.
pub const MAX_RECIPIENTS: usize = 7;

/// Handle one submitted line: run it as a command or publish it to the
/// active scope. Returns the request the node should carry out, if any.
pub fn execute(app: &mut App, raw: &str) -> Option<Effect> {
    let input = raw.trim();
    if input.is_empty() {
        return None;
    }

    if !input.starts_with(COMMAND_MARKER) {
        return Some(publish(app, input));
    }

    let (cmd, rest) = split_command(input);
    match cmd {
        "/public" => cmd_public(app),
        "/private" => cmd_private(app, rest),
        "/channel" => cmd_channel(app, rest),
        "/help" => cmd_help(app),
        "/quit" => app.should_quit = true,
        "/debug" => cmd_debug(app),
        _ => debug!(%cmd, "ignoring unknown command"),
    }
    None
}

fn cmd_public(app: &mut App) {
    app.store.switch_to_public();
}

fn cmd_private(app: &mut App, rest: &str) {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    if tokens.len() > MAX_RECIPIENTS {
        app.notice(format!(
            "Too many recipients: {} given, at most {MAX_RECIPIENTS} allowed.",
            tokens.len()
        ));
        return;
    }
    if tokens.is_empty() {
        app.notice("Usage: /private <name or @id> [<name or @id> ...]");
        return;
    }

    let ids: Vec<String> = tokens.iter().map(|t| app.store.lookup_id(t)).collect();
    let invalid: Vec<&str> = ids
        .iter()
        .filter(|id| !is_feed_id(id))
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        let msg = format!("Unknown recipients: {}", invalid.join(", "));
        app.notice(msg);
        return;
    }
    if !app.private_capable {
        app.notice("The connected node does not support private messages.");
        return;
    }

    let me = app.me.clone();
    let recipients = RecipientSet::new(ids.into_iter().chain(std::iter::once(me)));
    app.store.switch_to_private(recipients);
}

fn cmd_channel(app: &mut App, rest: &str) {
    let mut tokens = rest.split_whitespace();
    let name = tokens.next().unwrap_or("");
    if tokens.next().is_some() {
        app.notice("Usage: /channel [<name>] (channel names contain no spaces)");
        return;
    }
    match ChannelName::canonical(name) {
        Some(name) => app.store.switch_to_channel(name),
        None => cmd_public(app),
    }
}

fn cmd_help(app: &mut App) {
    let list: Vec<String> = COMMANDS
        .iter()
        .map(|(name, about)| format!("{name}: {about}"))
        .collect();
    app.notice(format!("Commands: {}. Tab completes names, @ids and #channels.", list.join("; ")));
}

fn cmd_debug(app: &App) {
    debug!(
        scope = ?app.store.active(),
        contexts = app.store.context_count(),
        ids = ?app.store.known_author_ids(),
        names = ?app.store.known_author_names(),
        channels = ?app.store.known_channels(),
        "session state"
    );
}

fn publish(app: &App, text: &str) -> Effect {
    match app.store.active() {
        Scope::Public => Effect::Publish(Content::public(text, None)),
        Scope::Channel(name) => Effect::Publish(Content::public(text, Some(name))),
        Scope::Private(recipients) => Effect::PublishPrivate {
            content: Content::private(text, recipients),
            recipients: recipients.ids().to_vec(),
        },
    }
}

fn split_command(input: &str) -> (&str, &str) {
    match input.find(char::is_whitespace) {
        Some(idx) => (&input[..idx], input[idx..].trim()),
        None => (input, ""),
    }
}
