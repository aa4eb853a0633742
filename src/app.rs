use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use tracing::{debug, error, warn};

use crate::commands;
use crate::completion::Completion;
use crate::message::{Message, Scope, now_millis};
use crate::store::{ConversationStore, DEFAULT_HISTORY};
use crate::viewport::{self, Chrome, Geometry};
use crate::wire::{self, Content, Envelope};

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// A request for the node, executed off the event loop. Its outcome comes
/// back as an [`AppEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Publish(Content),
    PublishPrivate {
        content: Content,
        recipients: Vec<String>,
    },
    Resolve(String),
}

/// Completions of earlier [`Effect`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    NameResolved { id: String, name: Option<String> },
    ResolveFailed { id: String, reason: String },
    PublishFailed { reason: String },
}

#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    pub history: usize,
    pub window_ms: i64,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            history: DEFAULT_HISTORY,
            window_ms: 7 * DAY_MS,
        }
    }
}

pub struct App {
    pub store: ConversationStore,
    /// Our own feed identifier.
    pub me: String,
    /// Whether the node offers private publishing.
    pub private_capable: bool,
    pub window_ms: i64,

    pub prompt_input: String,
    pub prompt_history: Vec<String>,
    /// Index into prompt_history while scrolling; None = live input.
    pub prompt_history_idx: Option<usize>,
    /// Live tab-completion cycle, dropped by any non-tab key.
    pub completion: Option<Completion>,

    pub geometry: Geometry,
    pub should_quit: bool,
}

impl App {
    pub fn new(me: String, private_capable: bool, options: AppOptions) -> Self {
        Self {
            store: ConversationStore::new(options.history),
            me,
            private_capable,
            window_ms: options.window_ms,
            prompt_input: String::new(),
            prompt_history: Vec::new(),
            prompt_history_idx: None,
            completion: None,
            geometry: Geometry::new(80, 24),
            should_quit: false,
        }
    }

    /// Append a local notice to whatever context is on screen.
    pub fn notice(&mut self, text: impl Into<String>) {
        self.store.add_message(Message::system(now_millis(), text));
    }

    /// Take one record off the node's read stream. Unknown authors trigger
    /// a name lookup unless one is already in flight.
    pub fn handle_record(&mut self, record: &Envelope, now: i64) -> Option<Effect> {
        let Some(msg) = wire::decode(record, now, self.window_ms) else {
            debug!("skipping record");
            return None;
        };
        let author = msg.author.clone();
        self.store.add_message(msg);
        self.store
            .identities_mut()
            .begin_resolution(&author)
            .then_some(Effect::Resolve(author))
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::NameResolved { id, name: Some(name) } => {
                self.store.resolve_identity(&id, &name);
            }
            AppEvent::NameResolved { id, name: None } => {
                // Nothing published; keep showing the raw id.
                debug!(%id, "no name published");
            }
            AppEvent::ResolveFailed { id, reason } => {
                // Not retried: the raw id stays on screen.
                warn!(%id, %reason, "name lookup failed");
            }
            AppEvent::PublishFailed { reason } => {
                error!(%reason, "publish failed");
                self.notice("Failed to post message.");
            }
        }
    }

    /// Submit the prompt: record it in history, then run or publish it.
    pub fn submit(&mut self) -> Option<Effect> {
        self.completion = None;
        let input = self.prompt_input.trim().to_string();
        self.prompt_input.clear();
        self.prompt_history_idx = None;
        if input.is_empty() {
            return None;
        }
        if self.prompt_history.last() != Some(&input) {
            self.prompt_history.push(input.clone());
        }
        commands::execute(self, &input)
    }

    pub fn complete(&mut self) {
        let completion = self
            .completion
            .get_or_insert_with(|| Completion::new(&self.prompt_input, &self.store));
        self.prompt_input = completion.next_line();
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.geometry = Geometry::new(width, height);
    }

    pub fn frame(&self) -> Vec<Line<'static>> {
        let chrome = Chrome {
            header: vec![self.header()],
            footer: vec![self.footer()],
            input: self.prompt_input.clone(),
        };
        viewport::render_frame(
            self.geometry,
            self.store.active_messages(),
            self.store.identities(),
            &chrome,
        )
    }

    pub fn scope_label(&self) -> String {
        let ids = self.store.identities();
        match self.store.active() {
            Scope::Public => "public".to_string(),
            Scope::Channel(name) => name.to_string(),
            Scope::Private(recipients) => {
                let others: Vec<&str> = recipients
                    .ids()
                    .iter()
                    .filter(|id| **id != self.me)
                    .map(|id| ids.display_name(id))
                    .collect();
                format!("private: {}", others.join(", "))
            }
        }
    }

    fn header(&self) -> Line<'static> {
        let width = self.geometry.width as usize;
        let me = self.store.identities().display_name(&self.me).to_string();
        let text = format!(" scat  │  {}  │  {}", self.scope_label(), me);
        Line::from(Span::styled(
            viewport::truncate(&text, width),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
    }

    fn footer(&self) -> Line<'static> {
        let width = self.geometry.width as usize;
        let count = self.store.active_messages().len();
        let text = match &self.completion {
            Some(c) if !c.candidates().is_empty() => format!(
                " {count} messages  │  {} matches, Tab for next",
                c.candidates().len()
            ),
            _ => format!(" {count} messages  │  Enter=send  Tab=complete  ↑↓=history  Esc=quit"),
        };
        Line::from(Span::styled(
            viewport::truncate(&text, width),
            Style::default().fg(Color::DarkGray),
        ))
    }
}
