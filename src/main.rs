use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use tokio::sync::mpsc;
use tracing::{info, warn};

mod app;
mod commands;
mod completion;
mod config;
mod events;
mod identity;
mod logging;
mod message;
mod node;
mod store;
mod ui;
mod viewport;
mod wire;

use app::{App, AppEvent, Effect};
use config::Config;
use node::NodeHandle;
use wire::Envelope;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    logging::init(config.debug);

    let (width, height) = terminal::size().context("reading terminal size")?;
    if (width as usize) < viewport::min_width() {
        bail!(
            "terminal is {width} columns wide, scat needs at least {}",
            viewport::min_width()
        );
    }

    let since = message::now_millis() - config.window_ms();
    let (node, records) = node::connect(&config.node, since)
        .await
        .with_context(|| format!("connecting to node at {}", config.node))?;
    info!(id = %node.id, "session started");

    let mut app = App::new(node.id.clone(), node.private_capable, config.app_options());
    app.resize(width, height);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, &node, records).await;

    // Close the node before leaving so no read stream outlives us.
    node.close().await;

    // Always restore the terminal, even on error.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn run<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    node: &NodeHandle,
    mut records: mpsc::Receiver<Envelope>,
) -> Result<()> {
    let mut reader = EventStream::new();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut records_open = true;

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        let effect = tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(event)) => events::handle_terminal_event(app, event),
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
            record = records.recv(), if records_open => {
                match record {
                    Some(record) => app.handle_record(&record, message::now_millis()),
                    None => {
                        warn!("node read stream ended");
                        records_open = false;
                        None
                    }
                }
            }
            Some(event) = events_rx.recv() => {
                app.handle_event(event);
                None
            }
            _ = tokio::signal::ctrl_c() => {
                app.should_quit = true;
                None
            }
        };

        if let Some(effect) = effect {
            spawn_effect(node.clone(), effect, events_tx.clone());
        }
        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Run a node request in the background; its outcome re-enters the event
/// loop through `events`.
fn spawn_effect(node: NodeHandle, effect: Effect, events: mpsc::UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let outcome = match effect {
            Effect::Publish(content) => node
                .publish(&content)
                .await
                .err()
                .map(|e| AppEvent::PublishFailed { reason: e.to_string() }),
            Effect::PublishPrivate { content, recipients } => node
                .publish_private(&content, &recipients)
                .await
                .err()
                .map(|e| AppEvent::PublishFailed { reason: e.to_string() }),
            Effect::Resolve(id) => Some(match node.display_name(&id).await {
                Ok(name) => AppEvent::NameResolved { id, name },
                Err(e) => AppEvent::ResolveFailed {
                    id,
                    reason: e.to_string(),
                },
            }),
        };
        if let Some(event) = outcome {
            let _ = events.send(event);
        }
    });
}
