use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, Effect};

/// Handle one terminal event. Quitting is signalled through
/// `app.should_quit`.
pub fn handle_terminal_event(app: &mut App, event: Event) -> Option<Effect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        Event::Resize(width, height) => {
            app.resize(width, height);
            None
        }
        Event::Paste(text) => {
            app.completion = None;
            app.prompt_input.push_str(&text.replace(['\r', '\n'], " "));
            None
        }
        _ => None,
    }
}

/// Handle one key event.
pub fn handle_key(app: &mut App, key: KeyEvent) -> Option<Effect> {
    // Ctrl+C → quit.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return None;
    }

    // Any key but Tab ends the current completion cycle.
    if key.code != KeyCode::Tab {
        app.completion = None;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        KeyCode::Enter => return app.submit(),

        KeyCode::Tab => app.complete(),

        KeyCode::Backspace => {
            app.prompt_input.pop();
            app.prompt_history_idx = None;
        }

        KeyCode::Up => scroll_history_up(app),

        KeyCode::Down => scroll_history_down(app),

        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.prompt_input.push(c);
            app.prompt_history_idx = None;
        }

        _ => {}
    }

    None
}

fn scroll_history_up(app: &mut App) {
    if app.prompt_history.is_empty() {
        return;
    }
    let new_idx = match app.prompt_history_idx {
        None => app.prompt_history.len() - 1,
        Some(i) => i.saturating_sub(1),
    };
    app.prompt_history_idx = Some(new_idx);
    app.prompt_input = app.prompt_history[new_idx].clone();
}

fn scroll_history_down(app: &mut App) {
    let Some(i) = app.prompt_history_idx else {
        return;
    };
    if i + 1 < app.prompt_history.len() {
        app.prompt_history_idx = Some(i + 1);
        app.prompt_input = app.prompt_history[i + 1].clone();
    } else {
        app.prompt_history_idx = None;
        app.prompt_input.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{AppEvent, AppOptions};
    use crate::message::{MESSAGE_TYPE, Scope, test_id};
    use crate::wire::{Content, Envelope};
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, key(KeyCode::Char(c)));
        }
    }

    fn app_with(names: &[(char, &str)]) -> App {
        let mut app = App::new(test_id('m'), true, AppOptions::default());
        for (seed, name) in names {
            let id = test_id(*seed);
            let record: Envelope = serde_json::from_value(json!({
                "value": {
                    "author": id,
                    "timestamp": 1_700_000_000_000i64,
                    "content": { "type": MESSAGE_TYPE, "text": "hi" },
                }
            }))
            .unwrap();
            app.handle_record(&record, 1_700_000_000_000);
            app.handle_event(AppEvent::NameResolved { id, name: Some(name.to_string()) });
        }
        app
    }

    #[test]
    fn typing_then_enter_publishes() {
        let mut app = app_with(&[]);
        type_text(&mut app, "hello");
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter)),
            Some(Effect::Publish(Content::public("hello", None)))
        );
        assert!(app.prompt_input.is_empty());
    }

    #[test]
    fn other_keys_reset_completion() {
        let mut app = app_with(&[('a', "alice"), ('b', "alan"), ('c', "bea")]);
        type_text(&mut app, "al");
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.prompt_input, "alice");
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.prompt_input, "alan");

        type_text(&mut app, " b");
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.prompt_input, "alan bea");
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.prompt_input, "alan bea");
    }

    #[test]
    fn tab_completes_private_command_then_name() {
        let mut app = app_with(&[('b', "bob")]);
        type_text(&mut app, "/pri");
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.prompt_input, "/private");
        type_text(&mut app, " b");
        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.prompt_input, "/private bob");
        assert_eq!(handle_key(&mut app, key(KeyCode::Enter)), None);
        assert!(matches!(app.store.active(), Scope::Private(_)));
    }

    #[test]
    fn history_walks_back_and_forth() {
        let mut app = app_with(&[]);
        for line in ["/channel dev", "/public"] {
            type_text(&mut app, line);
            handle_key(&mut app, key(KeyCode::Enter));
        }
        assert_eq!(app.store.active(), &Scope::Public);

        handle_key(&mut app, key(KeyCode::Up));
        assert_eq!(app.prompt_input, "/public");
        handle_key(&mut app, key(KeyCode::Up));
        assert_eq!(app.prompt_input, "/channel dev");
        handle_key(&mut app, key(KeyCode::Down));
        assert_eq!(app.prompt_input, "/public");
        handle_key(&mut app, key(KeyCode::Down));
        assert!(app.prompt_input.is_empty());
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        let mut app = app_with(&[]);
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.should_quit);

        let mut app = app_with(&[]);
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert!(app.prompt_input.is_empty());
    }

    #[test]
    fn control_chords_do_not_type() {
        let mut app = app_with(&[]);
        type_text(&mut app, "hi");
        for c in ['u', 'w'] {
            handle_key(&mut app, KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
        }
        assert_eq!(app.prompt_input, "hi");
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT));
        assert_eq!(app.prompt_input, "hiA");
    }

    #[test]
    fn resize_updates_geometry() {
        let mut app = app_with(&[]);
        handle_terminal_event(&mut app, Event::Resize(30, 12));
        assert!(app.geometry.is_too_narrow());
        assert_eq!(app.frame().len(), 12);
    }
}
