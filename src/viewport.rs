//! Lays out the active conversation plus chrome into exactly one
//! terminal's worth of lines.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::identity::IdentityMap;
use crate::message::{Message, TIMESTAMP_WIDTH};

/// Longest author name shown before truncation.
pub const MAX_AUTHOR_WIDTH: usize = 16;
/// Body columns that must remain next to the widest prefix.
const MIN_BODY_WIDTH: usize = 5;
pub const INPUT_PROMPT: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn is_too_narrow(&self) -> bool {
        (self.width as usize) < min_width()
    }
}

/// `[timestamp] <author> ` at its widest, plus room for some body text.
pub fn min_width() -> usize {
    prefix_width(TIMESTAMP_WIDTH, MAX_AUTHOR_WIDTH) + MIN_BODY_WIDTH
}

fn prefix_width(timestamp: usize, author: usize) -> usize {
    // "[" ts "] <" author "> "
    1 + timestamp + 3 + author + 2
}

/// Lines surrounding the message pane.
#[derive(Debug, Default, Clone)]
pub struct Chrome {
    pub header: Vec<Line<'static>>,
    pub footer: Vec<Line<'static>>,
    pub input: String,
}

/// Build the full frame. The result always holds exactly `geometry.height`
/// lines, each at most `geometry.width` columns wide.
pub fn render_frame(
    geometry: Geometry,
    messages: &[Message],
    identities: &IdentityMap,
    chrome: &Chrome,
) -> Vec<Line<'static>> {
    let width = geometry.width as usize;
    let height = geometry.height as usize;

    if geometry.is_too_narrow() {
        return pad(vec![narrow_warning(width)], height);
    }

    let input = input_lines(&chrome.input, width);
    let chrome_rows = chrome.header.len() + chrome.footer.len() + input.len();
    let available = height.saturating_sub(chrome_rows);

    let mut pane: Vec<Line<'static>> = messages
        .iter()
        .flat_map(|msg| message_lines(msg, identities, width))
        .collect();
    if pane.len() > available {
        pane.drain(..pane.len() - available);
    }
    while pane.len() < available {
        pane.push(Line::default());
    }

    let mut frame = Vec::with_capacity(height.max(chrome_rows));
    frame.extend(chrome.header.iter().cloned());
    frame.extend(pane);
    frame.extend(chrome.footer.iter().cloned());
    frame.extend(input);
    if frame.len() > height {
        // Chrome alone overflows; keep the input line visible.
        frame.drain(..frame.len() - height);
    }
    frame
}

/// Wrapped rows the input line occupies at `width`.
pub fn input_lines(input: &str, width: usize) -> Vec<Line<'static>> {
    input_rows(input, width)
        .into_iter()
        .map(|row| Line::from(Span::styled(row, Style::default().fg(Color::White))))
        .collect()
}

/// Cursor cell just past the end of the input, on the frame's last row.
pub fn input_cursor(input: &str, geometry: Geometry) -> (u16, u16) {
    let width = geometry.width.max(1) as usize;
    let rows = input_rows(input, width);
    let last = rows.last().map(|r| r.width()).unwrap_or(0);
    (last.min(width - 1) as u16, geometry.height.saturating_sub(1))
}

/// Prompt plus input, hard-wrapped. A full last row gets an empty one
/// after it so the cursor has a cell to sit in.
fn input_rows(input: &str, width: usize) -> Vec<String> {
    let mut rows = hard_wrap(&format!("{INPUT_PROMPT}{input}"), width);
    if rows.last().is_some_and(|r| r.width() >= width.max(1)) {
        rows.push(String::new());
    }
    rows
}

fn message_lines(msg: &Message, identities: &IdentityMap, width: usize) -> Vec<Line<'static>> {
    let timestamp = msg.timestamp();
    let author = truncate(identities.display_name(&msg.author), MAX_AUTHOR_WIDTH);
    let indent = prefix_width(timestamp.width(), author.width());
    let body_width = width.saturating_sub(indent).max(1);

    let author_style = if msg.is_system() {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(identities.color(&msg.author))
            .add_modifier(Modifier::BOLD)
    };
    let body_style = if msg.is_system() {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };

    let mut body = word_wrap(&msg.text, body_width);
    if body.is_empty() {
        body.push(String::new());
    }

    body.into_iter()
        .enumerate()
        .map(|(i, row)| {
            if i == 0 {
                Line::from(vec![
                    Span::raw("["),
                    Span::styled(timestamp.clone(), Style::default().fg(Color::DarkGray)),
                    Span::raw("] <"),
                    Span::styled(author.clone(), author_style),
                    Span::raw("> "),
                    Span::styled(row, body_style),
                ])
            } else {
                Line::from(vec![
                    Span::raw(" ".repeat(indent)),
                    Span::styled(row, body_style),
                ])
            }
        })
        .collect()
}

fn narrow_warning(width: usize) -> Line<'static> {
    let text = format!("Terminal too narrow: need {} columns", min_width());
    Line::from(Span::styled(
        truncate(&text, width),
        Style::default().fg(Color::Black).bg(Color::Yellow),
    ))
}

fn pad(mut lines: Vec<Line<'static>>, height: usize) -> Vec<Line<'static>> {
    lines.truncate(height);
    while lines.len() < height {
        lines.push(Line::default());
    }
    lines
}

/// Truncate to `max` display columns, marking the cut with `…`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    if max > 0 {
        out.push('…');
    }
    out
}

/// Word-wrap `text` to `width` columns. Words wider than a full row are
/// cut; explicit newlines start a new row.
pub fn word_wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = word.width();
            if current_width > 0 && current_width + 1 + word_width <= width {
                current.push(' ');
                current.push_str(word);
                current_width += 1 + word_width;
                continue;
            }
            if current_width > 0 {
                rows.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if word_width <= width {
                current.push_str(word);
                current_width = word_width;
            } else {
                let mut pieces = hard_wrap(word, width);
                if let Some(last) = pieces.pop() {
                    rows.extend(pieces);
                    current_width = last.width();
                    current = last;
                }
            }
        }

        if current_width > 0 || paragraph.trim().is_empty() {
            rows.push(current);
        }
    }

    if text.trim().is_empty() {
        rows.clear();
    }
    rows
}

/// Cut `text` into rows of at most `width` columns regardless of words.
pub fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width && used > 0 {
            rows.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(ch);
        used += w;
    }
    if !current.is_empty() || rows.is_empty() {
        rows.push(current);
    }
    rows
}
