use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use ratatui::style::Color;

use crate::message::is_feed_id;

const PALETTE: [Color; 5] = [Color::Green, Color::Cyan, Color::Magenta, Color::Blue, Color::Red];

/// Resolved display names and assigned colors, keyed by raw identifier.
/// Only ever grows.
#[derive(Debug, Default)]
pub struct IdentityMap {
    /// Identifiers in the order they were first seen.
    seen: Vec<String>,
    names: HashMap<String, String>,
    /// Resolved names in resolution order, for completion.
    name_order: Vec<String>,
    colors: HashMap<String, Color>,
    pending: HashSet<String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identifier and give it a color if it has none yet.
    pub fn observe(&mut self, id: &str) {
        if self.colors.contains_key(id) {
            return;
        }
        let color = *PALETTE
            .choose(&mut rand::thread_rng())
            .unwrap_or(&Color::White);
        self.colors.insert(id.to_string(), color);
        self.seen.push(id.to_string());
    }

    /// Store `name` for `id`. Returns `false` when nothing changed.
    ///
    /// The color stays keyed by `id`, so it carries over to the resolved
    /// name without being copied.
    pub fn resolve(&mut self, id: &str, name: &str) -> bool {
        self.pending.remove(id);
        if self.names.get(id).map(String::as_str) == Some(name) {
            return false;
        }
        if let Some(previous) = self.names.insert(id.to_string(), name.to_string()) {
            let still_used = self.names.values().any(|n| *n == previous);
            if !still_used {
                self.name_order.retain(|n| *n != previous);
            }
        }
        if !self.name_order.iter().any(|n| n == name) {
            self.name_order.push(name.to_string());
        }
        true
    }

    pub fn name(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Name if resolved, otherwise the identifier itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.name(id).unwrap_or(id)
    }

    pub fn color(&self, id: &str) -> Color {
        self.colors.get(id).copied().unwrap_or(Color::White)
    }

    /// Mark a resolution as in flight. Returns `false` if `id` is already
    /// resolved or a lookup for it has been issued before.
    pub fn begin_resolution(&mut self, id: &str) -> bool {
        if self.names.contains_key(id) {
            return false;
        }
        self.pending.insert(id.to_string())
    }

    /// Map a user-typed token to an identifier. Raw identifiers pass through,
    /// known names are translated, anything else is returned as typed.
    pub fn lookup_id(&self, name_or_id: &str) -> String {
        if is_feed_id(name_or_id) {
            return name_or_id.to_string();
        }
        self.seen
            .iter()
            .find(|id| self.name(id) == Some(name_or_id))
            .or_else(|| {
                self.names
                    .iter()
                    .find(|(_, name)| name.as_str() == name_or_id)
                    .map(|(id, _)| id)
            })
            .cloned()
            .unwrap_or_else(|| name_or_id.to_string())
    }

    pub fn ids(&self) -> &[String] {
        &self.seen
    }

    pub fn names(&self) -> &[String] {
        &self.name_order
    }
}
