//! Ordered ticker history with a pinned tail.
//!
//! `history` is storage order: oldest first, newest appended at the end. The
//! UI displays it reversed, so the end of the vector is the top of the list.
//! `pinned` symbols always sit in one contiguous block at the end of storage
//! order (the front of the display), after every unpinned symbol; each
//! mutating operation restores that layout before returning.
//!
//! The history is capped at [`HISTORY_CAP`] entries. Overflow evicts index 0
//! (the oldest entry) unconditionally, pinned or not; that is the original
//! policy and is preserved here.

use serde_json::{json, Map, Value};

use crate::config::ConfigStore;

/// Maximum number of symbols kept in the history.
pub const HISTORY_CAP: usize = 100;

/// Storage-order direction for [`Watchlist::move_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Toward index 0 (down the display).
    Older,
    /// Toward the end of storage (up the display).
    Newer,
}

/// Display-order direction for [`Watchlist::navigate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watchlist {
    history: Vec<String>,
    pinned: Vec<String>,
}

impl Watchlist {
    pub fn new(history: Vec<String>, pinned: Vec<String>) -> Self {
        Self { history, pinned }
    }

    /// Build from the persisted config document.
    pub fn from_config(document: &Map<String, Value>) -> Self {
        Self {
            history: ConfigStore::string_list(document, "history"),
            pinned: ConfigStore::string_list(document, "pinned"),
        }
    }

    /// The `history`/`pinned` snapshot to merge-write back to disk.
    pub fn to_partial(&self) -> Map<String, Value> {
        let mut partial = Map::new();
        partial.insert("history".to_string(), json!(self.history));
        partial.insert("pinned".to_string(), json!(self.pinned));
        partial
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn is_pinned(&self, symbol: &str) -> bool {
        self.pinned.iter().any(|s| s == symbol)
    }

    /// Display (reversed) index of a symbol.
    pub fn display_position(&self, symbol: &str) -> Option<usize> {
        self.history.iter().rev().position(|s| s == symbol)
    }

    /// Symbol at a display (reversed) index.
    pub fn at_display_index(&self, index: usize) -> Option<&str> {
        let n = self.history.len();
        if index < n {
            Some(self.history[n - 1 - index].as_str())
        } else {
            None
        }
    }

    /// Storage index of the first pinned entry, or `len` when none is pinned.
    fn first_pinned_index(&self) -> usize {
        self.history
            .iter()
            .position(|s| self.is_pinned(s))
            .unwrap_or(self.history.len())
    }

    fn remove_from_history(&mut self, symbol: &str) -> bool {
        match self.history.iter().position(|s| s == symbol) {
            Some(index) => {
                self.history.remove(index);
                true
            }
            None => false,
        }
    }

    /// Record a submitted symbol. Pinned symbols keep their position; any
    /// other symbol moves (or is inserted) to the newest unpinned slot, just
    /// below the pinned block. Overflow evicts the oldest entry regardless of
    /// its pin status.
    pub fn submit(&mut self, symbol: &str) {
        if !self.is_pinned(symbol) {
            self.remove_from_history(symbol);
            let index = self.first_pinned_index();
            self.history.insert(index, symbol.to_string());
        }
        if self.history.len() > HISTORY_CAP {
            self.history.remove(0);
        }
    }

    /// Pin an unpinned symbol or unpin a pinned one.
    ///
    /// Pinning moves the symbol to the front of the pinned block (top of the
    /// display among pins); unpinning drops it back to the newest unpinned
    /// slot. Unknown symbols are ignored.
    pub fn toggle_pin(&mut self, symbol: &str) {
        if !self.history.iter().any(|s| s == symbol) {
            return;
        }

        if let Some(index) = self.pinned.iter().position(|s| s == symbol) {
            self.pinned.remove(index);
        } else {
            self.pinned.push(symbol.to_string());
        }

        // Either way the symbol re-enters just before the first remaining
        // pinned entry, which is the boundary between both blocks.
        self.remove_from_history(symbol);
        let index = self.first_pinned_index();
        self.history.insert(index, symbol.to_string());
    }

    /// Swap a symbol with its adjacent storage-order neighbor. Returns true
    /// when a swap happened.
    pub fn move_entry(&mut self, symbol: &str, direction: MoveDirection) -> bool {
        let Some(index) = self.history.iter().position(|s| s == symbol) else {
            return false;
        };
        match direction {
            MoveDirection::Newer if index + 1 < self.history.len() => {
                self.history.swap(index, index + 1);
                true
            }
            MoveDirection::Older if index >= 1 => {
                self.history.swap(index, index - 1);
                true
            }
            _ => false,
        }
    }

    /// Move a symbol so it lands at `target` in the display (reversed)
    /// ordering. No-op when the target is out of range or already current.
    /// Returns true when the list changed.
    pub fn jump_to_display_index(&mut self, symbol: &str, target: usize) -> bool {
        let Some(index) = self.history.iter().position(|s| s == symbol) else {
            return false;
        };
        let current_display = self.history.len() - 1 - index;
        if target >= self.history.len() || target == current_display {
            return false;
        }

        let symbol = self.history.remove(index);
        let insert_at = self.history.len() - target;
        self.history.insert(insert_at, symbol);
        true
    }

    /// Remove a symbol from the history and from the pinned set. Scrubbing
    /// the pin here keeps a deleted symbol from resurfacing as pinned when it
    /// is submitted again later.
    pub fn delete(&mut self, symbol: &str) -> bool {
        let removed = self.remove_from_history(symbol);
        if removed {
            self.pinned.retain(|s| s != symbol);
        }
        removed
    }

    /// Step through the display-order history as a circular buffer. A
    /// `current` symbol that is not in the history counts as one slot before
    /// the first display entry.
    pub fn navigate(&self, current: &str, direction: NavDirection) -> Option<&str> {
        let n = self.history.len() as i64;
        if n == 0 {
            return None;
        }

        let current_display = self
            .history
            .iter()
            .rev()
            .position(|s| s == current)
            .map(|i| i as i64)
            .unwrap_or(-1);

        let next_display = match direction {
            NavDirection::Up => (current_display - 1).rem_euclid(n),
            NavDirection::Down => (current_display + 1).rem_euclid(n),
        };

        self.at_display_index(next_display as usize)
    }
}
