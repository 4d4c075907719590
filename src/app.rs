//! Application state and the mutations the event loop applies to it.
//!
//! Fetches and image rendering happen on the worker thread; the state here
//! only records what is in flight. Every request carries a sequence number
//! and results arriving with a stale number are dropped, so a fast typist
//! never sees an older symbol's chart replace a newer one.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::ConfigStore;
use crate::models::{Fundamentals, OhlcSeries};
use crate::ui::graphics::ImageDescriptor;
use crate::watchlist::{MoveDirection, NavDirection, Watchlist};

const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Watchlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarTab {
    Watchlist,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartMode {
    Block,
    Image,
    Debug,
}

impl ChartMode {
    pub fn label(&self) -> &'static str {
        match self {
            ChartMode::Block => "text",
            ChartMode::Image => "image",
            ChartMode::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    expires_at: Instant,
}

/// Mutable state of the dashboard.
pub struct App {
    pub running: bool,
    pub config: ConfigStore,
    pub watchlist: Watchlist,
    /// Selected row in the watchlist display order.
    pub selected: usize,
    pub focus: Focus,
    pub sidebar_tab: SidebarTab,
    pub chart_mode: ChartMode,
    pub input_buffer: String,
    pub series: Option<OhlcSeries>,
    pub fundamentals: Option<Fundamentals>,
    pub notification: Option<Notification>,
    /// Escape sequence waiting to be written over the chart pane.
    pub pending_image: Option<ImageDescriptor>,
    /// Set once the pending image has been written, so it is not re-sent
    /// on every tick.
    pub image_emitted: bool,
    fetch_seq: u64,
    render_seq: u64,
}

impl App {
    pub fn new(config: ConfigStore) -> Self {
        let document = config.load();
        let watchlist = Watchlist::from_config(&document);
        info!(entries = watchlist.len(), "loaded watchlist");
        Self {
            running: true,
            config,
            watchlist,
            selected: 0,
            focus: Focus::Input,
            sidebar_tab: SidebarTab::Watchlist,
            chart_mode: ChartMode::Block,
            input_buffer: String::new(),
            series: None,
            fundamentals: None,
            notification: None,
            pending_image: None,
            image_emitted: false,
            fetch_seq: 0,
            render_seq: 0,
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Expire the notification once its timeout passes.
    pub fn tick(&mut self) {
        if let Some(notification) = &self.notification {
            if Instant::now() >= notification.expires_at {
                self.notification = None;
            }
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        self.notification = Some(Notification {
            message: message.into(),
            severity,
            expires_at: Instant::now() + NOTIFICATION_TTL,
        });
    }

    /// Take the input buffer as a symbol, record it in the watchlist, and
    /// persist. Returns the symbol to fetch, or `None` for an empty buffer.
    pub fn submit_current_input(&mut self) -> Option<String> {
        let symbol = self.input_buffer.trim().to_uppercase();
        if symbol.is_empty() {
            return None;
        }
        self.input_buffer = symbol.clone();
        self.watchlist.submit(&symbol);
        self.persist_watchlist();
        Some(symbol)
    }

    /// Step through history relative to the input buffer. Returns the symbol
    /// to show, already written into the buffer.
    pub fn navigate_history(&mut self, direction: NavDirection) -> Option<String> {
        let current = self.input_buffer.trim().to_uppercase();
        let symbol = self.watchlist.navigate(&current, direction)?.to_string();
        self.input_buffer = symbol.clone();
        Some(symbol)
    }

    /// Send the selected entry to a display slot (the 1-9 shortcuts); the
    /// cursor follows it.
    pub fn jump_selected_to_slot(&mut self, target: usize) {
        let Some(symbol) = self.watchlist.at_display_index(self.selected) else {
            return;
        };
        let symbol = symbol.to_string();
        if self.watchlist.jump_to_display_index(&symbol, target) {
            self.persist_watchlist();
            self.selected = target;
            self.notify(format!("Moved {symbol} to slot {}", target + 1), Severity::Info);
        }
    }

    pub fn select_previous(&mut self) {
        let len = self.watchlist.len();
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }

    pub fn select_next(&mut self) {
        let len = self.watchlist.len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    /// Open the selected watchlist entry. Returns its symbol for fetching.
    pub fn open_selected(&mut self) -> Option<String> {
        let symbol = self.watchlist.at_display_index(self.selected)?.to_string();
        self.input_buffer = symbol.clone();
        Some(symbol)
    }

    pub fn delete_selected(&mut self) {
        let Some(symbol) = self.watchlist.at_display_index(self.selected) else {
            return;
        };
        let symbol = symbol.to_string();
        self.watchlist.delete(&symbol);
        self.persist_watchlist();
        let len = self.watchlist.len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
        self.notify(format!("Removed {symbol}"), Severity::Info);
    }

    pub fn toggle_pin_selected(&mut self) {
        let Some(symbol) = self.watchlist.at_display_index(self.selected) else {
            return;
        };
        let symbol = symbol.to_string();
        self.watchlist.toggle_pin(&symbol);
        self.persist_watchlist();
        // Keep the cursor on the entry it was on; pinning moves it.
        if let Some(position) = self.watchlist.display_position(&symbol) {
            self.selected = position;
        }
        let verb = if self.watchlist.is_pinned(&symbol) {
            "Pinned"
        } else {
            "Unpinned"
        };
        self.notify(format!("{verb} {symbol}"), Severity::Info);
    }

    /// Move the selected entry one display slot; the cursor follows it.
    pub fn move_selected(&mut self, direction: MoveDirection) {
        let Some(symbol) = self.watchlist.at_display_index(self.selected) else {
            return;
        };
        let symbol = symbol.to_string();
        if self.watchlist.move_entry(&symbol, direction) {
            self.persist_watchlist();
            if let Some(position) = self.watchlist.display_position(&symbol) {
                self.selected = position;
            }
        }
    }

    fn persist_watchlist(&self) {
        self.config.save(self.watchlist.to_partial());
    }

    /// Start a fetch; the returned sequence number tags the request.
    pub fn begin_fetch(&mut self) -> u64 {
        self.fetch_seq += 1;
        self.fetch_seq
    }

    /// Start an image render, invalidating any in-flight one.
    pub fn begin_render(&mut self) -> u64 {
        self.render_seq += 1;
        self.render_seq
    }

    pub fn apply_series(&mut self, series: OhlcSeries, seq: u64) -> bool {
        if seq != self.fetch_seq {
            debug!(seq, latest = self.fetch_seq, "dropping stale series");
            return false;
        }
        self.series = Some(series);
        true
    }

    pub fn apply_fundamentals(&mut self, fundamentals: Fundamentals, seq: u64) -> bool {
        if seq != self.fetch_seq {
            debug!(seq, latest = self.fetch_seq, "dropping stale fundamentals");
            return false;
        }
        self.fundamentals = Some(fundamentals);
        true
    }

    pub fn apply_image(&mut self, descriptor: ImageDescriptor, seq: u64) -> bool {
        if seq != self.render_seq {
            debug!(seq, latest = self.render_seq, "dropping stale image");
            return false;
        }
        self.pending_image = Some(descriptor);
        self.image_emitted = false;
        true
    }

    pub fn set_chart_mode(&mut self, mode: ChartMode) {
        if self.chart_mode == mode {
            return;
        }
        self.chart_mode = mode;
        self.pending_image = None;
        self.image_emitted = false;
        let message = match mode {
            ChartMode::Block => "Switched to text chart",
            ChartMode::Image => "Switched to image chart",
            ChartMode::Debug => "Graphics test: a white square should appear",
        };
        self.notify(message, Severity::Info);
    }
}
