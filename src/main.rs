use std::io::{self, Write};
use std::sync::mpsc;

use anyhow::{Context, Result};
use crossterm::{
    cursor::MoveTo,
    execute, queue,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use tracing::{debug, error, info};

use tickerdash::api::{fetch_daily_series, fetch_fundamentals, FetchError, FundamentalsError};
use tickerdash::app::{App, ChartMode, Focus, Severity, SidebarTab};
use tickerdash::config::ConfigStore;
use tickerdash::models::{Fundamentals, Ohlc, OhlcSeries};
use tickerdash::ui::{
    chart_area,
    events::{self, Event, EventHandler},
    graphics::{
        detect_protocol, kitty_rgb_descriptor, rasterize_candles, test_pattern, GraphicsProtocol,
        ImageDescriptor,
    },
    render,
};
use tickerdash::watchlist::{MoveDirection, NavDirection};

/// Assumed terminal cell geometry for rasterization. The kitty protocol
/// rescales to the requested cell box, so this only sets pixel density.
const CELL_WIDTH_PX: u32 = 10;
const CELL_HEIGHT_PX: u32 = 20;

/// Sessions drawn in image mode, matching the text renderer.
const IMAGE_SESSIONS: usize = 60;

/// Longest accepted symbol input; keeps the cursor inside the input pane.
const MAX_INPUT_LEN: usize = 20;

/// Work shipped to the background thread.
#[derive(Debug)]
enum WorkerCommand {
    FetchSeries { symbol: String, seq: u64 },
    FetchFundamentals { symbol: String, seq: u64 },
    RenderImage { candles: Vec<Ohlc>, cols: u16, rows: u16, seq: u64 },
    RenderTestPattern { rows: u16, seq: u64 },
}

#[derive(Debug)]
enum WorkerResult {
    Series {
        symbol: String,
        result: Result<OhlcSeries, FetchError>,
        seq: u64,
    },
    Fundamentals {
        symbol: String,
        result: Result<Fundamentals, FundamentalsError>,
        seq: u64,
    },
    Image {
        descriptor: ImageDescriptor,
        seq: u64,
    },
    ImageUnsupported {
        reason: String,
    },
}

/// File logging with daily rotation; stdout belongs to the TUI.
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join("tickerdash").join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("./logs"));
    std::fs::create_dir_all(&log_dir).context("failed to create log directory")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "tickerdash.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickerdash=debug,info".into()),
        )
        .init();

    info!(?log_dir, "logging initialized");
    Ok(())
}

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("warning: failed to initialize logging: {e}");
    });

    let mut terminal = setup_terminal()?;

    let mut app = App::new(ConfigStore::open_default());
    let (command_tx, command_rx) = mpsc::channel::<WorkerCommand>();
    let (result_tx, result_rx) = mpsc::channel::<WorkerResult>();

    info!("spawning background worker");
    spawn_worker(command_rx, result_tx);

    let events = EventHandler::new();
    let result = run(&mut terminal, &mut app, &events, &command_tx, &result_rx);

    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("exited normally"),
        Err(e) => error!(error = ?e, "exited with error"),
    }
    result
}

/// Background thread: owns a tokio runtime for the HTTP fetches and does
/// the pixel work for image mode. Exits when the command channel closes.
fn spawn_worker(command_rx: mpsc::Receiver<WorkerCommand>, result_tx: mpsc::Sender<WorkerResult>) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "failed to create worker runtime");
                return;
            }
        };

        while let Ok(command) = command_rx.recv() {
            debug!(?command, "worker received command");
            match command {
                WorkerCommand::FetchSeries { symbol, seq } => {
                    let result = runtime.block_on(fetch_daily_series(&symbol));
                    let _ = result_tx.send(WorkerResult::Series { symbol, result, seq });
                }
                WorkerCommand::FetchFundamentals { symbol, seq } => {
                    let result = runtime.block_on(fetch_fundamentals(&symbol));
                    let _ = result_tx.send(WorkerResult::Fundamentals { symbol, result, seq });
                }
                WorkerCommand::RenderImage { candles, cols, rows, seq } => {
                    let _ = result_tx.send(render_image(&candles, cols, rows, seq));
                }
                WorkerCommand::RenderTestPattern { rows, seq } => {
                    let _ = result_tx.send(render_test_pattern(rows, seq));
                }
            }
        }
        info!("worker exiting, channel closed");
    });
}

fn render_image(candles: &[Ohlc], cols: u16, rows: u16, seq: u64) -> WorkerResult {
    match detect_protocol() {
        GraphicsProtocol::Kitty => {
            let width_px = cols as u32 * CELL_WIDTH_PX;
            let height_px = rows as u32 * CELL_HEIGHT_PX;
            let pixels = rasterize_candles(candles, width_px, height_px);
            let descriptor = kitty_rgb_descriptor(&pixels, width_px, height_px, cols, rows);
            WorkerResult::Image { descriptor, seq }
        }
        GraphicsProtocol::Iterm2 => WorkerResult::ImageUnsupported {
            reason: "iTerm2 inline images need an encoded file payload; using text mode"
                .to_string(),
        },
    }
}

fn render_test_pattern(rows: u16, seq: u64) -> WorkerResult {
    match detect_protocol() {
        GraphicsProtocol::Kitty => {
            let side = (rows as u32 * CELL_HEIGHT_PX).max(CELL_HEIGHT_PX);
            let pixels = test_pattern(side);
            // Cells are roughly twice as tall as wide, so a square needs
            // twice as many columns as rows.
            let descriptor = kitty_rgb_descriptor(&pixels, side, side, rows * 2, rows);
            WorkerResult::Image { descriptor, seq }
        }
        GraphicsProtocol::Iterm2 => WorkerResult::ImageUnsupported {
            reason: "iTerm2 inline images need an encoded file payload; using text mode"
                .to_string(),
        },
    }
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    command_tx: &mpsc::Sender<WorkerCommand>,
    result_rx: &mpsc::Receiver<WorkerResult>,
) -> Result<()> {
    while app.running {
        while let Ok(result) = result_rx.try_recv() {
            apply_result(app, result, command_tx, terminal.size()?);
        }

        terminal.draw(|frame| render(frame, app))?;
        emit_pending_image(terminal, app)?;

        if let Ok(event) = events.next() {
            handle_event(app, event, command_tx, terminal.size()?);
        }
        app.tick();
    }
    Ok(())
}

/// Write the queued graphics escape sequence over the chart pane. Payloads
/// run to megabytes, so each descriptor is sent exactly once.
fn emit_pending_image(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    if app.image_emitted || !matches!(app.chart_mode, ChartMode::Image | ChartMode::Debug) {
        return Ok(());
    }
    let Some(descriptor) = &app.pending_image else {
        return Ok(());
    };

    let area = chart_area(terminal.size()?);
    let mut stdout = io::stdout();
    queue!(stdout, MoveTo(area.x, area.y))?;
    if !descriptor.clear.is_empty() {
        queue!(stdout, Print(&descriptor.clear))?;
    }
    queue!(stdout, Print(&descriptor.sequence))?;
    stdout.flush()?;
    app.image_emitted = true;
    Ok(())
}

fn apply_result(
    app: &mut App,
    result: WorkerResult,
    command_tx: &mpsc::Sender<WorkerCommand>,
    size: Rect,
) {
    match result {
        WorkerResult::Series { symbol, result, seq } => match result {
            Ok(series) => {
                let sessions = series.len();
                let change = series.last_session_change_percent();
                if app.apply_series(series, seq) {
                    let message = match change {
                        Some(change) => {
                            format!("{symbol}: {sessions} sessions, last {change:+.2}%")
                        }
                        None => format!("{symbol}: {sessions} sessions"),
                    };
                    app.notify(message, Severity::Info);
                    if app.chart_mode == ChartMode::Image {
                        request_image_render(app, command_tx, size);
                    }
                }
            }
            Err(error) => {
                error!(%symbol, %error, "series fetch failed");
                app.notify(error.to_string(), Severity::Error);
            }
        },
        WorkerResult::Fundamentals { symbol, result, seq } => match result {
            Ok(fundamentals) => {
                app.apply_fundamentals(fundamentals, seq);
            }
            Err(error) => {
                // Non-fatal: the chart still works without company data.
                debug!(%symbol, %error, "fundamentals fetch failed");
                app.notify(error.to_string(), Severity::Warning);
            }
        },
        WorkerResult::Image { descriptor, seq } => {
            app.apply_image(descriptor, seq);
        }
        WorkerResult::ImageUnsupported { reason } => {
            app.notify(reason, Severity::Warning);
            app.set_chart_mode(ChartMode::Block);
        }
    }
}

/// Kick off both fetches for a symbol under one sequence number.
fn request_fetch(app: &mut App, symbol: String, command_tx: &mpsc::Sender<WorkerCommand>) {
    let seq = app.begin_fetch();
    app.notify(format!("Fetching {symbol}..."), Severity::Info);
    app.pending_image = None;
    app.image_emitted = false;
    let _ = command_tx.send(WorkerCommand::FetchSeries {
        symbol: symbol.clone(),
        seq,
    });
    let _ = command_tx.send(WorkerCommand::FetchFundamentals { symbol, seq });
}

fn request_image_render(app: &mut App, command_tx: &mpsc::Sender<WorkerCommand>, size: Rect) {
    let Some(series) = &app.series else {
        return;
    };
    let area = chart_area(size);
    if area.width == 0 || area.height == 0 {
        return;
    }
    let start = series.len().saturating_sub(IMAGE_SESSIONS);
    let candles = series.candles[start..].to_vec();
    let seq = app.begin_render();
    let _ = command_tx.send(WorkerCommand::RenderImage {
        candles,
        cols: area.width,
        rows: area.height,
        seq,
    });
}

fn request_test_pattern(app: &mut App, command_tx: &mpsc::Sender<WorkerCommand>, size: Rect) {
    let area = chart_area(size);
    let rows = area.height.min(area.width / 2).max(1);
    let seq = app.begin_render();
    let _ = command_tx.send(WorkerCommand::RenderTestPattern { rows, seq });
}

fn handle_event(
    app: &mut App,
    event: Event,
    command_tx: &mpsc::Sender<WorkerCommand>,
    size: Rect,
) {
    let Event::Key(key) = event else {
        if matches!(event, Event::Resize) && app.chart_mode == ChartMode::Image {
            // The image is sized in cells; a resize invalidates it.
            request_image_render(app, command_tx, size);
        }
        return;
    };

    // Global chords first, then focus-specific keys. Plain 'q' only quits
    // outside the input box, where it is a symbol character.
    let ctrl = key.modifiers.contains(crossterm::event::KeyModifiers::CONTROL);
    if events::is_quit(&key) && (app.focus != Focus::Input || ctrl) {
        info!("quit requested");
        app.quit();
        return;
    }
    if events::is_tab(&key) {
        app.focus = match app.focus {
            Focus::Input => Focus::Watchlist,
            Focus::Watchlist => Focus::Input,
        };
        return;
    }
    if events::is_block_mode(&key) {
        app.set_chart_mode(ChartMode::Block);
        return;
    }
    if events::is_image_mode(&key) {
        app.set_chart_mode(ChartMode::Image);
        request_image_render(app, command_tx, size);
        return;
    }
    if events::is_debug_mode(&key) {
        app.set_chart_mode(ChartMode::Debug);
        request_test_pattern(app, command_tx, size);
        return;
    }

    match app.focus {
        Focus::Input => handle_input_key(app, &key, command_tx),
        Focus::Watchlist => handle_watchlist_key(app, &key, command_tx),
    }
}

fn handle_input_key(
    app: &mut App,
    key: &crossterm::event::KeyEvent,
    command_tx: &mpsc::Sender<WorkerCommand>,
) {
    if events::is_enter(key) {
        if let Some(symbol) = app.submit_current_input() {
            request_fetch(app, symbol, command_tx);
        }
    } else if events::is_backspace(key) {
        app.input_buffer.pop();
    } else if events::is_space(key) || events::is_escape(key) {
        app.input_buffer.clear();
    } else if events::is_up(key) {
        if let Some(symbol) = app.navigate_history(NavDirection::Up) {
            request_fetch(app, symbol, command_tx);
        }
    } else if events::is_down(key) {
        if let Some(symbol) = app.navigate_history(NavDirection::Down) {
            request_fetch(app, symbol, command_tx);
        }
    } else if let Some(c) = events::get_char(key) {
        if events::is_ticker_char(c) && app.input_buffer.len() < MAX_INPUT_LEN {
            app.input_buffer.push(c.to_ascii_uppercase());
        }
    }
}

fn handle_watchlist_key(
    app: &mut App,
    key: &crossterm::event::KeyEvent,
    command_tx: &mpsc::Sender<WorkerCommand>,
) {
    // Shifted move keys must win over plain navigation checks.
    if events::is_move_up(key) {
        app.move_selected(MoveDirection::Newer);
    } else if events::is_move_down(key) {
        app.move_selected(MoveDirection::Older);
    } else if events::is_enter(key) {
        if let Some(symbol) = app.open_selected() {
            request_fetch(app, symbol, command_tx);
        }
    } else if events::is_up(key) {
        app.select_previous();
    } else if events::is_down(key) {
        app.select_next();
    } else if events::is_pin(key) {
        app.toggle_pin_selected();
    } else if events::is_delete(key) {
        app.delete_selected();
    } else if events::is_info_toggle(key) {
        app.sidebar_tab = match app.sidebar_tab {
            SidebarTab::Watchlist => SidebarTab::Info,
            SidebarTab::Info => SidebarTab::Watchlist,
        };
    } else if let Some(slot) = events::digit_from_event(key) {
        app.jump_selected_to_slot(slot);
    } else if events::is_escape(key) {
        app.focus = Focus::Input;
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tempfile::TempDir;

    fn app() -> (App, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = ConfigStore::at(dir.path().join("config.json"));
        (App::new(config), dir)
    }

    #[test]
    fn failed_fundamentals_raise_a_warning_notification() {
        let (mut app, _dir) = app();
        let (tx, _rx) = mpsc::channel();
        let seq = app.begin_fetch();

        apply_result(
            &mut app,
            WorkerResult::Fundamentals {
                symbol: "AAPL".to_string(),
                result: Err(FundamentalsError::Unavailable("AAPL".to_string())),
                seq,
            },
            &tx,
            Rect::new(0, 0, 120, 40),
        );

        let notification = app.notification.expect("warning shown");
        assert_eq!(notification.severity, Severity::Warning);
        assert!(notification.message.contains("AAPL"));
    }

    #[test]
    fn not_found_series_raises_an_error_notification() {
        let (mut app, _dir) = app();
        let (tx, _rx) = mpsc::channel();
        let seq = app.begin_fetch();

        apply_result(
            &mut app,
            WorkerResult::Series {
                symbol: "NOPE".to_string(),
                result: Err(FetchError::NotFound("NOPE".to_string())),
                seq,
            },
            &tx,
            Rect::new(0, 0, 120, 40),
        );

        let notification = app.notification.expect("error shown");
        assert_eq!(notification.severity, Severity::Error);
        assert!(app.series.is_none());
    }

    #[test]
    fn input_buffer_stops_growing_at_the_cap() {
        let (mut app, _dir) = app();
        let (tx, _rx) = mpsc::channel();
        let key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);

        for _ in 0..MAX_INPUT_LEN + 30 {
            handle_input_key(&mut app, &key, &tx);
        }

        assert_eq!(app.input_buffer.len(), MAX_INPUT_LEN);
        assert!(app.input_buffer.chars().all(|c| c == 'A'));
    }
}
