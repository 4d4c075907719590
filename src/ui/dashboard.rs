//! Frame layout: sidebar, symbol input, notification area, chart, footer.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, Severity, SidebarTab};
use crate::ui::chart::render_chart;

const SIDEBAR_WIDTH: u16 = 34;
const PIN_MARKER: &str = "📌 ";

/// Render a full frame.
pub fn render(frame: &mut Frame, app: &App) {
    let [sidebar, main] = split_columns(frame.size());
    render_sidebar(frame, app, sidebar);

    let [top, chart, footer] = split_main(main);
    render_top_bar(frame, app, top);
    render_chart(frame, app, chart);
    render_footer(frame, app, footer);
}

/// The chart pane rectangle for a given terminal size. The main loop uses
/// this to position graphics escape sequences and to size image renders.
pub fn chart_area(size: Rect) -> Rect {
    let [_, main] = split_columns(size);
    let [_, chart, _] = split_main(main);
    // Inside the chart block's border.
    Block::default().borders(Borders::ALL).inner(chart)
}

fn split_columns(size: Rect) -> [Rect; 2] {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(size);
    [chunks[0], chunks[1]]
}

fn split_main(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    match app.sidebar_tab {
        SidebarTab::Watchlist => render_watchlist(frame, app, area),
        SidebarTab::Info => render_info(frame, app, area),
    }
}

fn render_watchlist(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Watchlist;
    let border = if focused { Color::Yellow } else { Color::DarkGray };

    let items: Vec<ListItem> = (0..app.watchlist.len())
        .filter_map(|i| app.watchlist.at_display_index(i))
        .map(|symbol| {
            if app.watchlist.is_pinned(symbol) {
                ListItem::new(Line::from(vec![
                    Span::styled(PIN_MARKER, Style::default().fg(Color::Cyan)),
                    Span::styled(
                        symbol.to_string(),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                ]))
            } else {
                ListItem::new(Line::from(symbol.to_string()))
            }
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(" Watchlist [i: info] "),
        )
        .highlight_style(if focused {
            Style::default()
                .bg(Color::Yellow)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        })
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if focused && !app.watchlist.is_empty() {
        state.select(Some(app.selected.min(app.watchlist.len() - 1)));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_info(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Info [i: watchlist] ");

    let Some(fundamentals) = &app.fundamentals else {
        frame.render_widget(
            Paragraph::new("No company data yet.").block(block),
            area,
        );
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            fundamentals.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            fundamentals.meta_line(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];
    for (label, value) in &fundamentals.snapshot {
        lines.push(Line::from(vec![
            Span::styled(format!("{label:<14}"), Style::default().fg(Color::DarkGray)),
            Span::raw(value.clone()),
        ]));
    }
    if !fundamentals.description.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(fundamentals.description.clone()));
    }

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_top_bar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(10)])
        .split(area);

    let focused = app.focus == Focus::Input;
    let border = if focused { Color::Yellow } else { Color::DarkGray };
    let input = Paragraph::new(app.input_buffer.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border))
            .title(" Symbol "),
    );
    frame.render_widget(input, chunks[0]);
    if focused {
        // Keep the cursor inside the pane even if the buffer outgrows it.
        let right_edge = chunks[0].x + chunks[0].width.saturating_sub(2);
        let cursor_x = chunks[0]
            .x
            .saturating_add(1)
            .saturating_add(app.input_buffer.len().min(u16::MAX as usize) as u16)
            .min(right_edge);
        frame.set_cursor(cursor_x, chunks[0].y + 1);
    }

    if let Some(notification) = &app.notification {
        let color = match notification.severity {
            Severity::Info => Color::Green,
            Severity::Warning => Color::Yellow,
            Severity::Error => Color::Red,
        };
        let label = Paragraph::new(Line::from(Span::styled(
            notification.message.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(label, chunks[1]);
    }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.focus {
        Focus::Input => "ENTER fetch | ↑/↓ history | SPACE clear | TAB watchlist | ^B/^H/^T chart mode | q quit",
        Focus::Watchlist => "ENTER open | p pin | d delete | K/J move | 1-9 slot | i info | TAB input | q quit",
    };
    let footer = Paragraph::new(Line::from(Span::styled(
        shortcuts,
        Style::default().fg(Color::DarkGray),
    )))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_area_sits_right_of_the_sidebar() {
        let area = chart_area(Rect::new(0, 0, 120, 40));
        assert!(area.x > SIDEBAR_WIDTH);
        assert!(area.width > 0);
        // Top bar above, footer below, plus the chart border.
        assert!(area.y >= 4);
        assert!(area.height < 40 - 6);
    }

    #[test]
    fn chart_area_survives_tiny_terminals() {
        let area = chart_area(Rect::new(0, 0, 10, 4));
        assert!(area.width <= 10);
    }
}
