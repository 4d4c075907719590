//! Chart pane rendering.
//!
//! Block mode draws the candlesticks with Unicode box-drawing characters,
//! line by line from the top. Image and debug modes only reserve the pane;
//! the actual pixels travel as a terminal-graphics escape sequence written
//! after the frame (see `ui::graphics`), so the pane itself stays blank.
//!
//! Candlestick cell algorithm: three vertical zones per candle (upper wick,
//! body, lower wick) with 0.25/0.75 fractional thresholds for sub-cell
//! precision.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, ChartMode};
use crate::models::Ohlc;
use crate::ui::graphics::{BEARISH_RGB, BULLISH_RGB};

const UNICODE_VOID: char = ' ';
const UNICODE_BODY: char = '┃';
const UNICODE_HALF_BODY_BOTTOM: char = '╻';
const UNICODE_HALF_BODY_TOP: char = '╹';
const UNICODE_WICK: char = '│';
const UNICODE_TOP: char = '╽';
const UNICODE_BOTTOM: char = '╿';
const UNICODE_UPPER_WICK: char = '╷';
const UNICODE_LOWER_WICK: char = '╵';

const BULLISH_COLOR: Color = Color::Rgb(BULLISH_RGB.0, BULLISH_RGB.1, BULLISH_RGB.2);
const BEARISH_COLOR: Color = Color::Rgb(BEARISH_RGB.0, BEARISH_RGB.1, BEARISH_RGB.2);

const Y_AXIS_WIDTH: u16 = 12;
/// Sessions shown in block mode, matching the image renderer.
const MAX_VISIBLE_SESSIONS: usize = 60;

/// Render the chart pane for the current mode.
pub fn render_chart(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.series {
        Some(series) => format!(
            " {} - Daily ({} sessions) [{}] ",
            series.symbol,
            series.len().min(MAX_VISIBLE_SESSIONS),
            app.chart_mode.label()
        ),
        None => " Chart ".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(series) = &app.series else {
        render_welcome(frame, inner);
        return;
    };

    match app.chart_mode {
        ChartMode::Block => {
            let renderer = CandlestickRenderer::new(&series.candles, inner);
            frame.render_widget(Paragraph::new(renderer.render_lines()), inner);
        }
        ChartMode::Image | ChartMode::Debug => {
            // The pane is left empty; the escape sequence is written over it
            // once the frame is on screen. Show a hint until the worker has
            // produced a descriptor.
            if app.pending_image.is_none() {
                let hint = Paragraph::new(Line::from(Span::styled(
                    "Rendering...",
                    Style::default().fg(Color::DarkGray),
                )))
                .alignment(Alignment::Center);
                frame.render_widget(hint, inner);
            }
        }
    }
}

fn render_welcome(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from("Welcome! Enter a stock symbol above."),
        Line::from(""),
        Line::from("Controls:"),
        Line::from(" - ENTER: Fetch data"),
        Line::from(" - CTRL+B: Switch to Block (Text) Mode"),
        Line::from(" - CTRL+H: Switch to Image (High-Res) Mode"),
        Line::from(" - CTRL+T: Test Terminal Graphics Support"),
        Line::from(" - TAB: Focus the watchlist"),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

/// Text-mode candlestick renderer.
pub struct CandlestickRenderer<'a> {
    candles: &'a [Ohlc],
    min_price: f64,
    max_price: f64,
    height: u16,
    width: u16,
}

impl<'a> CandlestickRenderer<'a> {
    pub fn new(candles: &'a [Ohlc], area: Rect) -> Self {
        let (min_price, max_price) = Self::compute_price_bounds(candles);
        Self {
            candles,
            min_price,
            max_price,
            // Two rows reserved for the x axis.
            height: area.height.saturating_sub(2),
            width: area.width.saturating_sub(Y_AXIS_WIDTH),
        }
    }

    /// Min/max over the candles with a 2% margin on both sides.
    fn compute_price_bounds(candles: &[Ohlc]) -> (f64, f64) {
        let max = candles.iter().fold(f64::NEG_INFINITY, |m, c| m.max(c.high));
        let min = candles.iter().fold(f64::INFINITY, |m, c| m.min(c.low));
        let margin = (max - min) * 0.02;
        ((min - margin).max(0.0), max + margin)
    }

    fn price_to_height(&self, price: f64) -> f64 {
        if self.max_price == self.min_price {
            return self.height as f64 / 2.0;
        }
        (price - self.min_price) / (self.max_price - self.min_price) * self.height as f64
    }

    fn candle_color(candle: &Ohlc) -> Color {
        if candle.is_bullish() {
            BULLISH_COLOR
        } else {
            BEARISH_COLOR
        }
    }

    /// Character for one candle at one row. `y` counts rows from the bottom.
    fn render_candle(&self, candle: &Ohlc, y: u16) -> char {
        let row = y as f64;
        let high_y = self.price_to_height(candle.high);
        let low_y = self.price_to_height(candle.low);
        let body_top = self.price_to_height(candle.open.max(candle.close));
        let body_bottom = self.price_to_height(candle.open.min(candle.close));

        if high_y.ceil() >= row && row >= body_top.floor() {
            // Upper wick zone.
            if body_top - row > 0.75 {
                UNICODE_BODY
            } else if body_top - row > 0.25 {
                if high_y - row > 0.75 {
                    UNICODE_TOP
                } else {
                    UNICODE_HALF_BODY_BOTTOM
                }
            } else if high_y - row > 0.75 {
                UNICODE_WICK
            } else if high_y - row > 0.25 {
                UNICODE_UPPER_WICK
            } else {
                UNICODE_VOID
            }
        } else if body_top.floor() >= row && row >= body_bottom.ceil() {
            UNICODE_BODY
        } else if body_bottom.ceil() >= row && row >= low_y.floor() {
            // Lower wick zone.
            if body_bottom - row < 0.25 {
                UNICODE_BODY
            } else if body_bottom - row < 0.75 {
                if low_y - row < 0.25 {
                    UNICODE_BOTTOM
                } else {
                    UNICODE_HALF_BODY_TOP
                }
            } else if low_y - row < 0.25 {
                UNICODE_WICK
            } else if low_y - row < 0.75 {
                UNICODE_LOWER_WICK
            } else {
                UNICODE_VOID
            }
        } else {
            UNICODE_VOID
        }
    }

    /// Price gutter for a row; a value every fourth line.
    fn render_y_axis(&self, y: u16) -> String {
        if y % 4 == 0 {
            let price = self.min_price
                + (y as f64 * (self.max_price - self.min_price) / self.height.max(1) as f64);
            format!("{:>9.2} │ ", price)
        } else {
            format!("{:>9} │ ", "")
        }
    }

    /// The most recent candles that fit on screen, capped at 60 sessions.
    fn visible_candles(&self) -> &[Ohlc] {
        let max_visible = (self.width as usize).min(MAX_VISIBLE_SESSIONS);
        if self.candles.len() <= max_visible {
            self.candles
        } else {
            &self.candles[self.candles.len() - max_visible..]
        }
    }

    pub fn render_lines(&self) -> Vec<Line<'a>> {
        let visible = self.visible_candles();
        if visible.is_empty() || self.height == 0 {
            return Vec::new();
        }

        let spacing = if visible.len() > 1 {
            self.width as f64 / visible.len() as f64
        } else {
            1.0
        };

        let mut lines = Vec::with_capacity(self.height as usize + 2);
        for y in (1..=self.height).rev() {
            let mut spans = vec![Span::styled(
                self.render_y_axis(y),
                Style::default().fg(Color::Gray),
            )];
            for (i, candle) in visible.iter().enumerate() {
                spans.push(Span::styled(
                    self.render_candle(candle, y).to_string(),
                    Style::default().fg(Self::candle_color(candle)),
                ));
                if i < visible.len() - 1 {
                    let gap = (spacing - 1.0).round() as usize;
                    if gap > 0 {
                        spans.push(Span::raw(" ".repeat(gap)));
                    }
                }
            }
            lines.push(Line::from(spans));
        }

        lines.extend(self.render_x_axis(visible, spacing));
        lines
    }

    /// Tick-mark row plus "dd/mm" labels at a spacing that keeps labels from
    /// colliding.
    fn render_x_axis(&self, visible: &[Ohlc], spacing: f64) -> Vec<Line<'a>> {
        // "dd/mm" is 5 chars; 2 more guarantee a gap.
        let max_labels = (self.width as usize / 7).clamp(2, 10);
        let label_interval = if visible.len() <= max_labels {
            1
        } else {
            visible.len() / max_labels
        };

        let gutter = format!("{:>width$}", "", width = Y_AXIS_WIDTH as usize);

        let mut tick_spans = vec![Span::raw(gutter.clone())];
        for (i, _) in visible.iter().enumerate() {
            let tick = if i % label_interval == 0 { "│" } else { " " };
            tick_spans.push(Span::styled(tick, Style::default().fg(Color::Gray)));
            if i < visible.len() - 1 {
                let gap = (spacing - 1.0).round() as usize;
                if gap > 0 {
                    tick_spans.push(Span::raw(" ".repeat(gap)));
                }
            }
        }

        let mut label_spans = vec![Span::raw(gutter)];
        let mut position = 0.0;
        for (i, candle) in visible.iter().enumerate() {
            if i % label_interval != 0 {
                continue;
            }
            let label = candle.timestamp.format("%d/%m").to_string();
            label_spans.push(Span::styled(
                label.clone(),
                Style::default().fg(Color::Gray),
            ));

            let next_position = if i + label_interval < visible.len() {
                (i + label_interval) as f64 * spacing
            } else {
                self.width as f64
            };
            let gap = (next_position - position - label.len() as f64).max(0.0) as usize;
            if gap > 0 {
                label_spans.push(Span::raw(" ".repeat(gap)));
            }
            position = next_position;
        }

        vec![Line::from(tick_spans), Line::from(label_spans)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Ohlc {
        Ohlc::new(Utc::now(), open, high, low, close, 1000)
    }

    fn renderer(candles: &[Ohlc], width: u16, height: u16) -> CandlestickRenderer<'_> {
        CandlestickRenderer::new(candles, Rect::new(0, 0, width, height))
    }

    #[test]
    fn price_bounds_add_margin() {
        let candles = [candle(100.0, 110.0, 90.0, 105.0)];
        let (min, max) = CandlestickRenderer::compute_price_bounds(&candles);
        assert!(min < 90.0);
        assert!(max > 110.0);
    }

    #[test]
    fn body_rows_render_full_body_character() {
        let candles = [candle(100.0, 120.0, 80.0, 110.0)];
        let r = renderer(&candles, 80, 22);
        // The middle of the body must be a solid body cell.
        let mid = r.price_to_height(105.0).round() as u16;
        assert_eq!(r.render_candle(&candles[0], mid), UNICODE_BODY);
    }

    #[test]
    fn rows_above_the_high_are_empty() {
        let candles = [candle(100.0, 110.0, 90.0, 105.0), candle(105.0, 140.0, 100.0, 130.0)];
        let r = renderer(&candles, 80, 22);
        assert_eq!(r.render_candle(&candles[0], r.height), UNICODE_VOID);
    }

    #[test]
    fn visible_candles_cap_at_sixty_sessions() {
        let candles: Vec<Ohlc> = (0..200)
            .map(|i| candle(100.0 + i as f64, 110.0 + i as f64, 90.0 + i as f64, 105.0 + i as f64))
            .collect();
        let r = renderer(&candles, 200, 30);
        let visible = r.visible_candles();
        assert_eq!(visible.len(), 60);
        // The newest candles survive.
        assert_eq!(visible.last().unwrap().open, candles.last().unwrap().open);
    }

    #[test]
    fn render_lines_has_chart_rows_plus_axis() {
        let candles = [candle(100.0, 110.0, 90.0, 105.0)];
        let r = renderer(&candles, 80, 20);
        let lines = r.render_lines();
        assert_eq!(lines.len(), r.height as usize + 2);
    }

    #[test]
    fn empty_series_renders_nothing() {
        let r = renderer(&[], 80, 20);
        assert!(r.render_lines().is_empty());
    }
}
