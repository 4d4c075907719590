use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single daily candlestick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ohlc {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Ohlc {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }

    /// Change over the bar, in percent of the open.
    pub fn change_percent(&self) -> f64 {
        if self.open == 0.0 {
            0.0
        } else {
            ((self.close - self.open) / self.open) * 100.0
        }
    }
}

/// Daily bars for one symbol, sorted by ascending timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcSeries {
    pub symbol: String,
    pub candles: Vec<Ohlc>,
}

impl OhlcSeries {
    pub fn new(symbol: String) -> Self {
        Self {
            symbol,
            candles: Vec::new(),
        }
    }

    pub fn push(&mut self, candle: Ohlc) {
        self.candles.push(candle);
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Close-on-close change of the most recent session, in percent.
    /// Falls back to the last bar's own open/close change when there is
    /// only one bar.
    pub fn last_session_change_percent(&self) -> Option<f64> {
        let last = self.candles.last()?;
        match self.candles.len() {
            1 => Some(last.change_percent()),
            n => {
                let prev_close = self.candles[n - 2].close;
                if prev_close == 0.0 {
                    None
                } else {
                    Some(((last.close - prev_close) / prev_close) * 100.0)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Ohlc {
        Ohlc::new(Utc::now(), open, high, low, close, 1000)
    }

    #[test]
    fn bullish_and_bearish() {
        assert!(candle(100.0, 110.0, 95.0, 105.0).is_bullish());
        assert!(!candle(100.0, 105.0, 90.0, 95.0).is_bullish());
    }

    #[test]
    fn session_change_uses_previous_close() {
        let mut series = OhlcSeries::new("AAPL".to_string());
        let t0 = Utc::now() - Duration::days(1);
        series.push(Ohlc::new(t0, 98.0, 101.0, 97.0, 100.0, 1000));
        series.push(Ohlc::new(
            t0 + Duration::days(1),
            101.0,
            106.0,
            100.0,
            105.0,
            1200,
        ));

        // (105 - 100) / 100 = 5%
        assert_eq!(series.last_session_change_percent(), Some(5.0));
    }

    #[test]
    fn session_change_single_bar() {
        let mut series = OhlcSeries::new("AAPL".to_string());
        series.push(candle(100.0, 110.0, 95.0, 105.0));
        assert_eq!(series.last_session_change_percent(), Some(5.0));
    }

    #[test]
    fn empty_series_has_no_change() {
        let series = OhlcSeries::new("AAPL".to_string());
        assert!(series.last_session_change_percent().is_none());
    }
}
