//! Yahoo Finance v8 chart API client.
//!
//! Fetches six months of daily bars for a symbol and normalizes them into an
//! [`OhlcSeries`]. Rows with missing values are skipped.

use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::api::FetchError;
use crate::models::{Ohlc, OhlcSeries};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    #[allow(dead_code)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Fetch six months of daily OHLC bars for `symbol`.
#[instrument]
pub async fn fetch_daily_series(symbol: &str) -> Result<OhlcSeries, FetchError> {
    let url = build_chart_url(symbol);
    debug!(url = %url, "requesting Yahoo Finance chart");

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| FetchError::Transient(e.to_string()))?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| FetchError::Transient(e.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound(symbol.to_string()));
    }
    if !status.is_success() {
        return Err(FetchError::Transient(format!(
            "Yahoo Finance returned HTTP {status}"
        )));
    }

    let yahoo_response: YahooResponse = response
        .json()
        .await
        .map_err(|e| FetchError::Transient(e.to_string()))?;

    let series = parse_response(yahoo_response, symbol)?;
    info!(candles = series.len(), "fetched daily series");
    Ok(series)
}

fn build_chart_url(symbol: &str) -> String {
    format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?range=6mo&interval=1d",
        symbol
    )
}

fn parse_response(response: YahooResponse, symbol: &str) -> Result<OhlcSeries, FetchError> {
    let result = response
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::NotFound(symbol.to_string()))?;

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Err(FetchError::NotFound(symbol.to_string()));
    }

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::InvalidFormat(symbol.to_string()))?;

    // All four OHLC columns are required; volume is optional.
    let (Some(opens), Some(highs), Some(lows), Some(closes)) =
        (quote.open, quote.high, quote.low, quote.close)
    else {
        return Err(FetchError::InvalidFormat(symbol.to_string()));
    };
    let volumes = quote.volume.unwrap_or_default();

    let mut series = OhlcSeries::new(symbol.to_string());
    let mut skipped = 0usize;
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let row = (
            opens.get(i).copied().flatten(),
            highs.get(i).copied().flatten(),
            lows.get(i).copied().flatten(),
            closes.get(i).copied().flatten(),
            DateTime::from_timestamp(timestamp, 0),
        );
        let (Some(open), Some(high), Some(low), Some(close), Some(datetime)) = row else {
            skipped += 1;
            continue;
        };
        let volume = volumes.get(i).copied().flatten().unwrap_or(0);
        series.push(Ohlc::new(datetime, open, high, low, close, volume));
    }

    if skipped > 0 {
        warn!(skipped, total = timestamps.len(), "skipped bars with missing values");
    }

    if series.is_empty() {
        return Err(FetchError::NotFound(symbol.to_string()));
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_fixture(body: &str, symbol: &str) -> Result<OhlcSeries, FetchError> {
        let response: YahooResponse = serde_json::from_str(body).expect("fixture parses");
        parse_response(response, symbol)
    }

    #[test]
    fn build_url_targets_six_months_of_daily_bars() {
        let url = build_chart_url("AAPL");
        assert!(url.contains("/chart/AAPL"));
        assert!(url.contains("range=6mo"));
        assert!(url.contains("interval=1d"));
    }

    #[test]
    fn parses_bars_and_skips_null_rows() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1700000000, 1700086400, 1700172800],
                    "indicators": {
                        "quote": [{
                            "open":   [100.0, null, 102.0],
                            "high":   [110.0, 111.0, 112.0],
                            "low":    [ 95.0,  96.0,  97.0],
                            "close":  [105.0, 106.0, 107.0],
                            "volume": [1000, 1100, null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let series = parse_fixture(body, "AAPL").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.candles[0].open, 100.0);
        assert_eq!(series.candles[1].close, 107.0);
        assert_eq!(series.candles[1].volume, 0);
    }

    #[test]
    fn empty_result_is_not_found() {
        let body = r#"{"chart": {"result": [], "error": null}}"#;
        assert!(matches!(
            parse_fixture(body, "NOPE"),
            Err(FetchError::NotFound(_))
        ));
    }

    #[test]
    fn missing_ohlc_columns_is_invalid_format() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1700000000],
                    "indicators": {
                        "quote": [{
                            "open": [100.0],
                            "close": [105.0]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        assert!(matches!(
            parse_fixture(body, "AAPL"),
            Err(FetchError::InvalidFormat(_))
        ));
    }

    #[test]
    fn all_null_rows_is_not_found() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1700000000],
                    "indicators": {
                        "quote": [{
                            "open": [null], "high": [null],
                            "low": [null], "close": [null],
                            "volume": [null]
                        }]
                    }
                }],
                "error": null
            }
        }"#;
        assert!(matches!(
            parse_fixture(body, "AAPL"),
            Err(FetchError::NotFound(_))
        ));
    }
}
