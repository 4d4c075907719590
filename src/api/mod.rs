pub mod finviz;
pub mod yahoo;

pub use finviz::fetch_fundamentals;
pub use yahoo::fetch_daily_series;

use thiserror::Error;

/// Failure modes of a price-series fetch. Fetches are single-attempt; every
/// variant surfaces as a user-visible notification and nothing is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider returned no data for the symbol.
    #[error("no data found for '{0}'")]
    NotFound(String),

    /// The response is missing required OHLC columns.
    #[error("invalid data format for {0}")]
    InvalidFormat(String),

    /// Network, HTTP, or decoding failure; carries the underlying text.
    #[error("fetch error: {0}")]
    Transient(String),
}

/// Fundamentals are best-effort; any failure collapses into this.
#[derive(Debug, Error)]
pub enum FundamentalsError {
    #[error("fundamentals unavailable for {0}")]
    Unavailable(String),
}
