pub mod fundamentals;
pub mod ohlc;

pub use fundamentals::Fundamentals;
pub use ohlc::{Ohlc, OhlcSeries};
