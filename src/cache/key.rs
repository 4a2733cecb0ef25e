//! Request fingerprints
//!
//! Keys mirror the dashboard API paths so that distinct upstream requests
//! never share a cache slot.

use std::fmt;

/// Builder for cache keys made of an endpoint path and query parameters.
///
/// ```
/// use ticker_cache::cache::CacheKey;
///
/// let key = CacheKey::candlestick("AAPL", "1mo", "1d");
/// assert_eq!(key.to_string(), "stock/aapl/candlestick?period=1mo&interval=1d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl CacheKey {
    /// Starts a key for an arbitrary endpoint path.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        }
    }

    /// Appends a query parameter. Parameters render in insertion order.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Technical indicator summary for a ticker.
    pub fn technical(ticker: &str) -> Self {
        Self::stock(ticker, "technical")
    }

    /// News sentiment analysis for a ticker.
    pub fn sentiment(ticker: &str) -> Self {
        Self::stock(ticker, "sentiment")
    }

    /// Price graph for a ticker over a period (e.g. `1y`).
    pub fn graph(ticker: &str, period: &str) -> Self {
        Self::stock(ticker, "graph").param("period", period)
    }

    /// Candlestick series for a ticker over a period at an interval.
    pub fn candlestick(ticker: &str, period: &str, interval: &str) -> Self {
        Self::stock(ticker, "candlestick")
            .param("period", period)
            .param("interval", interval)
    }

    /// Real-time S&P 500 snapshot.
    pub fn sp500_realtime() -> Self {
        Self::new("sp500-realtime")
    }

    fn stock(ticker: &str, endpoint: &str) -> Self {
        Self::new(format!(
            "stock/{}/{}",
            ticker.trim().to_lowercase(),
            endpoint
        ))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.endpoint)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}
