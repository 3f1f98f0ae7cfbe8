//! Binance spot market-data retrieval.
//!
//! Public REST endpoints only, no API key required:
//! - `/api/v3/ticker/24hr` to rank pairs by 24h traded volume
//! - `/api/v3/klines` for OHLCV bar series
//!
//! The client adds a small random delay before every request to stay polite
//! toward the API, and sends a browser-like User-Agent since the plain
//! default gets blocked by some edge nodes.

use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::OHLCV;

/// Binance spot REST base URL
pub const BASE_URL: &str = "https://api.binance.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// High-volume USDT pairs used when the ticker ranking endpoint is down.
/// The run degrades to this list instead of aborting.
pub const FALLBACK_SYMBOLS: &[&str] = &[
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "ADAUSDT", "XRPUSDT", "SOLUSDT", "DOTUSDT", "DOGEUSDT",
    "AVAXUSDT", "SHIBUSDT", "MATICUSDT", "LTCUSDT", "LINKUSDT", "ATOMUSDT", "FTMUSDT", "NEARUSDT",
    "ALGOUSDT", "XLMUSDT", "VETUSDT", "FILUSDT", "TRXUSDT", "ETCUSDT", "THETAUSDT", "ICPUSDT",
    "EOSUSDT", "AAVEUSDT", "MKRUSDT", "COMPUSDT", "SNXUSDT", "YFIUSDT", "UNIUSDT", "SUSHIUSDT",
    "CAKEUSDT", "ALPHAUSDT", "CHZUSDT", "ENJUSDT", "MANAUSDT", "SANDUSDT", "GALAUSDT", "AXSUSDT",
    "FLOWUSDT", "ONEUSDT", "ZILUSDT", "WAVESUSDT", "KSMUSDT", "QNTUSDT", "BATUSDT", "ZRXUSDT",
];

// ============================================================
// ERRORS
// ============================================================

/// Errors from the retrieval layer. All of these are transient per-symbol
/// failures from the caller's point of view: log, skip, continue.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse field {field}: {value:?}")]
    Parse {
        field: &'static str,
        value: String,
    },

    #[error("Invalid interval: {0:?}")]
    InvalidInterval(String),
}

// ============================================================
// INTERVAL
// ============================================================

/// Supported kline intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    FourHours,
    #[default]
    OneDay,
    OneWeek,
}

impl Interval {
    /// The interval string the API expects
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "1h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1w",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Interval {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::OneMinute),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "1h" => Ok(Interval::OneHour),
            "4h" => Ok(Interval::FourHours),
            "1d" => Ok(Interval::OneDay),
            "1w" => Ok(Interval::OneWeek),
            other => Err(FetchError::InvalidInterval(other.to_string())),
        }
    }
}

// ============================================================
// BAR
// ============================================================

/// One OHLCV bar as returned by the klines endpoint
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    /// Bar open time, milliseconds since epoch (exchange-provided)
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn timestamp_ms(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// API RESPONSE TYPES
// ============================================================

/// Raw kline row: a mixed-type JSON array, prices as strings
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // full row mapped, only the OHLCV fields are used
struct RawKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base volume
    String, // 10: Taker buy quote volume
    String, // 11: Ignore
);

impl RawKline {
    fn into_bar(self) -> Result<Bar, FetchError> {
        Ok(Bar {
            timestamp: self.0,
            open: parse_price("open", &self.1)?,
            high: parse_price("high", &self.2)?,
            low: parse_price("low", &self.3)?,
            close: parse_price("close", &self.4)?,
            volume: parse_price("volume", &self.5)?,
        })
    }
}

fn parse_price(field: &'static str, value: &str) -> Result<f64, FetchError> {
    value.parse().map_err(|_| FetchError::Parse {
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct Ticker24h {
    symbol: String,
    /// 24h base asset volume, stringified decimal
    volume: String,
}

// ============================================================
// CLIENT
// ============================================================

/// Binance public market-data client
pub struct BinanceClient {
    client: Client,
    base_url: String,
    /// Random per-request delay range; zero max disables it
    jitter: (Duration, Duration),
}

impl BinanceClient {
    /// Create a client against the production API with the default
    /// 100-300 ms request jitter.
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            jitter: (Duration::from_millis(100), Duration::from_millis(300)),
        })
    }

    /// Point the client at a different base URL (tests use a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request jitter range. `Duration::ZERO` for both
    /// bounds disables the delay entirely.
    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.jitter = (min, max);
        self
    }

    /// The `limit` most actively traded pairs with the given quote asset,
    /// ranked by 24h base volume descending.
    pub async fn top_symbols(&self, quote: &str, limit: usize) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        self.pause().await;
        debug!("GET {url}");

        let tickers: Vec<Ticker24h> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut pairs: Vec<(String, f64)> = tickers
            .into_iter()
            .filter(|t| t.symbol.ends_with(quote))
            .map(|t| {
                // Unparseable volume ranks last rather than failing the run
                let volume = t.volume.parse().unwrap_or(0.0);
                (t.symbol, volume)
            })
            .collect();

        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs.truncate(limit);

        Ok(pairs.into_iter().map(|(symbol, _)| symbol).collect())
    }

    /// The most recent `limit` bars for one symbol, oldest first
    pub async fn klines(
        &self,
        symbol: &str,
        interval: Interval,
        limit: u32,
    ) -> Result<Vec<Bar>, FetchError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol,
            interval.as_str(),
            limit
        );
        self.pause().await;
        debug!("GET {url}");

        let rows: Vec<RawKline> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        rows.into_iter().map(RawKline::into_bar).collect()
    }

    async fn pause(&self) {
        let (min, max) = self.jitter;
        if max.is_zero() {
            return;
        }
        let delay = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}
