//! # candlescan
//!
//! Candlestick pattern screener for the most actively traded Binance spot pairs.
//!
//! The core of the crate is a pure, stateless classification engine: given the
//! bar series of one instrument it evaluates a fixed catalog of single-bar and
//! two-bar candlestick patterns against the most recent bar(s) and produces an
//! [`InstrumentReport`]. Reports from a whole universe of instruments are then
//! folded into a [`FrequencyTable`].
//!
//! ## Quick Start
//!
//! ```rust
//! use candlescan::prelude::*;
//!
//! // Define your OHLCV data
//! struct Bar { o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//! }
//!
//! let engine = EngineBuilder::new().with_defaults().build().unwrap();
//!
//! let bars = vec![
//!     Bar { o: 100.0, h: 101.0, l: 99.0, c: 99.5, v: 10.0 },
//!     Bar { o: 100.0, h: 101.0, l: 99.0, c: 100.05, v: 10.0 },
//! ];
//! let report = engine.classify("BTCUSDT", &bars).unwrap().unwrap();
//! assert!(report.patterns.contains(&Pattern::Doji));
//! ```

pub mod binance;
pub mod detectors;

pub mod prelude {
    pub use crate::{
        // Aggregation
        aggregate,
        // Parallel
        classify_parallel,
        // Detectors
        detectors::*,
        // Types
        BuiltinDetector,
        ClassifyError,
        Direction,
        EngineBuilder,
        FrequencyTable,
        InstrumentReport,
        OHLCVExt,
        Pattern,
        PatternCount,
        PatternDetector,
        PatternEngine,
        // Errors
        PatternError,
        Ratio,
        Result,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors that can occur during pattern classification
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOhlcv { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Milliseconds since epoch, if the source provides one
    fn timestamp_ms(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn body_low(&self) -> f64 {
        self.open().min(self.close())
    }

    #[inline]
    fn body_high(&self) -> f64 {
        self.open().max(self.close())
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None if range is zero
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > 0.0).then(|| self.body() / range)
    }

    /// Validate OHLCV data consistency.
    ///
    /// Checks the full bar invariant: all values finite and non-negative,
    /// `low <= min(open, close)` and `max(open, close) <= high`.
    fn validate(&self) -> Result<()> {
        let values = [self.open(), self.high(), self.low(), self.close()];
        if values.iter().any(|v| v.is_nan()) {
            return Err(PatternError::InvalidOhlcv {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(PatternError::InvalidOhlcv {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if values.iter().any(|v| *v < 0.0) || self.volume() < 0.0 {
            return Err(PatternError::InvalidOhlcv {
                index: 0,
                reason: "Negative value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidOhlcv {
                index: 0,
                reason: "high < low",
            });
        }
        if self.body_low() < self.low() {
            return Err(PatternError::InvalidOhlcv {
                index: 0,
                reason: "open/close below low",
            });
        }
        if self.body_high() > self.high() {
            return Err(PatternError::InvalidOhlcv {
                index: 0,
                reason: "open/close above high",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// PATTERN CATALOG
// ============================================================

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// A recognized candlestick pattern.
///
/// The catalog is fixed and finite, so a closed enum is all that is needed.
/// Declaration order is the evaluation order of the engine and also the
/// tie-break order of [`FrequencyTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pattern {
    Doji,
    Hammer,
    ShootingStar,
    BullishMarubozu,
    BearishMarubozu,
    BullishEngulfing,
    BearishEngulfing,
}

impl Pattern {
    /// All patterns in catalog (= evaluation) order
    pub const ALL: [Pattern; 7] = [
        Pattern::Doji,
        Pattern::Hammer,
        Pattern::ShootingStar,
        Pattern::BullishMarubozu,
        Pattern::BearishMarubozu,
        Pattern::BullishEngulfing,
        Pattern::BearishEngulfing,
    ];

    /// Human-readable pattern name
    pub fn name(self) -> &'static str {
        match self {
            Pattern::Doji => "Doji",
            Pattern::Hammer => "Hammer",
            Pattern::ShootingStar => "Shooting Star",
            Pattern::BullishMarubozu => "Bullish Marubozu",
            Pattern::BearishMarubozu => "Bearish Marubozu",
            Pattern::BullishEngulfing => "Bullish Engulfing",
            Pattern::BearishEngulfing => "Bearish Engulfing",
        }
    }

    /// Typical directional bias of the pattern
    pub fn direction(self) -> Direction {
        match self {
            Pattern::Doji => Direction::Neutral,
            Pattern::Hammer => Direction::Bullish,
            Pattern::ShootingStar => Direction::Bearish,
            Pattern::BullishMarubozu => Direction::Bullish,
            Pattern::BearishMarubozu => Direction::Bearish,
            Pattern::BullishEngulfing => Direction::Bullish,
            Pattern::BearishEngulfing => Direction::Bearish,
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl serde::Serialize for Pattern {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

// ============================================================
// INSTRUMENT REPORT
// ============================================================

/// Classification result for a single instrument.
///
/// Built once per instrument per run from the latest bar(s) of its series;
/// immutable thereafter.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstrumentReport {
    pub symbol: String,
    /// Formatted UTC timestamp of the evaluated bar ("n/a" if the source
    /// carries no timestamps)
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Matched patterns in evaluation order; a pattern appears at most once
    pub patterns: Vec<Pattern>,
    /// (close - open) / open * 100
    pub price_change_pct: f64,
}

impl InstrumentReport {
    #[inline]
    pub fn has_patterns(&self) -> bool {
        !self.patterns.is_empty()
    }
}

/// Format an exchange timestamp (milliseconds since epoch) as UTC
pub(crate) fn format_timestamp(ms: Option<i64>) -> String {
    ms.and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// A stateless pattern predicate over the latest bar (and, for two-bar
/// patterns, the previous one).
pub trait PatternDetector: Send + Sync {
    /// Name of the pattern family this detector recognizes
    fn name(&self) -> &'static str;

    /// Number of bars the predicate consumes (1 or 2)
    fn min_bars(&self) -> usize;

    /// Evaluate the predicate. `prev` is the second-to-last bar; single-bar
    /// detectors ignore it.
    fn detect<T: OHLCV>(&self, prev: Option<&T>, curr: &T) -> Option<Pattern>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch, no vtable
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, prev: Option<&T>, curr: &T) -> Option<Pattern> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, prev, curr)),*
                }
            }

            #[inline]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(d) => PatternDetector::name(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    // Single bar
    Doji(DojiDetector),
    Hammer(HammerDetector),
    ShootingStar(ShootingStarDetector),
    Marubozu(MarubozuDetector),

    // Two bar
    BullishEngulfing(BullishEngulfingDetector),
    BearishEngulfing(BearishEngulfingDetector),
}

// ============================================================
// PATTERN ENGINE
// ============================================================

/// The classification engine.
///
/// Pure and stateless across invocations: each [`classify`](Self::classify)
/// call touches only its own input series, so instruments can be classified
/// concurrently without locking (see [`classify_parallel`]).
pub struct PatternEngine {
    detectors: Vec<BuiltinDetector>,
}

impl PatternEngine {
    /// Classify the latest bar(s) of `bars` (oldest first).
    ///
    /// Returns `Ok(None)` when the series holds fewer than two bars: there is
    /// not enough history to classify, which is not an error. Bars violating
    /// the OHLC ordering invariant are rejected with
    /// [`PatternError::InvalidOhlcv`] rather than silently producing negative
    /// shadow geometry.
    pub fn classify<T: OHLCV>(&self, symbol: &str, bars: &[T]) -> Result<Option<InstrumentReport>> {
        self.validate_bars(bars)?;

        if bars.len() < 2 {
            return Ok(None);
        }

        let curr = &bars[bars.len() - 1];
        let prev = &bars[bars.len() - 2];

        let mut patterns = Vec::new();
        for detector in &self.detectors {
            if let Some(p) = detector.detect(Some(prev), curr) {
                patterns.push(p);
            }
        }

        // A zero open would blow the percentage up; report 0 instead
        let price_change_pct = if curr.open() > 0.0 {
            (curr.close() - curr.open()) / curr.open() * 100.0
        } else {
            0.0
        };

        Ok(Some(InstrumentReport {
            symbol: symbol.to_string(),
            time: format_timestamp(curr.timestamp_ms()),
            open: curr.open(),
            high: curr.high(),
            low: curr.low(),
            close: curr.close(),
            patterns,
            price_change_pct,
        }))
    }

    /// Number of registered detectors
    #[inline]
    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                PatternError::InvalidOhlcv { reason, .. } => {
                    PatternError::InvalidOhlcv { index: i, reason }
                }
                other => other,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for d in &self.detectors {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternEngine instances
#[derive(Default)]
pub struct EngineBuilder {
    detectors: Vec<BuiltinDetector>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the whole catalog in evaluation order: Doji, Hammer, Shooting
    /// Star, Marubozu, Bullish Engulfing, Bearish Engulfing.
    pub fn with_defaults(mut self) -> Self {
        self.detectors.extend([
            BuiltinDetector::Doji(DojiDetector::with_defaults()),
            BuiltinDetector::Hammer(HammerDetector::with_defaults()),
            BuiltinDetector::ShootingStar(ShootingStarDetector::with_defaults()),
            BuiltinDetector::Marubozu(MarubozuDetector::with_defaults()),
            BuiltinDetector::BullishEngulfing(BullishEngulfingDetector::with_defaults()),
            BuiltinDetector::BearishEngulfing(BearishEngulfingDetector::with_defaults()),
        ]);
        self
    }

    /// Add a detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.detectors.push(detector);
        Ok(self)
    }

    /// Build the engine
    pub fn build(self) -> Result<PatternEngine> {
        let engine = PatternEngine {
            detectors: self.detectors,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// AGGREGATION
// ============================================================

/// One entry of a [`FrequencyTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PatternCount {
    pub pattern: Pattern,
    pub count: usize,
}

/// Pattern occurrence counts across a universe of instruments.
///
/// Entries are ordered by count descending; ties keep catalog order (the
/// declaration order of [`Pattern`]), which makes the ordering deterministic.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FrequencyTable {
    entries: Vec<PatternCount>,
}

impl FrequencyTable {
    /// Build the table by scanning every report's matched-pattern set.
    ///
    /// Each report contributes each of its patterns exactly once (duplicates
    /// within one report are impossible by construction of the engine).
    pub fn from_reports<'a, I>(reports: I) -> Self
    where
        I: IntoIterator<Item = &'a InstrumentReport>,
    {
        let mut counts = [0usize; Pattern::ALL.len()];
        for report in reports {
            for &pattern in &report.patterns {
                counts[pattern as usize] += 1;
            }
        }

        let mut entries: Vec<PatternCount> = Pattern::ALL
            .iter()
            .filter(|p| counts[**p as usize] > 0)
            .map(|&pattern| PatternCount {
                pattern,
                count: counts[pattern as usize],
            })
            .collect();

        // Stable sort: equal counts stay in catalog order
        entries.sort_by(|a, b| b.count.cmp(&a.count));

        Self { entries }
    }

    /// Occurrence count of one pattern (0 if it never matched)
    pub fn count(&self, pattern: Pattern) -> usize {
        self.entries
            .iter()
            .find(|e| e.pattern == pattern)
            .map_or(0, |e| e.count)
    }

    pub fn entries(&self) -> &[PatternCount] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternCount> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fold per-instrument reports into a [`FrequencyTable`].
///
/// Pure function: permuting the input changes neither the counts nor the
/// output order.
pub fn aggregate(reports: &[InstrumentReport]) -> FrequencyTable {
    FrequencyTable::from_reports(reports)
}

// ============================================================
// PARALLEL CLASSIFICATION
// ============================================================

use rayon::prelude::*;

/// Error from classifying a single instrument
#[derive(Debug)]
pub struct ClassifyError {
    pub symbol: String,
    pub error: PatternError,
}

/// Classify many instruments in parallel.
///
/// Returns the reports of every series with enough history (two or more
/// bars), plus the per-instrument errors. Instruments with insufficient
/// history are skipped, matching the engine's absent-report contract.
pub fn classify_parallel<'a, T, I>(
    engine: &PatternEngine,
    instruments: I,
) -> (Vec<InstrumentReport>, Vec<ClassifyError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .classify(symbol, bars)
                .map_err(|error| ClassifyError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut reports = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(e) => errors.push(e),
        }
    }

    (reports, errors)
}

// ============================================================
// TESTS
// ============================================================
