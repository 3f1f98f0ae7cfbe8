//! Candlestick pattern detectors
//!
//! Every detector is a pure, stateless predicate over the latest bar (and,
//! for two-bar patterns, the previous bar) of an instrument's series.
//!
//! # Pattern Catalog
//!
//! - **Single-bar**: Doji, Hammer, Shooting Star, Marubozu (bullish/bearish)
//! - **Two-bar**: Bullish Engulfing, Bearish Engulfing

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
    ($($detector:ty),* $(,)?) => {
        $(impl $detector {
            pub fn with_defaults() -> Self {
                Self::default()
            }
        })*
    };
}

pub mod single_bar;
pub mod two_bar;

// Re-export all detectors for convenience
pub use single_bar::*;
pub use two_bar::*;
