//! Two-bar candlestick pattern detectors
//!
//! Patterns: Bullish Engulfing, Bearish Engulfing.
//!
//! Both require the current bar's body to strictly contain the previous
//! bar's body on both ends, with opposite candle directions. The directional
//! preconditions are complementary, so the two patterns are mutually
//! exclusive for any bar pair.

use crate::{OHLCVExt, Pattern, PatternDetector, OHLCV};

impl_with_defaults!(BullishEngulfingDetector, BearishEngulfingDetector);

/// Strict body containment: `curr` body covers `prev` body on both ends
#[inline]
fn engulfs<T: OHLCV>(prev: &T, curr: &T) -> bool {
    curr.body_low() < prev.body_low() && curr.body_high() > prev.body_high()
}

/// Bullish Engulfing - a bearish bar followed by a larger bullish bar whose
/// body strictly contains the previous body
#[derive(Debug, Clone, Copy, Default)]
pub struct BullishEngulfingDetector;

impl PatternDetector for BullishEngulfingDetector {
    fn name(&self) -> &'static str {
        "Bullish Engulfing"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, prev: Option<&T>, curr: &T) -> Option<Pattern> {
        let prev = prev?;
        (prev.is_bearish() && curr.is_bullish() && engulfs(prev, curr))
            .then_some(Pattern::BullishEngulfing)
    }
}

/// Bearish Engulfing - the mirror: a bullish bar followed by a larger bearish
/// bar whose body strictly contains the previous body
#[derive(Debug, Clone, Copy, Default)]
pub struct BearishEngulfingDetector;

impl PatternDetector for BearishEngulfingDetector {
    fn name(&self) -> &'static str {
        "Bearish Engulfing"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, prev: Option<&T>, curr: &T) -> Option<Pattern> {
        let prev = prev?;
        (prev.is_bullish() && curr.is_bearish() && engulfs(prev, curr))
            .then_some(Pattern::BearishEngulfing)
    }
}
