//! Single-bar candlestick pattern detectors
//!
//! Patterns: Doji, Hammer, Shooting Star, Marubozu (bullish/bearish).
//!
//! All predicates work on the derived bar quantities: body, full range and
//! the two shadows. A bar with zero range never matches Doji or Marubozu; a
//! bar with zero body never matches Hammer or Shooting Star.

use crate::{OHLCVExt, Pattern, PatternDetector, PatternError, Ratio, Result, OHLCV};

/// Maximum body/range ratio for a Doji
pub const DOJI_TOLERANCE: f64 = 0.10;
/// Maximum shadow share of the range for a Marubozu (body/range >= 1 - this)
pub const MARUBOZU_TOLERANCE: f64 = 0.05;
/// Dominant shadow must be at least this multiple of the body
pub const SHADOW_BODY_RATIO: f64 = 2.0;
/// Opposite shadow may be at most this multiple of the body
pub const COUNTER_SHADOW_RATIO: f64 = 0.5;

impl_with_defaults!(
    DojiDetector,
    HammerDetector,
    ShootingStarDetector,
    MarubozuDetector,
);

// ============================================================
// DOJI
// ============================================================

/// Doji - body small relative to the full range (open close to close)
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub tolerance: Ratio,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(DOJI_TOLERANCE),
        }
    }
}

impl PatternDetector for DojiDetector {
    fn name(&self) -> &'static str {
        "Doji"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, _prev: Option<&T>, curr: &T) -> Option<Pattern> {
        // Zero-range bars are explicitly excluded, not treated as trivial dojis
        let body_ratio = curr.body_ratio()?;
        (body_ratio <= self.tolerance.get()).then_some(Pattern::Doji)
    }
}

// ============================================================
// HAMMER / SHOOTING STAR
// ============================================================

/// Hammer - long lower shadow, short body and upper shadow
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub shadow_body_ratio: f64,
    pub counter_shadow_ratio: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            shadow_body_ratio: SHADOW_BODY_RATIO,
            counter_shadow_ratio: COUNTER_SHADOW_RATIO,
        }
    }
}

impl PatternDetector for HammerDetector {
    fn name(&self) -> &'static str {
        "Hammer"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, _prev: Option<&T>, curr: &T) -> Option<Pattern> {
        let body = curr.body();
        if body <= 0.0 {
            return None;
        }

        let lower = curr.lower_shadow();
        let upper = curr.upper_shadow();

        (lower >= self.shadow_body_ratio * body
            && upper <= self.counter_shadow_ratio * body
            && lower > 0.0)
            .then_some(Pattern::Hammer)
    }

    fn validate_config(&self) -> Result<()> {
        validate_shadow_ratios(self.shadow_body_ratio, self.counter_shadow_ratio)
    }
}

/// Shooting Star - the mirror of Hammer: long upper shadow, short body and
/// lower shadow. The two cannot match the same bar once the body is positive.
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarDetector {
    pub shadow_body_ratio: f64,
    pub counter_shadow_ratio: f64,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            shadow_body_ratio: SHADOW_BODY_RATIO,
            counter_shadow_ratio: COUNTER_SHADOW_RATIO,
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn name(&self) -> &'static str {
        "Shooting Star"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, _prev: Option<&T>, curr: &T) -> Option<Pattern> {
        let body = curr.body();
        if body <= 0.0 {
            return None;
        }

        let lower = curr.lower_shadow();
        let upper = curr.upper_shadow();

        (upper >= self.shadow_body_ratio * body
            && lower <= self.counter_shadow_ratio * body
            && upper > 0.0)
            .then_some(Pattern::ShootingStar)
    }

    fn validate_config(&self) -> Result<()> {
        validate_shadow_ratios(self.shadow_body_ratio, self.counter_shadow_ratio)
    }
}

fn validate_shadow_ratios(shadow_body: f64, counter_shadow: f64) -> Result<()> {
    if !shadow_body.is_finite() || shadow_body <= 0.0 {
        return Err(PatternError::InvalidConfig(format!(
            "shadow_body_ratio must be finite and positive, got {shadow_body}"
        )));
    }
    if !counter_shadow.is_finite() || counter_shadow < 0.0 {
        return Err(PatternError::InvalidConfig(format!(
            "counter_shadow_ratio must be finite and non-negative, got {counter_shadow}"
        )));
    }
    Ok(())
}

// ============================================================
// MARUBOZU
// ============================================================

/// Marubozu - body occupies nearly the full range (minimal shadows),
/// sub-classified bullish or bearish by close vs open
#[derive(Debug, Clone, Copy)]
pub struct MarubozuDetector {
    pub tolerance: Ratio,
}

impl Default for MarubozuDetector {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(MARUBOZU_TOLERANCE),
        }
    }
}

impl PatternDetector for MarubozuDetector {
    fn name(&self) -> &'static str {
        "Marubozu"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, _prev: Option<&T>, curr: &T) -> Option<Pattern> {
        // Same zero-range exclusion as Doji
        let body_ratio = curr.body_ratio()?;
        if body_ratio < 1.0 - self.tolerance.get() {
            return None;
        }

        // body_ratio >= 0.95 with positive range forces open != close
        Some(if curr.is_bullish() {
            Pattern::BullishMarubozu
        } else {
            Pattern::BearishMarubozu
        })
    }
}
