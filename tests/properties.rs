//! Property tests for the classification engine and the aggregator.

use candlescan::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl OHLCV for TestBar {
    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        1000.0
    }
}

fn engine() -> PatternEngine {
    EngineBuilder::new().with_defaults().build().unwrap()
}

/// Any bar satisfying the OHLC ordering invariant
fn arb_bar() -> impl Strategy<Value = TestBar> {
    (1.0f64..1000.0, 0.0f64..100.0, 0.0f64..=1.0, 0.0f64..=1.0).prop_map(
        |(low, range, open_frac, close_frac)| TestBar {
            o: low + open_frac * range,
            h: low + range,
            l: low,
            c: low + close_frac * range,
        },
    )
}

/// A bar with zero range (all four prices equal)
fn flat_bar() -> impl Strategy<Value = TestBar> {
    (1.0f64..1000.0).prop_map(|p| TestBar {
        o: p,
        h: p,
        l: p,
        c: p,
    })
}

/// A bar with zero body but arbitrary shadows
fn zero_body_bar() -> impl Strategy<Value = TestBar> {
    (1.0f64..1000.0, 0.0f64..100.0, 0.0f64..=1.0).prop_map(|(low, range, body_frac)| {
        let price = low + body_frac * range;
        TestBar {
            o: price,
            h: low + range,
            l: low,
            c: price,
        }
    })
}

fn classify_pair(prev: TestBar, curr: TestBar) -> Vec<Pattern> {
    engine()
        .classify("PROP", &[prev, curr])
        .unwrap()
        .unwrap()
        .patterns
}

proptest! {
    /// Zero-range bars never match Doji or Marubozu
    #[test]
    fn zero_range_excludes_doji_and_marubozu(prev in arb_bar(), curr in flat_bar()) {
        let patterns = classify_pair(prev, curr);
        prop_assert!(!patterns.contains(&Pattern::Doji));
        prop_assert!(!patterns.contains(&Pattern::BullishMarubozu));
        prop_assert!(!patterns.contains(&Pattern::BearishMarubozu));
    }

    /// Zero-body bars never match Hammer or Shooting Star
    #[test]
    fn zero_body_excludes_hammer_and_star(prev in arb_bar(), curr in zero_body_bar()) {
        let patterns = classify_pair(prev, curr);
        prop_assert!(!patterns.contains(&Pattern::Hammer));
        prop_assert!(!patterns.contains(&Pattern::ShootingStar));
    }

    /// Hammer and Shooting Star are mutually exclusive on any bar
    #[test]
    fn hammer_and_star_are_exclusive(prev in arb_bar(), curr in arb_bar()) {
        let patterns = classify_pair(prev, curr);
        prop_assert!(
            !(patterns.contains(&Pattern::Hammer) && patterns.contains(&Pattern::ShootingStar))
        );
    }

    /// The two engulfing patterns are mutually exclusive on any bar pair
    #[test]
    fn engulfing_patterns_are_exclusive(prev in arb_bar(), curr in arb_bar()) {
        let patterns = classify_pair(prev, curr);
        prop_assert!(
            !(patterns.contains(&Pattern::BullishEngulfing)
                && patterns.contains(&Pattern::BearishEngulfing))
        );
    }

    /// classify is a pure function: same input, same output
    #[test]
    fn classify_is_idempotent(prev in arb_bar(), curr in arb_bar()) {
        let engine = engine();
        let bars = [prev, curr];
        let first = engine.classify("PROP", &bars).unwrap().unwrap();
        let second = engine.classify("PROP", &bars).unwrap().unwrap();
        prop_assert_eq!(first.patterns, second.patterns);
        prop_assert_eq!(first.price_change_pct, second.price_change_pct);
        prop_assert_eq!(first.time, second.time);
    }

    /// Per-pattern counts do not depend on report order
    #[test]
    fn aggregation_is_order_independent(
        sets in prop::collection::vec(
            prop::sample::subsequence(Pattern::ALL.to_vec(), 0..=Pattern::ALL.len()),
            0..16,
        )
    ) {
        let reports: Vec<InstrumentReport> = sets
            .into_iter()
            .enumerate()
            .map(|(i, patterns)| InstrumentReport {
                symbol: format!("SYM{i}"),
                time: "n/a".to_string(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                patterns,
                price_change_pct: 0.0,
            })
            .collect();

        let mut permuted = reports.clone();
        permuted.reverse();
        if permuted.len() > 2 {
            let mid = permuted.len() / 2;
            permuted.rotate_left(mid);
        }

        let a = aggregate(&reports);
        let b = aggregate(&permuted);
        for pattern in Pattern::ALL {
            prop_assert_eq!(a.count(pattern), b.count(pattern));
        }
        // The declared tie-break makes even the entry order identical
        prop_assert_eq!(a.entries(), b.entries());
    }
}
