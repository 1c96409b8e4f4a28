use chrono::{Duration, NaiveDate};
use common::{MarketSnapshot, StatusKind};
use proptest::prelude::*;
use strategy::{analyze, ema, rsi, SignalState};

fn closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01f64..1_000_000.0f64, 15..300)
}

proptest! {
    /// RSI stays within [0, 100] for any positive price series.
    #[test]
    fn rsi_is_bounded(prices in closes(), period in 1usize..15) {
        let value = rsi(&prices, period).unwrap();
        prop_assert!((0.0..=100.0).contains(&value), "RSI out of range: {}", value);
    }

    /// Indicator functions are pure: repeated calls agree bit for bit.
    #[test]
    fn indicators_are_deterministic(prices in closes(), period in 1usize..15) {
        prop_assert_eq!(ema(&prices, period).unwrap().to_bits(), ema(&prices, period).unwrap().to_bits());
        prop_assert_eq!(rsi(&prices, period).unwrap().to_bits(), rsi(&prices, period).unwrap().to_bits());
    }

    /// EMA never leaves the range spanned by its inputs.
    #[test]
    fn ema_is_within_input_range(prices in closes(), period in 1usize..15) {
        let value = ema(&prices, period).unwrap();
        let lo = prices.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(value >= lo - 1e-6 && value <= hi + 1e-6);
    }

    /// Any sequence of daily snapshots yields a consistent state and status.
    #[test]
    fn analysis_keeps_record_invariants(
        days in prop::collection::vec(
            (0.0f64..200_000.0, 0.0f64..200_000.0, 0.0f64..100.0, 0.0f64..6.0, 1i64..40),
            1..60,
        )
    ) {
        let mut today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut state = SignalState::default();

        for (price, ema_200, weekly_rsi, mvrv, step) in days {
            today += Duration::days(step);
            let snapshot = MarketSnapshot { price, ema_200, weekly_rsi, mvrv };
            let (condition, next, status) = analyze(&snapshot, &state, today);
            let record = next.to_record(today);

            prop_assert_eq!(record.last_updated.clone(), today.format("%Y-%m-%d").to_string());
            if !record.conditions_failing_since.is_empty() {
                prop_assert!(record.active);
            }
            if !record.end_date.is_empty() {
                prop_assert!(!record.active);
            }
            prop_assert!(record.days_active >= 0);
            match status.status {
                StatusKind::Active => prop_assert!(record.active && condition.both_conditions_met),
                StatusKind::Weakening => prop_assert!(record.active && !condition.both_conditions_met),
                StatusKind::RecentlyOff => prop_assert!(!record.active && !record.end_date.is_empty()),
                StatusKind::NoSignal => prop_assert!(!record.active && record.end_date.is_empty()),
            }
            prop_assert_eq!(SignalState::from_record(&record).unwrap(), next.clone());
            state = next;
        }
    }
}
