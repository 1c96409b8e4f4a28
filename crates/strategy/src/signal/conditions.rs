use common::{Comparison, ConditionStatus, MarketSnapshot, MarketType, SignalCondition, SignalType};

/// Bull market: MVRV must exceed this for a SELL signal.
pub const SELL_MVRV_THRESHOLD: f64 = 3.0;
/// Bull market: weekly RSI must exceed this for a SELL signal.
pub const SELL_RSI_THRESHOLD: f64 = 70.0;
/// Bear market: MVRV must be below this for a BUY signal.
pub const BUY_MVRV_THRESHOLD: f64 = 1.0;
/// Bear market: weekly RSI must be below this for a BUY signal.
pub const BUY_RSI_THRESHOLD: f64 = 30.0;

struct Rule {
    threshold: f64,
    operator: Comparison,
    unmet: &'static str,
}

impl Rule {
    fn evaluate(&self, value: f64, met_description: &str) -> ConditionStatus {
        let condition_met = self.operator.holds(value, self.threshold);
        ConditionStatus {
            value,
            condition_met,
            threshold: self.threshold,
            operator: self.operator,
            description: if condition_met {
                met_description.to_string()
            } else {
                self.unmet.to_string()
            },
        }
    }
}

const SELL_MVRV: Rule = Rule {
    threshold: SELL_MVRV_THRESHOLD,
    operator: Comparison::Above,
    unmet: "Need >3.0 for sell signal",
};
const SELL_RSI: Rule = Rule {
    threshold: SELL_RSI_THRESHOLD,
    operator: Comparison::Above,
    unmet: "Need >70 for sell signal",
};
const BUY_MVRV: Rule = Rule {
    threshold: BUY_MVRV_THRESHOLD,
    operator: Comparison::Below,
    unmet: "Need <1.0 for buy signal",
};
const BUY_RSI: Rule = Rule {
    threshold: BUY_RSI_THRESHOLD,
    operator: Comparison::Below,
    unmet: "Need <30 for buy signal",
};

/// Regime from price vs. 200-day EMA. No hysteresis: a price equal to the
/// EMA counts as bull.
pub fn market_type(snapshot: &MarketSnapshot) -> MarketType {
    if snapshot.price >= snapshot.ema_200 {
        MarketType::Bull
    } else {
        MarketType::Bear
    }
}

/// Evaluate the SELL (bull) or BUY (bear) conditions for a snapshot.
pub fn evaluate(snapshot: &MarketSnapshot) -> SignalCondition {
    let market_type = market_type(snapshot);

    let (signal_type, mvrv, rsi) = match market_type {
        MarketType::Bull => (
            SignalType::Sell,
            SELL_MVRV.evaluate(snapshot.mvrv, "Sell signal condition met"),
            SELL_RSI.evaluate(snapshot.weekly_rsi, "Sell signal condition met"),
        ),
        MarketType::Bear => (
            SignalType::Buy,
            BUY_MVRV.evaluate(snapshot.mvrv, "Buy signal condition met"),
            BUY_RSI.evaluate(snapshot.weekly_rsi, "Buy signal condition met"),
        ),
    };

    SignalCondition {
        signal_type,
        both_conditions_met: mvrv.condition_met && rsi.condition_met,
        mvrv,
        rsi,
        market_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(price: f64, ema_200: f64, mvrv: f64, weekly_rsi: f64) -> MarketSnapshot {
        MarketSnapshot {
            price,
            ema_200,
            weekly_rsi,
            mvrv,
        }
    }

    #[test]
    fn bull_market_meets_sell_conditions() {
        let c = evaluate(&snap(100.0, 90.0, 3.1, 71.0));
        assert_eq!(c.market_type, MarketType::Bull);
        assert_eq!(c.signal_type, SignalType::Sell);
        assert!(c.both_conditions_met);
        assert_eq!(c.mvrv.description, "Sell signal condition met");
    }

    #[test]
    fn sell_thresholds_are_strict() {
        let c = evaluate(&snap(100.0, 90.0, 3.0, 71.0));
        assert!(!c.mvrv.condition_met);
        assert!(c.rsi.condition_met);
        assert!(!c.both_conditions_met);
        assert_eq!(c.mvrv.description, "Need >3.0 for sell signal");

        let c = evaluate(&snap(100.0, 90.0, 3.5, 70.0));
        assert!(!c.rsi.condition_met);
        assert_eq!(c.rsi.description, "Need >70 for sell signal");
    }

    #[test]
    fn bear_market_meets_buy_conditions() {
        let c = evaluate(&snap(45_000.0, 60_000.0, 0.8, 25.0));
        assert_eq!(c.market_type, MarketType::Bear);
        assert_eq!(c.signal_type, SignalType::Buy);
        assert!(c.both_conditions_met);
        assert_eq!(c.rsi.operator, Comparison::Below);
        assert_eq!(c.rsi.threshold, 30.0);
    }

    #[test]
    fn buy_thresholds_are_strict() {
        let c = evaluate(&snap(45_000.0, 60_000.0, 1.0, 30.0));
        assert!(!c.mvrv.condition_met);
        assert!(!c.rsi.condition_met);
        assert_eq!(c.mvrv.description, "Need <1.0 for buy signal");
        assert_eq!(c.rsi.description, "Need <30 for buy signal");
    }

    #[test]
    fn price_equal_to_ema_is_bull() {
        assert_eq!(market_type(&snap(90.0, 90.0, 0.0, 0.0)), MarketType::Bull);
    }

    #[test]
    fn zeroed_snapshot_meets_nothing() {
        let c = evaluate(&MarketSnapshot::default());
        assert_eq!(c.market_type, MarketType::Bull);
        assert!(!c.both_conditions_met);
    }
}
