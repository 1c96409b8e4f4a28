use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Date format used for every persisted date string.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw record handed over by the collectors.
///
/// Every field is optional; missing or non-finite values are read as zero,
/// which yields a degenerate "conditions not met" analysis instead of an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketInput {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub indicators: IndicatorValues,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorValues {
    #[serde(default)]
    pub ema_200: Option<f64>,
    #[serde(default)]
    pub weekly_rsi: Option<f64>,
    #[serde(default)]
    pub mvrv: Option<f64>,
}

impl MarketInput {
    pub fn snapshot(&self) -> MarketSnapshot {
        MarketSnapshot {
            price: or_zero(self.price),
            ema_200: or_zero(self.indicators.ema_200),
            weekly_rsi: or_zero(self.indicators.weekly_rsi),
            mvrv: or_zero(self.indicators.mvrv),
        }
    }
}

fn or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Price and indicator values for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price: f64,
    pub ema_200: f64,
    pub weekly_rsi: f64,
    pub mvrv: f64,
}

impl From<MarketSnapshot> for MarketInput {
    fn from(s: MarketSnapshot) -> Self {
        MarketInput {
            price: Some(s.price),
            indicators: IndicatorValues {
                ema_200: Some(s.ema_200),
                weekly_rsi: Some(s.weekly_rsi),
                mvrv: Some(s.mvrv),
            },
        }
    }
}

/// Direction of a BTC cycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
        }
    }

    /// Parse the persisted form. Anything other than "BUY"/"SELL" is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(SignalType::Buy),
            "SELL" => Some(SignalType::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market regime relative to the 200-day EMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Bull,
    Bear,
}

impl std::fmt::Display for MarketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketType::Bull => write!(f, "bull"),
            MarketType::Bear => write!(f, "bear"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<")]
    Below,
}

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => value > threshold,
            Comparison::Below => value < threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Above => ">",
            Comparison::Below => "<",
        }
    }
}

/// Evaluation of one indicator against its fixed threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionStatus {
    pub value: f64,
    pub condition_met: bool,
    pub threshold: f64,
    pub operator: Comparison,
    pub description: String,
}

/// Per-run evaluation of the signal conditions. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCondition {
    pub signal_type: SignalType,
    pub both_conditions_met: bool,
    pub mvrv: ConditionStatus,
    pub rsi: ConditionStatus,
    pub market_type: MarketType,
}

/// Flat persisted form of the signal state, keyed by
/// `("SIGNAL_STATE", "CURRENT")`.
///
/// Empty strings stand for "unset". `days_active` is written for display
/// only and recomputed whenever the record is read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalStateRecord {
    pub active: bool,
    pub signal_type: String,
    pub start_date: String,
    pub end_date: String,
    pub conditions_failing_since: String,
    pub last_updated: String,
    pub days_active: i64,
}

/// User-facing classification of the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Active,
    Weakening,
    RecentlyOff,
    #[serde(rename = "none")]
    NoSignal,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusKind::Active => write!(f, "active"),
            StatusKind::Weakening => write!(f, "weakening"),
            StatusKind::RecentlyOff => write!(f, "recently_off"),
            StatusKind::NoSignal => write!(f, "none"),
        }
    }
}

/// Display-ready status handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalStatus {
    pub status: StatusKind,
    pub message: String,
    pub emoji: String,
    pub prediction: String,
    pub days_active: i64,
    pub start_date: String,
    pub end_date: String,
}

/// One entry of the BTC holdings ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HoldingsEntry {
    #[serde(default)]
    pub btc: Option<i64>,
}

impl HoldingsEntry {
    pub fn new(btc: i64) -> Self {
        Self { btc: Some(btc) }
    }
}

/// ISO date string → holdings on that date.
pub type HoldingsHistory = BTreeMap<String, HoldingsEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_read_as_zero() {
        let input: MarketInput =
            serde_json::from_str(r#"{"price": 95000.0, "indicators": {"mvrv": 2.1}}"#).unwrap();
        let snap = input.snapshot();
        assert_eq!(snap.price, 95000.0);
        assert_eq!(snap.ema_200, 0.0);
        assert_eq!(snap.weekly_rsi, 0.0);
        assert_eq!(snap.mvrv, 2.1);
    }

    #[test]
    fn non_finite_values_read_as_zero() {
        let input = MarketInput {
            price: Some(f64::NAN),
            indicators: IndicatorValues {
                ema_200: Some(f64::INFINITY),
                weekly_rsi: None,
                mvrv: Some(1.5),
            },
        };
        let snap = input.snapshot();
        assert_eq!(snap.price, 0.0);
        assert_eq!(snap.ema_200, 0.0);
        assert_eq!(snap.mvrv, 1.5);
    }

    #[test]
    fn status_kind_serializes_to_legacy_names() {
        assert_eq!(serde_json::to_string(&StatusKind::RecentlyOff).unwrap(), "\"recently_off\"");
        assert_eq!(serde_json::to_string(&StatusKind::NoSignal).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&Comparison::Above).unwrap(), "\">\"");
    }

    #[test]
    fn signal_type_parse_rejects_unknown() {
        assert_eq!(SignalType::parse("SELL"), Some(SignalType::Sell));
        assert_eq!(SignalType::parse("BUY"), Some(SignalType::Buy));
        assert_eq!(SignalType::parse(""), None);
        assert_eq!(SignalType::parse("buy"), None);
    }
}
