use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use common::{
    Error, MarketInput, MarketSnapshot, MarketType, Result, SignalCondition, SignalStateRecord,
    SignalStatus, SignalStore, SignalType, StatusKind,
};

use super::conditions;
use super::machine::SignalState;

const SELL_PREDICTION: &str = "Top is likely to be reached within 1-3 months";
const BUY_PREDICTION: &str = "Bottom is likely to be in 4-6 months";
const WEAKENING_PREDICTION: &str =
    "One parameter no longer met - signal may turn off if continues >30 days";

/// Indicator values echoed back in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorReadings {
    pub mvrv: f64,
    pub weekly_rsi: f64,
}

/// Complete result of one analysis run, ready for the notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalAnalysis {
    pub market_status: MarketType,
    pub is_bull_market: bool,
    pub price: f64,
    pub ema_200: f64,
    pub price_vs_ema_pct: f64,
    pub indicators: IndicatorReadings,
    pub signal_conditions: SignalCondition,
    pub signal_state: SignalStateRecord,
    pub signal_status: SignalStatus,
    pub analysis_timestamp: DateTime<Utc>,
}

/// Summary returned by `SignalAnalyzer::signal_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalHistory {
    pub current_signal: SignalStateRecord,
    pub period_days: u32,
    pub history_available: bool,
}

/// One step of the signal lifecycle: evaluate conditions, advance the state
/// machine and derive the display status. No I/O.
pub fn analyze(
    snapshot: &MarketSnapshot,
    previous: &SignalState,
    today: NaiveDate,
) -> (SignalCondition, SignalState, SignalStatus) {
    let condition = conditions::evaluate(snapshot);
    let next = previous.clone().advance(&condition, today);
    let status = derive_status(&next, condition.both_conditions_met, today);
    (condition, next, status)
}

/// Display status from the post-transition state and today's condition result.
pub fn derive_status(state: &SignalState, both_conditions_met: bool, today: NaiveDate) -> SignalStatus {
    let record = state.to_record(today);
    let label = record.signal_type.clone();

    let (status, message, emoji, prediction) = if state.is_active() {
        if both_conditions_met {
            let (emoji, prediction) = match state.signal_type() {
                Some(SignalType::Sell) => ("🔴", SELL_PREDICTION),
                _ => ("🟢", BUY_PREDICTION),
            };
            (
                StatusKind::Active,
                format!("{label} SIGNAL ACTIVE"),
                emoji,
                prediction.to_string(),
            )
        } else {
            (
                StatusKind::Weakening,
                format!("{label} SIGNAL WEAKENING"),
                "🟡",
                WEAKENING_PREDICTION.to_string(),
            )
        }
    } else if !record.end_date.is_empty() {
        (
            StatusKind::RecentlyOff,
            format!("{label} SIGNAL OFF"),
            "🟡",
            format!("Was active: {} to {}", record.start_date, record.end_date),
        )
    } else {
        (StatusKind::NoSignal, String::new(), "", String::new())
    };

    SignalStatus {
        status,
        message,
        emoji: emoji.to_string(),
        prediction,
        days_active: record.days_active,
        start_date: record.start_date,
        end_date: record.end_date,
    }
}

/// Drives the signal lifecycle against a persisted state record.
///
/// Persistence is best-effort: a missing, failing or unreadable store falls
/// back to the default (never-fired) state and analysis carries on.
pub struct SignalAnalyzer {
    store: Option<Arc<dyn SignalStore>>,
}

impl SignalAnalyzer {
    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Analyzer with no persistence; every run starts from the default state.
    pub fn without_store() -> Self {
        Self { store: None }
    }

    /// Analyze a collector record, persist the new state and build the report.
    pub async fn analyze_input(&self, input: &MarketInput, today: NaiveDate) -> SignalAnalysis {
        self.analyze_snapshot(&input.snapshot(), today).await
    }

    pub async fn analyze_snapshot(&self, snapshot: &MarketSnapshot, today: NaiveDate) -> SignalAnalysis {
        let previous = self.load_state().await;
        let (condition, next, status) = analyze(snapshot, &previous, today);

        let record = next.to_record(today);
        if let Err(e) = self.save_record(&record).await {
            match e {
                Error::StorageUnavailable(_) => {
                    warn!("No storage service available - signal state not persisted")
                }
                other => error!(error = %other, "Failed to save signal state"),
            }
        }

        debug!(
            market = %condition.market_type,
            signal = %condition.signal_type,
            both_met = condition.both_conditions_met,
            status = %status.status,
            "BTC signal analysis complete"
        );

        SignalAnalysis {
            market_status: condition.market_type,
            is_bull_market: condition.market_type == MarketType::Bull,
            price: snapshot.price,
            ema_200: snapshot.ema_200,
            price_vs_ema_pct: price_vs_ema_pct(snapshot),
            indicators: IndicatorReadings {
                mvrv: snapshot.mvrv,
                weekly_rsi: snapshot.weekly_rsi,
            },
            signal_conditions: condition,
            signal_state: record,
            signal_status: status,
            analysis_timestamp: Utc::now(),
        }
    }

    /// Current state, or the default state when nothing usable is stored.
    pub async fn load_state(&self) -> SignalState {
        let Some(store) = &self.store else {
            return SignalState::default();
        };

        match store.get().await {
            Ok(Some(record)) => SignalState::from_record(&record).unwrap_or_else(|e| {
                warn!(error = %e, "Stored signal state unreadable, using default");
                SignalState::default()
            }),
            Ok(None) => SignalState::default(),
            Err(e) => {
                error!(error = %e, "Error getting signal state, using default");
                SignalState::default()
            }
        }
    }

    /// Current state as a flat record with `days_active` derived for `today`.
    pub async fn current_state(&self, today: NaiveDate) -> SignalStateRecord {
        self.load_state().await.to_record(today)
    }

    pub async fn signal_history(&self, period_days: u32, today: NaiveDate) -> Result<SignalHistory> {
        if self.store.is_none() {
            return Err(Error::StorageUnavailable("no signal store configured".into()));
        }
        let current_signal = self.current_state(today).await;
        Ok(SignalHistory {
            history_available: !current_signal.start_date.is_empty(),
            current_signal,
            period_days,
        })
    }

    /// Restore the default state, stamped with `today`.
    /// Returns whether the reset reached the store.
    pub async fn reset_signal_state(&self, today: NaiveDate) -> bool {
        let state = SignalState {
            last_updated: Some(today),
            ..SignalState::default()
        };
        match self.save_record(&state.to_record(today)).await {
            Ok(()) => {
                info!("Signal state reset to default");
                true
            }
            Err(e) => {
                error!(error = %e, "Error resetting signal state");
                false
            }
        }
    }

    async fn save_record(&self, record: &SignalStateRecord) -> Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| Error::StorageUnavailable("no signal store configured".into()))?;
        store.put(record).await
    }
}

fn price_vs_ema_pct(snapshot: &MarketSnapshot) -> f64 {
    if snapshot.ema_200 > 0.0 {
        (snapshot.price - snapshot.ema_200) / snapshot.ema_200 * 100.0
    } else {
        0.0
    }
}
