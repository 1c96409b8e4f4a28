use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use common::{HoldingsHistory, DATE_FORMAT};

use crate::PbydError;

/// Minimum age, in days, of the reference holdings entry.
pub const LOOKBACK_DAYS: i64 = 365;

/// Displayed in place of a value when any stage fails.
pub const NOT_AVAILABLE: &str = "N/A";

/// Holdings entry chosen as the yield baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalHoldings {
    pub btc_amount: i64,
    pub date: NaiveDate,
    pub days_ago: i64,
}

/// Outcome of one pipeline stage, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace<T> {
    pub success: bool,
    pub value: Option<T>,
    pub reason: Option<String>,
}

impl<T: Clone> From<&Result<T, PbydError>> for StageTrace<T> {
    fn from(result: &Result<T, PbydError>) -> Self {
        match result {
            Ok(v) => StageTrace {
                success: true,
                value: Some(v.clone()),
                reason: None,
            },
            Err(e) => StageTrace {
                success: false,
                value: None,
                reason: Some(e.to_string()),
            },
        }
    }
}

/// Every intermediate value the pipeline reached, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PbydDebugInfo {
    pub reference_date: String,
    pub current_btc_holdings: f64,
    pub mnav: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_lookup: Option<StageTrace<HistoricalHoldings>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_calculation: Option<StageTrace<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pbyd_calculation: Option<StageTrace<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PbydResult {
    /// Ratio formatted to two decimals, or "N/A".
    pub value: String,
    pub reason: Option<String>,
    pub debug_info: PbydDebugInfo,
}

impl PbydResult {
    pub fn is_available(&self) -> bool {
        self.reason.is_none()
    }
}

/// Most recent holdings entry dated at least `LOOKBACK_DAYS` before
/// `reference_date`.
///
/// Ties resolve to the latest qualifying date, not the one closest to
/// exactly a year. Keys that are not `YYYY-MM-DD` are skipped.
pub fn find_historical_holdings(
    history: &HoldingsHistory,
    reference_date: NaiveDate,
) -> Result<HistoricalHoldings, PbydError> {
    if history.is_empty() {
        return Err(PbydError::NoHoldingsData);
    }

    let target = reference_date - Duration::days(LOOKBACK_DAYS);

    let best = history
        .iter()
        .filter_map(|(key, entry)| match NaiveDate::parse_from_str(key, DATE_FORMAT) {
            Ok(date) => Some((key, date, entry)),
            Err(_) => {
                warn!(date = %key, "Invalid date format in BTC holdings data");
                None
            }
        })
        .filter(|(_, date, _)| *date <= target)
        .max_by_key(|(_, date, _)| *date);

    let Some((key, date, entry)) = best else {
        return Err(PbydError::NoHistoricalData);
    };

    let days_ago = (reference_date - date).num_days();
    match entry.btc {
        Some(btc_amount) if btc_amount > 0 => Ok(HistoricalHoldings {
            btc_amount,
            date,
            days_ago,
        }),
        _ => Err(PbydError::InvalidHistoricalAmount {
            date: key.clone(),
            days_ago,
        }),
    }
}

/// `(current / historical) ^ (365 / actual_days) - 1`.
pub fn annualized_yield(current: f64, historical: f64, actual_days: i64) -> Result<f64, PbydError> {
    // Negated comparisons so NaN is rejected too.
    if !(current > 0.0) {
        return Err(PbydError::InvalidCurrentHoldings);
    }
    if !(historical > 0.0) {
        return Err(PbydError::InvalidHistoricalHoldings);
    }
    if actual_days <= 0 {
        return Err(PbydError::InvalidPeriod);
    }

    let growth_ratio = current / historical;
    if !(growth_ratio > 0.0) {
        return Err(PbydError::InvalidGrowthRatio);
    }

    let exponent = LOOKBACK_DAYS as f64 / actual_days as f64;
    let annualized = growth_ratio.powf(exponent);
    if !annualized.is_finite() {
        return Err(PbydError::YieldOverflow {
            growth_ratio,
            exponent,
        });
    }
    Ok(annualized - 1.0)
}

/// `ln(mNAV) / ln(1 + annualized_yield)`.
pub fn pbyd_ratio(mnav: f64, annualized_yield: f64) -> Result<f64, PbydError> {
    if !(mnav > 0.0) {
        return Err(PbydError::InvalidMnav);
    }

    let yield_plus_one = 1.0 + annualized_yield;
    if !(yield_plus_one > 0.0) {
        return Err(PbydError::LogDomain { yield_plus_one });
    }

    let log_yield = yield_plus_one.ln();
    if log_yield == 0.0 {
        return Err(PbydError::DivisionByZero);
    }
    Ok(mnav.ln() / log_yield)
}

/// Full pipeline: validate inputs, find the year-old baseline, annualize the
/// holdings growth and take the log ratio against mNAV.
///
/// Never fails: any stage error turns into `"N/A"` with the stage's reason.
/// `reference_date` defaults to today (UTC).
pub fn calculate_full_pbyd(
    current_btc_holdings: f64,
    mnav: f64,
    history: &HoldingsHistory,
    reference_date: Option<NaiveDate>,
) -> PbydResult {
    let reference_date = reference_date.unwrap_or_else(|| Utc::now().date_naive());
    let mut debug_info = PbydDebugInfo {
        reference_date: reference_date.format(DATE_FORMAT).to_string(),
        current_btc_holdings,
        mnav,
        ..Default::default()
    };

    let outcome = run_pipeline(current_btc_holdings, mnav, history, reference_date, &mut debug_info);
    match outcome {
        Ok(pbyd) => {
            let formatted = format!("{pbyd:.2}");
            debug!(pbyd = %formatted, "P/BYD calculated");
            debug_info.final_value = Some(formatted.clone());
            PbydResult {
                value: formatted,
                reason: None,
                debug_info,
            }
        }
        Err(e) => {
            debug!(reason = %e, "P/BYD not available");
            PbydResult {
                value: NOT_AVAILABLE.to_string(),
                reason: Some(e.to_string()),
                debug_info,
            }
        }
    }
}

fn run_pipeline(
    current_btc_holdings: f64,
    mnav: f64,
    history: &HoldingsHistory,
    reference_date: NaiveDate,
    debug_info: &mut PbydDebugInfo,
) -> Result<f64, PbydError> {
    if !(current_btc_holdings > 0.0) {
        return Err(PbydError::MissingCurrentHoldings);
    }
    if !(mnav > 0.0) {
        return Err(PbydError::MissingMnav);
    }

    let lookup = find_historical_holdings(history, reference_date);
    debug_info.historical_lookup = Some((&lookup).into());
    let historical = lookup?;

    let yield_result = annualized_yield(
        current_btc_holdings,
        historical.btc_amount as f64,
        historical.days_ago,
    );
    debug_info.yield_calculation = Some((&yield_result).into());
    let annualized = yield_result?;

    let pbyd_result = pbyd_ratio(mnav, annualized);
    debug_info.pbyd_calculation = Some((&pbyd_result).into());
    pbyd_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::HoldingsEntry;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn history(entries: &[(&str, i64)]) -> HoldingsHistory {
        entries
            .iter()
            .map(|(d, btc)| (d.to_string(), HoldingsEntry::new(*btc)))
            .collect()
    }

    fn sample_history() -> HoldingsHistory {
        history(&[
            ("2024-07-21", 226_331),
            ("2024-06-20", 220_000),
            ("2023-07-21", 152_333),
        ])
    }

    #[test]
    fn full_pipeline_on_known_inputs() {
        let result = calculate_full_pbyd(607_770.0, 2.5, &sample_history(), Some(day("2025-07-21")));
        assert_eq!(result.value, "0.93");
        assert!(result.reason.is_none());
        assert!(result.is_available());

        let lookup = result.debug_info.historical_lookup.unwrap().value.unwrap();
        assert_eq!(lookup.btc_amount, 226_331);
        assert_eq!(lookup.days_ago, 365);

        let y = result.debug_info.yield_calculation.unwrap().value.unwrap();
        assert!((y - (607_770.0 / 226_331.0 - 1.0)).abs() < 1e-9, "yield {y}");
        assert!((y - 1.6853).abs() < 1e-3);
        assert_eq!(result.debug_info.final_value.as_deref(), Some("0.93"));
    }

    #[test]
    fn lookup_prefers_latest_qualifying_date() {
        let reference = day("2025-07-21");
        let h = history(&[
            ("2024-06-16", 100), // 400 days ago
            ("2024-07-16", 200), // 370 days ago
            ("2024-12-01", 300), // too recent
        ]);
        let found = find_historical_holdings(&h, reference).unwrap();
        assert_eq!(found.btc_amount, 200);
        assert_eq!(found.days_ago, 370);
        assert_eq!(found.date, day("2024-07-16"));
    }

    #[test]
    fn lookup_skips_malformed_dates() {
        let h = history(&[("July 2023", 1), ("2023-07-01", 150_000)]);
        let found = find_historical_holdings(&h, day("2025-07-21")).unwrap();
        assert_eq!(found.btc_amount, 150_000);
    }

    #[test]
    fn lookup_rejects_non_positive_chosen_amount() {
        // An older valid entry does not rescue an invalid latest one.
        let h = history(&[("2023-01-01", 100_000), ("2024-07-01", 0)]);
        let err = find_historical_holdings(&h, day("2025-07-21")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid BTC amount for date 2024-07-01");

        let mut h = HoldingsHistory::new();
        h.insert("2024-07-01".into(), HoldingsEntry { btc: None });
        assert!(matches!(
            find_historical_holdings(&h, day("2025-07-21")),
            Err(PbydError::InvalidHistoricalAmount { days_ago: 385, .. })
        ));
    }

    #[test]
    fn empty_history_reports_no_data() {
        let result = calculate_full_pbyd(607_770.0, 2.5, &HoldingsHistory::new(), Some(day("2025-07-21")));
        assert_eq!(result.value, "N/A");
        assert_eq!(result.reason.as_deref(), Some("No BTC holdings data available"));
    }

    #[test]
    fn recent_only_history_reports_no_historical_data() {
        let h = history(&[("2025-01-01", 450_000)]);
        let result = calculate_full_pbyd(607_770.0, 2.5, &h, Some(day("2025-07-21")));
        assert_eq!(result.value, "N/A");
        assert_eq!(result.reason.as_deref(), Some("No historical data ≥365 days ago"));
        let trace = result.debug_info.historical_lookup.unwrap();
        assert!(!trace.success);
        assert!(result.debug_info.yield_calculation.is_none());
    }

    #[test]
    fn input_validation_short_circuits() {
        let r = calculate_full_pbyd(0.0, 2.5, &sample_history(), Some(day("2025-07-21")));
        assert_eq!(r.reason.as_deref(), Some("Missing current BTC holdings"));
        assert!(r.debug_info.historical_lookup.is_none());

        let r = calculate_full_pbyd(607_770.0, -1.0, &sample_history(), Some(day("2025-07-21")));
        assert_eq!(r.reason.as_deref(), Some("Missing mNAV data"));

        let r = calculate_full_pbyd(f64::NAN, 2.5, &sample_history(), Some(day("2025-07-21")));
        assert_eq!(r.value, "N/A");
    }

    #[test]
    fn flat_holdings_divide_by_zero() {
        let h = history(&[("2024-07-21", 500_000)]);
        let r = calculate_full_pbyd(500_000.0, 2.5, &h, Some(day("2025-07-21")));
        assert_eq!(r.value, "N/A");
        assert_eq!(r.reason.as_deref(), Some("Division by zero (log(1+yield)=0)"));
        let trace = r.debug_info.yield_calculation.unwrap();
        assert_eq!(trace.value, Some(0.0));
        assert!(!r.debug_info.pbyd_calculation.unwrap().success);
    }

    #[test]
    fn annualized_yield_compounds_over_two_years() {
        let y = annualized_yield(200.0, 100.0, 730).unwrap();
        assert!((y - (2f64.sqrt() - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn annualized_yield_guards() {
        assert_eq!(annualized_yield(0.0, 1.0, 365), Err(PbydError::InvalidCurrentHoldings));
        assert_eq!(annualized_yield(1.0, -5.0, 365), Err(PbydError::InvalidHistoricalHoldings));
        assert_eq!(annualized_yield(1.0, 1.0, 0), Err(PbydError::InvalidPeriod));
        assert!(matches!(
            annualized_yield(1e300, 1e-300, 1),
            Err(PbydError::YieldOverflow { .. })
        ));
    }

    #[test]
    fn pbyd_ratio_guards() {
        assert_eq!(pbyd_ratio(0.0, 0.5), Err(PbydError::InvalidMnav));
        assert!(matches!(pbyd_ratio(2.0, -1.0), Err(PbydError::LogDomain { .. })));
        assert_eq!(pbyd_ratio(2.0, 0.0), Err(PbydError::DivisionByZero));
        assert_eq!(
            pbyd_ratio(2.0, -1.5).unwrap_err().to_string(),
            "Invalid yield for log calculation (1+yield=-0.500000)"
        );
    }

    #[test]
    fn pbyd_ratio_at_par_is_zero() {
        assert_eq!(pbyd_ratio(1.0, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn error_kinds_map_to_common_errors() {
        assert!(matches!(
            common::Error::from(PbydError::DivisionByZero),
            common::Error::Domain(_)
        ));
        assert!(matches!(
            common::Error::from(PbydError::InvalidMnav),
            common::Error::InvalidInput(_)
        ));
    }

    #[test]
    fn debug_info_serializes_stage_traces() {
        let result = calculate_full_pbyd(607_770.0, 2.5, &sample_history(), Some(day("2025-07-21")));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["value"], "0.93");
        assert_eq!(json["debug_info"]["reference_date"], "2025-07-21");
        assert_eq!(json["debug_info"]["historical_lookup"]["value"]["date"], "2024-07-21");
        assert_eq!(json["debug_info"]["pbyd_calculation"]["success"], true);
    }
}
