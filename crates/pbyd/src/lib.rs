//! P/BYD (Price-to-Bitcoin-Yield-Delta): relates the mNAV premium to the
//! annualized growth rate of BTC holdings.
//!
//! `pbyd = ln(mNAV) / ln(1 + annualized_yield)`, where the yield is measured
//! against the most recent holdings entry at least 365 days old.

pub mod calculator;
pub mod error;

pub use calculator::{
    annualized_yield, calculate_full_pbyd, find_historical_holdings, pbyd_ratio,
    HistoricalHoldings, PbydDebugInfo, PbydResult, StageTrace, LOOKBACK_DAYS, NOT_AVAILABLE,
};
pub use error::PbydError;
