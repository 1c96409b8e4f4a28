use thiserror::Error;

/// Why a P/BYD stage could not produce a value.
///
/// The `Display` text is the human-readable reason shown next to "N/A".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PbydError {
    #[error("Missing current BTC holdings")]
    MissingCurrentHoldings,

    #[error("Missing mNAV data")]
    MissingMnav,

    #[error("No BTC holdings data available")]
    NoHoldingsData,

    #[error("No historical data ≥365 days ago")]
    NoHistoricalData,

    #[error("Invalid BTC amount for date {date}")]
    InvalidHistoricalAmount { date: String, days_ago: i64 },

    #[error("Invalid current BTC holdings (≤0)")]
    InvalidCurrentHoldings,

    #[error("Invalid historical BTC holdings (≤0)")]
    InvalidHistoricalHoldings,

    #[error("Invalid time period (≤0 days)")]
    InvalidPeriod,

    #[error("Invalid growth ratio (≤0)")]
    InvalidGrowthRatio,

    #[error("Math error in yield calculation: {growth_ratio}^{exponent} is not finite")]
    YieldOverflow { growth_ratio: f64, exponent: f64 },

    #[error("Invalid mNAV value (≤0)")]
    InvalidMnav,

    #[error("Invalid yield for log calculation (1+yield={yield_plus_one:.6})")]
    LogDomain { yield_plus_one: f64 },

    #[error("Division by zero (log(1+yield)=0)")]
    DivisionByZero,
}

impl PbydError {
    /// Math-domain failures (log of a non-positive value, division by zero,
    /// overflow) as opposed to unusable inputs.
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            PbydError::InvalidGrowthRatio
                | PbydError::YieldOverflow { .. }
                | PbydError::LogDomain { .. }
                | PbydError::DivisionByZero
        )
    }
}

impl From<PbydError> for common::Error {
    fn from(e: PbydError) -> Self {
        if e.is_domain_error() {
            common::Error::Domain(e.to_string())
        } else {
            common::Error::InvalidInput(e.to_string())
        }
    }
}
