pub mod ema;
pub mod rsi;

pub use ema::ema;
pub use rsi::rsi;

use serde::{Deserialize, Serialize};
use tracing::debug;

use common::Result;

use crate::config::IndicatorFileConfig;

/// The two series-derived inputs of the BTC signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedIndicators {
    pub ema_200: f64,
    pub weekly_rsi: f64,
}

/// EMA over daily closes and RSI over weekly closes (both oldest first).
pub fn derive(
    daily_closes: &[f64],
    weekly_closes: &[f64],
    cfg: &IndicatorFileConfig,
) -> Result<DerivedIndicators> {
    let ema_200 = ema(daily_closes, cfg.ema_period)?;
    let weekly_rsi = rsi(weekly_closes, cfg.rsi_period)?;
    debug!(
        ema = ema_200,
        rsi = weekly_rsi,
        daily = daily_closes.len(),
        weekly = weekly_closes.len(),
        "Indicators derived"
    );
    Ok(DerivedIndicators {
        ema_200,
        weekly_rsi,
    })
}
