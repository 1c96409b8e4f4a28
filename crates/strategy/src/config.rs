use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Indicator parameter file (TOML).
///
/// Example `config/indicators.toml`:
/// ```toml
/// ema_period = 200
/// rsi_period = 14
/// ```
///
/// Only the lookback periods live here; the signal thresholds are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IndicatorFileConfig {
    /// EMA lookback applied to daily closes.
    #[serde(default = "default_ema_period")]
    pub ema_period: usize,
    /// RSI lookback applied to weekly closes.
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
}

fn default_ema_period() -> usize {
    200
}

fn default_rsi_period() -> usize {
    14
}

impl Default for IndicatorFileConfig {
    fn default() -> Self {
        Self {
            ema_period: default_ema_period(),
            rsi_period: default_rsi_period(),
        }
    }
}

impl IndicatorFileConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&content).map_err(|e| Error::Config(format!("{path}: {e}")))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        if cfg.ema_period == 0 || cfg.rsi_period == 0 {
            return Err(Error::Config("indicator periods must be >= 1".into()));
        }
        Ok(cfg)
    }
}
