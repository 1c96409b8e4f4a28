pub mod config;
pub mod indicators;
pub mod signal;

pub use config::IndicatorFileConfig;
pub use indicators::{ema, rsi, DerivedIndicators};
pub use signal::{analyze, SignalAnalysis, SignalAnalyzer, SignalHistory, SignalPhase, SignalState};
