pub mod analyzer;
pub mod conditions;
pub mod machine;

pub use analyzer::{analyze, derive_status, SignalAnalysis, SignalAnalyzer, SignalHistory};
pub use machine::{SignalPhase, SignalState, WEAKENING_GRACE_DAYS};
