pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use store::{SignalStore, SIGNAL_STATE_PARTITION, SIGNAL_STATE_ROW};
pub use types::*;
