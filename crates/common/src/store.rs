use async_trait::async_trait;

use crate::{Result, SignalStateRecord};

/// Partition key of the persisted signal state record.
pub const SIGNAL_STATE_PARTITION: &str = "SIGNAL_STATE";
/// Row key of the persisted signal state record.
pub const SIGNAL_STATE_ROW: &str = "CURRENT";

/// Abstraction over the signal state persistence.
///
/// `SqliteSignalStore` implements this for real runs.
/// `MemorySignalStore` implements this for tests and dry runs.
///
/// Only the flat `SignalStateRecord` crosses this boundary; the analyzer
/// converts it to and from its own state machine.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Read the current record, `None` if nothing has been stored yet.
    async fn get(&self) -> Result<Option<SignalStateRecord>>;

    /// Insert or replace the current record.
    async fn put(&self, record: &SignalStateRecord) -> Result<()>;
}
