use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use common::{Result, SignalStateRecord, SignalStore};

/// In-process signal store.
///
/// Holds the single current record; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemorySignalStore {
    record: Arc<RwLock<Option<SignalStateRecord>>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `record`.
    pub fn with_record(record: SignalStateRecord) -> Self {
        Self {
            record: Arc::new(RwLock::new(Some(record))),
        }
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn get(&self) -> Result<Option<SignalStateRecord>> {
        Ok(self.record.read().await.clone())
    }

    async fn put(&self, record: &SignalStateRecord) -> Result<()> {
        debug!(active = record.active, signal = %record.signal_type, "Signal state stored in memory");
        *self.record.write().await = Some(record.clone());
        Ok(())
    }
}
