pub mod ledger;
pub mod memory;
pub mod sqlite;

pub use ledger::HoldingsLedger;
pub use memory::MemorySignalStore;
pub use sqlite::SqliteSignalStore;
