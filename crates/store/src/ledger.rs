use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use common::{Error, HoldingsEntry, HoldingsHistory, Result, DATE_FORMAT};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    btc_data: HoldingsHistory,
    /// Other top-level sections of the file, preserved on save.
    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// BTC holdings history kept in a JSON file:
///
/// ```json
/// { "btc_data": { "2025-07-21": { "btc": 607770 } } }
/// ```
#[derive(Debug, Clone)]
pub struct HoldingsLedger {
    path: PathBuf,
    data: LedgerFile,
}

impl HoldingsLedger {
    /// Load the ledger at `path`. A missing file is an empty ledger.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn holdings(&self) -> &HoldingsHistory {
        &self.data.btc_data
    }

    /// Most recent entry with a recorded amount.
    pub fn latest(&self) -> Option<(&str, i64)> {
        self.data
            .btc_data
            .iter()
            .rev()
            .find_map(|(date, entry)| entry.btc.map(|btc| (date.as_str(), btc)))
    }

    /// Record holdings for `date` (replacing any existing entry) and save.
    pub async fn add_holdings(&mut self, date: NaiveDate, btc_amount: i64) -> Result<()> {
        if btc_amount <= 0 {
            return Err(Error::InvalidInput(format!(
                "BTC holdings must be positive, got {btc_amount}"
            )));
        }
        let key = date.format(DATE_FORMAT).to_string();
        self.data
            .btc_data
            .insert(key.clone(), HoldingsEntry::new(btc_amount));
        self.save().await?;
        info!(date = %key, btc = btc_amount, "Added BTC holdings");
        Ok(())
    }

    /// Write to a temporary sibling file, then rename over the ledger.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let json = serde_json::to_string_pretty(&self.data)?;
        if let Err(e) = tokio::fs::write(&tmp, json).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(entries = self.data.btc_data.len(), path = %self.path.display(), "Saved holdings ledger");
        Ok(())
    }
}
