/// All configuration loaded from environment variables at startup.
///
/// Nothing is strictly required: without `DATABASE_URL` the analyzer runs
/// without persistence and every run starts from the default signal state.
#[derive(Debug, Clone)]
pub struct Config {
    // Signal state store
    pub database_url: Option<String>,

    // BTC holdings ledger (JSON)
    pub holdings_path: String,

    // Indicator parameter file path
    pub indicator_config_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            database_url: optional_env("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            holdings_path: optional_env("HOLDINGS_PATH")
                .unwrap_or_else(|| "data/holdings.json".to_string()),
            indicator_config_path: optional_env("INDICATOR_CONFIG_PATH")
                .unwrap_or_else(|| "config/indicators.toml".to_string()),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
