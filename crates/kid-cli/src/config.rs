use anyhow::{Context, Result};
use kid_identity::constants::DEFAULT_LEGACY_COLLECTION;
use kid_identity::StubConfig;
use std::path::PathBuf;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Path to the RocksDB ledger
    pub ledger_path: PathBuf,

    /// Identity repository settings
    pub stub: StubConfig,
}

impl CliConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let ledger_path = lookup("KID_LEDGER_PATH")
            .unwrap_or_else(|| "./data/kid-ledger.db".to_string())
            .into();

        // Set but empty disables the legacy lookup
        let legacy_collection = match lookup("KID_LEGACY_COLLECTION") {
            Some(name) if name.is_empty() => None,
            Some(name) => Some(name),
            None => Some(DEFAULT_LEGACY_COLLECTION.to_string()),
        };

        let migrate_legacy = lookup("KID_MIGRATE_LEGACY")
            .unwrap_or_else(|| "true".to_string())
            .parse()
            .context("KID_MIGRATE_LEGACY must be true or false")?;

        Ok(CliConfig {
            ledger_path,
            stub: StubConfig {
                legacy_collection,
                migrate_legacy,
            },
        })
    }

    /// Private collections the ledger must provide
    pub fn collections(&self) -> Vec<&str> {
        self.stub.legacy_collection.iter().map(String::as_str).collect()
    }
}
