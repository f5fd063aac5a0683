use serde::Deserialize;
use std::{fs, io::ErrorKind, path::PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("ledger-data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Reject a batch whose total units exceed the meter's payable amount.
    ///
    /// This compares kWh against taka and is kept only as a sanity bound.
    pub enforce_usage_cap: bool,
    pub max_rooms_per_batch: usize,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            enforce_usage_cap: true,
            max_rooms_per_batch: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Refuse room keys already used by another meter instead of letting the
    /// last saved reading win in the snapshot.
    pub reject_duplicate_room_keys: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub allocation: AllocationConfig,
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Read `RENTAL_LEDGER_CONFIG` (default `rental-ledger.toml`); a missing file means defaults.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("RENTAL_LEDGER_CONFIG").unwrap_or_else(|_| "rental-ledger.toml".to_string());
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
