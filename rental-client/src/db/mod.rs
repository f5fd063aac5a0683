pub mod electricity_queries;
pub mod property_queries;
pub mod store;

pub use store::{FileStore, MemoryStore};

/// Storage key of the meter ledger document.
pub const ELECTRICITY_KEY: &str = "electricityData";
/// Storage key of the property ledger document.
pub const PROPERTIES_KEY: &str = "properties";
/// Storage key of the derived electricity bill snapshot.
pub const SNAPSHOT_KEY: &str = "currentElectricityBill";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage io error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed document storage, the equivalent of browser local storage.
///
/// Every write replaces the whole document stored under a key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

pub(crate) fn read_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: serde::de::DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Decode {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub(crate) fn write_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<(), StoreError>
where
    T: serde::Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}
