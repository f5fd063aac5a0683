pub mod db;
pub mod domain;

pub use db::{FileStore, KeyValueStore, MemoryStore, StoreError};
