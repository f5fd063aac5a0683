pub mod allocation;
pub mod app;
pub mod config;
pub mod error;
pub mod meter_ledger;
pub mod observability;
pub mod property_ledger;
pub mod sync;
pub mod transfer;

pub use app::RentalLedger;
pub use error::{LedgerError, LedgerResult};
