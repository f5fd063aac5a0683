use anyhow::{bail, Result};
use rental_client::FileStore;
use rental_ledger::{config::AppConfig, observability, RentalLedger};
use std::{env, fs};

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_ledger <json_file_path>");
    }
    let file_path = &args[1];
    let contents = fs::read_to_string(file_path)?;

    // Point RENTAL_LEDGER_CONFIG elsewhere to import into another data directory.
    let cfg = AppConfig::load()?;
    let store = FileStore::open(&cfg.storage.data_dir)?;
    let mut ledger = RentalLedger::open(store, &cfg);

    ledger.import_electricity(&contents)?;

    let snapshot = ledger.snapshot();
    tracing::info!(
        rooms = snapshot.total_rooms,
        keyed_rooms = snapshot.room_electricity_data.len(),
        "electricity snapshot regenerated from import"
    );

    Ok(())
}
