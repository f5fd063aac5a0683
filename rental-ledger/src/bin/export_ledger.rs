use anyhow::{bail, Result};
use rental_client::FileStore;
use rental_ledger::{config::AppConfig, observability, transfer, RentalLedger};
use std::{env, fs, path::PathBuf};
use time::OffsetDateTime;

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        bail!("usage: export_ledger [output_file_path]");
    }
    let path = match args.get(1) {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(transfer::export_file_name(OffsetDateTime::now_utc().date())),
    };

    let cfg = AppConfig::load()?;
    let store = FileStore::open(&cfg.storage.data_dir)?;
    let ledger = RentalLedger::open(store, &cfg);

    let json = ledger.export_electricity()?;
    fs::write(&path, json)?;

    tracing::info!(
        path = %path.display(),
        main_meters = ledger.meters().meters().len(),
        sub_meters = ledger.meters().readings().len(),
        "electricity data exported"
    );

    Ok(())
}
