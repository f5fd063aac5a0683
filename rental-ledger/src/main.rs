use anyhow::Result;
use rental_client::FileStore;
use rental_ledger::{allocation::display_round, config::AppConfig, observability, RentalLedger};

fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;
    let store = FileStore::open(&cfg.storage.data_dir)?;
    let ledger = RentalLedger::open(store, &cfg);

    for warning in ledger.load_warnings() {
        tracing::warn!(%warning, "stored data was reset");
    }

    let summary = ledger.meters().summary()?;
    tracing::info!(
        main_meters = summary.main_meters,
        sub_meters = summary.sub_meters,
        total_units = %display_round(summary.total_units),
        total_bill = %display_round(summary.total_bill),
        "electricity summary"
    );

    for overview in ledger.meters().meter_overview() {
        tracing::info!(
            meter_number = %overview.meter.meter_number,
            owner = %overview.meter.owner_name,
            payable = %display_round(overview.meter.payable_taka),
            sub_meters = overview.sub_meter_count,
            "main meter"
        );
    }

    for property in ledger.portfolio() {
        tracing::info!(
            property = %property.name,
            rooms = property.room_count,
            occupied = property.occupied_rooms,
            total_rent = %display_round(property.total_rent),
            total_income = %display_round(property.total_income),
            "property"
        );
    }

    Ok(())
}
