use crate::domain::{ElectricityBillSnapshot, ElectricityData};

use super::{read_json, write_json, KeyValueStore, StoreError, ELECTRICITY_KEY, SNAPSHOT_KEY};

/// Fetch the meter ledger document, `None` when nothing has been saved yet.
pub fn load_electricity_data<S>(store: &S) -> Result<Option<ElectricityData>, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    read_json(store, ELECTRICITY_KEY)
}

/// Replace the whole meter ledger document.
pub fn save_electricity_data<S>(store: &mut S, data: &ElectricityData) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
{
    write_json(store, ELECTRICITY_KEY, data)
}

pub fn clear_electricity_data<S>(store: &mut S) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
{
    store.remove(ELECTRICITY_KEY)
}

pub fn load_snapshot<S>(store: &S) -> Result<Option<ElectricityBillSnapshot>, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    read_json(store, SNAPSHOT_KEY)
}

/// Replace the stored snapshot; there is no merge with the previous one.
pub fn save_snapshot<S>(store: &mut S, snapshot: &ElectricityBillSnapshot) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
{
    write_json(store, SNAPSHOT_KEY, snapshot)
}
