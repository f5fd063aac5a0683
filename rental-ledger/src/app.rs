use rental_client::{
    db::{electricity_queries, property_queries},
    domain::{ElectricityBillSnapshot, ElectricityData, MainMeter, Property, Room, Tenant},
    KeyValueStore, StoreError,
};
use time::OffsetDateTime;

use crate::{
    allocation::{Allocation, AllocationPolicy, ReadingInput},
    config::AppConfig,
    error::{LedgerError, LedgerResult},
    meter_ledger::{MeterLedger, NewMainMeter},
    property_ledger::{PropertyLedger, PropertySummary, RoomInput, TenantInput},
    sync::{self, EffectiveRoom, PropertyTotals},
    transfer,
};

/// Application root: owns the store, both ledgers and the current snapshot.
///
/// Each mutating call runs against a copy of the affected ledger, persists the
/// whole document and only then replaces the in-memory state. Meter-side
/// mutations project the snapshot up front and store it with the ledger; a
/// failed snapshot write puts the previous ledger document back.
pub struct RentalLedger<S: KeyValueStore> {
    store: S,
    meters: MeterLedger,
    properties: PropertyLedger,
    snapshot: ElectricityBillSnapshot,
    load_warnings: Vec<String>,
}

fn recover<T: Default>(loaded: Result<Option<T>, StoreError>, what: &str, warnings: &mut Vec<String>) -> T {
    match loaded {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "could not load {what}, starting empty");
            warnings.push(format!("{what} could not be loaded and was reset: {e}"));
            T::default()
        }
    }
}

impl<S: KeyValueStore> RentalLedger<S> {
    /// Load both ledgers from `store`. Unreadable documents start empty and are
    /// reported through `load_warnings`.
    pub fn open(store: S, config: &AppConfig) -> Self {
        let mut warnings = Vec::new();
        let data: ElectricityData = recover(
            electricity_queries::load_electricity_data(&store),
            "electricity data",
            &mut warnings,
        );
        let properties: Vec<Property> = recover(
            property_queries::load_properties(&store),
            "properties",
            &mut warnings,
        );

        let now = OffsetDateTime::now_utc();
        let snapshot = match electricity_queries::load_snapshot(&store) {
            Ok(Some(s)) => Ok(s),
            Ok(None) => sync::project(&data, now),
            Err(e) => {
                tracing::warn!(error = %e, "stored electricity snapshot unreadable, re-projecting");
                sync::project(&data, now)
            }
        };
        let snapshot = snapshot.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "electricity snapshot could not be projected, starting empty");
            warnings.push(format!("electricity snapshot could not be projected: {e}"));
            ElectricityBillSnapshot::empty(now)
        });

        tracing::info!(
            main_meters = data.main_meters.len(),
            sub_meters = data.sub_meter_data.len(),
            properties = properties.len(),
            "ledgers loaded"
        );

        Self {
            store,
            meters: MeterLedger::new(
                data,
                AllocationPolicy::from(&config.allocation),
                config.sync.reject_duplicate_room_keys,
            ),
            properties: PropertyLedger::new(properties),
            snapshot,
            load_warnings: warnings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Problems hit while loading; the affected ledgers started empty.
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    pub fn meters(&self) -> &MeterLedger {
        &self.meters
    }

    pub fn properties(&self) -> &PropertyLedger {
        &self.properties
    }

    pub fn snapshot(&self) -> &ElectricityBillSnapshot {
        &self.snapshot
    }

    fn mutate_meters<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut MeterLedger) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut next = self.meters.clone();
        let out = f(&mut next).map_err(|e| {
            tracing::warn!(operation, error = %e, "meter ledger operation rejected");
            e
        })?;
        let snapshot = sync::project(next.data(), OffsetDateTime::now_utc())?;
        electricity_queries::save_electricity_data(&mut self.store, next.data())?;
        self.save_snapshot_or_restore(&snapshot)?;
        self.meters = next;
        self.snapshot = snapshot;
        Ok(out)
    }

    fn mutate_properties<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut PropertyLedger) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut next = self.properties.clone();
        let out = f(&mut next).map_err(|e| {
            tracing::warn!(operation, error = %e, "property ledger operation rejected");
            e
        })?;
        property_queries::save_properties(&mut self.store, next.properties())?;
        self.properties = next;
        Ok(out)
    }

    /// Store `snapshot`. On failure the electricity document is rewritten from
    /// the in-memory ledger, which still holds the previous state.
    fn save_snapshot_or_restore(&mut self, snapshot: &ElectricityBillSnapshot) -> LedgerResult<()> {
        let Err(e) = electricity_queries::save_snapshot(&mut self.store, snapshot) else {
            return Ok(());
        };
        tracing::warn!(error = %e, "snapshot write failed, restoring electricity data");
        if let Err(restore) = electricity_queries::save_electricity_data(&mut self.store, self.meters.data()) {
            tracing::error!(error = %restore, "could not restore electricity data");
        }
        Err(e.into())
    }

    fn publish_snapshot(&mut self) -> LedgerResult<()> {
        let snapshot = sync::project(self.meters.data(), OffsetDateTime::now_utc())?;
        electricity_queries::save_snapshot(&mut self.store, &snapshot)?;
        self.snapshot = snapshot;
        Ok(())
    }

    pub fn add_meter(&mut self, input: NewMainMeter) -> LedgerResult<MainMeter> {
        let meter = self.mutate_meters("add_meter", |l| l.add_meter(input, OffsetDateTime::now_utc()))?;
        tracing::info!(meter_id = %meter.id, meter_number = %meter.meter_number, "main meter added");
        Ok(meter)
    }

    pub fn delete_meter(&mut self, meter_id: &str) -> LedgerResult<()> {
        let removed = self.mutate_meters("delete_meter", |l| l.delete_meter(meter_id))?;
        tracing::info!(meter_id, removed_readings = removed, "main meter deleted");
        Ok(())
    }

    pub fn save_reading_batch(&mut self, meter_id: &str, readings: &[ReadingInput]) -> LedgerResult<Allocation> {
        let allocation = self.mutate_meters("save_reading_batch", |l| l.save_reading_batch(meter_id, readings))?;
        tracing::info!(
            meter_id,
            rooms = allocation.rooms.len(),
            per_unit_cost = %crate::allocation::display_round(allocation.per_unit_cost),
            "sub-meter configuration saved"
        );
        Ok(allocation)
    }

    pub fn delete_reading(&mut self, reading_id: &str) -> LedgerResult<()> {
        let removed = self.mutate_meters("delete_reading", |l| l.delete_reading(reading_id))?;
        tracing::info!(reading_id, room = %removed.room_name, "sub-meter reading deleted");
        Ok(())
    }

    /// Re-project and store the snapshot on demand.
    pub fn link_snapshot(&mut self) -> LedgerResult<&ElectricityBillSnapshot> {
        if self.meters.readings().is_empty() {
            return Err(LedgerError::Validation(
                "no electricity bill data found; add main meters and sub-meters first".to_string(),
            ));
        }
        self.publish_snapshot()?;
        tracing::info!(
            rooms = self.snapshot.total_rooms,
            total_bill = %crate::allocation::display_round(self.snapshot.total_electricity_bill),
            "electricity bills linked to properties"
        );
        Ok(&self.snapshot)
    }

    pub fn export_electricity(&self) -> LedgerResult<String> {
        transfer::export_json(self.meters.data(), OffsetDateTime::now_utc())
    }

    /// Replace the meter ledger with an export file; rejected files change nothing.
    pub fn import_electricity(&mut self, json: &str) -> LedgerResult<()> {
        let data = transfer::parse_import(json).map_err(|e| {
            tracing::warn!(error = %e, "electricity import rejected");
            e
        })?;
        let (meters, readings) = (data.main_meters.len(), data.sub_meter_data.len());
        self.mutate_meters("import_electricity", |l| {
            l.replace(data);
            Ok(())
        })?;
        tracing::info!(main_meters = meters, sub_meters = readings, "electricity data imported");
        Ok(())
    }

    pub fn clear_electricity(&mut self) -> LedgerResult<()> {
        let snapshot = ElectricityBillSnapshot::empty(OffsetDateTime::now_utc());
        electricity_queries::clear_electricity_data(&mut self.store)?;
        self.save_snapshot_or_restore(&snapshot)?;
        self.meters.clear();
        self.snapshot = snapshot;
        tracing::info!("electricity data cleared");
        Ok(())
    }

    pub fn add_property(&mut self, name: &str, address: &str, room_count: usize) -> LedgerResult<Property> {
        let property = self.mutate_properties("add_property", |l| {
            l.add_property(name, address, room_count, OffsetDateTime::now_utc())
        })?;
        tracing::info!(property_id = %property.id, rooms = room_count, "property added");
        Ok(property)
    }

    pub fn edit_property(&mut self, property_id: &str, name: &str, address: &str) -> LedgerResult<()> {
        self.mutate_properties("edit_property", |l| l.edit_property(property_id, name, address))
    }

    pub fn delete_property(&mut self, property_id: &str) -> LedgerResult<()> {
        let removed = self.mutate_properties("delete_property", |l| l.delete_property(property_id))?;
        tracing::info!(property_id, rooms = removed.rooms.len(), "property deleted");
        Ok(())
    }

    pub fn add_room(&mut self, property_id: &str, input: &RoomInput) -> LedgerResult<Room> {
        self.mutate_properties("add_room", |l| l.add_room(property_id, input))
    }

    pub fn edit_room(&mut self, property_id: &str, room_id: &str, input: &RoomInput) -> LedgerResult<Room> {
        self.mutate_properties("edit_room", |l| l.edit_room(property_id, room_id, input))
    }

    pub fn delete_room(&mut self, property_id: &str, room_id: &str) -> LedgerResult<()> {
        self.mutate_properties("delete_room", |l| l.delete_room(property_id, room_id))
            .map(|_| ())
    }

    pub fn assign_tenant(&mut self, room_id: &str, input: TenantInput) -> LedgerResult<Tenant> {
        self.mutate_properties("assign_tenant", |l| {
            l.assign_tenant(room_id, input, OffsetDateTime::now_utc())
        })
    }

    pub fn remove_tenant(&mut self, room_id: &str) -> LedgerResult<Tenant> {
        self.mutate_properties("remove_tenant", |l| l.remove_tenant(room_id))
    }

    pub fn effective_rooms(&self, property_id: &str) -> LedgerResult<Vec<EffectiveRoom>> {
        self.properties.effective_rooms(property_id, &self.snapshot)
    }

    pub fn property_totals(&self, property_id: &str) -> LedgerResult<PropertyTotals> {
        self.properties.property_totals(property_id, &self.snapshot)
    }

    pub fn portfolio(&self) -> Vec<PropertySummary> {
        self.properties.portfolio(&self.snapshot)
    }

    /// Pick up a snapshot written by another process. A missing document
    /// leaves the current snapshot in place.
    pub fn refresh_snapshot(&mut self) -> LedgerResult<()> {
        if let Some(snapshot) = electricity_queries::load_snapshot(&self.store)? {
            self.snapshot = snapshot;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_client::{
        db::{ELECTRICITY_KEY, PROPERTIES_KEY, SNAPSHOT_KEY},
        MemoryStore,
    };
    use rust_decimal::Decimal;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn open(store: MemoryStore) -> RentalLedger<MemoryStore> {
        RentalLedger::open(store, &AppConfig::default())
    }

    fn meter(number: &str) -> NewMainMeter {
        NewMainMeter {
            owner_name: "Karim".to_string(),
            meter_number: number.to_string(),
            code_name: "North".to_string(),
            payable_taka: d("1000"),
        }
    }

    fn room_input(number: &str) -> RoomInput {
        RoomInput {
            number: number.to_string(),
            rent: d("5000"),
            current_bill: d("150"),
            water_bill: d("200"),
            dust_collection: d("50"),
        }
    }

    /// Fails every write once armed, or only writes to `fail_key`.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
        fail_key: Option<&'static str>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_writes || self.fail_key == Some(key) {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn saved_batch_flows_into_property_rooms() {
        let mut app = open(MemoryStore::new());
        let p = app.add_property("Villa", "", 0).unwrap();
        app.add_room(&p.id, &room_input("101")).unwrap();

        let m1 = app.add_meter(meter("MTR-1")).unwrap();
        let m2 = app.add_meter(meter("MTR-2")).unwrap();
        app.save_reading_batch(&m1.id, &[ReadingInput::new("A", d("0"), d("100"))])
            .unwrap();
        app.save_reading_batch(
            &m2.id,
            &[
                ReadingInput::new("101", d("10"), d("50")),
                ReadingInput::new("B", d("0"), d("60")),
            ],
        )
        .unwrap();

        let rooms = app.effective_rooms(&p.id).unwrap();
        assert!(rooms[0].is_from_electricity());
        assert_eq!(rooms[0].current_bill, d("400"));
        assert_eq!(rooms[0].total, d("5650"));
        assert_eq!(app.snapshot().room("101").unwrap().meter_number, "MTR-2");

        // The snapshot was persisted alongside the ledger.
        let stored = electricity_queries::load_snapshot(app.store()).unwrap().unwrap();
        assert_eq!(stored.room_electricity_data, app.snapshot().room_electricity_data);
        assert_eq!(stored.total_rooms, 3);
    }

    #[test]
    fn deleted_meter_disappears_from_snapshot() {
        let mut app = open(MemoryStore::new());
        let m = app.add_meter(meter("MTR-1")).unwrap();
        app.save_reading_batch(&m.id, &[ReadingInput::new("101", d("0"), d("10"))])
            .unwrap();
        assert!(app.snapshot().room("101").is_some());

        app.delete_meter(&m.id).unwrap();
        assert!(app.snapshot().room("101").is_none());
        assert_eq!(app.snapshot().total_rooms, 0);
        assert!(app.meters().readings().is_empty());
    }

    #[test]
    fn deleting_a_reading_reprojects() {
        let mut app = open(MemoryStore::new());
        let m = app.add_meter(meter("MTR-1")).unwrap();
        app.save_reading_batch(
            &m.id,
            &[
                ReadingInput::new("101", d("0"), d("10")),
                ReadingInput::new("102", d("0"), d("30")),
            ],
        )
        .unwrap();
        let id = app.meters().readings()[0].id.clone();
        app.delete_reading(&id).unwrap();
        assert!(app.snapshot().room("101").is_none());
        assert_eq!(app.snapshot().room("102").unwrap().current_bill, d("750"));
    }

    #[test]
    fn rejected_batch_keeps_stored_readings() {
        let mut app = open(MemoryStore::new());
        let m = app.add_meter(meter("MTR-1")).unwrap();
        app.save_reading_batch(&m.id, &[ReadingInput::new("101", d("0"), d("10"))])
            .unwrap();
        let stored_before = app.store().get(ELECTRICITY_KEY).unwrap();

        let res = app.save_reading_batch(
            &m.id,
            &[
                ReadingInput::new("101", d("10"), d("20")),
                ReadingInput::new("102", d("9"), d("3")),
            ],
        );
        assert!(matches!(res, Err(LedgerError::Validation(_))));
        assert_eq!(app.store().get(ELECTRICITY_KEY).unwrap(), stored_before);
        assert_eq!(app.meters().readings().len(), 1);
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let mut app = RentalLedger::open(FlakyStore::default(), &AppConfig::default());
        app.add_meter(meter("MTR-1")).unwrap();

        app.store.fail_writes = true;
        let res = app.add_meter(meter("MTR-2"));
        assert!(matches!(res, Err(LedgerError::Storage(_))));
        assert_eq!(app.meters().meters().len(), 1);

        let res = app.add_property("Villa", "", 2);
        assert!(matches!(res, Err(LedgerError::Storage(_))));
        assert!(app.properties().properties().is_empty());
    }

    #[test]
    fn failed_snapshot_write_rolls_back_meter_change() {
        let mut app = RentalLedger::open(FlakyStore::default(), &AppConfig::default());
        let m = app.add_meter(meter("MTR-1")).unwrap();
        app.save_reading_batch(&m.id, &[ReadingInput::new("101", d("0"), d("10"))])
            .unwrap();
        let stored_data = app.store().get(ELECTRICITY_KEY).unwrap();
        let stored_snapshot = app.store().get(SNAPSHOT_KEY).unwrap();
        let snapshot_before = app.snapshot().clone();

        app.store.fail_key = Some(SNAPSHOT_KEY);
        let res = app.add_meter(meter("MTR-2"));
        assert!(matches!(res, Err(LedgerError::Storage(_))));
        assert_eq!(app.meters().meters().len(), 1);
        assert_eq!(app.snapshot(), &snapshot_before);
        assert_eq!(app.store().get(ELECTRICITY_KEY).unwrap(), stored_data);
        assert_eq!(app.store().get(SNAPSHOT_KEY).unwrap(), stored_snapshot);

        let res = app.delete_meter(&m.id);
        assert!(matches!(res, Err(LedgerError::Storage(_))));
        assert_eq!(app.meters().readings().len(), 1);
        assert_eq!(app.store().get(ELECTRICITY_KEY).unwrap(), stored_data);

        let res = app.clear_electricity();
        assert!(matches!(res, Err(LedgerError::Storage(_))));
        assert_eq!(app.meters().readings().len(), 1);
        assert!(app.store().get(ELECTRICITY_KEY).unwrap().is_some());
        assert!(app.snapshot().room("101").is_some());

        let res = app.link_snapshot();
        assert!(matches!(res, Err(LedgerError::Storage(_))));
        assert_eq!(app.snapshot(), &snapshot_before);
    }

    #[test]
    fn unprojectable_import_is_rejected() {
        let mut app = open(MemoryStore::new());
        app.add_meter(meter("MTR-1")).unwrap();
        let before = app.meters().data().clone();
        let json = r#"{
            "mainMeters": [],
            "subMeterData": [
                {"id": "a", "mainMeterId": "m", "roomName": "101", "previousUnit": 0, "currentUnit": 1,
                 "roomBill": 40000000000000000000000000000},
                {"id": "b", "mainMeterId": "m", "roomName": "102", "previousUnit": 0, "currentUnit": 1,
                 "roomBill": 40000000000000000000000000000}
            ]
        }"#;

        let res = app.import_electricity(json);
        assert!(matches!(res, Err(LedgerError::Validation(_))), "{res:?}");
        assert_eq!(app.meters().data(), &before);
    }

    #[test]
    fn unprojectable_stored_data_opens_with_empty_snapshot() {
        let huge = "40000000000000000000000000000";
        let doc = format!(
            r#"{{"mainMeters": [], "subMeterData": [
                {{"id": "a", "mainMeterId": "m", "roomName": "101", "previousUnit": 0, "currentUnit": 1, "roomBill": {huge}}},
                {{"id": "b", "mainMeterId": "m", "roomName": "102", "previousUnit": 0, "currentUnit": 1, "roomBill": {huge}}}
            ]}}"#
        );
        let mut store = MemoryStore::new();
        store.set(ELECTRICITY_KEY, &doc).unwrap();

        let app = open(store);
        assert_eq!(app.load_warnings().len(), 1);
        assert_eq!(app.meters().readings().len(), 2);
        assert_eq!(app.snapshot().total_rooms, 0);
        assert!(app.snapshot().room_electricity_data.is_empty());
    }

    #[test]
    fn incomplete_import_changes_nothing() {
        let mut app = open(MemoryStore::new());
        app.add_meter(meter("MTR-1")).unwrap();
        let before = app.meters().data().clone();

        let res = app.import_electricity(r#"{"mainMeters": []}"#);
        assert!(matches!(res, Err(LedgerError::ImportFormat(_))));
        assert_eq!(app.meters().data(), &before);
    }

    #[test]
    fn export_then_import_into_fresh_store() {
        let mut source = open(MemoryStore::new());
        let m = source.add_meter(meter("MTR-1")).unwrap();
        source
            .save_reading_batch(&m.id, &[ReadingInput::new("101", d("0"), d("40"))])
            .unwrap();
        let json = source.export_electricity().unwrap();

        let mut target = open(MemoryStore::new());
        target.import_electricity(&json).unwrap();
        assert_eq!(target.meters().meters().len(), 1);
        assert_eq!(target.snapshot().room("101").unwrap().current_bill, d("1000"));
    }

    #[test]
    fn clear_removes_document_and_empties_snapshot() {
        let mut app = open(MemoryStore::new());
        let m = app.add_meter(meter("MTR-1")).unwrap();
        app.save_reading_batch(&m.id, &[ReadingInput::new("101", d("0"), d("40"))])
            .unwrap();
        app.clear_electricity().unwrap();
        assert!(app.store().get(ELECTRICITY_KEY).unwrap().is_none());
        assert!(app.snapshot().room_electricity_data.is_empty());
        assert!(matches!(app.link_snapshot(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn state_survives_reopen() {
        let mut app = open(MemoryStore::new());
        let m = app.add_meter(meter("MTR-1")).unwrap();
        app.save_reading_batch(&m.id, &[ReadingInput::new("1", d("0"), d("40"))])
            .unwrap();
        let p = app.add_property("Villa", "Road 1", 2).unwrap();

        let reopened = open(app.into_store());
        assert!(reopened.load_warnings().is_empty());
        assert_eq!(reopened.meters().readings().len(), 1);
        let rooms = reopened.effective_rooms(&p.id).unwrap();
        assert_eq!(rooms[0].current_bill, d("1000"));
        assert_eq!(rooms[1].current_bill, Decimal::ZERO);
    }

    #[test]
    fn corrupt_documents_start_empty_with_warnings() {
        let mut store = MemoryStore::new();
        store.set(ELECTRICITY_KEY, "{oops").unwrap();
        store.set(PROPERTIES_KEY, "{}").unwrap();
        store.set(SNAPSHOT_KEY, "nope").unwrap();

        let app = open(store);
        assert_eq!(app.load_warnings().len(), 2);
        assert!(app.meters().meters().is_empty());
        assert!(app.properties().properties().is_empty());
        assert_eq!(app.snapshot().total_rooms, 0);
    }

    #[test]
    fn refresh_picks_up_external_snapshot() {
        let mut app = open(MemoryStore::new());
        let p = app.add_property("Villa", "", 1).unwrap();

        let mut other = open(MemoryStore::new());
        let m = other.add_meter(meter("MTR-1")).unwrap();
        other
            .save_reading_batch(&m.id, &[ReadingInput::new("1", d("0"), d("40"))])
            .unwrap();
        let external = other.snapshot().clone();

        electricity_queries::save_snapshot(&mut app.store, &external).unwrap();
        assert_eq!(app.property_totals(&p.id).unwrap().current, Decimal::ZERO);
        app.refresh_snapshot().unwrap();
        assert_eq!(app.property_totals(&p.id).unwrap().current, d("1000"));
        assert_eq!(app.portfolio()[0].total_income, d("1000"));
    }
}
