use std::collections::HashSet;

use rental_client::domain::{ElectricityData, MainMeter, SubMeterReading};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    allocation::{checked_sum, Allocation, AllocationPolicy, ReadingInput},
    error::{LedgerError, LedgerResult},
};

/// Fields entered when registering a main meter.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMainMeter {
    pub owner_name: String,
    pub meter_number: String,
    pub code_name: String,
    pub payable_taka: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeterOverview {
    pub meter: MainMeter,
    pub sub_meter_count: usize,
}

/// One meter and its current batch, in ledger order.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReadings<'a> {
    pub meter: &'a MainMeter,
    pub readings: Vec<&'a SubMeterReading>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElectricitySummary {
    pub main_meters: usize,
    pub sub_meters: usize,
    pub total_units: Decimal,
    pub total_bill: Decimal,
}

/// In-memory meter ledger.
///
/// Every operation validates completely before touching `data`, so a failed
/// call leaves the ledger exactly as it was.
#[derive(Debug, Clone)]
pub struct MeterLedger {
    data: ElectricityData,
    policy: AllocationPolicy,
    reject_duplicate_room_keys: bool,
}

impl MeterLedger {
    pub fn new(data: ElectricityData, policy: AllocationPolicy, reject_duplicate_room_keys: bool) -> Self {
        Self {
            data,
            policy,
            reject_duplicate_room_keys,
        }
    }

    pub fn data(&self) -> &ElectricityData {
        &self.data
    }

    pub fn meters(&self) -> &[MainMeter] {
        &self.data.main_meters
    }

    pub fn readings(&self) -> &[SubMeterReading] {
        &self.data.sub_meter_data
    }

    pub fn add_meter(&mut self, input: NewMainMeter, now: OffsetDateTime) -> LedgerResult<MainMeter> {
        let owner_name = input.owner_name.trim();
        let meter_number = input.meter_number.trim();
        let code_name = input.code_name.trim();
        if owner_name.is_empty() || meter_number.is_empty() || code_name.is_empty() {
            return Err(LedgerError::Validation(
                "owner name, meter number and code name are required".to_string(),
            ));
        }
        if input.payable_taka <= Decimal::ZERO {
            return Err(LedgerError::Validation("payable amount must be positive".to_string()));
        }
        if self
            .data
            .main_meters
            .iter()
            .any(|m| m.meter_number.trim() == meter_number)
        {
            return Err(LedgerError::Duplicate(format!(
                "meter number {meter_number} already exists"
            )));
        }

        let meter = MainMeter {
            id: Uuid::new_v4().to_string(),
            owner_name: owner_name.to_string(),
            meter_number: meter_number.to_string(),
            code_name: code_name.to_string(),
            payable_taka: input.payable_taka,
            created_at: now,
        };
        self.data.main_meters.push(meter.clone());
        Ok(meter)
    }

    /// Remove a meter and every reading it owns. Returns the number of readings removed.
    pub fn delete_meter(&mut self, meter_id: &str) -> LedgerResult<usize> {
        if self.data.meter(meter_id).is_none() {
            return Err(LedgerError::NotFound(format!("main meter {meter_id}")));
        }
        self.data.main_meters.retain(|m| m.id != meter_id);
        let before = self.data.sub_meter_data.len();
        self.data.sub_meter_data.retain(|r| r.main_meter_id != meter_id);
        Ok(before - self.data.sub_meter_data.len())
    }

    /// Replace the meter's batch with `readings`, allocating its payable amount.
    pub fn save_reading_batch(&mut self, meter_id: &str, readings: &[ReadingInput]) -> LedgerResult<Allocation> {
        let meter = self
            .data
            .meter(meter_id)
            .ok_or_else(|| LedgerError::NotFound(format!("main meter {meter_id}")))?;

        let allocation = self.policy.allocate(meter.payable_taka, readings)?;
        if self.reject_duplicate_room_keys {
            self.check_room_keys(meter_id, &allocation)?;
        }

        let batch: Vec<SubMeterReading> = allocation
            .rooms
            .iter()
            .map(|room| SubMeterReading {
                id: Uuid::new_v4().to_string(),
                main_meter_id: meter_id.to_string(),
                room_name: room.room_name.clone(),
                room_number: Some(room.room_name.clone()),
                previous_unit: room.previous_unit,
                current_unit: room.current_unit,
                units_used: Some(room.units_used),
                per_unit_cost: Some(allocation.per_unit_cost),
                room_bill: Some(room.room_bill),
            })
            .collect();

        self.data.sub_meter_data.retain(|r| r.main_meter_id != meter_id);
        self.data.sub_meter_data.extend(batch);
        Ok(allocation)
    }

    fn check_room_keys(&self, meter_id: &str, allocation: &Allocation) -> LedgerResult<()> {
        let mut seen = HashSet::new();
        for room in &allocation.rooms {
            if !seen.insert(room.room_name.as_str()) {
                return Err(LedgerError::Duplicate(format!(
                    "room {} appears more than once in the batch",
                    room.room_name
                )));
            }
        }
        for other in self
            .data
            .sub_meter_data
            .iter()
            .filter(|r| r.main_meter_id != meter_id)
        {
            if let Some(key) = other.room_key().filter(|k| seen.contains(k)) {
                let owner = self
                    .data
                    .meter(&other.main_meter_id)
                    .map_or(other.main_meter_id.as_str(), |m| m.meter_number.as_str());
                return Err(LedgerError::Duplicate(format!(
                    "room {key} is already billed by meter {owner}"
                )));
            }
        }
        Ok(())
    }

    pub fn delete_reading(&mut self, reading_id: &str) -> LedgerResult<SubMeterReading> {
        let idx = self
            .data
            .sub_meter_data
            .iter()
            .position(|r| r.id == reading_id)
            .ok_or_else(|| LedgerError::NotFound(format!("sub-meter reading {reading_id}")))?;
        Ok(self.data.sub_meter_data.remove(idx))
    }

    /// Swap in a whole ledger, e.g. from an import.
    pub fn replace(&mut self, data: ElectricityData) {
        self.data = data;
    }

    pub fn clear(&mut self) {
        self.data = ElectricityData::default();
    }

    pub fn meter_overview(&self) -> Vec<MeterOverview> {
        self.data
            .main_meters
            .iter()
            .map(|m| MeterOverview {
                meter: m.clone(),
                sub_meter_count: self.data.readings_for(&m.id).count(),
            })
            .collect()
    }

    /// Readings grouped by meter in order of first appearance. Readings whose
    /// meter no longer exists are skipped.
    pub fn readings_by_meter(&self) -> Vec<MeterReadings<'_>> {
        let mut groups: Vec<MeterReadings<'_>> = Vec::new();
        for reading in &self.data.sub_meter_data {
            if let Some(group) = groups.iter_mut().find(|g| g.meter.id == reading.main_meter_id) {
                group.readings.push(reading);
                continue;
            }
            if let Some(meter) = self.data.meter(&reading.main_meter_id) {
                groups.push(MeterReadings {
                    meter,
                    readings: vec![reading],
                });
            }
        }
        groups
    }

    pub fn summary(&self) -> LedgerResult<ElectricitySummary> {
        let readings = &self.data.sub_meter_data;
        let out_of_range = || LedgerError::Validation("sub-meter totals are out of range".to_string());
        Ok(ElectricitySummary {
            main_meters: self.data.main_meters.len(),
            sub_meters: readings.len(),
            total_units: checked_sum(readings.iter().map(|r| r.units_or_zero())).ok_or_else(out_of_range)?,
            total_bill: checked_sum(readings.iter().map(|r| r.bill_or_zero())).ok_or_else(out_of_range)?,
        })
    }
}
