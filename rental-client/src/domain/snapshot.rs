use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Denormalized electricity billing projection consumed by the property side.
///
/// Regenerated in full from the meter ledger; never merged with an older copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricityBillSnapshot {
    pub total_electricity_bill: Decimal,
    pub total_units: Decimal,
    pub total_rooms: usize,
    pub average_bill_per_room: Decimal,
    #[serde(default)]
    pub room_electricity_data: BTreeMap<String, RoomElectricity>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    #[serde(default)]
    pub main_meters_count: usize,
    #[serde(default)]
    pub sub_meters_count: usize,
}

impl ElectricityBillSnapshot {
    pub fn empty(now: OffsetDateTime) -> Self {
        Self {
            total_electricity_bill: Decimal::ZERO,
            total_units: Decimal::ZERO,
            total_rooms: 0,
            average_bill_per_room: Decimal::ZERO,
            room_electricity_data: BTreeMap::new(),
            last_updated: now,
            main_meters_count: 0,
            sub_meters_count: 0,
        }
    }

    /// Exact, case-sensitive lookup; the caller trims.
    pub fn room(&self, key: &str) -> Option<&RoomElectricity> {
        self.room_electricity_data.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomElectricity {
    pub current_bill: Decimal,
    pub units_used: Decimal,
    pub per_unit_cost: Decimal,
    /// Owner name of the source meter.
    pub main_meter: String,
    pub meter_number: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}
