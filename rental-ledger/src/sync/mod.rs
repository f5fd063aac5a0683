//! Projection of the meter ledger into per-room electricity bills, and the
//! read-time resolution of a room's effective bill against that projection.

use std::collections::{BTreeMap, HashMap};

use rental_client::domain::{ElectricityBillSnapshot, ElectricityData, MainMeter, Room, RoomElectricity};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    allocation::checked_sum,
    error::{LedgerError, LedgerResult},
};

const UNKNOWN_METER: &str = "Unknown";

/// Trimmed, case-sensitive join key; blank keys never match.
pub fn room_key(raw: &str) -> Option<&str> {
    let key = raw.trim();
    (!key.is_empty()).then_some(key)
}

/// Rebuild the snapshot from every current reading.
///
/// Readings sharing a key overwrite each other in ledger order, including
/// readings of different meters. Totals cover every reading, keyed or not,
/// and a total outside the `Decimal` range fails the projection.
pub fn project(data: &ElectricityData, now: OffsetDateTime) -> LedgerResult<ElectricityBillSnapshot> {
    let meters: HashMap<&str, &MainMeter> = data
        .main_meters
        .iter()
        .map(|m| (m.id.as_str(), m))
        .collect();

    let mut rooms = BTreeMap::new();
    for reading in &data.sub_meter_data {
        let Some(key) = reading.room_key() else {
            continue;
        };
        let meter = meters.get(reading.main_meter_id.as_str());
        let entry = RoomElectricity {
            current_bill: reading.bill_or_zero(),
            units_used: reading.units_or_zero(),
            per_unit_cost: reading.per_unit_cost.unwrap_or_default(),
            main_meter: meter.map_or(UNKNOWN_METER, |m| m.owner_name.as_str()).to_string(),
            meter_number: meter.map_or(UNKNOWN_METER, |m| m.meter_number.as_str()).to_string(),
            last_updated: now,
        };
        if rooms.insert(key.to_string(), entry).is_some() {
            tracing::debug!(room_key = key, "room key shared by several readings, last one wins");
        }
    }

    let out_of_range = |what: &str| LedgerError::Validation(format!("total {what} across sub-meters is out of range"));
    let total_electricity_bill =
        checked_sum(data.sub_meter_data.iter().map(|r| r.bill_or_zero())).ok_or_else(|| out_of_range("bill"))?;
    let total_units =
        checked_sum(data.sub_meter_data.iter().map(|r| r.units_or_zero())).ok_or_else(|| out_of_range("units"))?;
    let total_rooms = data.sub_meter_data.len();
    let average_bill_per_room = if total_rooms > 0 {
        total_electricity_bill / Decimal::from(total_rooms)
    } else {
        Decimal::ZERO
    };

    metrics::counter!("electricity_snapshot_projections_total").increment(1);
    tracing::debug!(
        keyed_rooms = rooms.len(),
        total_rooms,
        total_bill = %total_electricity_bill,
        "electricity snapshot projected"
    );

    Ok(ElectricityBillSnapshot {
        total_electricity_bill,
        total_units,
        total_rooms,
        average_bill_per_room,
        room_electricity_data: rooms,
        last_updated: now,
        main_meters_count: data.main_meters.len(),
        sub_meters_count: data.sub_meter_data.len(),
    })
}

/// A room as it should be displayed and aggregated right now.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveRoom {
    /// The room as stored, with its manual bill intact.
    pub room: Room,
    pub current_bill: Decimal,
    pub total: Decimal,
    pub electricity: Option<RoomElectricity>,
}

impl EffectiveRoom {
    pub fn is_from_electricity(&self) -> bool {
        self.electricity.is_some()
    }
}

/// Resolve a room's bill against the snapshot. Recompute on every read; the
/// snapshot changes independently of the room record.
pub fn sync_room(room: &Room, snapshot: &ElectricityBillSnapshot) -> EffectiveRoom {
    let electricity = room_key(&room.number)
        .and_then(|key| snapshot.room(key))
        .cloned();

    let current_bill = electricity
        .as_ref()
        .map_or(room.current_bill, |e| e.current_bill);

    EffectiveRoom {
        room: room.clone(),
        current_bill,
        total: room.total_with_bill(current_bill),
        electricity,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertyTotals {
    pub rent: Decimal,
    pub current: Decimal,
    pub water: Decimal,
    pub dust: Decimal,
    pub total: Decimal,
}

pub fn property_totals<'a, I>(rooms: I, snapshot: &ElectricityBillSnapshot) -> PropertyTotals
where
    I: IntoIterator<Item = &'a Room>,
{
    rooms
        .into_iter()
        .map(|room| sync_room(room, snapshot))
        .fold(PropertyTotals::default(), |acc, e| PropertyTotals {
            rent: acc.rent + e.room.rent,
            current: acc.current + e.current_bill,
            water: acc.water + e.room.water_bill,
            dust: acc.dust + e.room.dust_collection,
            total: acc.total + e.total,
        })
}
