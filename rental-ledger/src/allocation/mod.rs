//! Cost allocation for one main meter's batch of sub-meter readings.
//!
//! Amounts stay exact decimals throughout; `display_round` is for output only.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{config::AllocationConfig, error::LedgerError};

/// A room reading as entered, before consumption is derived.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingInput {
    pub room_name: String,
    pub previous_unit: Decimal,
    pub current_unit: Decimal,
}

impl ReadingInput {
    pub fn new(room_name: impl Into<String>, previous_unit: Decimal, current_unit: Decimal) -> Self {
        Self {
            room_name: room_name.into(),
            previous_unit,
            current_unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomAllocation {
    /// Trimmed room name.
    pub room_name: String,
    pub previous_unit: Decimal,
    pub current_unit: Decimal,
    pub units_used: Decimal,
    pub room_bill: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub per_unit_cost: Decimal,
    pub total_units: Decimal,
    pub rooms: Vec<RoomAllocation>,
}

impl Allocation {
    pub fn total_billed(&self) -> Decimal {
        self.rooms.iter().map(|r| r.room_bill).sum()
    }
}

/// Sum without panicking; `None` once the total leaves the `Decimal` range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationPolicy {
    pub enforce_usage_cap: bool,
    pub max_rooms: usize,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy::from(&AllocationConfig::default())
    }
}

impl From<&AllocationConfig> for AllocationPolicy {
    fn from(cfg: &AllocationConfig) -> Self {
        Self {
            enforce_usage_cap: cfg.enforce_usage_cap,
            max_rooms: cfg.max_rooms_per_batch,
        }
    }
}

/// Units consumed between two readings, rounded to 2 decimals.
///
/// `None` when the current reading is below the previous one; such a reading
/// must not be saved.
pub fn compute_consumption(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if current >= previous {
        Some((current - previous).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    } else {
        None
    }
}

/// Presentation rounding (2 decimals, half away from zero).
pub fn display_round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Allocate with the default policy.
pub fn allocate(payable_taka: Decimal, readings: &[ReadingInput]) -> Result<Allocation, LedgerError> {
    AllocationPolicy::default().allocate(payable_taka, readings)
}

impl AllocationPolicy {
    /// Split `payable_taka` across `readings` in proportion to consumption.
    ///
    /// Rules:
    /// - the batch holds between 1 and `max_rooms` readings;
    /// - every room has a non-blank name and non-negative readings;
    /// - current >= previous for every room;
    /// - total units <= payable amount, when `enforce_usage_cap` is set.
    ///
    /// A batch with zero total consumption costs nothing per unit.
    pub fn allocate(&self, payable_taka: Decimal, readings: &[ReadingInput]) -> Result<Allocation, LedgerError> {
        match self.compute(payable_taka, readings) {
            Ok(a) => Ok(a),
            Err(e) => {
                let reason = match &e {
                    LedgerError::Allocation(_) => "usage_cap",
                    _ => "validation",
                };
                metrics::counter!("allocation_batch_rejected_total", "reason" => reason).increment(1);
                Err(e)
            }
        }
    }

    fn compute(&self, payable_taka: Decimal, readings: &[ReadingInput]) -> Result<Allocation, LedgerError> {
        if payable_taka <= Decimal::ZERO {
            return Err(LedgerError::Validation("payable amount must be positive".to_string()));
        }
        if readings.is_empty() {
            return Err(LedgerError::Validation("batch has no room readings".to_string()));
        }
        if readings.len() > self.max_rooms {
            return Err(LedgerError::Validation(format!(
                "batch has {} rooms, at most {} allowed",
                readings.len(),
                self.max_rooms
            )));
        }

        let mut rooms = Vec::with_capacity(readings.len());
        for (idx, r) in readings.iter().enumerate() {
            let room_name = r.room_name.trim();
            if room_name.is_empty() {
                return Err(LedgerError::Validation(format!("room {} has no name", idx + 1)));
            }
            if r.previous_unit < Decimal::ZERO || r.current_unit < Decimal::ZERO {
                return Err(LedgerError::Validation(format!(
                    "readings for {room_name} must be non-negative"
                )));
            }
            let units_used = compute_consumption(r.previous_unit, r.current_unit).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "current unit cannot be less than previous unit for {room_name}"
                ))
            })?;
            rooms.push(RoomAllocation {
                room_name: room_name.to_string(),
                previous_unit: r.previous_unit,
                current_unit: r.current_unit,
                units_used,
                room_bill: Decimal::ZERO,
            });
        }

        let total_units = checked_sum(rooms.iter().map(|r| r.units_used))
            .ok_or_else(|| LedgerError::Validation("total units are out of range".to_string()))?;
        if self.enforce_usage_cap && total_units > payable_taka {
            return Err(LedgerError::Allocation(format!(
                "usage exceeds meter limit: {total_units} units against {payable_taka} payable"
            )));
        }

        let per_unit_cost = if total_units > Decimal::ZERO {
            payable_taka.checked_div(total_units).ok_or_else(|| {
                LedgerError::Validation(format!(
                    "per-unit cost of {payable_taka} over {total_units} units is out of range"
                ))
            })?
        } else {
            Decimal::ZERO
        };
        for room in &mut rooms {
            room.room_bill = room.units_used.checked_mul(per_unit_cost).ok_or_else(|| {
                LedgerError::Validation(format!("bill for {} is out of range", room.room_name))
            })?;
        }

        Ok(Allocation {
            per_unit_cost,
            total_units,
            rooms,
        })
    }
}
