use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One room's reading within a meter's saved batch.
///
/// `units_used`, `per_unit_cost` and `room_bill` are optional because documents
/// written by older front ends (or imported by hand) may leave them out; readings
/// saved through the ledger always carry all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMeterReading {
    pub id: String,
    pub main_meter_id: String,
    /// Doubles as the key matched against `Room::number`.
    pub room_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_number: Option<String>,
    pub previous_unit: Decimal,
    pub current_unit: Decimal,
    #[serde(default)]
    pub units_used: Option<Decimal>,
    #[serde(default)]
    pub per_unit_cost: Option<Decimal>,
    #[serde(default)]
    pub room_bill: Option<Decimal>,
}

impl SubMeterReading {
    /// Trimmed room key, falling back to `room_number` when the name is blank.
    pub fn room_key(&self) -> Option<&str> {
        let name = self.room_name.trim();
        if !name.is_empty() {
            return Some(name);
        }
        self.room_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    pub fn units_or_zero(&self) -> Decimal {
        self.units_used.unwrap_or_default()
    }

    pub fn bill_or_zero(&self) -> Decimal {
        self.room_bill.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(name: &str, number: Option<&str>) -> SubMeterReading {
        SubMeterReading {
            id: "r-1".to_string(),
            main_meter_id: "m-1".to_string(),
            room_name: name.to_string(),
            room_number: number.map(str::to_string),
            previous_unit: Decimal::ZERO,
            current_unit: Decimal::ZERO,
            units_used: None,
            per_unit_cost: None,
            room_bill: None,
        }
    }

    #[test]
    fn room_key_trims_name() {
        assert_eq!(reading("  101 ", None).room_key(), Some("101"));
    }

    #[test]
    fn room_key_falls_back_to_number() {
        assert_eq!(reading("   ", Some(" 7B ")).room_key(), Some("7B"));
        assert_eq!(reading("", None).room_key(), None);
    }

    #[test]
    fn parses_browser_document_shape() {
        let json = r#"{
            "id": "1712_0",
            "mainMeterId": "1712",
            "roomName": "101",
            "roomNumber": "101",
            "previousUnit": 10,
            "currentUnit": 50.5,
            "unitsUsed": 40.5,
            "perUnitCost": 10,
            "roomBill": 405
        }"#;
        let r: SubMeterReading = serde_json::from_str(json).unwrap();
        assert_eq!(r.units_used, Some(Decimal::new(405, 1)));
        assert_eq!(r.bill_or_zero(), Decimal::from(405));
    }

    #[test]
    fn missing_computed_fields_default_to_none() {
        let json = r#"{"id":"x","mainMeterId":"m","roomName":"A","previousUnit":0,"currentUnit":3}"#;
        let r: SubMeterReading = serde_json::from_str(json).unwrap();
        assert!(r.units_used.is_none());
        assert_eq!(r.units_or_zero(), Decimal::ZERO);
    }
}
