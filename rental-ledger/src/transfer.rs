use rental_client::{
    domain::{ElectricityData, ExportDocument, EXPORT_FORMAT_VERSION},
    StoreError,
};
use time::{macros::format_description, Date, OffsetDateTime};

use crate::error::{LedgerError, LedgerResult};

pub fn export_document(data: &ElectricityData, now: OffsetDateTime) -> ExportDocument {
    ExportDocument {
        main_meters: data.main_meters.clone(),
        sub_meter_data: data.sub_meter_data.clone(),
        export_date: Some(now),
        version: Some(EXPORT_FORMAT_VERSION.to_string()),
    }
}

/// Pretty-printed export file contents.
pub fn export_json(data: &ElectricityData, now: OffsetDateTime) -> LedgerResult<String> {
    serde_json::to_string_pretty(&export_document(data, now)).map_err(|source| {
        LedgerError::Storage(StoreError::Encode {
            key: "export".to_string(),
            source,
        })
    })
}

/// `electricity_data_<YYYY-MM-DD>.json`
pub fn export_file_name(date: Date) -> String {
    let day = date
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string());
    format!("electricity_data_{day}.json")
}

/// Parse an export file. Both `mainMeters` and `subMeterData` must be present;
/// anything short of a complete document is rejected as a whole.
pub fn parse_import(json: &str) -> LedgerResult<ElectricityData> {
    match parse_document(json) {
        Ok(doc) => Ok(doc.into()),
        Err(e) => {
            metrics::counter!("ledger_import_rejected_total").increment(1);
            Err(e)
        }
    }
}

fn parse_document(json: &str) -> LedgerResult<ExportDocument> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| LedgerError::ImportFormat(format!("invalid JSON: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| LedgerError::ImportFormat("expected a JSON object".to_string()))?;
    for key in ["mainMeters", "subMeterData"] {
        if obj.get(key).map_or(true, serde_json::Value::is_null) {
            return Err(LedgerError::ImportFormat(format!("missing required field '{key}'")));
        }
    }

    if let Some(version) = obj.get("version").and_then(|v| v.as_str()) {
        if version != EXPORT_FORMAT_VERSION {
            tracing::warn!(version, "importing document with unexpected format version");
        }
    }

    serde_json::from_value(value).map_err(|e| LedgerError::ImportFormat(format!("malformed ledger data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_client::domain::{MainMeter, SubMeterReading};
    use rust_decimal::Decimal;
    use time::macros::{date, datetime};

    fn sample() -> ElectricityData {
        ElectricityData {
            main_meters: vec![MainMeter {
                id: "m1".to_string(),
                owner_name: "Karim".to_string(),
                meter_number: "MTR-1".to_string(),
                code_name: "North".to_string(),
                payable_taka: Decimal::from(1000),
                created_at: datetime!(2024-01-01 00:00:00 UTC),
            }],
            sub_meter_data: vec![SubMeterReading {
                id: "r1".to_string(),
                main_meter_id: "m1".to_string(),
                room_name: "101".to_string(),
                room_number: Some("101".to_string()),
                previous_unit: Decimal::from(10),
                current_unit: Decimal::from(50),
                units_used: Some(Decimal::from(40)),
                per_unit_cost: Some(Decimal::from(25)),
                room_bill: Some(Decimal::from(1000)),
            }],
        }
    }

    #[test]
    fn export_carries_date_and_version() {
        let json = export_json(&sample(), datetime!(2024-05-01 12:00:00 UTC)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["exportDate"], "2024-05-01T12:00:00Z");
        assert_eq!(value["mainMeters"][0]["meterNumber"], "MTR-1");
        assert_eq!(value["subMeterData"][0]["roomBill"], 1000.0);
    }

    #[test]
    fn exported_file_imports_back() {
        let json = export_json(&sample(), datetime!(2024-05-01 12:00:00 UTC)).unwrap();
        assert_eq!(parse_import(&json).unwrap(), sample());
    }

    #[test]
    fn import_without_sub_meter_data_is_rejected() {
        let json = r#"{"mainMeters": [], "exportDate": "2024-05-01T12:00:00Z", "version": "1.0"}"#;
        match parse_import(json) {
            Err(LedgerError::ImportFormat(msg)) => assert!(msg.contains("subMeterData")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn import_rejects_garbage_and_null_collections() {
        assert!(matches!(parse_import("not json"), Err(LedgerError::ImportFormat(_))));
        assert!(matches!(parse_import("[]"), Err(LedgerError::ImportFormat(_))));
        assert!(matches!(
            parse_import(r#"{"mainMeters": null, "subMeterData": []}"#),
            Err(LedgerError::ImportFormat(_))
        ));
        assert!(matches!(
            parse_import(r#"{"mainMeters": [{"id": 1}], "subMeterData": []}"#),
            Err(LedgerError::ImportFormat(_))
        ));
    }

    #[test]
    fn import_accepts_empty_collections_without_metadata() {
        let data = parse_import(r#"{"mainMeters": [], "subMeterData": []}"#).unwrap();
        assert_eq!(data, ElectricityData::default());
    }

    #[test]
    fn file_name_uses_export_day() {
        assert_eq!(export_file_name(date!(2024 - 05 - 01)), "electricity_data_2024-05-01.json");
    }
}
