use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{MainMeter, SubMeterReading};

pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// The persisted meter ledger (`electricityData`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricityData {
    #[serde(default)]
    pub main_meters: Vec<MainMeter>,
    #[serde(default)]
    pub sub_meter_data: Vec<SubMeterReading>,
}

impl ElectricityData {
    pub fn meter(&self, meter_id: &str) -> Option<&MainMeter> {
        self.main_meters.iter().find(|m| m.id == meter_id)
    }

    pub fn readings_for<'a>(&'a self, meter_id: &'a str) -> impl Iterator<Item = &'a SubMeterReading> + 'a {
        self.sub_meter_data
            .iter()
            .filter(move |r| r.main_meter_id == meter_id)
    }
}

/// Import/export file. Unlike `ElectricityData`, both collections are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub main_meters: Vec<MainMeter>,
    pub sub_meter_data: Vec<SubMeterReading>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub export_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub version: Option<String>,
}

impl From<ExportDocument> for ElectricityData {
    fn from(doc: ExportDocument) -> Self {
        ElectricityData {
            main_meters: doc.main_meters,
            sub_meter_data: doc.sub_meter_data,
        }
    }
}
