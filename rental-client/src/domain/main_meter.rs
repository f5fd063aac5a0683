use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A physical utility meter whose fixed monthly amount is shared by its rooms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainMeter {
    pub id: String,
    pub owner_name: String,
    /// Unique across all meters.
    pub meter_number: String,
    pub code_name: String,
    pub payable_taka: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
