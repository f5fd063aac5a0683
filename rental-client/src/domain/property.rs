use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    /// Room count requested at creation; rooms may be added or removed later.
    #[serde(default)]
    pub room_count: usize,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Property {
    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn room_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.id == room_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    /// Matched against `SubMeterReading::room_name` after trimming.
    pub number: String,
    #[serde(default)]
    pub rent: Decimal,
    /// Manually entered bill. Shadowed, never overwritten, by synchronized electricity data.
    #[serde(default)]
    pub current_bill: Decimal,
    #[serde(default)]
    pub water_bill: Decimal,
    #[serde(default)]
    pub dust_collection: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Tenant>,
}

impl Room {
    pub fn new(id: String, number: String) -> Self {
        Self {
            id,
            number,
            rent: Decimal::ZERO,
            current_bill: Decimal::ZERO,
            water_bill: Decimal::ZERO,
            dust_collection: Decimal::ZERO,
            total: Decimal::ZERO,
            tenant: None,
        }
    }

    /// Total using the stored bill.
    pub fn stored_total(&self) -> Decimal {
        self.total_with_bill(self.current_bill)
    }

    pub fn total_with_bill(&self, current_bill: Decimal) -> Decimal {
        self.rent + current_bill + self.water_bill + self.dust_collection
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub emergency_contact: String,
    #[serde(default)]
    pub emergency_contact_name: String,
    #[serde(default)]
    pub nid_number: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, with = "lease_date")]
    pub lease_start_date: Option<Date>,
    #[serde(default, with = "lease_date")]
    pub lease_end_date: Option<Date>,
    #[serde(default)]
    pub security_deposit: Decimal,
    #[serde(default)]
    pub notes: String,
    /// Identification document as a `data:image/...` URL.
    #[serde(default)]
    pub nid_picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub added_date: OffsetDateTime,
}

/// `YYYY-MM-DD` lease dates; an empty string or `null` reads as no date.
mod lease_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{macros::format_description, Date};

    pub fn serialize<S>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => {
                let s = date
                    .format(format_description!("[year]-[month]-[day]"))
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&s)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Date::parse(s, format_description!("[year]-[month]-[day]"))
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn tenant_lease_dates_accept_blank_strings() {
        let json = r#"{
            "id": "t-1",
            "name": "Rahim",
            "leaseStartDate": "2024-02-01",
            "leaseEndDate": "",
            "securityDeposit": 5000,
            "addedDate": "2024-02-01T10:00:00.000Z"
        }"#;
        let t: Tenant = serde_json::from_str(json).unwrap();
        assert_eq!(t.lease_start_date, Some(date!(2024 - 02 - 01)));
        assert_eq!(t.lease_end_date, None);
        assert!(t.nid_picture.is_none());

        let out = serde_json::to_value(&t).unwrap();
        assert_eq!(out["leaseStartDate"], "2024-02-01");
        assert!(out["leaseEndDate"].is_null());
    }

    #[test]
    fn room_totals_sum_all_charges() {
        let mut room = Room::new("p_room_1".to_string(), "1".to_string());
        room.rent = Decimal::from(5000);
        room.current_bill = Decimal::from(300);
        room.water_bill = Decimal::from(200);
        room.dust_collection = Decimal::from(50);
        assert_eq!(room.stored_total(), Decimal::from(5550));
        assert_eq!(room.total_with_bill(Decimal::from(400)), Decimal::from(5650));
    }
}
