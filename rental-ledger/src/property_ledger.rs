use rental_client::domain::{ElectricityBillSnapshot, Property, Room, Tenant};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    error::{LedgerError, LedgerResult},
    sync::{self, EffectiveRoom, PropertyTotals},
};

/// Upper bound on an identification image, measured on the decoded bytes.
pub const MAX_NID_PICTURE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomInput {
    pub number: String,
    pub rent: Decimal,
    pub current_bill: Decimal,
    pub water_bill: Decimal,
    pub dust_collection: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantInput {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub emergency_contact: String,
    pub emergency_contact_name: String,
    pub nid_number: String,
    pub address: String,
    pub status: Option<String>,
    pub lease_start_date: Option<Date>,
    pub lease_end_date: Option<Date>,
    pub security_deposit: Decimal,
    pub notes: String,
    /// New identification image; `None` keeps whatever is stored.
    pub nid_picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySummary {
    pub id: String,
    pub name: String,
    pub address: String,
    pub room_count: usize,
    pub occupied_rooms: usize,
    pub total_rent: Decimal,
    pub total_income: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyLedger {
    properties: Vec<Property>,
}

fn validate_room(input: &RoomInput) -> LedgerResult<()> {
    if input.number.trim().is_empty() {
        return Err(LedgerError::Validation("room number is required".to_string()));
    }
    let amounts = [input.rent, input.current_bill, input.water_bill, input.dust_collection];
    if amounts.iter().any(|a| *a < Decimal::ZERO) {
        return Err(LedgerError::Validation(format!(
            "charges for room {} must be non-negative",
            input.number.trim()
        )));
    }
    Ok(())
}

fn apply_room(room: &mut Room, input: &RoomInput) {
    room.number = input.number.trim().to_string();
    room.rent = input.rent;
    room.current_bill = input.current_bill;
    room.water_bill = input.water_bill;
    room.dust_collection = input.dust_collection;
    room.total = room.stored_total();
}

fn validate_nid_picture(picture: &str) -> LedgerResult<()> {
    let Some((header, payload)) = picture.split_once(',') else {
        return Err(LedgerError::Validation("identification image must be a data URL".to_string()));
    };
    if !header.starts_with("data:image/") {
        return Err(LedgerError::Validation("identification document must be an image".to_string()));
    }
    let decoded_len = if header.ends_with(";base64") {
        payload.len() / 4 * 3
    } else {
        payload.len()
    };
    if decoded_len > MAX_NID_PICTURE_BYTES {
        return Err(LedgerError::Validation("identification image must be under 5MB".to_string()));
    }
    Ok(())
}

impl PropertyLedger {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn property(&self, property_id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == property_id)
    }

    fn property_mut(&mut self, property_id: &str) -> LedgerResult<&mut Property> {
        self.properties
            .iter_mut()
            .find(|p| p.id == property_id)
            .ok_or_else(|| LedgerError::NotFound(format!("property {property_id}")))
    }

    fn require_property(&self, property_id: &str) -> LedgerResult<&Property> {
        self.property(property_id)
            .ok_or_else(|| LedgerError::NotFound(format!("property {property_id}")))
    }

    /// Find a room by id across all properties.
    pub fn room(&self, room_id: &str) -> Option<(&Property, &Room)> {
        self.properties
            .iter()
            .find_map(|p| p.room(room_id).map(|r| (p, r)))
    }

    fn room_mut(&mut self, room_id: &str) -> LedgerResult<&mut Room> {
        self.properties
            .iter_mut()
            .find_map(|p| p.room_mut(room_id))
            .ok_or_else(|| LedgerError::NotFound(format!("room {room_id}")))
    }

    /// Create a property with rooms numbered `1..=room_count`, all charges zero.
    pub fn add_property(
        &mut self,
        name: &str,
        address: &str,
        room_count: usize,
        now: OffsetDateTime,
    ) -> LedgerResult<Property> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation("property name is required".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let rooms = (1..=room_count)
            .map(|i| Room::new(format!("{id}_room_{i}"), i.to_string()))
            .collect();
        let property = Property {
            id,
            name: name.to_string(),
            address: address.trim().to_string(),
            room_count,
            rooms,
            created_at: now,
        };
        self.properties.push(property.clone());
        Ok(property)
    }

    pub fn edit_property(&mut self, property_id: &str, name: &str, address: &str) -> LedgerResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation("property name is required".to_string()));
        }
        let property = self.property_mut(property_id)?;
        property.name = name.to_string();
        property.address = address.trim().to_string();
        Ok(())
    }

    /// Remove a property together with its rooms and tenants.
    pub fn delete_property(&mut self, property_id: &str) -> LedgerResult<Property> {
        let idx = self
            .properties
            .iter()
            .position(|p| p.id == property_id)
            .ok_or_else(|| LedgerError::NotFound(format!("property {property_id}")))?;
        Ok(self.properties.remove(idx))
    }

    pub fn add_room(&mut self, property_id: &str, input: &RoomInput) -> LedgerResult<Room> {
        validate_room(input)?;
        let property = self.property_mut(property_id)?;
        let mut room = Room::new(
            format!("{}_room_{}", property.id, Uuid::new_v4().simple()),
            String::new(),
        );
        apply_room(&mut room, input);
        property.rooms.push(room.clone());
        Ok(room)
    }

    /// Overwrite a room's number and charges; the tenant stays.
    pub fn edit_room(&mut self, property_id: &str, room_id: &str, input: &RoomInput) -> LedgerResult<Room> {
        validate_room(input)?;
        let property = self.property_mut(property_id)?;
        let room = property
            .room_mut(room_id)
            .ok_or_else(|| LedgerError::NotFound(format!("room {room_id}")))?;
        apply_room(room, input);
        Ok(room.clone())
    }

    pub fn delete_room(&mut self, property_id: &str, room_id: &str) -> LedgerResult<Room> {
        let property = self.property_mut(property_id)?;
        let idx = property
            .rooms
            .iter()
            .position(|r| r.id == room_id)
            .ok_or_else(|| LedgerError::NotFound(format!("room {room_id}")))?;
        Ok(property.rooms.remove(idx))
    }

    /// Add a tenant to the room, or update the one already there.
    ///
    /// Updating keeps the tenant id, the date it was added and, unless a new
    /// one is given, the stored identification image.
    pub fn assign_tenant(&mut self, room_id: &str, input: TenantInput, now: OffsetDateTime) -> LedgerResult<Tenant> {
        if input.name.trim().is_empty() {
            return Err(LedgerError::Validation("tenant name is required".to_string()));
        }
        if input.security_deposit < Decimal::ZERO {
            return Err(LedgerError::Validation("security deposit must be non-negative".to_string()));
        }
        if let Some(picture) = &input.nid_picture {
            validate_nid_picture(picture)?;
        }
        if let (Some(start), Some(end)) = (input.lease_start_date, input.lease_end_date) {
            if end < start {
                return Err(LedgerError::Validation("lease cannot end before it starts".to_string()));
            }
        }

        let room = self.room_mut(room_id)?;
        let previous = room.tenant.take();
        let (id, added_date, stored_picture) = match previous {
            Some(t) => (t.id, t.added_date, t.nid_picture),
            None => (Uuid::new_v4().to_string(), now, None),
        };

        let tenant = Tenant {
            id,
            name: input.name.trim().to_string(),
            phone: input.phone,
            email: input.email,
            emergency_contact: input.emergency_contact,
            emergency_contact_name: input.emergency_contact_name,
            nid_number: input.nid_number,
            address: input.address,
            status: input.status,
            lease_start_date: input.lease_start_date,
            lease_end_date: input.lease_end_date,
            security_deposit: input.security_deposit,
            notes: input.notes,
            nid_picture: input.nid_picture.or(stored_picture),
            added_date,
        };
        room.tenant = Some(tenant.clone());
        Ok(tenant)
    }

    pub fn remove_tenant(&mut self, room_id: &str) -> LedgerResult<Tenant> {
        self.room_mut(room_id)?
            .tenant
            .take()
            .ok_or_else(|| LedgerError::NotFound(format!("tenant in room {room_id}")))
    }

    pub fn effective_rooms(
        &self,
        property_id: &str,
        snapshot: &ElectricityBillSnapshot,
    ) -> LedgerResult<Vec<EffectiveRoom>> {
        let property = self.require_property(property_id)?;
        Ok(property
            .rooms
            .iter()
            .map(|room| sync::sync_room(room, snapshot))
            .collect())
    }

    pub fn property_totals(
        &self,
        property_id: &str,
        snapshot: &ElectricityBillSnapshot,
    ) -> LedgerResult<PropertyTotals> {
        let property = self.require_property(property_id)?;
        Ok(sync::property_totals(&property.rooms, snapshot))
    }

    pub fn portfolio(&self, snapshot: &ElectricityBillSnapshot) -> Vec<PropertySummary> {
        self.properties
            .iter()
            .map(|p| {
                let totals = sync::property_totals(&p.rooms, snapshot);
                PropertySummary {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    address: p.address.clone(),
                    room_count: p.rooms.len(),
                    occupied_rooms: p.rooms.iter().filter(|r| r.tenant.is_some()).count(),
                    total_rent: totals.rent,
                    total_income: totals.total,
                }
            })
            .collect()
    }
}
