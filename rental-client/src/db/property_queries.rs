use crate::domain::Property;

use super::{read_json, write_json, KeyValueStore, StoreError, PROPERTIES_KEY};

/// Fetch all properties. The document is a bare array.
pub fn load_properties<S>(store: &S) -> Result<Option<Vec<Property>>, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    read_json(store, PROPERTIES_KEY)
}

pub fn save_properties<S>(store: &mut S, properties: &[Property]) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
{
    write_json(store, PROPERTIES_KEY, &properties)
}
