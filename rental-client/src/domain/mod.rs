pub mod electricity;
pub mod main_meter;
pub mod property;
pub mod snapshot;
pub mod sub_meter;

pub use electricity::{ElectricityData, ExportDocument, EXPORT_FORMAT_VERSION};
pub use main_meter::MainMeter;
pub use property::{Property, Room, Tenant};
pub use snapshot::{ElectricityBillSnapshot, RoomElectricity};
pub use sub_meter::SubMeterReading;
