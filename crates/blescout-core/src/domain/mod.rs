//! Domain types: addresses, raw detection events and device aggregates.

pub mod address;
pub mod detection;
pub mod record;

pub use address::Address;
pub use detection::{GpsFix, RawDetection};
pub use record::{BestFix, DeviceKey, DeviceRecord};
