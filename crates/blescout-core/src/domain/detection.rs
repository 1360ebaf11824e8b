//! Raw advertisement detection events as delivered by a capture source.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GpsFix
// ---------------------------------------------------------------------------

/// A geographic position stamped onto detections at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl GpsFix {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    #[must_use]
    pub fn with_altitude(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: Some(altitude),
        }
    }
}

// ---------------------------------------------------------------------------
// RawDetection
// ---------------------------------------------------------------------------

/// One advertisement sighting, exactly as a capture source reported it.
///
/// The address stays textual here; the ledger parses and canonicalizes it
/// when the event is recorded. Events are transient: the ledger folds them
/// into [`DeviceRecord`](crate::domain::DeviceRecord)s and never retains
/// them afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    /// Device address text, e.g. `"54:2B:9A:10:22:31"`.
    pub address: String,
    /// Received signal strength in dBm.
    pub rssi: i32,
    /// Advertised transmit power in dBm, when present in the advertisement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_power: Option<i32>,
    /// Advertised local name, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Manufacturer-specific data keyed by company identifier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub manufacturer_data: BTreeMap<u16, Vec<u8>>,
    /// Advertised service UUIDs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_uuids: Vec<String>,
    /// Position stamped by the capture source, when one was available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<GpsFix>,
    /// Capture timestamp.
    pub timestamp: DateTime<Utc>,
    /// Label of the adapter or feed that produced the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
}

impl RawDetection {
    /// Builds a minimal detection; optional fields start empty.
    #[must_use]
    pub fn new(address: impl Into<String>, rssi: i32, timestamp: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            rssi,
            tx_power: None,
            name: None,
            manufacturer_data: BTreeMap::new(),
            service_uuids: Vec::new(),
            fix: None,
            timestamp,
            adapter: None,
        }
    }
}
