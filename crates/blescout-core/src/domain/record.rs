//! Per-device aggregate state built up from admitted detections.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::address::Address;
use crate::domain::detection::{GpsFix, RawDetection};
use crate::signal::window::RssiWindow;

// ---------------------------------------------------------------------------
// DeviceKey
// ---------------------------------------------------------------------------

/// Aggregation key for a tracked device.
///
/// `Identity` keys collapse every rotated resolvable private address that
/// matched the same identity resolving key into a single record; the index
/// refers to the position of the key in the configured key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceKey {
    /// Keyed by raw device address.
    Address(Address),
    /// Keyed by matched identity resolving key index.
    Identity(usize),
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "{addr}"),
            Self::Identity(index) => write!(f, "identity#{index}"),
        }
    }
}

// ---------------------------------------------------------------------------
// BestFix
// ---------------------------------------------------------------------------

/// The position observed at the strongest averaged signal so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestFix {
    pub fix: GpsFix,
    /// Averaged RSSI at the moment the fix was recorded.
    pub avg_rssi: i32,
}

// ---------------------------------------------------------------------------
// DeviceRecord
// ---------------------------------------------------------------------------

/// Durable aggregate for one tracked device.
///
/// Mutated only by the ledger while it holds the write lock; callers receive
/// clones and must treat them as point-in-time snapshots.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Aggregation key the record lives under.
    pub key: DeviceKey,
    /// Most recently seen address (for identity keys this is the latest
    /// rotation of the device's private address).
    pub address: Address,
    /// Number of admitted detections folded into this record.
    pub detections: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Latest raw RSSI in dBm.
    pub rssi: i32,
    /// Averaged RSSI over the smoothing window.
    pub avg_rssi: i32,
    /// Latest advertised transmit power, once one has been observed.
    pub tx_power: Option<i32>,
    /// Latest distance estimate in meters, when computable.
    pub distance_m: Option<f64>,
    pub best_fix: Option<BestFix>,
    pub name: Option<String>,
    pub manufacturer_data: BTreeMap<u16, Vec<u8>>,
    pub service_uuids: BTreeSet<String>,
    /// Index of the identity resolving key that matched, for identity keys.
    pub matched_irk: Option<usize>,
    /// True while the latest distance estimate is inside the configured
    /// alert radius.
    pub proximity_alert: bool,
    /// Smoothing window over raw RSSI samples.
    pub window: RssiWindow,
}

impl DeviceRecord {
    pub(crate) fn new(
        key: DeviceKey,
        address: Address,
        matched_irk: Option<usize>,
        window_capacity: usize,
        first_seen: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            address,
            detections: 0,
            first_seen,
            last_seen: first_seen,
            rssi: 0,
            avg_rssi: 0,
            tx_power: None,
            distance_m: None,
            best_fix: None,
            name: None,
            manufacturer_data: BTreeMap::new(),
            service_uuids: BTreeSet::new(),
            matched_irk,
            proximity_alert: false,
            window: RssiWindow::new(window_capacity),
        }
    }

    /// Folds one admitted detection into the aggregate.
    ///
    /// `avg` is the window average after the sample was pushed and `distance`
    /// the estimate derived from it. Observed fields merge non-empty-wins: a
    /// detection that omits a field never clears a previously seen value.
    pub(crate) fn observe(
        &mut self,
        det: &RawDetection,
        address: Address,
        avg: i32,
        distance: Option<f64>,
    ) {
        self.detections += 1;
        self.last_seen = det.timestamp;
        self.address = address;
        self.rssi = det.rssi;
        self.avg_rssi = avg;
        self.distance_m = distance;
        if det.tx_power.is_some() {
            self.tx_power = det.tx_power;
        }
        if let Some(fix) = det.fix {
            let stronger = self.best_fix.map_or(true, |best| avg > best.avg_rssi);
            if stronger {
                self.best_fix = Some(BestFix { fix, avg_rssi: avg });
            }
        }
        if let Some(name) = det.name.as_deref() {
            if !name.is_empty() {
                self.name = Some(name.to_string());
            }
        }
        for (company, data) in &det.manufacturer_data {
            if !data.is_empty() {
                self.manufacturer_data.insert(*company, data.clone());
            }
        }
        for uuid in &det.service_uuids {
            if !uuid.is_empty() {
                self.service_uuids.insert(uuid.clone());
            }
        }
    }
}
