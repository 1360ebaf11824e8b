//! The device ledger: correlates raw detections into per-device records.
//!
//! One [`DeviceLedger`] serves a whole scan session. Handles are cheap to
//! clone and share an inner state guarded by a single `RwLock`, so any number
//! of capture feeds can record concurrently while readers take consistent
//! snapshots. All per-event mutation happens under one write-lock scope;
//! a snapshot can never observe a half-applied detection.

pub mod config;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::domain::{Address, DeviceKey, DeviceRecord, RawDetection};
use crate::error::ScanResult;
use crate::resolve::RpaResolver;
use crate::signal::DistanceEstimator;

pub use config::{ScanMode, SessionConfig, SessionConfigBuilder};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a detection was not admitted into a device record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// The smoothed RSSI would have fallen below the configured floor.
    BelowMinRssi,
    /// The advertised name did not contain the configured pattern.
    NameMismatch,
    /// The address did not contain the targeted needle.
    TargetMismatch,
}

/// Result of recording one detection.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
    /// The detection was folded into a record; the snapshot reflects the
    /// state immediately after this event.
    Recorded(DeviceRecord),
    /// Resolve mode: the address matched none of the configured keys. Not an
    /// error; counted as seen but (without verbose tracking) not aggregated.
    Unresolved,
    /// An admission filter suppressed the detection; no state changed.
    Filtered(FilterReason),
}

/// Aggregate session counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTally {
    /// Detections admitted or seen-but-unresolved. Filtered and malformed
    /// events never count.
    pub detections: u64,
    pub unique_devices: u64,
    /// Detections that resolved against a configured key.
    pub irk_matches: u64,
}

// ---------------------------------------------------------------------------
// DeviceLedger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LedgerState {
    devices: HashMap<DeviceKey, DeviceRecord>,
    /// Keys in first-seen order, for stable snapshot output.
    order: Vec<DeviceKey>,
    detections: u64,
    irk_matches: u64,
}

struct LedgerInner {
    config: SessionConfig,
    resolver: RpaResolver,
    estimator: DistanceEstimator,
    state: RwLock<LedgerState>,
}

/// Shared, thread-safe device tracking state for one scan session.
#[derive(Clone)]
pub struct DeviceLedger {
    inner: Arc<LedgerInner>,
}

impl DeviceLedger {
    /// Creates a ledger from a validated session configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let resolver = match &config.mode {
            ScanMode::Resolve { keys } => RpaResolver::new(keys.clone()),
            _ => RpaResolver::default(),
        };
        let estimator = DistanceEstimator::new(config.environment, config.ref_rssi);
        Self {
            inner: Arc::new(LedgerInner {
                config,
                resolver,
                estimator,
                state: RwLock::new(LedgerState::default()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Records one raw detection.
    ///
    /// The whole pipeline runs atomically per event: aggregation-key
    /// determination, admission filtering against the would-be smoothed
    /// RSSI, window update, distance estimation, best-fix retention, field
    /// merge and counters. Malformed addresses fail with
    /// [`ScanError::InvalidDetection`](crate::error::ScanError) and leave
    /// the ledger untouched.
    pub fn record(&self, det: &RawDetection) -> ScanResult<RecordOutcome> {
        let address = Address::parse(&det.address)?;
        let config = &self.inner.config;

        let mut guard = self.inner.state.write();
        let state = &mut *guard;

        // Aggregation key. Targeted mismatches and quiet unresolved
        // addresses never reach a device record.
        let mut tallied_unresolved = false;
        let (key, matched_irk) = match &config.mode {
            ScanMode::Discovery => (DeviceKey::Address(address), None),
            ScanMode::Targeted { needle } => {
                if !address.to_string().contains(&needle.to_ascii_uppercase()) {
                    trace!(%address, "suppressing non-target device");
                    return Ok(RecordOutcome::Filtered(FilterReason::TargetMismatch));
                }
                (DeviceKey::Address(address), None)
            }
            ScanMode::Resolve { .. } => match self.inner.resolver.resolve(&address) {
                Some(index) => (DeviceKey::Identity(index), Some(index)),
                None => {
                    state.detections += 1;
                    if !config.verbose_unresolved {
                        trace!(%address, "address matched no configured key");
                        return Ok(RecordOutcome::Unresolved);
                    }
                    tallied_unresolved = true;
                    (DeviceKey::Address(address), None)
                }
            },
        };

        // Admission filters, applied before the sample is committed. The
        // RSSI floor sees the value the window would smooth to, so one deep
        // fade cannot drop an otherwise strong device.
        if let Some(floor) = config.min_rssi {
            let smoothed = state
                .devices
                .get(&key)
                .map_or(det.rssi, |record| record.window.preview(det.rssi));
            if smoothed < floor {
                trace!(device = %key, rssi = det.rssi, smoothed, "below RSSI floor");
                return Ok(RecordOutcome::Filtered(FilterReason::BelowMinRssi));
            }
        }
        if let Some(pattern) = &config.name_filter {
            let matched = det
                .name
                .as_deref()
                .is_some_and(|name| name.to_lowercase().contains(&pattern.to_lowercase()));
            if !matched {
                return Ok(RecordOutcome::Filtered(FilterReason::NameMismatch));
            }
        }

        let is_new = !state.devices.contains_key(&key);
        let record = match state.devices.entry(key) {
            Entry::Vacant(entry) => {
                state.order.push(key);
                entry.insert(DeviceRecord::new(
                    key,
                    address,
                    matched_irk,
                    config.window_capacity,
                    det.timestamp,
                ))
            }
            Entry::Occupied(entry) => entry.into_mut(),
        };

        let avg = record.window.push(det.rssi);
        let distance = self.inner.estimator.estimate(avg, det.tx_power);
        record.observe(det, address, avg, distance);
        record.proximity_alert = match (config.alert_within_m, record.distance_m) {
            (Some(radius), Some(d)) => d <= radius,
            _ => false,
        };
        let snapshot = record.clone();

        if !tallied_unresolved {
            state.detections += 1;
        }
        if matched_irk.is_some() {
            state.irk_matches += 1;
        }
        if is_new {
            debug!(device = %key, rssi = det.rssi, "tracking new device");
        } else {
            trace!(device = %key, rssi = det.rssi, avg, "detection recorded");
        }
        Ok(RecordOutcome::Recorded(snapshot))
    }

    /// Point-in-time snapshot of every tracked device, first-seen order.
    #[must_use]
    pub fn all_records(&self) -> Vec<DeviceRecord> {
        let state = self.inner.state.read();
        state
            .order
            .iter()
            .filter_map(|key| state.devices.get(key))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.inner.state.read().devices.len()
    }

    #[must_use]
    pub fn tally(&self) -> ScanTally {
        let state = self.inner.state.read();
        ScanTally {
            detections: state.detections,
            unique_devices: state.devices.len() as u64,
            irk_matches: state.irk_matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GpsFix;
    use crate::resolve::{ah, IdentityResolvingKey};
    use crate::signal::Environment;
    use chrono::Utc;

    fn make_det(address: &str, rssi: i32) -> RawDetection {
        RawDetection::new(address, rssi, Utc::now())
    }

    fn make_key(seed: u8) -> IdentityResolvingKey {
        IdentityResolvingKey::from_bytes([seed; 16])
    }

    fn make_rpa(key: &IdentityResolvingKey, prand: [u8; 3]) -> String {
        let prand = [(prand[0] & 0x3F) | 0x40, prand[1], prand[2]];
        let hash = ah(key, prand);
        format!(
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            prand[0], prand[1], prand[2], hash[0], hash[1], hash[2]
        )
    }

    fn recorded(outcome: RecordOutcome) -> DeviceRecord {
        match outcome {
            RecordOutcome::Recorded(record) => record,
            other => panic!("expected Recorded, got {other:?}"),
        }
    }

    #[test]
    fn test_discovery_tracks_by_address() {
        let ledger = DeviceLedger::new(SessionConfig::default());
        let rec = recorded(ledger.record(&make_det("C0:11:22:33:44:55", -68)).unwrap());
        assert_eq!(rec.address.to_string(), "C0:11:22:33:44:55");
        assert_eq!(rec.detections, 1);
        assert_eq!(rec.rssi, -68);
        assert_eq!(rec.avg_rssi, -68);
        assert!(rec.matched_irk.is_none());

        let rec = recorded(ledger.record(&make_det("c0:11:22:33:44:55", -72)).unwrap());
        assert_eq!(rec.detections, 2);
        assert_eq!(ledger.device_count(), 1);
    }

    #[test]
    fn test_malformed_address_is_an_error_and_leaves_no_state() {
        let ledger = DeviceLedger::new(SessionConfig::default());
        assert!(ledger.record(&make_det("", -60)).is_err());
        assert!(ledger.record(&make_det("junk", -60)).is_err());
        assert_eq!(ledger.device_count(), 0);
        assert_eq!(ledger.tally().detections, 0);
    }

    #[test]
    fn test_targeted_mode_suppresses_non_matches_silently() {
        let config = SessionConfig::builder().targeted("9a:10").build().unwrap();
        let ledger = DeviceLedger::new(config);

        let miss = ledger.record(&make_det("C0:11:22:33:44:55", -60)).unwrap();
        assert!(matches!(
            miss,
            RecordOutcome::Filtered(FilterReason::TargetMismatch)
        ));
        assert_eq!(ledger.tally().detections, 0);

        let hit = ledger.record(&make_det("54:2B:9A:10:22:31", -60)).unwrap();
        assert!(matches!(hit, RecordOutcome::Recorded(_)));
        assert_eq!(ledger.tally().detections, 1);
    }

    #[test]
    fn test_resolve_mode_collapses_rotations_into_one_identity() {
        let key = make_key(0x3C);
        let config = SessionConfig::builder()
            .resolve_keys(vec![make_key(1), key])
            .window_capacity(3)
            .build()
            .unwrap();
        let ledger = DeviceLedger::new(config);

        let rotations = [
            make_rpa(&key, [0x40, 0x00, 0x01]),
            make_rpa(&key, [0x51, 0xA2, 0xB3]),
            make_rpa(&key, [0x7F, 0xFF, 0xFE]),
        ];
        for (addr, rssi) in rotations.iter().zip([-60, -70, -50]) {
            let rec = recorded(ledger.record(&make_det(addr, rssi)).unwrap());
            assert_eq!(rec.matched_irk, Some(1));
        }

        let records = ledger.all_records();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.key, DeviceKey::Identity(1));
        assert_eq!(rec.detections, 3);
        // Rotations share one smoothing window.
        assert_eq!(rec.window.contents(), vec![-60, -70, -50]);
        assert_eq!(rec.avg_rssi, -60);
        // Representative address follows the latest rotation.
        assert_eq!(rec.address.to_string(), rotations[2]);

        let tally = ledger.tally();
        assert_eq!(tally.detections, 3);
        assert_eq!(tally.irk_matches, 3);
        assert_eq!(tally.unique_devices, 1);
    }

    #[test]
    fn test_unresolved_is_counted_but_not_tracked() {
        let config = SessionConfig::builder()
            .resolve_keys(vec![make_key(1)])
            .build()
            .unwrap();
        let ledger = DeviceLedger::new(config);

        let stranger = make_rpa(&make_key(9), [0x42, 0x00, 0x07]);
        let outcome = ledger.record(&make_det(&stranger, -60)).unwrap();
        assert!(matches!(outcome, RecordOutcome::Unresolved));
        assert_eq!(ledger.device_count(), 0);
        let tally = ledger.tally();
        assert_eq!(tally.detections, 1);
        assert_eq!(tally.irk_matches, 0);
    }

    #[test]
    fn test_verbose_unresolved_tracks_under_raw_address() {
        let config = SessionConfig::builder()
            .resolve_keys(vec![make_key(1)])
            .verbose_unresolved(true)
            .build()
            .unwrap();
        let ledger = DeviceLedger::new(config);

        let stranger = make_rpa(&make_key(9), [0x42, 0x00, 0x07]);
        let rec = recorded(ledger.record(&make_det(&stranger, -60)).unwrap());
        assert!(rec.matched_irk.is_none());
        assert!(matches!(rec.key, DeviceKey::Address(_)));
        // Counted once as seen, not double-counted on aggregation.
        let tally = ledger.tally();
        assert_eq!(tally.detections, 1);
        assert_eq!(tally.unique_devices, 1);
        assert_eq!(tally.irk_matches, 0);
    }

    #[test]
    fn test_non_rpa_address_in_resolve_mode_is_unresolved() {
        let config = SessionConfig::builder()
            .resolve_keys(vec![make_key(1)])
            .build()
            .unwrap();
        let ledger = DeviceLedger::new(config);
        let outcome = ledger.record(&make_det("C0:11:22:33:44:55", -60)).unwrap();
        assert!(matches!(outcome, RecordOutcome::Unresolved));
    }

    #[test]
    fn test_rssi_floor_uses_smoothed_value() {
        let config = SessionConfig::builder()
            .min_rssi(-65)
            .window_capacity(3)
            .build()
            .unwrap();
        let ledger = DeviceLedger::new(config);
        let addr = "C0:11:22:33:44:55";

        ledger.record(&make_det(addr, -50)).unwrap();
        ledger.record(&make_det(addr, -50)).unwrap();

        // Raw -80 is far below the floor, but the smoothed value
        // round((-50 - 50 - 80) / 3) = -60 clears it.
        let rec = recorded(ledger.record(&make_det(addr, -80)).unwrap());
        assert_eq!(rec.avg_rssi, -60);
        assert_eq!(rec.detections, 3);
    }

    #[test]
    fn test_rssi_floor_rejection_leaves_window_untouched() {
        let config = SessionConfig::builder()
            .min_rssi(-65)
            .window_capacity(3)
            .build()
            .unwrap();
        let ledger = DeviceLedger::new(config);
        let addr = "C0:11:22:33:44:55";

        ledger.record(&make_det(addr, -60)).unwrap();
        ledger.record(&make_det(addr, -60)).unwrap();

        // round((-60 - 60 - 90) / 3) = -70 < -65: suppressed.
        let outcome = ledger.record(&make_det(addr, -90)).unwrap();
        assert!(matches!(
            outcome,
            RecordOutcome::Filtered(FilterReason::BelowMinRssi)
        ));
        let records = ledger.all_records();
        assert_eq!(records[0].window.contents(), vec![-60, -60]);
        assert_eq!(records[0].detections, 2);
        assert_eq!(ledger.tally().detections, 2);
    }

    #[test]
    fn test_first_detection_filtered_creates_no_record() {
        let config = SessionConfig::builder().min_rssi(-65).build().unwrap();
        let ledger = DeviceLedger::new(config);
        let outcome = ledger.record(&make_det("C0:11:22:33:44:55", -80)).unwrap();
        assert!(matches!(
            outcome,
            RecordOutcome::Filtered(FilterReason::BelowMinRssi)
        ));
        assert_eq!(ledger.device_count(), 0);
    }

    #[test]
    fn test_name_filter_is_case_insensitive_substring() {
        let config = SessionConfig::builder().name_filter("tile").build().unwrap();
        let ledger = DeviceLedger::new(config);

        let mut named = make_det("C0:11:22:33:44:55", -60);
        named.name = Some("My Tile Tracker".to_string());
        assert!(matches!(
            ledger.record(&named).unwrap(),
            RecordOutcome::Recorded(_)
        ));

        let anonymous = make_det("C0:11:22:33:44:66", -60);
        assert!(matches!(
            ledger.record(&anonymous).unwrap(),
            RecordOutcome::Filtered(FilterReason::NameMismatch)
        ));
        assert_eq!(ledger.device_count(), 1);
    }

    #[test]
    fn test_best_fix_keeps_strongest_position() {
        let config = SessionConfig::builder().build().unwrap();
        let ledger = DeviceLedger::new(config);
        let addr = "C0:11:22:33:44:55";

        for (rssi, lat) in [(-70, 1.0), (-50, 2.0), (-80, 3.0)] {
            let mut det = make_det(addr, rssi);
            det.fix = Some(GpsFix::new(lat, lat));
            ledger.record(&det).unwrap();
        }
        let records = ledger.all_records();
        let best = records[0].best_fix.unwrap();
        assert_eq!(best.fix.latitude, 2.0);
        assert_eq!(best.avg_rssi, -50);
    }

    #[test]
    fn test_proximity_alert_follows_latest_distance() {
        let config = SessionConfig::builder()
            .ref_rssi(-59)
            .environment(Environment::FreeSpace)
            .alert_within_m(1.5)
            .build()
            .unwrap();
        let ledger = DeviceLedger::new(config);
        let addr = "C0:11:22:33:44:55";

        let near = recorded(ledger.record(&make_det(addr, -40)).unwrap());
        assert!(near.proximity_alert);
        assert!(near.distance_m.unwrap() < 1.5);

        let far = recorded(ledger.record(&make_det(addr, -90)).unwrap());
        assert!(!far.proximity_alert);
    }

    #[test]
    fn test_snapshots_keep_first_seen_order() {
        let ledger = DeviceLedger::new(SessionConfig::default());
        let addrs = ["C0:00:00:00:00:03", "C0:00:00:00:00:01", "C0:00:00:00:00:02"];
        for addr in addrs {
            ledger.record(&make_det(addr, -60)).unwrap();
        }
        ledger.record(&make_det(addrs[0], -61)).unwrap();

        let order: Vec<String> = ledger
            .all_records()
            .iter()
            .map(|r| r.address.to_string())
            .collect();
        assert_eq!(order, addrs);
    }

    #[test]
    fn test_distance_tracks_smoothed_rssi_and_tx_power() {
        let config = SessionConfig::builder()
            .environment(Environment::FreeSpace)
            .build()
            .unwrap();
        let ledger = DeviceLedger::new(config);
        let addr = "C0:11:22:33:44:55";

        // No reference anywhere: no estimate.
        let rec = recorded(ledger.record(&make_det(addr, -59)).unwrap());
        assert!(rec.distance_m.is_none());

        // tx_power arrives: estimate appears, ~1 m at -59 with tx 0.
        let mut det = make_det(addr, -59);
        det.tx_power = Some(0);
        let rec = recorded(ledger.record(&det).unwrap());
        let d = rec.distance_m.unwrap();
        assert!((d - 1.0).abs() < 1e-9);
    }
}
