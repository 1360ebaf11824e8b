//! Flat export rows and the session report.
//!
//! Field names and their order are a stable interface; downstream tooling
//! keys on them, so changes here are breaking.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::domain::DeviceRecord;
use crate::ledger::ScanTally;

// ---------------------------------------------------------------------------
// ExportRow
// ---------------------------------------------------------------------------

/// One tracked device, flattened for CSV/JSON export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub address: String,
    pub name: String,
    pub rssi: i32,
    pub avg_rssi: i32,
    pub tx_power: Option<i32>,
    pub distance_m: Option<f64>,
    pub manufacturer: String,
    pub service_uuids: String,
    pub detections: u64,
    pub first_seen: String,
    pub last_seen: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub gps_altitude: Option<f64>,
    pub matched_irk_index: Option<usize>,
}

impl From<&DeviceRecord> for ExportRow {
    fn from(record: &DeviceRecord) -> Self {
        Self {
            address: record.address.to_string(),
            name: record
                .name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            rssi: record.rssi,
            avg_rssi: record.avg_rssi,
            tx_power: record.tx_power,
            distance_m: record.distance_m.map(|d| (d * 100.0).round() / 100.0),
            manufacturer: format_manufacturer(&record.manufacturer_data),
            service_uuids: record
                .service_uuids
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
            detections: record.detections,
            first_seen: format_timestamp(record.first_seen),
            last_seen: format_timestamp(record.last_seen),
            latitude: record.best_fix.map(|best| best.fix.latitude),
            longitude: record.best_fix.map(|best| best.fix.longitude),
            gps_altitude: record.best_fix.and_then(|best| best.fix.altitude),
            matched_irk_index: record.matched_irk,
        }
    }
}

/// `0xXXXX:<hex payload>` per company identifier, `"; "`-joined.
#[must_use]
pub fn format_manufacturer(data: &BTreeMap<u16, Vec<u8>>) -> String {
    data.iter()
        .map(|(company, bytes)| format!("0x{company:04X}:{}", hex::encode(bytes)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// ISO 8601 in local time with a numeric UTC offset.
#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%dT%H:%M:%S%z")
        .to_string()
}

// ---------------------------------------------------------------------------
// ScanReport
// ---------------------------------------------------------------------------

/// Session counters plus every tracked device, ready for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub detections: u64,
    pub unique_devices: u64,
    pub irk_matches: u64,
    pub devices: Vec<ExportRow>,
}

impl ScanReport {
    #[must_use]
    pub fn new(tally: ScanTally, records: &[DeviceRecord]) -> Self {
        Self {
            generated_at: Utc::now(),
            detections: tally.detections,
            unique_devices: tally.unique_devices,
            irk_matches: tally.irk_matches,
            devices: records.iter().map(ExportRow::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, DeviceKey, GpsFix, RawDetection};
    use crate::ledger::{DeviceLedger, RecordOutcome, SessionConfig};

    fn make_record() -> DeviceRecord {
        let ledger = DeviceLedger::new(SessionConfig::default());
        let mut det = RawDetection::new("C0:11:22:33:44:55", -63, Utc::now());
        det.name = Some("beacon-7".to_string());
        det.tx_power = Some(0);
        det.manufacturer_data.insert(0x004C, vec![0x02, 0x15]);
        det.manufacturer_data.insert(0x0006, vec![0xAA]);
        det.service_uuids = vec!["feed".to_string(), "180f".to_string()];
        det.fix = Some(GpsFix::with_altitude(59.3293, 18.0686, 28.0));
        match ledger.record(&det).unwrap() {
            RecordOutcome::Recorded(record) => record,
            other => panic!("expected Recorded, got {other:?}"),
        }
    }

    #[test]
    fn test_row_renders_record_fields() {
        let row = ExportRow::from(&make_record());
        assert_eq!(row.address, "C0:11:22:33:44:55");
        assert_eq!(row.name, "beacon-7");
        assert_eq!(row.rssi, -63);
        assert_eq!(row.manufacturer, "0x0006:aa; 0x004C:0215");
        assert_eq!(row.service_uuids, "180f, feed");
        assert_eq!(row.detections, 1);
        assert_eq!(row.latitude, Some(59.3293));
        assert_eq!(row.gps_altitude, Some(28.0));
        assert_eq!(row.matched_irk_index, None);
    }

    #[test]
    fn test_unknown_name_placeholder() {
        let address = Address::parse("C0:11:22:33:44:55").unwrap();
        let record = DeviceRecord::new(DeviceKey::Address(address), address, None, 1, Utc::now());
        let row = ExportRow::from(&record);
        assert_eq!(row.name, "Unknown");
        assert_eq!(row.manufacturer, "");
        assert_eq!(row.latitude, None);
    }

    #[test]
    fn test_distance_rounded_to_centimeters() {
        let row = ExportRow::from(&make_record());
        // tx 0 at rssi -63 in free space: 10^(4/20) = 1.5848... -> 1.58
        assert_eq!(row.distance_m, Some(1.58));
    }

    #[test]
    fn test_timestamp_format_has_offset() {
        let row = ExportRow::from(&make_record());
        assert_eq!(row.first_seen.len(), "2026-08-25T10:00:00+0000".len());
        assert!(row.first_seen.contains('T'));
        let offset = &row.first_seen[19..];
        assert!(offset.starts_with('+') || offset.starts_with('-'));
    }

    #[test]
    fn test_json_uses_stable_field_names() {
        let row = ExportRow::from(&make_record());
        let value = serde_json::to_value(&row).unwrap();
        for field in [
            "address",
            "name",
            "rssi",
            "avg_rssi",
            "tx_power",
            "distance_m",
            "manufacturer",
            "service_uuids",
            "detections",
            "first_seen",
            "last_seen",
            "latitude",
            "longitude",
            "gps_altitude",
            "matched_irk_index",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
    }

    #[test]
    fn test_report_carries_tally_and_rows() {
        let ledger = DeviceLedger::new(SessionConfig::default());
        ledger
            .record(&RawDetection::new("C0:11:22:33:44:55", -60, Utc::now()))
            .unwrap();
        ledger
            .record(&RawDetection::new("C0:11:22:33:44:66", -70, Utc::now()))
            .unwrap();
        let report = ScanReport::new(ledger.tally(), &ledger.all_records());
        assert_eq!(report.detections, 2);
        assert_eq!(report.unique_devices, 2);
        assert_eq!(report.devices.len(), 2);
    }
}
