//! # blescout-core
//!
//! Correlation engine for BLE advertisement scanning: resolves rotating
//! private addresses against identity resolving keys, smooths RSSI, estimates
//! distance and tracks per-device state that any number of capture feeds can
//! update concurrently.
//!
//! ## Data flow
//!
//! ```text
//!   capture feeds (replay, synthetic, radio adapters)
//!        |  RawDetection
//!        v
//!   DeviceLedger::record()
//!        |-- address parse + canonicalize           (domain)
//!        |-- RPA resolution against key sequence    (resolve)
//!        |-- admission filters (RSSI floor, name)
//!        |-- window smoothing + distance estimate   (signal)
//!        `-- merge into DeviceRecord + counters     (ledger)
//!        v
//!   all_records() snapshots --> ExportRow / ScanReport (export)
//! ```
//!
//! ## Example
//!
//! ```
//! use blescout_core::prelude::*;
//! use chrono::Utc;
//!
//! # fn main() -> Result<(), ScanError> {
//! let config = SessionConfig::builder()
//!     .window_capacity(5)
//!     .environment(Environment::Indoor)
//!     .build()?;
//! let ledger = DeviceLedger::new(config);
//!
//! let detection = RawDetection::new("54:2B:9A:10:22:31", -64, Utc::now());
//! if let RecordOutcome::Recorded(record) = ledger.record(&detection)? {
//!     assert_eq!(record.detections, 1);
//! }
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod error;
pub mod export;
pub mod ledger;
pub mod port;
pub mod resolve;
pub mod signal;

pub use domain::{Address, BestFix, DeviceKey, DeviceRecord, GpsFix, RawDetection};
pub use error::{ScanError, ScanResult};
pub use export::{ExportRow, ScanReport};
pub use ledger::{
    DeviceLedger, FilterReason, RecordOutcome, ScanMode, ScanTally, SessionConfig,
    SessionConfigBuilder,
};
pub use port::{FixSource, NoFixSource, StaticFixSource};
pub use resolve::{ah, parse_irk_lines, IdentityResolvingKey, RpaResolver};
pub use signal::{DistanceEstimator, Environment, RssiWindow, REF_RSSI_OFFSET_DB};

/// Crate version, for banners and reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience imports for typical sessions.
pub mod prelude {
    pub use crate::domain::{Address, DeviceKey, DeviceRecord, GpsFix, RawDetection};
    pub use crate::error::{ScanError, ScanResult};
    pub use crate::export::{ExportRow, ScanReport};
    pub use crate::ledger::{
        DeviceLedger, FilterReason, RecordOutcome, ScanMode, ScanTally, SessionConfig,
    };
    pub use crate::port::{FixSource, NoFixSource, StaticFixSource};
    pub use crate::resolve::{IdentityResolvingKey, RpaResolver};
    pub use crate::signal::Environment;
}
