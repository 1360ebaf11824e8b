//! Log-distance path-loss estimation from RSSI.

use std::fmt;

use crate::error::ScanError;

/// Offset subtracted from advertised transmit power to derive the expected
/// RSSI at one meter when no explicit reference was configured.
pub const REF_RSSI_OFFSET_DB: i32 = 59;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Propagation environment presets mapping to path-loss exponents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    FreeSpace,
    Outdoor,
    Indoor,
}

impl Environment {
    #[must_use]
    pub fn path_loss_exponent(self) -> f64 {
        match self {
            Self::FreeSpace => 2.0,
            Self::Outdoor => 2.2,
            Self::Indoor => 3.0,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FreeSpace => "free_space",
            Self::Outdoor => "outdoor",
            Self::Indoor => "indoor",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// DistanceEstimator
// ---------------------------------------------------------------------------

/// Estimates distance as `10 ^ ((ref_rssi - rssi) / (10 * n))` meters.
///
/// The reference RSSI (expected signal at one meter) comes from an explicit
/// override when configured, otherwise from the advertisement's transmit
/// power minus [`REF_RSSI_OFFSET_DB`]. With neither available no estimate is
/// produced.
#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    exponent: f64,
    ref_rssi: Option<i32>,
}

impl DistanceEstimator {
    /// Builds an estimator from an environment preset.
    #[must_use]
    pub fn new(environment: Environment, ref_rssi: Option<i32>) -> Self {
        Self {
            exponent: environment.path_loss_exponent(),
            ref_rssi,
        }
    }

    /// Builds an estimator with a custom path-loss exponent.
    pub fn with_exponent(exponent: f64, ref_rssi: Option<i32>) -> Result<Self, ScanError> {
        if exponent <= 0.0 {
            return Err(ScanError::configuration(format!(
                "path-loss exponent must be positive, got {exponent}"
            )));
        }
        Ok(Self { exponent, ref_rssi })
    }

    #[must_use]
    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    /// Distance in meters for a smoothed RSSI, or `None` when no reference
    /// signal level is known.
    #[must_use]
    pub fn estimate(&self, rssi: i32, tx_power: Option<i32>) -> Option<f64> {
        let reference = match (self.ref_rssi, tx_power) {
            (Some(reference), _) => reference,
            (None, Some(tx)) => tx - REF_RSSI_OFFSET_DB,
            (None, None) => return None,
        };
        Some(10f64.powf(f64::from(reference - rssi) / (10.0 * self.exponent)))
    }
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self::new(Environment::FreeSpace, None)
    }
}
