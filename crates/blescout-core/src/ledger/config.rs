//! Scan session configuration.

use crate::error::ScanError;
use crate::resolve::IdentityResolvingKey;
use crate::signal::Environment;

// ---------------------------------------------------------------------------
// ScanMode
// ---------------------------------------------------------------------------

/// What the session is looking for.
#[derive(Debug, Clone, Default)]
pub enum ScanMode {
    /// Track every device seen.
    #[default]
    Discovery,
    /// Track only devices whose canonical address contains the needle
    /// (case-insensitive substring).
    Targeted { needle: String },
    /// Resolve rotating private addresses against an ordered key sequence
    /// and aggregate by matched identity.
    Resolve { keys: Vec<IdentityResolvingKey> },
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Validated configuration for one scan session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mode: ScanMode,
    /// Detections whose smoothed RSSI would fall below this are not admitted.
    pub min_rssi: Option<i32>,
    /// Case-insensitive substring required in the advertised name.
    pub name_filter: Option<String>,
    /// Smoothing window capacity; 1 disables smoothing.
    pub window_capacity: usize,
    pub environment: Environment,
    /// Explicit expected RSSI at one meter, overriding tx-power derivation.
    pub ref_rssi: Option<i32>,
    /// In resolve mode, also track unmatched devices under their raw address.
    pub verbose_unresolved: bool,
    /// Distance below which records are flagged with a proximity alert.
    pub alert_within_m: Option<f64>,
}

impl SessionConfig {
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Discovery,
            min_rssi: None,
            name_filter: None,
            window_capacity: 1,
            environment: Environment::FreeSpace,
            ref_rssi: None,
            verbose_unresolved: false,
            alert_within_m: None,
        }
    }
}

/// Builder for [`SessionConfig`]; `build` validates the combination.
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    mode: ScanMode,
    min_rssi: Option<i32>,
    name_filter: Option<String>,
    window_capacity: Option<usize>,
    environment: Environment,
    ref_rssi: Option<i32>,
    verbose_unresolved: bool,
    alert_within_m: Option<f64>,
}

impl SessionConfigBuilder {
    #[must_use]
    pub fn mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn targeted(mut self, needle: impl Into<String>) -> Self {
        self.mode = ScanMode::Targeted {
            needle: needle.into(),
        };
        self
    }

    #[must_use]
    pub fn resolve_keys(mut self, keys: Vec<IdentityResolvingKey>) -> Self {
        self.mode = ScanMode::Resolve { keys };
        self
    }

    #[must_use]
    pub fn min_rssi(mut self, dbm: i32) -> Self {
        self.min_rssi = Some(dbm);
        self
    }

    #[must_use]
    pub fn name_filter(mut self, pattern: impl Into<String>) -> Self {
        self.name_filter = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn ref_rssi(mut self, dbm: i32) -> Self {
        self.ref_rssi = Some(dbm);
        self
    }

    #[must_use]
    pub fn verbose_unresolved(mut self, enabled: bool) -> Self {
        self.verbose_unresolved = enabled;
        self
    }

    #[must_use]
    pub fn alert_within_m(mut self, meters: f64) -> Self {
        self.alert_within_m = Some(meters);
        self
    }

    pub fn build(self) -> Result<SessionConfig, ScanError> {
        let window_capacity = self.window_capacity.unwrap_or(1);
        if window_capacity == 0 {
            return Err(ScanError::configuration(
                "window capacity must be at least 1",
            ));
        }
        if let Some(meters) = self.alert_within_m {
            if meters <= 0.0 {
                return Err(ScanError::configuration(format!(
                    "alert radius must be positive, got {meters}"
                )));
            }
        }
        match &self.mode {
            ScanMode::Targeted { needle } if needle.trim().is_empty() => {
                return Err(ScanError::configuration("target needle must not be empty"));
            }
            ScanMode::Resolve { keys } if keys.is_empty() => {
                return Err(ScanError::configuration(
                    "resolve mode requires at least one IRK",
                ));
            }
            _ => {}
        }
        Ok(SessionConfig {
            mode: self.mode,
            min_rssi: self.min_rssi,
            name_filter: self.name_filter,
            window_capacity,
            environment: self.environment,
            ref_rssi: self.ref_rssi,
            verbose_unresolved: self.verbose_unresolved,
            alert_within_m: self.alert_within_m,
        })
    }
}
