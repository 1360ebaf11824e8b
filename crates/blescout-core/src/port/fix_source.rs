//! Position source abstraction for capture feeds.

use crate::domain::GpsFix;

/// Supplies the position to stamp onto detections at capture time.
///
/// Implementations must be cheap to query per event; feeds call this once
/// for every detection that arrives without its own fix.
pub trait FixSource: Send + Sync {
    fn current_fix(&self) -> Option<GpsFix>;
}

/// A fixed operator-supplied position (stationary scanner).
#[derive(Debug, Clone, Copy)]
pub struct StaticFixSource {
    fix: GpsFix,
}

impl StaticFixSource {
    #[must_use]
    pub fn new(fix: GpsFix) -> Self {
        Self { fix }
    }
}

impl FixSource for StaticFixSource {
    fn current_fix(&self) -> Option<GpsFix> {
        Some(self.fix)
    }
}

/// No position available; detections stay unstamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFixSource;

impl FixSource for NoFixSource {
    fn current_fix(&self) -> Option<GpsFix> {
        None
    }
}
