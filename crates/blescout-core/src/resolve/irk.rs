//! Identity resolving key parsing and masked display.

use std::fmt;

use crate::error::ScanError;

// ---------------------------------------------------------------------------
// IdentityResolvingKey -- Value Object
// ---------------------------------------------------------------------------

/// A 128-bit identity resolving key (IRK).
///
/// Both `Debug` and `Display` render the masked form so full key material
/// never lands in logs; use [`as_bytes`](Self::as_bytes) for the raw key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdentityResolvingKey([u8; 16]);

impl IdentityResolvingKey {
    /// Parses a key from its textual form.
    ///
    /// Accepted: plain 32-digit hex, colon- or dash-separated hex, and a
    /// leading `0x` prefix. Case-insensitive.
    pub fn parse(text: &str) -> Result<Self, ScanError> {
        let cleaned = text.trim().to_ascii_lowercase();
        let cleaned = cleaned.strip_prefix("0x").unwrap_or(&cleaned);
        let cleaned: String = cleaned.chars().filter(|c| *c != ':' && *c != '-').collect();
        if cleaned.len() != 32 {
            return Err(ScanError::invalid_key(format!(
                "must be exactly 16 bytes (32 hex chars), got {} hex chars",
                cleaned.len()
            )));
        }
        let bytes = hex::decode(&cleaned).map_err(|_| {
            ScanError::invalid_key(format!("contains invalid hex characters: {}", text.trim()))
        })?;
        let mut key = [0u8; 16];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Masked hex form safe for display: first and last four digits only.
    #[must_use]
    pub fn masked(&self) -> String {
        let full = hex::encode(self.0);
        format!("{}...{}", &full[..4], &full[28..])
    }
}

impl fmt::Display for IdentityResolvingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl fmt::Debug for IdentityResolvingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityResolvingKey({self})")
    }
}

// ---------------------------------------------------------------------------
// Key files
// ---------------------------------------------------------------------------

/// Parses one key per line. Blank lines and `#` comments are skipped; a bad
/// line fails the whole input with its line number.
pub fn parse_irk_lines(text: &str) -> Result<Vec<IdentityResolvingKey>, ScanError> {
    let mut keys = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let key = IdentityResolvingKey::parse(line).map_err(|err| match err {
            ScanError::InvalidKeyFormat { reason } => {
                ScanError::invalid_key(format!("line {}: {reason}", index + 1))
            }
            other => other,
        })?;
        keys.push(key);
    }
    if keys.is_empty() {
        return Err(ScanError::invalid_key("input contains no keys"));
    }
    Ok(keys)
}
