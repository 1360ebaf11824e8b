//! Bluetooth device address value object.

use std::fmt;

use crate::error::ScanError;

// ---------------------------------------------------------------------------
// Address -- Value Object
// ---------------------------------------------------------------------------

/// A 48-bit Bluetooth device address, stored in display order (the byte that
/// prints first is `0[0]`).
///
/// Resolvable private addresses (RPAs) carry `0b01` in the two most
/// significant bits of the first displayed octet. For an RPA the first three
/// displayed octets are the random part (`prand`) and the last three are the
/// hash computed from an identity resolving key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// Builds an address from a raw byte slice in display order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScanError> {
        if bytes.len() != 6 {
            return Err(ScanError::invalid_detection(format!(
                "address must be 6 bytes, got {}",
                bytes.len()
            )));
        }
        let mut addr = [0u8; 6];
        addr.copy_from_slice(bytes);
        Ok(Self(addr))
    }

    /// Parses the textual form `AA:BB:CC:DD:EE:FF` (dashes also accepted).
    pub fn parse(s: &str) -> Result<Self, ScanError> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ScanError::invalid_detection("empty address"));
        }
        let mut addr = [0u8; 6];
        let mut count = 0;
        for part in text.split(|c| c == ':' || c == '-') {
            if count == 6 {
                return Err(ScanError::invalid_detection(format!(
                    "address has too many octets: {text}"
                )));
            }
            addr[count] = u8::from_str_radix(part, 16).map_err(|_| {
                ScanError::invalid_detection(format!("invalid address octet {part:?} in {text}"))
            })?;
            count += 1;
        }
        if count != 6 {
            return Err(ScanError::invalid_detection(format!(
                "address must have 6 octets, got {count}: {text}"
            )));
        }
        Ok(Self(addr))
    }

    /// Returns the raw bytes in display order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// True when the top two bits of the most significant octet are `0b01`,
    /// marking a resolvable private address.
    #[must_use]
    pub fn is_resolvable_private(&self) -> bool {
        self.0[0] >> 6 == 0b01
    }

    /// The random part of an RPA: the three most significant octets.
    #[must_use]
    pub fn prand(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// The hash part of an RPA: the three least significant octets.
    #[must_use]
    pub fn hash(&self) -> [u8; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_roundtrip() {
        let addr = Address::parse("54:2b:9a:10:22:31").unwrap();
        assert_eq!(addr.as_bytes(), &[0x54, 0x2b, 0x9a, 0x10, 0x22, 0x31]);
        assert_eq!(addr.to_string(), "54:2B:9A:10:22:31");
    }

    #[test]
    fn test_parse_accepts_dashes() {
        let colon = Address::parse("40-11-22-33-44-55").unwrap();
        assert_eq!(colon, Address([0x40, 0x11, 0x22, 0x33, 0x44, 0x55]));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse("   ").is_err());
        assert!(Address::parse("54:2b:9a:10:22").is_err());
        assert!(Address::parse("54:2b:9a:10:22:31:99").is_err());
        assert!(Address::parse("zz:2b:9a:10:22:31").is_err());
        assert!(Address::parse("not an address").is_err());
    }

    #[test]
    fn test_from_bytes_length_check() {
        assert!(Address::from_bytes(&[1, 2, 3]).is_err());
        let addr = Address::from_bytes(&[0x40, 0, 0, 0, 0, 1]).unwrap();
        assert_eq!(addr.to_string(), "40:00:00:00:00:01");
    }

    #[test]
    fn test_rpa_flag_covers_all_top_bit_patterns() {
        // Only the 0b01 pattern marks a resolvable private address.
        let rpa = |msb: u8| Address([msb, 0, 0, 0, 0, 0]).is_resolvable_private();
        assert!(rpa(0x40));
        assert!(rpa(0x7F));
        assert!(!rpa(0x00)); // 0b00: non-resolvable private
        assert!(!rpa(0x80)); // 0b10: reserved
        assert!(!rpa(0xC0)); // 0b11: static random
    }

    #[test]
    fn test_prand_and_hash_split() {
        let addr = Address([0x52, 0x33, 0x8E, 0xAB, 0xCD, 0xEF]);
        assert_eq!(addr.prand(), [0x52, 0x33, 0x8E]);
        assert_eq!(addr.hash(), [0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn test_debug_includes_display_form() {
        let addr = Address::parse("40:11:22:33:44:55").unwrap();
        assert_eq!(format!("{addr:?}"), "Address(40:11:22:33:44:55)");
    }
}
