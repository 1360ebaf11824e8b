//! Resolvable private address resolution.
//!
//! An RPA proves ownership of an identity resolving key: the advertiser
//! picks a 24-bit random value (`prand`), computes `ah(irk, prand)` and
//! broadcasts `prand || hash` as its address. Anyone holding the key can
//! recompute the hash and match the device across address rotations.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Block};

use crate::domain::Address;
use crate::resolve::irk::IdentityResolvingKey;

/// The `ah` random address hash: AES-128-encrypt a block of 13 zero bytes
/// followed by the 3-byte `prand`, and keep the last 3 ciphertext bytes.
#[must_use]
pub fn ah(irk: &IdentityResolvingKey, prand: [u8; 3]) -> [u8; 3] {
    let mut block = Block::default();
    block[13..].copy_from_slice(&prand);
    let cipher = Aes128::new(GenericArray::from_slice(irk.as_bytes()));
    cipher.encrypt_block(&mut block);
    [block[13], block[14], block[15]]
}

// ---------------------------------------------------------------------------
// RpaResolver
// ---------------------------------------------------------------------------

/// Matches resolvable private addresses against an ordered key sequence.
#[derive(Debug, Clone, Default)]
pub struct RpaResolver {
    keys: Vec<IdentityResolvingKey>,
}

impl RpaResolver {
    #[must_use]
    pub fn new(keys: Vec<IdentityResolvingKey>) -> Self {
        Self { keys }
    }

    #[must_use]
    pub fn keys(&self) -> &[IdentityResolvingKey] {
        &self.keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns the index of the first key whose recomputed hash matches the
    /// address, or `None` for a non-match. Addresses that are not resolvable
    /// private addresses never match.
    #[must_use]
    pub fn resolve(&self, address: &Address) -> Option<usize> {
        if !address.is_resolvable_private() {
            return None;
        }
        let prand = address.prand();
        let hash = address.hash();
        self.keys.iter().position(|key| ah(key, prand) == hash)
    }
}
