//! Stake bearing notes
//!
//! A note is identified on the ledger by its commitment, and consumed by
//! revealing its nullifier. Both are one way hashes, neither reveals the
//! value nor the owner of the note.

use crate::key::{tag, value_to_be_bytes, DomainHasher, Hash};
use std::fmt;

/// Secret key of the owner of a note
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        SecretKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// big endian, right aligned in the 32 bytes of the key
impl From<u64> for SecretKey {
    fn from(sk: u64) -> Self {
        let mut bytes = [0; 32];
        bytes[24..].copy_from_slice(&sk.to_be_bytes());
        SecretKey(bytes)
    }
}

// never leak the key material in the logs
impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Public commitment to a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Commitment(Hash);

/// Proof that a note was consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Nullifier(Hash);

impl Commitment {
    pub fn as_hash(&self) -> &Hash {
        &self.0
    }
}

impl Nullifier {
    pub fn as_hash(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub value: u64,
    pub secret_key: SecretKey,
    pub nonce: Hash,
    pub unit: Hash,
    pub state: Hash,
    pub zone_id: Hash,
}

impl Note {
    pub fn new(value: u64, secret_key: SecretKey) -> Self {
        Note {
            value,
            secret_key,
            nonce: Hash::zero(),
            unit: Hash::zero(),
            state: Hash::zero(),
            zone_id: Hash::zero(),
        }
    }

    pub fn public_key(&self) -> Hash {
        DomainHasher::new(tag::NOTE_PUBLIC_KEY)
            .chain(self.secret_key.as_bytes())
            .finalize()
    }

    pub fn commitment(&self) -> Commitment {
        let hash = DomainHasher::new(tag::NOTE_COMMITMENT)
            .chain(self.unit.as_ref())
            .chain(&value_to_be_bytes(self.value))
            .chain(self.nonce.as_ref())
            .chain(self.public_key().as_ref())
            .chain(self.state.as_ref())
            .chain(self.zone_id.as_ref())
            .finalize();
        Commitment(hash)
    }

    pub fn nullifier(&self) -> Nullifier {
        let hash = DomainHasher::new(tag::NOTE_NULLIFIER)
            .chain(self.commitment().as_hash().as_ref())
            .chain(self.secret_key.as_bytes())
            .finalize();
        Nullifier(hash)
    }

    /// The note replacing this one once it has been used to lead a slot.
    ///
    /// Only the nonce changes, so the value and the owner are preserved
    /// while commitment and nullifier are fresh.
    pub fn evolve(&self) -> Note {
        let nonce = DomainHasher::new(tag::NOTE_EVOLVE)
            .chain(self.nonce.as_ref())
            .chain(self.secret_key.as_bytes())
            .finalize();
        Note {
            nonce,
            ..self.clone()
        }
    }
}
