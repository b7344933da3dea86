//! Hashes used as identifiers of blocks, notes and nonces

use cryptoxide::{blake2b::Blake2b, digest::Digest};
use std::{fmt, str::FromStr};

pub const HASH_SIZE: usize = 32;

/// Domain separation tags, every hash of the protocol starts with one of
/// them. They are part of the wire contract and must never change.
pub mod tag {
    pub const BLOCK_ID: &[u8] = b"BLOCK_ID";
    pub const EPOCH_NONCE: &[u8] = b"EPOCH_NONCE";
    pub const NOTE_COMMITMENT: &[u8] = b"NOMOS_NOTE_CM";
    pub const NOTE_NULLIFIER: &[u8] = b"NOMOS_NOTE_NF";
    pub const NOTE_PUBLIC_KEY: &[u8] = b"NOMOS_NOTE_PK";
    pub const NOTE_EVOLVE: &[u8] = b"NOMOS_NOTE_EVOLVE";
    pub const LEAD: &[u8] = b"LEAD";
    pub const NONCE_CONTRIBUTION: &[u8] = b"NOMOS_NONCE_CONTRIB";
}

/// Blake2b-256 digest
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Hash([u8; HASH_SIZE]);

/// Identifier of a block, the hash of its header
pub type HeaderId = Hash;

impl Hash {
    pub const fn zero() -> Self {
        Hash([0; HASH_SIZE])
    }

    pub const fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// plain, untagged, digest of the given bytes
    pub fn hash_bytes(bytes: &[u8]) -> Self {
        DomainHasher::new(&[]).chain(bytes).finalize()
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_SIZE]> for Hash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(&self.0))
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; HASH_SIZE];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Hash(bytes))
    }
}

/// Incremental `H(tag || parts...)` computation
pub(crate) struct DomainHasher(Blake2b);

impl DomainHasher {
    pub(crate) fn new(tag: &[u8]) -> Self {
        let mut ctx = Blake2b::new(HASH_SIZE);
        ctx.input(tag);
        DomainHasher(ctx)
    }

    pub(crate) fn chain(mut self, data: &[u8]) -> Self {
        self.0.input(data);
        self
    }

    pub(crate) fn finalize(mut self) -> Hash {
        let mut out = [0; HASH_SIZE];
        self.0.result(&mut out);
        Hash(out)
    }
}

/// 32 bytes big endian encoding of an amount
pub(crate) fn value_to_be_bytes(value: u64) -> [u8; 32] {
    let mut out = [0; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}
