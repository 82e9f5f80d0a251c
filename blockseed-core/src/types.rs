use crate::error::{BlockseedError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Block height on the host chain.
pub type Height = u64;

/// Caller-chosen round identifier. Zero is reserved as "no round".
pub type RoundId = u64;

/// Network identity, bound into every derived seed.
pub type ChainId = u64;

/// A 256-bit block hash. The all-zero value is the "unset" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash([u8; 32]);

impl BlockHash {
    pub const ZERO: BlockHash = BlockHash([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| BlockseedError::invalid_hash(format!("{}: {}", s, e)))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| BlockseedError::invalid_hash(format!("expected 32 bytes: {}", s)))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        BlockHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 256-bit derived random value. Zero until a round is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed([u8; 32]);

impl Seed {
    pub const ZERO: Seed = Seed([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let hash = BlockHash::from_hex(s)?;
        Ok(Self(*hash.as_bytes()))
    }

    /// Remainder of the full 256-bit value modulo `m`.
    ///
    /// Byte-folds big-endian through u128 so the result covers the whole
    /// word, not just the low bits. `m` must be nonzero.
    pub fn mod_u64(&self, m: u64) -> u64 {
        debug_assert!(m != 0);
        let m = m as u128;
        let mut rem: u128 = 0;
        for byte in self.0 {
            rem = ((rem << 8) | byte as u128) % m;
        }
        rem as u64
    }
}

impl From<[u8; 32]> for Seed {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Seed::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Per-round commit-reveal state. Created on commit, never deleted,
/// immutable once revealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_id: RoundId,
    pub seed_block: Height,
    pub commit_block: Height,
    pub committed: bool,
    pub revealed: bool,
    pub used_extended_history: bool,
    pub block_hash: BlockHash,
    pub seed: Seed,
}

impl RoundRecord {
    /// Fresh committed record. Hash and seed stay zero until reveal.
    pub fn committed(round_id: RoundId, commit_block: Height, seed_block: Height) -> Self {
        Self {
            round_id,
            seed_block,
            commit_block,
            committed: true,
            revealed: false,
            used_extended_history: false,
            block_hash: BlockHash::ZERO,
            seed: Seed::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex_round_trip() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xde;
        bytes[31] = 0x01;
        let hash = BlockHash::new(bytes);
        assert_eq!(BlockHash::from_hex(&hash.to_hex()).unwrap(), hash);
        assert!(BlockHash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_mod_covers_full_word() {
        // 2^248 mod 10 == 6; truncating to the low 64 bits would give 0
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        let seed = Seed::new(bytes);
        assert_eq!(seed.mod_u64(10), 6);
        assert_eq!(seed.mod_u64(1), 0);

        let max = Seed::new([0xff; 32]);
        // 2^256 - 1 == 5 (mod 10)
        assert_eq!(max.mod_u64(10), 5);
    }

    #[test]
    fn test_zero_sentinels() {
        assert!(BlockHash::ZERO.is_zero());
        assert!(Seed::ZERO.is_zero());
        let record = RoundRecord::committed(7, 100, 102);
        assert!(record.committed && !record.revealed);
        assert!(record.block_hash.is_zero());
        assert!(record.seed.is_zero());
    }
}
