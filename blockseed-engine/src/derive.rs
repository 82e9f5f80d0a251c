//! Pure seed derivation and mapping helpers.
//!
//! Everything here is a function of its arguments only, so any observer who
//! trusts a reported block hash can recompute a round's seed and every value
//! drawn from it.

use blockseed_core::types::{BlockHash, ChainId, RoundId, Seed};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Basis-point denominator for probability checks.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Final seed for a round: Sha256 over the captured block hash, the round
/// id, and the engine/network identities. No other state feeds in.
pub fn derive_seed(
    block_hash: &BlockHash,
    round_id: RoundId,
    engine_id: &Uuid,
    chain_id: ChainId,
) -> Seed {
    let mut hasher = Sha256::new();
    hasher.update(block_hash.as_bytes());
    hasher.update(round_id.to_be_bytes());
    hasher.update(engine_id.as_bytes());
    hasher.update(chain_id.to_be_bytes());
    Seed::new(hasher.finalize().into())
}

/// Independent value per `(seed, index)` pair, so one revealed seed can
/// drive many uncorrelated outcomes in a round.
pub fn sub_seed(seed: &Seed, index: u64) -> Seed {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(index.to_be_bytes());
    Seed::new(hasher.finalize().into())
}

/// Map a seed into `[0, max)` by modulo. Bias is negligible while `max` is
/// far below the seed's 256-bit value space. Returns 0 when `max` is 0.
pub fn seed_to_range(seed: &Seed, max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    seed.mod_u64(max)
}

/// Map a seed into `[min, max]`. Returns `min` when `max < min`.
pub fn seed_to_range_inclusive(seed: &Seed, min: u64, max: u64) -> u64 {
    if max < min {
        return min;
    }
    min + seed.mod_u64(max - min + 1)
}

/// True with probability `probability_bps / 10000`.
pub fn seed_to_bool(seed: &Seed, probability_bps: u64) -> bool {
    seed.mod_u64(BPS_DENOMINATOR) < probability_bps
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_hash(byte: u8) -> BlockHash {
        BlockHash::new([byte; 32])
    }

    fn test_engine_id() -> Uuid {
        Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0)
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let hash = test_hash(0x42);
        let a = derive_seed(&hash, 7, &test_engine_id(), 1);
        let b = derive_seed(&hash, 7, &test_engine_id(), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_input_changes_the_seed() {
        let hash = test_hash(0x42);
        let base = derive_seed(&hash, 7, &test_engine_id(), 1);

        assert_ne!(base, derive_seed(&test_hash(0x43), 7, &test_engine_id(), 1));
        assert_ne!(base, derive_seed(&hash, 8, &test_engine_id(), 1));
        assert_ne!(base, derive_seed(&hash, 7, &Uuid::from_u128(99), 1));
        assert_ne!(base, derive_seed(&hash, 7, &test_engine_id(), 2));
    }

    #[test]
    fn test_round_isolation_on_shared_hash() {
        let hash = test_hash(0x42);
        let seeds: HashSet<Seed> = (1..=100)
            .map(|round_id| derive_seed(&hash, round_id, &test_engine_id(), 1))
            .collect();
        assert_eq!(seeds.len(), 100);
    }

    #[test]
    fn test_sub_seeds_are_independent() {
        let seed = derive_seed(&test_hash(0x42), 7, &test_engine_id(), 1);
        let other = derive_seed(&test_hash(0x43), 7, &test_engine_id(), 1);

        assert_ne!(sub_seed(&seed, 0), sub_seed(&seed, 1));
        assert_ne!(sub_seed(&seed, 0), seed);
        // same index, different parent seed
        assert_ne!(sub_seed(&seed, 0), sub_seed(&other, 0));
    }

    #[test]
    fn test_range_zero_max_is_safe() {
        let seed = derive_seed(&test_hash(0x42), 7, &test_engine_id(), 1);
        assert_eq!(seed_to_range(&seed, 0), 0);
    }

    #[test]
    fn test_range_inclusive_inverted_bounds_is_safe() {
        let seed = derive_seed(&test_hash(0x42), 7, &test_engine_id(), 1);
        assert_eq!(seed_to_range_inclusive(&seed, 5, 3), 5);
        let v = seed_to_range_inclusive(&seed, 3, 5);
        assert!((3..=5).contains(&v));
    }

    #[test]
    fn test_range_is_roughly_uniform() {
        let base = derive_seed(&test_hash(0x42), 7, &test_engine_id(), 1);
        let mut histogram = [0u32; 10];
        let samples = 2_000;

        for index in 0..samples {
            let value = seed_to_range(&sub_seed(&base, index), 10);
            histogram[value as usize] += 1;
        }

        // expected 200 per bucket; a heavily skewed mixer would blow past this
        for (bucket, count) in histogram.iter().enumerate() {
            assert!(
                (120..=280).contains(count),
                "bucket {} has {} of {} samples",
                bucket,
                count,
                samples
            );
        }
    }

    #[test]
    fn test_bool_probability_edges() {
        let seed = derive_seed(&test_hash(0x42), 7, &test_engine_id(), 1);
        assert!(!seed_to_bool(&seed, 0));
        assert!(seed_to_bool(&seed, BPS_DENOMINATOR));
    }

    #[test]
    fn test_bool_rate_tracks_bps() {
        let base = derive_seed(&test_hash(0x42), 7, &test_engine_id(), 1);
        let hits = (0..2_000)
            .filter(|&i| seed_to_bool(&sub_seed(&base, i), 2_500))
            .count();
        // 25% of 2000 = 500 expected
        assert!((350..=650).contains(&hits), "got {} hits", hits);
    }
}
