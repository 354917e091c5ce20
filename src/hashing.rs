//! Fibonacci distribution of a 64-bit hash into per-level trie indices.
//!
//! The hash is mixed once with `h ^ (h >> W)` followed by a multiplication
//! with the 64-bit golden-ratio constant. Both steps are bijections on `u64`,
//! so two keys land in the same slot at every level iff their hashes are
//! equal. Level `d` consumes bits `[d*W, d*W + W)` from the most significant
//! end; the last level is narrower when `W` does not divide 64.

/// `2^64 / φ`, rounded to odd.
pub const MUL64: u64 = 11_400_714_819_323_198_485;

pub const HASH_BITS: u32 = u64::BITS;

/// Number of levels needed to consume every hash bit at `bits` per level.
#[inline]
pub const fn max_depth_for(bits: u32) -> u32 {
    HASH_BITS.div_ceil(bits)
}

#[inline]
pub fn mix(hash: u64, bits: u32) -> u64 {
    (hash ^ (hash >> bits)).wrapping_mul(MUL64)
}

/// Index into a `2^bits` wide node at `depth`.
#[inline]
pub fn index_of(hash: u64, bits: u32, depth: u32) -> usize {
    let consumed = depth * bits;
    debug_assert!(consumed < HASH_BITS, "hash exhausted at depth {depth}");
    let take = bits.min(HASH_BITS - consumed);
    ((mix(hash, bits) << consumed) >> (HASH_BITS - take)) as usize
}
