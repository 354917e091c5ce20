//! Tuning parameters for `FibSet` and its overflow tables.

use crate::error::ConfigError;
use crate::fib_set::FibSet;
use crate::hashing;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Default bits of hash consumed per trie level (16-wide nodes).
pub const DEFAULT_SEGMENT_BITS: u32 = 4;

/// Default initial capacity of an overflow table.
pub const DEFAULT_TABLE_CAPACITY: usize = 16;

/// How a full overflow table computes its next capacity.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TableGrowth {
    /// Add a fixed number of slots.
    Chunk(usize),
    /// Multiply the capacity.
    Factor(usize),
}

impl TableGrowth {
    pub fn next_capacity(self, capacity: usize) -> usize {
        match self {
            TableGrowth::Chunk(n) => capacity + n,
            TableGrowth::Factor(f) => capacity * f,
        }
    }

    fn validate(self) -> Result<(), ConfigError> {
        match self {
            TableGrowth::Chunk(0) => Err(ConfigError::TableGrowth("chunk must be at least 1")),
            TableGrowth::Factor(f) if f < 2 => {
                Err(ConfigError::TableGrowth("factor must be at least 2"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for TableGrowth {
    fn default() -> Self {
        TableGrowth::Chunk(DEFAULT_TABLE_CAPACITY)
    }
}

/// Validated configuration. Obtain one through `FibSetBuilder` or `Default`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FibSetConfig {
    segment_bits: u32,
    max_depth: u32,
    table_capacity: usize,
    table_growth: TableGrowth,
}

impl FibSetConfig {
    pub fn new(
        segment_bits: u32,
        max_depth: Option<u32>,
        table_capacity: usize,
        table_growth: TableGrowth,
    ) -> Result<Self, ConfigError> {
        if !(1..=8).contains(&segment_bits) {
            return Err(ConfigError::SegmentBits(segment_bits));
        }
        let limit = hashing::max_depth_for(segment_bits);
        let max_depth = max_depth.unwrap_or(limit);
        if max_depth == 0 || max_depth > limit {
            return Err(ConfigError::MaxDepth {
                depth: max_depth,
                limit,
            });
        }
        if table_capacity == 0 {
            return Err(ConfigError::TableCapacity);
        }
        table_growth.validate()?;
        Ok(Self {
            segment_bits,
            max_depth,
            table_capacity,
            table_growth,
        })
    }

    /// Hash bits consumed per trie level.
    pub fn segment_bits(&self) -> u32 {
        self.segment_bits
    }

    /// Slots per trie node.
    pub fn node_width(&self) -> usize {
        1 << self.segment_bits
    }

    /// Deepest trie level; a collision here flattens into an overflow table.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn table_capacity(&self) -> usize {
        self.table_capacity
    }

    pub fn table_growth(&self) -> TableGrowth {
        self.table_growth
    }
}

impl Default for FibSetConfig {
    fn default() -> Self {
        Self {
            segment_bits: DEFAULT_SEGMENT_BITS,
            max_depth: hashing::max_depth_for(DEFAULT_SEGMENT_BITS),
            table_capacity: DEFAULT_TABLE_CAPACITY,
            table_growth: TableGrowth::default(),
        }
    }
}

/// Builder for a `FibSet` with non-default tuning or hasher.
///
/// ```
/// use fibset::{FibSetBuilder, TableGrowth};
///
/// let set = FibSetBuilder::new()
///     .segment_bits(5)
///     .table_growth(TableGrowth::Factor(2))
///     .try_build(|k: &u64| k.to_string())
///     .unwrap();
/// assert_eq!(set.config().node_width(), 32);
/// assert_eq!(*set.put(&7u64).read(), "7");
/// ```
#[derive(Clone, Debug)]
pub struct FibSetBuilder<S = DefaultHashBuilder> {
    segment_bits: u32,
    max_depth: Option<u32>,
    table_capacity: usize,
    table_growth: TableGrowth,
    hasher: S,
}

impl FibSetBuilder {
    pub fn new() -> Self {
        Self {
            segment_bits: DEFAULT_SEGMENT_BITS,
            max_depth: None,
            table_capacity: DEFAULT_TABLE_CAPACITY,
            table_growth: TableGrowth::default(),
            hasher: DefaultHashBuilder::default(),
        }
    }
}

impl Default for FibSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> FibSetBuilder<S> {
    pub fn segment_bits(mut self, bits: u32) -> Self {
        self.segment_bits = bits;
        self
    }

    /// Deepest trie level before colliding keys flatten into an overflow
    /// table. Defaults to the level at which the hash is exhausted.
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn table_capacity(mut self, capacity: usize) -> Self {
        self.table_capacity = capacity;
        self
    }

    pub fn table_growth(mut self, growth: TableGrowth) -> Self {
        self.table_growth = growth;
        self
    }

    pub fn hasher<S2>(self, hasher: S2) -> FibSetBuilder<S2> {
        FibSetBuilder {
            segment_bits: self.segment_bits,
            max_depth: self.max_depth,
            table_capacity: self.table_capacity,
            table_growth: self.table_growth,
            hasher,
        }
    }

    pub fn try_build<K, V, F>(self, factory: F) -> Result<FibSet<K, V, S>, ConfigError>
    where
        K: Eq + Hash,
        S: BuildHasher,
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        let config = FibSetConfig::new(
            self.segment_bits,
            self.max_depth,
            self.table_capacity,
            self.table_growth,
        )?;
        Ok(FibSet::with_config(config, self.hasher, factory))
    }

    /// Like [`try_build`](Self::try_build), panicking on invalid settings.
    pub fn build<K, V, F>(self, factory: F) -> FibSet<K, V, S>
    where
        K: Eq + Hash,
        S: BuildHasher,
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        match self.try_build(factory) {
            Ok(set) => set,
            Err(e) => panic!("invalid FibSet configuration: {e}"),
        }
    }
}
