//! Configuration errors.

/// Returned by [`FibSetBuilder::try_build`](crate::FibSetBuilder::try_build)
/// when a tuning parameter is out of range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("segment_bits must be in 1..=8, got {0}")]
    SegmentBits(u32),

    #[error("max_depth must be in 1..={limit} for the configured segment width, got {depth}")]
    MaxDepth { depth: u32, limit: u32 },

    #[error("table_capacity must be at least 1")]
    TableCapacity,

    #[error("invalid table growth: {0}")]
    TableGrowth(&'static str),
}
