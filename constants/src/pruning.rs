//! Pruning.
//!
//! The blockchain is split into stripes of [`PRUNING_STRIPE_SIZE`] blocks,
//! a pruned node keeps the full data of one stripe out of every
//! `2^PRUNING_LOG_STRIPES`.

/// The default log2 of the number of stripes.
///
/// The higher this is, the more space a pruned node saves.
pub const PRUNING_LOG_STRIPES: u32 = 3;

/// The amount of consecutive blocks a stripe keeps before the next stripe starts.
pub const PRUNING_STRIPE_SIZE: u64 = 4096;

/// The amount of blocks from the top of the chain that are never pruned.
pub const PRUNING_TIP_BLOCKS: u64 = 5500;

/// Bit offset of the `log_stripes` field in a packed pruning seed.
pub const PRUNING_SEED_LOG_STRIPES_SHIFT: u32 = 7;

/// Mask of the `log_stripes` field once shifted down.
pub const PRUNING_SEED_LOG_STRIPES_MASK: u32 = 0x7;

/// Bit offset of the `stripe - 1` field in a packed pruning seed.
pub const PRUNING_SEED_STRIPE_SHIFT: u32 = 0;

/// Mask of the `stripe - 1` field once shifted down.
pub const PRUNING_SEED_STRIPE_MASK: u32 = 0x7f;
