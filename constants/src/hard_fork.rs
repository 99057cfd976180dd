//! Hard-fork voting and timing defaults.

/// The version every block has before the first scheduled fork.
pub const DEFAULT_ORIGINAL_VERSION: u8 = 1;

/// The last height at which [`DEFAULT_ORIGINAL_VERSION`] is assumed without reading the block.
pub const DEFAULT_ORIGINAL_VERSION_TILL_HEIGHT: u64 = 0;

/// Seconds after the last scheduled fork after which a node that has not
/// upgraded is most likely on a dead fork (one year).
pub const DEFAULT_FORKED_TIME: u64 = 31_557_600;

/// Seconds after the last scheduled fork after which a node should
/// look for an update (half a year).
pub const DEFAULT_UPDATE_TIME: u64 = 31_557_600 / 2;

/// The amount of recent blocks whose votes are counted, about a week of blocks.
pub const DEFAULT_WINDOW_SIZE: u64 = 10080;

/// The default percentage of the window that has to vote for a fork.
pub const DEFAULT_THRESHOLD_PERCENT: u8 = 80;

/// The highest possible threshold percentage.
pub const MAX_THRESHOLD_PERCENT: u8 = 100;
