//! Hard-fork tracker error types.

//---------------------------------------------------------------------------------------------------- Types
/// Alias for a thread-safe boxed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

//---------------------------------------------------------------------------------------------------- ConfigError
/// Errors constructing a [`HardForkTracker`](crate::HardForkTracker).
///
/// These are caused by a misconfigured caller, not by the chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The vote window can not be empty.
    #[error("the vote window size must be strictly positive")]
    ZeroWindowSize,

    /// The default threshold is over 100%.
    #[error("the default threshold must be between 0 and 100, got: {0}")]
    ThresholdOutOfRange(u8),

    /// A fork in the configured schedule was rejected.
    #[error("invalid hard-fork schedule: {0}")]
    Schedule(#[from] ForkScheduleError),
}

//---------------------------------------------------------------------------------------------------- ForkScheduleError
/// Errors registering a fork with [`HardForkTracker::add_fork`](crate::HardForkTracker::add_fork).
///
/// The schedule is left untouched when one of these is returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForkScheduleError {
    /// Version `0` can not be scheduled.
    #[error("a hard-fork can not have version 0")]
    ZeroVersion,

    /// The version was not above the last scheduled version.
    #[error("the hard-fork version must be above the last scheduled version")]
    VersionNotIncreasing,

    /// The height was not above the last scheduled height.
    #[error("the hard-fork height must be above the last scheduled height")]
    HeightNotIncreasing,

    /// The time was not after the last scheduled time.
    #[error("the hard-fork time must be after the last scheduled time")]
    TimeNotIncreasing,

    /// The threshold is over 100%.
    #[error("the hard-fork threshold must be between 0 and 100, got: {0}")]
    ThresholdOutOfRange(u8),
}

//---------------------------------------------------------------------------------------------------- RuntimeError
/// Errors returned by a [`HardForkDatabase`](crate::HardForkDatabase).
///
/// The tracker does not inspect these, they are handed back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The requested height is not in the database.
    #[error("key/value pair was not found")]
    KeyNotFound,

    /// A [`std::io::Error`].
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other storage failure.
    #[error("unknown error: {0}")]
    Unknown(BoxError),
}

//---------------------------------------------------------------------------------------------------- HardForkError
/// Errors from the [`HardForkTracker`](crate::HardForkTracker) state transitions.
#[derive(Debug, thiserror::Error)]
pub enum HardForkError {
    /// The block's version is not the version of the active fork.
    #[error("the block is on an incorrect hard-fork, expected: {expected}, found: {found}")]
    VersionIncorrect {
        /// The active fork's version.
        expected: u8,
        /// The block's major version.
        found: u8,
    },

    /// The block's vote is for a previous hard-fork.
    #[error("the block's vote is for a previous hard-fork, required: {required}, vote: {vote}")]
    VoteTooLow {
        /// The active fork's version.
        required: u8,
        /// The block's vote.
        vote: u8,
    },

    /// The height is not below the current chain height.
    #[error("block height {height} is not in the chain, chain height: {chain_height}")]
    HeightNotInChain {
        /// The requested block height.
        height: u64,
        /// The chain height at the time of the request.
        chain_height: u64,
    },

    /// A chain height of `0` has no top block.
    #[error("the chain height must be strictly positive")]
    ZeroChainHeight,

    /// The database returned an error.
    #[error("database error: {0}")]
    Database(#[from] RuntimeError),
}

impl HardForkError {
    /// Returns `true` if this error rejected a block, as opposed to a failure reading the chain.
    pub const fn is_block_rejection(&self) -> bool {
        matches!(self, Self::VersionIncorrect { .. } | Self::VoteTooLow { .. })
    }
}
