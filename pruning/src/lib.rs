#![doc = include_str!("../README.md")]

use thiserror::Error;

pub use forkline_constants::pruning::{
    PRUNING_LOG_STRIPES, PRUNING_STRIPE_SIZE, PRUNING_TIP_BLOCKS,
};

pub mod raw;
mod seed;

pub use seed::{DecompressedPruningSeed, PruningSeed};

/// An error creating a pruning seed or searching for pruned/unpruned heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PruningError {
    #[error("log_stripes is out of range")]
    LogStripesOutOfRange,
    #[error("Stripe is out of range")]
    StripeOutOfRange,
    #[error("The block height is greater than `MAX_BLOCK_HEIGHT`")]
    BlockHeightTooLarge,
    #[error("The blockchain height is greater than `MAX_BLOCK_HEIGHT`")]
    BlockChainHeightTooLarge,
    #[error("The calculated height is smaller than the block height entered")]
    CalculatedHeightSmallerThanEnteredBlock,
}
