//! Pruning functions over raw `u32` seeds.
//!
//! A seed of `0` is always "not pruned". Decoding never fails, the functions that
//! search for heights validate the seed first as an invalid stripe would never
//! line up with any block.

use rand::Rng;

use forkline_constants::{
    block::MAX_BLOCK_HEIGHT,
    pruning::{
        PRUNING_LOG_STRIPES, PRUNING_SEED_LOG_STRIPES_MASK, PRUNING_SEED_LOG_STRIPES_SHIFT,
        PRUNING_SEED_STRIPE_MASK, PRUNING_SEED_STRIPE_SHIFT, PRUNING_STRIPE_SIZE,
        PRUNING_TIP_BLOCKS,
    },
};

use crate::PruningError;

/// Returns the `log_stripes` field of a seed.
pub const fn get_pruning_log_stripes(seed: u32) -> u32 {
    (seed >> PRUNING_SEED_LOG_STRIPES_SHIFT) & PRUNING_SEED_LOG_STRIPES_MASK
}

/// Returns the stripe of a seed, `0` means the seed does no pruning.
pub const fn get_pruning_stripe_from_seed(seed: u32) -> u32 {
    if seed == 0 {
        0
    } else {
        1 + ((seed >> PRUNING_SEED_STRIPE_SHIFT) & PRUNING_SEED_STRIPE_MASK)
    }
}

/// Packs a `stripe` and `log_stripes` into a seed.
///
/// # Errors
///
/// `log_stripes` must be in `0..=7` and `stripe` in `1..=2^log_stripes`.
pub const fn make_pruning_seed(stripe: u32, log_stripes: u32) -> Result<u32, PruningError> {
    if log_stripes > PRUNING_SEED_LOG_STRIPES_MASK {
        return Err(PruningError::LogStripesOutOfRange);
    }
    if stripe == 0 || stripe > (1 << log_stripes) {
        return Err(PruningError::StripeOutOfRange);
    }

    Ok((log_stripes << PRUNING_SEED_LOG_STRIPES_SHIFT)
        | ((stripe - 1) << PRUNING_SEED_STRIPE_SHIFT))
}

/// Returns if a block is close enough to the top of the chain that nobody prunes it.
pub const fn is_tip_block(block_height: u64, blockchain_height: u64) -> bool {
    block_height.saturating_add(PRUNING_TIP_BLOCKS) >= blockchain_height
}

/// The stripe a block falls in, ignoring the tip.
const fn stripe_of_height(block_height: u64, log_stripes: u32) -> u32 {
    let mask = (1_u64 << log_stripes) - 1;
    #[expect(
        clippy::cast_possible_truncation,
        reason = "masked to at most `PRUNING_SEED_LOG_STRIPES_MASK` bits"
    )]
    let stripe = ((block_height / PRUNING_STRIPE_SIZE) & mask) as u32;
    stripe + 1
}

/// Returns the stripe `block_height` belongs to when the chain is split into `2^log_stripes` stripes.
///
/// Blocks within [`PRUNING_TIP_BLOCKS`] of `blockchain_height` return `0`, they are
/// not part of any stripe.
///
/// The stripe changes every [`PRUNING_STRIPE_SIZE`] blocks, so with 8 stripes blocks
/// `0..4096` are stripe 1, `4096..8192` stripe 2, looping back to stripe 1 at block 32768.
pub const fn get_pruning_stripe(block_height: u64, blockchain_height: u64, log_stripes: u32) -> u32 {
    if is_tip_block(block_height, blockchain_height) {
        0
    } else {
        stripe_of_height(block_height, log_stripes)
    }
}

/// Returns the seed of a node that keeps the full data of `block_height`.
///
/// Returns `0` for tip blocks.
pub const fn get_pruning_seed(block_height: u64, blockchain_height: u64, log_stripes: u32) -> u32 {
    let stripe = get_pruning_stripe(block_height, blockchain_height, log_stripes);
    if stripe == 0 {
        return 0;
    }

    (log_stripes << PRUNING_SEED_LOG_STRIPES_SHIFT) | ((stripe - 1) << PRUNING_SEED_STRIPE_SHIFT)
}

/// Returns if a node with `seed` keeps the full data of `block_height`.
pub const fn has_unpruned_block(block_height: u64, blockchain_height: u64, seed: u32) -> bool {
    let stripe = get_pruning_stripe_from_seed(seed);
    if stripe == 0 {
        return true;
    }

    let block_stripe =
        get_pruning_stripe(block_height, blockchain_height, get_pruning_log_stripes(seed));
    block_stripe == 0 || block_stripe == stripe
}

/// Rejects heights past the maximum and seeds whose stripe doesn't fit their `log_stripes`.
const fn check_inputs(
    block_height: u64,
    blockchain_height: u64,
    seed: u32,
) -> Result<(), PruningError> {
    if block_height > MAX_BLOCK_HEIGHT + 1 {
        return Err(PruningError::BlockHeightTooLarge);
    }
    if blockchain_height > MAX_BLOCK_HEIGHT + 1 {
        return Err(PruningError::BlockChainHeightTooLarge);
    }
    if seed != 0 && get_pruning_stripe_from_seed(seed) > (1 << get_pruning_log_stripes(seed)) {
        return Err(PruningError::StripeOutOfRange);
    }
    Ok(())
}

/// Returns the first height `>= block_height` a node with `seed` keeps in full.
///
/// If the node's next stripe would start inside the tip, the first tip block is returned.
///
/// # Errors
///
/// Errors if a height is past [`MAX_BLOCK_HEIGHT`] or the seed is invalid.
pub fn get_next_unpruned_block_height(
    block_height: u64,
    blockchain_height: u64,
    seed: u32,
) -> Result<u64, PruningError> {
    check_inputs(block_height, blockchain_height, seed)?;

    let stripe = get_pruning_stripe_from_seed(seed);
    if stripe == 0 || is_tip_block(block_height, blockchain_height) {
        return Ok(block_height);
    }

    let log_stripes = get_pruning_log_stripes(seed);
    let block_stripe = stripe_of_height(block_height, log_stripes);
    if block_stripe == stripe {
        return Ok(block_height);
    }

    // A cycle is one run through every stripe, if our stripe comes later in this
    // cycle we start this cycle, otherwise the next one.
    let cycles = (block_height / PRUNING_STRIPE_SIZE) >> log_stripes;
    let cycle_start = cycles + if stripe > block_stripe { 0 } else { 1 };

    let calculated_height = cycle_start * (PRUNING_STRIPE_SIZE << log_stripes)
        + u64::from(stripe - 1) * PRUNING_STRIPE_SIZE;

    if calculated_height + PRUNING_TIP_BLOCKS > blockchain_height {
        return Ok(blockchain_height.saturating_sub(PRUNING_TIP_BLOCKS));
    }
    if calculated_height < block_height {
        return Err(PruningError::CalculatedHeightSmallerThanEnteredBlock);
    }

    Ok(calculated_height)
}

/// Returns the first height `>= block_height` a node with `seed` prunes.
///
/// Returns `blockchain_height` if the node will not prune any block from `block_height` onwards.
///
/// # Errors
///
/// Errors if a height is past [`MAX_BLOCK_HEIGHT`] or the seed is invalid.
pub fn get_next_pruned_block_height(
    block_height: u64,
    blockchain_height: u64,
    seed: u32,
) -> Result<u64, PruningError> {
    check_inputs(block_height, blockchain_height, seed)?;

    let stripe = get_pruning_stripe_from_seed(seed);
    if stripe == 0 || is_tip_block(block_height, blockchain_height) {
        return Ok(blockchain_height);
    }

    let log_stripes = get_pruning_log_stripes(seed);
    let block_stripe = stripe_of_height(block_height, log_stripes);
    if block_stripe != stripe {
        return Ok(block_height);
    }

    // Our run ends where the following stripe's run starts.
    let next_stripe = 1 + (block_stripe & ((1 << log_stripes) - 1));
    let next_seed = make_pruning_seed(next_stripe, log_stripes)?;
    let calculated_height =
        get_next_unpruned_block_height(block_height, blockchain_height, next_seed)?;

    if is_tip_block(calculated_height, blockchain_height) {
        Ok(blockchain_height)
    } else {
        Ok(calculated_height)
    }
}

/// Returns a random stripe in `1..=2^PRUNING_LOG_STRIPES`, for a node picking its own seed.
pub fn get_random_stripe() -> u32 {
    rand::thread_rng().gen_range(1..=(1 << PRUNING_LOG_STRIPES))
}
