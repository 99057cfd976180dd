//! The typed pruning seed.

use std::cmp::Ordering;

use crate::{
    raw::{
        get_next_pruned_block_height, get_next_unpruned_block_height, get_pruning_log_stripes,
        get_pruning_seed, get_pruning_stripe_from_seed, get_random_stripe, has_unpruned_block,
        make_pruning_seed,
    },
    PruningError, PRUNING_LOG_STRIPES,
};

/// A valid pruning seed.
///
/// A pruning seed tells nodes which blocks they should keep and which they should prune.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub enum PruningSeed {
    /// A peer with this seed is not pruned.
    NotPruned,
    /// A peer with this seed is pruned.
    Pruned(DecompressedPruningSeed),
}

impl PruningSeed {
    /// Creates a new [`PruningSeed::Pruned`] seed.
    ///
    /// See: [`DecompressedPruningSeed::new`]
    pub fn new_pruned(stripe: u32, log_stripes: u32) -> Result<Self, PruningError> {
        Ok(Self::Pruned(DecompressedPruningSeed::new(stripe, log_stripes)?))
    }

    /// Creates a pruned seed keeping a random stripe, using [`PRUNING_LOG_STRIPES`].
    pub fn random() -> Self {
        Self::Pruned(DecompressedPruningSeed {
            log_stripes: PRUNING_LOG_STRIPES,
            stripe: get_random_stripe(),
        })
    }

    /// Returns the seed of a node that keeps the full data of `block_height`.
    ///
    /// Tip blocks are kept by everyone, for them this returns [`PruningSeed::NotPruned`].
    pub fn for_block(
        block_height: u64,
        blockchain_height: u64,
        log_stripes: u32,
    ) -> Result<Self, PruningError> {
        Self::decompress(get_pruning_seed(
            block_height,
            blockchain_height,
            log_stripes,
        ))
    }

    /// Attempts to decompress a raw pruning seed.
    ///
    /// An error means the pruning seed was invalid.
    pub fn decompress(seed: u32) -> Result<Self, PruningError> {
        Ok(DecompressedPruningSeed::decompress(seed)?.map_or(Self::NotPruned, Self::Pruned))
    }

    /// Decompresses the seed, performing the same checks as [`PruningSeed::decompress`] and
    /// also requiring `log_stripes` to be [`PRUNING_LOG_STRIPES`], which is all the p2p
    /// network accepts.
    pub fn decompress_p2p_rules(seed: u32) -> Result<Self, PruningError> {
        let seed = Self::decompress(seed)?;

        match seed.get_log_stripes() {
            Some(log_stripes) if log_stripes != PRUNING_LOG_STRIPES => {
                Err(PruningError::LogStripesOutOfRange)
            }
            _ => Ok(seed),
        }
    }

    /// Compresses this pruning seed to a u32.
    pub const fn compress(&self) -> u32 {
        match self {
            Self::NotPruned => 0,
            Self::Pruned(seed) => seed.compress(),
        }
    }

    /// Returns the `log_stripes` for this seed, if this seed is pruned otherwise [`None`] is returned.
    pub const fn get_log_stripes(&self) -> Option<u32> {
        match self {
            Self::NotPruned => None,
            Self::Pruned(seed) => Some(seed.log_stripes),
        }
    }

    /// Returns the `stripe` for this seed, if this seed is pruned otherwise [`None`] is returned.
    pub const fn get_stripe(&self) -> Option<u32> {
        match self {
            Self::NotPruned => None,
            Self::Pruned(seed) => Some(seed.stripe),
        }
    }

    /// Returns if a peer with this pruning seed should have a non-pruned version of a block.
    pub const fn has_full_block(&self, height: u64, blockchain_height: u64) -> bool {
        has_unpruned_block(height, blockchain_height, self.compress())
    }

    /// Gets the next pruned block for a given `block_height` and `blockchain_height`
    ///
    /// Each seed will store, in a cyclic manner, a portion of blocks while discarding
    /// the ones that are out of your stripe. This function is finding the next height
    /// for which a specific seed will start pruning blocks.
    ///
    /// This will return Ok(None) if the seed does no pruning or if there is no pruned block
    /// after this one.
    ///
    /// ### Errors
    ///
    /// This function will return an Error if the inputted `block_height` or
    /// `blockchain_height` is greater than [`MAX_BLOCK_HEIGHT`](forkline_constants::block::MAX_BLOCK_HEIGHT).
    pub fn get_next_pruned_block(
        &self,
        block_height: u64,
        blockchain_height: u64,
    ) -> Result<Option<u64>, PruningError> {
        match self {
            Self::NotPruned => Ok(None),
            Self::Pruned(seed) => seed.get_next_pruned_block(block_height, blockchain_height),
        }
    }

    /// Gets the next unpruned block for a given `block_height` and `blockchain_height`
    ///
    /// Each seed will store, in a cyclic manner, a portion of blocks while discarding
    /// the ones that are out of your stripe. This function is finding the next height
    /// for which a specific seed will start storing blocks.
    ///
    /// ### Errors
    ///
    /// This function will return an Error if the inputted `block_height` or
    /// `blockchain_height` is greater than [`MAX_BLOCK_HEIGHT`](forkline_constants::block::MAX_BLOCK_HEIGHT).
    pub fn get_next_unpruned_block(
        &self,
        block_height: u64,
        blockchain_height: u64,
    ) -> Result<u64, PruningError> {
        get_next_unpruned_block_height(block_height, blockchain_height, self.compress())
    }
}

impl TryFrom<u32> for PruningSeed {
    type Error = PruningError;

    fn try_from(seed: u32) -> Result<Self, Self::Error> {
        Self::decompress(seed)
    }
}

impl From<PruningSeed> for u32 {
    fn from(seed: PruningSeed) -> Self {
        seed.compress()
    }
}

impl PartialOrd<Self> for PruningSeed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PruningSeed {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // Make sure pruning seeds storing more blocks are greater.
            (Self::NotPruned, Self::NotPruned) => Ordering::Equal,
            (Self::NotPruned, Self::Pruned(_)) => Ordering::Greater,
            (Self::Pruned(_), Self::NotPruned) => Ordering::Less,

            (Self::Pruned(seed1), Self::Pruned(seed2)) => seed1.cmp(seed2),
        }
    }
}

/// A pruning seed that does pruning.
///
/// It does allow representations of pruning seeds that the p2p network would not allow, i.e.
/// it does not restrict `log_stripes` to [`PRUNING_LOG_STRIPES`].
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct DecompressedPruningSeed {
    /// log2 of the amount of portions the blockchain is split into.
    log_stripes: u32,
    /// The specific portion this peer keeps.
    ///
    /// *MUST* be between 1..=2^log_stripes
    stripe: u32,
}

impl PartialOrd<Self> for DecompressedPruningSeed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecompressedPruningSeed {
    fn cmp(&self, other: &Self) -> Ordering {
        // Compare the `log_stripes` first so peers which store more blocks are greater than peers
        // storing less.
        match self.log_stripes.cmp(&other.log_stripes) {
            Ordering::Equal => self.stripe.cmp(&other.stripe),
            ord => ord,
        }
    }
}

impl DecompressedPruningSeed {
    /// Creates a new pruning seed from a `stripe` and `log_stripes`
    ///
    /// ### What is a `stripe`
    ///
    /// A stripe is the part of the blockchain this peer will keep.
    ///
    /// When pruning the blockchain is split into multiple "stripes",
    /// currently 8, and each pruned peer keeps one of them.
    ///
    /// ### What is `log_stripes`
    ///
    /// `log_stripes` is log2 of the amount of stripes used, for 8 stripes it is 3.
    ///
    /// ---------------------------------------------------------------
    ///
    /// *note this function allows you to make seeds the p2p network rejects, so the
    /// specifics of pruning can change in the future. To make a seed peers accept you
    /// currently MUST pass in a number 1 to 8 for `stripe` and 3 for `log_stripes`.*
    ///
    /// A `log_stripes` of `0` is rejected, a single stripe packs to `0` which means no pruning.
    pub const fn new(stripe: u32, log_stripes: u32) -> Result<Self, PruningError> {
        if log_stripes == 0 {
            return Err(PruningError::LogStripesOutOfRange);
        }

        match make_pruning_seed(stripe, log_stripes) {
            Ok(_) => Ok(Self {
                log_stripes,
                stripe,
            }),
            Err(e) => Err(e),
        }
    }

    /// Attempts to decompress a raw pruning seed.
    ///
    /// Will return Ok(None) if the pruning seed means no pruning.
    ///
    /// An error means the pruning seed was invalid.
    pub const fn decompress(seed: u32) -> Result<Option<Self>, PruningError> {
        if seed == 0 {
            return Ok(None);
        }

        let log_stripes = get_pruning_log_stripes(seed);
        let stripe = get_pruning_stripe_from_seed(seed);

        if stripe > (1 << log_stripes) {
            return Err(PruningError::StripeOutOfRange);
        }

        Ok(Some(Self {
            log_stripes,
            stripe,
        }))
    }

    /// Compresses the pruning seed into a u32.
    pub const fn compress(&self) -> u32 {
        match make_pruning_seed(self.stripe, self.log_stripes) {
            Ok(seed) => seed,
            Err(_) => unreachable!(),
        }
    }

    /// Returns `log_stripes`.
    pub const fn log_stripes(&self) -> u32 {
        self.log_stripes
    }

    /// Returns the stripe this seed keeps.
    pub const fn stripe(&self) -> u32 {
        self.stripe
    }

    /// Returns if a peer with this pruning seed should have a non-pruned version of a block.
    pub const fn has_full_block(&self, height: u64, blockchain_height: u64) -> bool {
        has_unpruned_block(height, blockchain_height, self.compress())
    }

    /// Gets the next unpruned block for a given `block_height` and `blockchain_height`.
    ///
    /// See [`PruningSeed::get_next_unpruned_block`].
    pub fn get_next_unpruned_block(
        &self,
        block_height: u64,
        blockchain_height: u64,
    ) -> Result<u64, PruningError> {
        get_next_unpruned_block_height(block_height, blockchain_height, self.compress())
    }

    /// Gets the next pruned block for a given `block_height` and `blockchain_height`.
    ///
    /// See [`PruningSeed::get_next_pruned_block`].
    pub fn get_next_pruned_block(
        &self,
        block_height: u64,
        blockchain_height: u64,
    ) -> Result<Option<u64>, PruningError> {
        let height =
            get_next_pruned_block_height(block_height, blockchain_height, self.compress())?;

        Ok((height < blockchain_height).then_some(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_all_pruning_seeds() -> Vec<PruningSeed> {
        let possible_stripes = 1..=(1 << PRUNING_LOG_STRIPES);
        possible_stripes
            .map(|stripe| PruningSeed::new_pruned(stripe, PRUNING_LOG_STRIPES).unwrap())
            .collect()
    }

    #[test]
    fn from_u32_for_pruning_seed() {
        let good_seeds = 384..=391;
        for seed in good_seeds {
            assert!(PruningSeed::decompress(seed).is_ok());
        }
        let bad_seeds = [383, 392];
        for seed in bad_seeds {
            assert!(PruningSeed::decompress(seed).is_err());
        }
    }

    #[test]
    fn p2p_rules_only_allow_eight_stripes() {
        assert!(PruningSeed::decompress_p2p_rules(386).is_ok());
        assert_eq!(
            PruningSeed::decompress_p2p_rules(0).unwrap(),
            PruningSeed::NotPruned
        );

        let two_stripes = PruningSeed::new_pruned(1, 1).unwrap().compress();
        assert_eq!(
            PruningSeed::decompress_p2p_rules(two_stripes),
            Err(PruningError::LogStripesOutOfRange)
        );
    }

    #[test]
    fn make_invalid_pruning_seeds() {
        let invalid_stripes = [0, (1 << PRUNING_LOG_STRIPES) + 1];

        for stripe in invalid_stripes {
            assert!(PruningSeed::new_pruned(stripe, PRUNING_LOG_STRIPES).is_err());
        }
    }

    #[test]
    fn single_stripe_is_not_a_pruned_seed() {
        assert_eq!(
            PruningSeed::new_pruned(1, 0),
            Err(PruningError::LogStripesOutOfRange)
        );
        assert_eq!(PruningSeed::try_from(0_u32).unwrap(), PruningSeed::NotPruned);

        for log_stripes in 1..=7 {
            let seed = PruningSeed::new_pruned(1, log_stripes).unwrap();
            assert_ne!(seed.compress(), 0);
            assert_eq!(PruningSeed::try_from(seed.compress()).unwrap(), seed);
        }
    }

    #[test]
    fn compress_round_trips() {
        for seed in make_all_pruning_seeds() {
            let raw: u32 = seed.into();
            assert_eq!(PruningSeed::try_from(raw).unwrap(), seed);
        }
        assert_eq!(PruningSeed::NotPruned.compress(), 0);
    }

    #[test]
    fn get_pruning_log_stripe() {
        for seed in make_all_pruning_seeds() {
            assert_eq!(seed.get_log_stripes().unwrap(), 3);
        }
    }

    #[test]
    fn get_pruning_stripe() {
        for (i, seed) in make_all_pruning_seeds().iter().enumerate() {
            assert_eq!(seed.get_stripe().unwrap(), u32::try_from(i).unwrap() + 1);
        }
    }

    #[test]
    fn random_seed_is_valid() {
        for _ in 0..100 {
            let seed = PruningSeed::random();
            assert_eq!(PruningSeed::decompress_p2p_rules(seed.compress()), Ok(seed));
        }
    }

    #[test]
    fn seed_for_block() {
        let blockchain_height = 76437863;

        assert_eq!(
            PruningSeed::for_block(4096, blockchain_height, PRUNING_LOG_STRIPES).unwrap(),
            PruningSeed::new_pruned(2, PRUNING_LOG_STRIPES).unwrap()
        );
        assert_eq!(
            PruningSeed::for_block(
                blockchain_height - 1,
                blockchain_height,
                PRUNING_LOG_STRIPES
            )
            .unwrap(),
            PruningSeed::NotPruned
        );
    }

    #[test]
    fn ordering_prefers_more_data() {
        let mut seeds = make_all_pruning_seeds();
        seeds.push(PruningSeed::NotPruned);
        seeds.push(PruningSeed::new_pruned(1, 1).unwrap());
        seeds.sort();

        assert_eq!(seeds.first(), Some(&PruningSeed::new_pruned(1, 1).unwrap()));
        assert_eq!(seeds.last(), Some(&PruningSeed::NotPruned));
    }

    #[test]
    fn next_unpruned_block() {
        let all_valid_seeds = make_all_pruning_seeds();
        let blockchain_height = 76437863;

        for (i, seed) in (0_u64..).zip(&all_valid_seeds) {
            assert_eq!(
                seed.get_next_unpruned_block(0, blockchain_height).unwrap(),
                i * 4096
            );
            assert_eq!(
                seed.get_next_unpruned_block((i + 1) * 4096, blockchain_height)
                    .unwrap(),
                i * 4096 + 32768
            );
            assert_eq!(
                seed.get_next_unpruned_block((i + 8) * 4096, blockchain_height)
                    .unwrap(),
                i * 4096 + 32768
            );
            assert_eq!(
                seed.get_next_unpruned_block(blockchain_height - 1, blockchain_height)
                    .unwrap(),
                blockchain_height - 1
            );
        }

        assert_eq!(
            PruningSeed::NotPruned
                .get_next_unpruned_block(33443, 5565445)
                .unwrap(),
            33443
        );

        // the next unpruned block is the first tip block
        let seed = PruningSeed::decompress(384).unwrap();
        assert_eq!(seed.get_next_unpruned_block(5000, 11000).unwrap(), 5500);
    }

    #[test]
    fn next_pruned_block() {
        let all_valid_seeds = make_all_pruning_seeds();
        let blockchain_height = 76437863;

        for seed in all_valid_seeds.iter().skip(1) {
            assert_eq!(
                seed.get_next_pruned_block(0, blockchain_height).unwrap(),
                Some(0)
            );
        }

        for (i, seed) in (0_u64..).zip(&all_valid_seeds) {
            assert_eq!(
                seed.get_next_pruned_block((i + 1) * 4096, blockchain_height)
                    .unwrap(),
                Some((i + 1) * 4096)
            );
            assert_eq!(
                seed.get_next_pruned_block((i + 8) * 4096, blockchain_height)
                    .unwrap(),
                Some((i + 9) * 4096)
            );
            assert_eq!(
                seed.get_next_pruned_block(blockchain_height - 1, blockchain_height)
                    .unwrap(),
                None
            );
        }

        assert_eq!(
            PruningSeed::NotPruned
                .get_next_pruned_block(33443, 5565445)
                .unwrap(),
            None
        );

        // there is no next pruned block
        let seed = PruningSeed::decompress(384).unwrap();
        assert_eq!(seed.get_next_pruned_block(5000, 10000).unwrap(), None);
    }
}
