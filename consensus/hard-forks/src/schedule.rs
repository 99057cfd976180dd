//! # Hard-Fork Schedule
//!
//! The list of scheduled forks, and the rules that only need the schedule to be evaluated.
use strum::{AsRefStr, Display, EnumIs, IntoStaticStr};

use crate::HardForkError;

/// One scheduled hard-fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(test, feature = "serde"), serde(deny_unknown_fields))]
pub struct ForkEntry {
    /// The version blocks must have once this fork is active.
    pub version: u8,
    /// The first height this fork can activate at.
    pub height: u64,
    /// The percentage of the vote window that must vote for this fork, or a later one.
    pub threshold: u8,
    /// Approximate activation time, as a unix timestamp.
    pub time: u64,
}

impl ForkEntry {
    pub const fn new(version: u8, height: u64, threshold: u8, time: u64) -> Self {
        Self {
            version,
            height,
            threshold,
            time,
        }
    }
}

/// How up to date the node is expected to be with the fork schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIs, IntoStaticStr)]
pub enum HardForkState {
    /// Running the latest known version.
    Ready,
    /// A fork should have happened a while ago, an update is probably needed.
    UpdateNeeded,
    /// A fork should have happened long ago, this node is likely on a forked chain.
    LikelyForked,
}

/// Checks a blocks version and vote, assuming that `hf` is the current hard-fork version.
///
/// ref: <https://monero-book.cuprate.org/consensus_rules/hardforks.html#blocks-version-and-vote>
pub const fn check_block_version_vote(hf: u8, version: u8, vote: u8) -> Result<(), HardForkError> {
    if hf != version {
        return Err(HardForkError::VersionIncorrect {
            expected: hf,
            found: version,
        });
    }
    if hf > vote {
        return Err(HardForkError::VoteTooLow { required: hf, vote });
    }

    Ok(())
}

/// Returns the votes needed for a fork with `threshold` percent over a `window` of votes.
///
/// ref: <https://monero-book.cuprate.org/consensus_rules/hardforks.html#accepting-a-fork>
pub fn votes_needed(threshold: u8, window: u64) -> u64 {
    u64::from(threshold).saturating_mul(window).div_ceil(100)
}

/// Clamps a vote to the highest version in `forks`.
///
/// Votes for versions this node does not know about still count towards the newest fork it does.
pub(crate) fn effective_version(forks: &[ForkEntry], vote: u8) -> u8 {
    forks.last().map_or(vote, |last| vote.min(last.version))
}
