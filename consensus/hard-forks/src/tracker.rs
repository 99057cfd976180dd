//! # Hard-Fork Tracker
//!
//! [`HardForkTracker`] decides which version blocks must have at every height.
//!
//! It keeps the votes of the last `window_size` blocks and activates a scheduled fork once
//! its height is reached and enough of the window voted for it (or a later fork).
//! The decided version for each height is written back to the [`HardForkDatabase`], which
//! is also the only durable state, everything else can be rebuilt with
//! [`HardForkTracker::rescan_from_block_height`].
use std::{
    sync::{Mutex, MutexGuard},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tracing::{debug, info, instrument, warn};

use forkline_constants::hard_fork::MAX_THRESHOLD_PERCENT;

use crate::{
    database::BatchGuard,
    schedule::{check_block_version_vote, effective_version, votes_needed},
    votes::VoteWindow,
    BlockVersionInfo, ConfigError, ForkEntry, ForkScheduleError, HardForkConfig,
    HardForkDatabase, HardForkError, HardForkState,
};

/// The state of the current voting, as returned by [`HardForkTracker::get_voting_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingInfo {
    /// If the current version is at or above the queried version.
    pub enabled: bool,
    /// The amount of votes in the window.
    pub window: u64,
    /// The votes for the queried version, or any later version.
    pub votes: u64,
    /// The votes the current fork needed over the current window.
    pub threshold: u64,
    /// See [`HardForkTracker::get_earliest_ideal_height_for_version`].
    pub earliest_height: u64,
    /// The highest scheduled version.
    pub voting: u8,
}

/// The mutable part of the tracker.
#[derive(Debug)]
struct TrackerState {
    forks: Vec<ForkEntry>,
    votes: VoteWindow,
    current_fork_index: usize,
}

/// Tracks the active hard-fork of a chain.
///
/// Every method locks the tracker for its whole duration, so one tracker can be shared
/// between threads.
///
/// # Usage
/// 1. Create with [`HardForkTracker::new`] or [`HardForkTracker::from_config`].
/// 2. Register forks with [`HardForkTracker::add_fork`], in order.
/// 3. Call [`HardForkTracker::init`].
/// 4. Call [`HardForkTracker::add`] for each new block, in height order.
#[derive(Debug)]
pub struct HardForkTracker<D> {
    db: D,

    original_version: u8,
    original_version_till_height: u64,
    forked_time: u64,
    update_time: u64,
    window_size: u64,
    default_threshold_percent: u8,

    state: Mutex<TrackerState>,
}

impl<D: HardForkDatabase> HardForkTracker<D> {
    /// Create a new tracker with an empty schedule.
    ///
    /// # Errors
    /// Returns an error if `window_size` is `0` or `default_threshold_percent` is above `100`.
    pub fn new(
        db: D,
        original_version: u8,
        original_version_till_height: u64,
        forked_time: u64,
        update_time: u64,
        window_size: u64,
        default_threshold_percent: u8,
    ) -> Result<Self, ConfigError> {
        if window_size == 0 {
            return Err(ConfigError::ZeroWindowSize);
        }
        if default_threshold_percent > MAX_THRESHOLD_PERCENT {
            return Err(ConfigError::ThresholdOutOfRange(default_threshold_percent));
        }

        Ok(Self {
            db,
            original_version,
            original_version_till_height,
            forked_time,
            update_time,
            window_size,
            default_threshold_percent,
            state: Mutex::new(TrackerState {
                forks: Vec::new(),
                votes: VoteWindow::new(window_size),
                current_fork_index: 0,
            }),
        })
    }

    /// Create a new tracker from `config`, registering every fork in its schedule.
    ///
    /// [`HardForkTracker::init`] still has to be called.
    pub fn from_config(db: D, config: HardForkConfig) -> Result<Self, ConfigError> {
        let tracker = Self::new(
            db,
            config.original_version,
            config.original_version_till_height,
            config.forked_time,
            config.update_time,
            config.window_size,
            config.default_threshold_percent,
        )?;

        for fork in config.forks {
            tracker.add_fork(fork.version, fork.height, fork.threshold, fork.time)?;
        }

        Ok(tracker)
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap()
    }

    /// The fork at `index`, or a fork for the original version if nothing was scheduled.
    fn fork_at(&self, state: &TrackerState, index: usize) -> ForkEntry {
        state
            .forks
            .get(index)
            .copied()
            .unwrap_or(ForkEntry::new(self.original_version, 0, 0, 0))
    }

    fn current_fork(&self, state: &TrackerState) -> ForkEntry {
        self.fork_at(state, state.current_fork_index)
    }

    //---------------------------------------------------------------------------------------------------- Schedule
    /// Schedule a new fork.
    ///
    /// Forks must be added in order: the version, height and time must all be above the
    /// last scheduled fork's.
    pub fn add_fork(
        &self,
        version: u8,
        height: u64,
        threshold: u8,
        time: u64,
    ) -> Result<(), ForkScheduleError> {
        let mut state = self.lock();

        if version == 0 {
            return Err(ForkScheduleError::ZeroVersion);
        }
        if let Some(last) = state.forks.last() {
            if version <= last.version {
                return Err(ForkScheduleError::VersionNotIncreasing);
            }
            if height <= last.height {
                return Err(ForkScheduleError::HeightNotIncreasing);
            }
            if time <= last.time {
                return Err(ForkScheduleError::TimeNotIncreasing);
            }
        }
        if threshold > MAX_THRESHOLD_PERCENT {
            return Err(ForkScheduleError::ThresholdOutOfRange(threshold));
        }

        state
            .forks
            .push(ForkEntry::new(version, height, threshold, time));
        Ok(())
    }

    /// Schedule a new fork with the default threshold, see [`HardForkTracker::add_fork`].
    pub fn add_fork_with_default_threshold(
        &self,
        version: u8,
        height: u64,
        time: u64,
    ) -> Result<(), ForkScheduleError> {
        self.add_fork(version, height, self.default_threshold_percent, time)
    }

    //---------------------------------------------------------------------------------------------------- Init
    /// Restore the voting state from the database.
    ///
    /// If no fork was scheduled, a fork for the original version at height `0` is added.
    #[instrument(name = "init_hard_forks", skip_all)]
    pub fn init(&self) -> Result<(), HardForkError> {
        let mut state = self.lock();

        if state.forks.is_empty() {
            state
                .forks
                .push(ForkEntry::new(self.original_version, 0, 0, 0));
        }

        state.votes.clear();
        state.current_fork_index = 0;

        let chain_height = self.db.height()?;
        if chain_height != 0 {
            let start_chain_height = if chain_height > self.window_size {
                chain_height - (self.window_size - 1)
            } else {
                1
            };

            self.rescan_locked(&mut state, start_chain_height - 1)?;
        }

        info!(
            chain_height,
            current_version = self.current_fork(&state).version,
            "Hard-fork state initialized, votes: {}",
            state.votes
        );

        Ok(())
    }

    //---------------------------------------------------------------------------------------------------- Blocks
    /// Returns `true` if `block` can be the next block of the chain.
    ///
    /// Its version must be the current version and its vote must be at least the current version.
    pub fn check(&self, block: &BlockVersionInfo) -> bool {
        let current = self.current_fork(&self.lock());
        check_block_version_vote(current.version, block.version(), block.vote()).is_ok()
    }

    /// Returns `true` if `block` would be valid at `height`, given the current votes.
    pub fn check_for_height(&self, block: &BlockVersionInfo, height: u64) -> bool {
        let fork = {
            let state = self.lock();
            self.fork_at(&state, self.voted_fork_index(&state, height))
        };
        check_block_version_vote(fork.version, block.version(), block.vote()).is_ok()
    }

    /// Add the next block of the chain.
    ///
    /// On success the current version is stored for `height` and the block's vote is counted.
    /// Blocks must be added in height order.
    pub fn add(&self, block: &BlockVersionInfo, height: u64) -> Result<(), HardForkError> {
        self.add_raw(block.version(), block.vote(), height)
    }

    /// [`HardForkTracker::add`] with the block's version and its (already decoded) vote.
    pub fn add_raw(&self, version: u8, vote: u8, height: u64) -> Result<(), HardForkError> {
        let mut state = self.lock();
        self.add_locked(&mut state, version, vote, height)
    }

    fn add_locked(
        &self,
        state: &mut TrackerState,
        version: u8,
        vote: u8,
        height: u64,
    ) -> Result<(), HardForkError> {
        let current = self.current_fork(state);
        if let Err(e) = check_block_version_vote(current.version, version, vote) {
            debug!(height, "Block rejected: {e}");
            return Err(e);
        }

        self.db.set_hard_fork_version(height, current.version)?;

        state.votes.add_vote(effective_version(&state.forks, vote));

        let voted = self.voted_fork_index(state, height + 1);
        if voted > state.current_fork_index {
            debug!(
                height = height + 1,
                version = self.fork_at(state, voted).version,
                "Hard-fork activated"
            );
            state.current_fork_index = voted;
        }

        Ok(())
    }

    /// The index of the highest fork that can activate at `height` with the current votes,
    /// or the current index if there is none.
    ///
    /// Votes for a version count towards every fork up to that version.
    ///
    /// ref: <https://monero-book.cuprate.org/consensus_rules/hardforks.html#accepting-a-fork>
    fn voted_fork_index(&self, state: &TrackerState, height: u64) -> usize {
        let mut accumulated_votes = 0;

        for (index, fork) in state.forks.iter().enumerate().rev() {
            accumulated_votes += state.votes.votes_for(fork.version);
            if height >= fork.height
                && accumulated_votes >= votes_needed(fork.threshold, self.window_size)
            {
                return index;
            }
        }

        state.current_fork_index
    }

    //---------------------------------------------------------------------------------------------------- Reorgs
    /// Rebuild the voting state after the chain was changed above `height`.
    ///
    /// The votes of the window ending at `height` are re-read from the stored blocks, then
    /// every stored block above `height` is added again. Stored blocks that are rejected
    /// while being added again are skipped.
    ///
    /// On error the write batch is aborted and the voting state is left as it was.
    ///
    /// # Errors
    /// Returns [`HardForkError::HeightNotInChain`] if `height` is not below the chain height.
    #[instrument(skip(self))]
    pub fn reorganize_from_block_height(&self, height: u64) -> Result<(), HardForkError> {
        let mut state = self.lock();

        let chain_height = self.db.height()?;
        if height >= chain_height {
            return Err(HardForkError::HeightNotInChain {
                height,
                chain_height,
            });
        }

        let saved_votes = state.votes.clone();
        let saved_fork_index = state.current_fork_index;

        if let Err(e) = self.reorganize_locked(&mut state, height, chain_height) {
            // the batch was aborted, the state must match the stored chain again
            state.votes = saved_votes;
            state.current_fork_index = saved_fork_index;
            return Err(e);
        }

        debug!(
            current_version = self.current_fork(&state).version,
            "Reorganized hard-fork state"
        );

        Ok(())
    }

    fn reorganize_locked(
        &self,
        state: &mut TrackerState,
        height: u64,
        chain_height: u64,
    ) -> Result<(), HardForkError> {
        let batch = BatchGuard::start(&self.db)?;

        let rescan_height = height.saturating_sub(self.window_size - 1);
        let start_version = if height == 0 {
            self.original_version
        } else {
            self.db.hard_fork_version(height)?
        };

        let mut votes = VoteWindow::new(self.window_size);
        for h in rescan_height..=height {
            let vote = self.db.block_version_info(h)?.vote();
            votes.add_vote(effective_version(&state.forks, vote));
        }
        state.votes = votes;

        while state.current_fork_index > 0 && self.current_fork(state).version > start_version {
            state.current_fork_index -= 1;
        }

        let voted = self.voted_fork_index(state, height + 1);
        if voted > state.current_fork_index {
            state.current_fork_index = voted;
        }

        for h in height + 1..chain_height {
            let block = self.db.block_version_info(h)?;

            if let Err(e) = self.add_locked(state, block.version(), block.vote(), h) {
                if !e.is_block_rejection() {
                    return Err(e);
                }
                warn!(height = h, "Stored block rejected after reorg: {e}");
            }
        }

        batch.commit()?;
        Ok(())
    }

    /// [`HardForkTracker::reorganize_from_block_height`] with the top block of a chain
    /// of `chain_height` blocks.
    pub fn reorganize_from_chain_height(&self, chain_height: u64) -> Result<(), HardForkError> {
        if chain_height == 0 {
            return Err(HardForkError::ZeroChainHeight);
        }
        self.reorganize_from_block_height(chain_height - 1)
    }

    /// Rebuild the voting state from the stored blocks from `height` to the top of the chain.
    ///
    /// Only the newest `window_size` votes are kept. The current fork is taken from the
    /// version stored for the top block, and advanced if the votes allow it.
    ///
    /// # Errors
    /// Returns [`HardForkError::HeightNotInChain`] if `height` is not below the chain height.
    pub fn rescan_from_block_height(&self, height: u64) -> Result<(), HardForkError> {
        let mut state = self.lock();
        self.rescan_locked(&mut state, height)
    }

    /// [`HardForkTracker::rescan_from_block_height`] with the top block of a chain
    /// of `chain_height` blocks.
    pub fn rescan_from_chain_height(&self, chain_height: u64) -> Result<(), HardForkError> {
        if chain_height == 0 {
            return Err(HardForkError::ZeroChainHeight);
        }
        self.rescan_from_block_height(chain_height - 1)
    }

    #[instrument(skip(self, state))]
    fn rescan_locked(&self, state: &mut TrackerState, height: u64) -> Result<(), HardForkError> {
        let chain_height = self.db.height()?;
        if height >= chain_height {
            return Err(HardForkError::HeightNotInChain {
                height,
                chain_height,
            });
        }

        let mut votes = VoteWindow::new(self.window_size);
        for h in height..chain_height {
            let vote = self.db.block_version_info(h)?.vote();
            votes.add_vote(effective_version(&state.forks, vote));
        }
        let top_version = self.db.hard_fork_version(chain_height - 1)?;

        state.votes = votes;
        state.current_fork_index = state
            .forks
            .iter()
            .position(|fork| fork.version == top_version)
            .unwrap_or_else(|| state.forks.len().saturating_sub(1));

        let voted = self.voted_fork_index(state, chain_height);
        if voted > state.current_fork_index {
            state.current_fork_index = voted;
        }

        debug!(
            votes = state.votes.total_votes(),
            current_version = self.current_fork(state).version,
            "Rescanned hard-fork votes"
        );

        Ok(())
    }

    /// Update the voting state after `numb_blocks` blocks were popped from the top of the chain.
    ///
    /// The votes of the popped blocks are removed and the versions stored for those heights
    /// are added to the old end of the window.
    /// The current fork is then the last fork whose height is reached, votes are not checked.
    ///
    /// # Panics
    /// This will panic if `numb_blocks` is `0`.
    pub fn on_block_popped(&self, numb_blocks: u64) -> Result<(), HardForkError> {
        assert!(numb_blocks > 0, "numb_blocks must be greater than 0");

        let mut state = self.lock();

        let new_chain_height = self.db.height()?;
        let old_chain_height = new_chain_height + numb_blocks;

        let old_versions = (new_chain_height..old_chain_height)
            .rev()
            .map(|height| self.db.hard_fork_version(height))
            .collect::<Result<Vec<_>, _>>()?;

        for version in old_versions {
            state.votes.pop_newest();
            state.votes.push_oldest(version);
        }

        state.current_fork_index = state
            .forks
            .iter()
            .rposition(|fork| new_chain_height >= fork.height)
            .unwrap_or(0);

        Ok(())
    }

    //---------------------------------------------------------------------------------------------------- Queries
    /// Returns the version of the block at `height`.
    ///
    /// For the next block's height, this is the current version.
    ///
    /// # Panics
    /// This will panic if `height` is above the chain height.
    pub fn get(&self, height: u64) -> Result<u8, HardForkError> {
        let state = self.lock();

        let chain_height = self.db.height()?;
        assert!(
            height <= chain_height,
            "height {height} is above the chain height {chain_height}"
        );

        if height == chain_height {
            return Ok(self.current_fork(&state).version);
        }

        Ok(self.db.hard_fork_version(height)?)
    }

    /// Returns the major version of the block at `height`, without any fork checks.
    pub fn get_block_version(&self, height: u64) -> Result<u8, HardForkError> {
        if height <= self.original_version_till_height {
            return Ok(self.original_version);
        }

        Ok(self.db.block_version_info(height)?.version())
    }

    /// The version the next block must have.
    pub fn get_current_version(&self) -> u8 {
        self.current_fork(&self.lock()).version
    }

    /// The highest scheduled version.
    pub fn get_ideal_version(&self) -> u8 {
        let state = self.lock();
        state
            .forks
            .last()
            .map_or(self.original_version, |fork| fork.version)
    }

    /// The version `height` would have if every fork activated as soon as possible.
    pub fn get_ideal_version_for_height(&self, height: u64) -> u8 {
        let state = self.lock();
        state
            .forks
            .iter()
            .skip(1)
            .rev()
            .find(|fork| height >= fork.height)
            .map_or(self.original_version, |fork| fork.version)
    }

    /// The version of the fork after the one the next block is scheduled for.
    ///
    /// This is the last scheduled version once every fork's height has been reached.
    pub fn get_next_version(&self) -> Result<u8, HardForkError> {
        let state = self.lock();
        let chain_height = self.db.height()?;

        for (index, fork) in state.forks.iter().enumerate().rev() {
            if chain_height >= fork.height {
                return Ok(state.forks.get(index + 1).unwrap_or(fork).version);
            }
        }

        Ok(self.original_version)
    }

    /// The earliest height at which a version at or above `version` is scheduled,
    /// or [`u64::MAX`] if no such version is scheduled.
    pub fn get_earliest_ideal_height_for_version(&self, version: u8) -> u64 {
        let state = self.lock();
        Self::earliest_ideal_height(&state, version)
    }

    fn earliest_ideal_height(state: &TrackerState, version: u8) -> u64 {
        state
            .forks
            .iter()
            .rev()
            .take_while(|fork| fork.version >= version)
            .last()
            .map_or(u64::MAX, |fork| fork.height)
    }

    /// Returns the state of the voting for `version`.
    pub fn get_voting_info(&self, version: u8) -> VotingInfo {
        let state = self.lock();
        let current = self.current_fork(&state);

        let window = u64::try_from(state.votes.total_votes()).unwrap_or(u64::MAX);

        VotingInfo {
            enabled: current.version >= version,
            window,
            votes: state.votes.votes_for_at_least(version),
            threshold: votes_needed(current.threshold, window),
            earliest_height: Self::earliest_ideal_height(&state, version),
            voting: state
                .forks
                .last()
                .map_or(self.original_version, |fork| fork.version),
        }
    }

    /// Returns how far `time` is past the last scheduled fork.
    ///
    /// Always [`HardForkState::Ready`] if at most one fork is scheduled.
    pub fn get_state(&self, time: u64) -> HardForkState {
        let state = self.lock();

        let [_, .., last] = state.forks.as_slice() else {
            return HardForkState::Ready;
        };

        if time >= last.time.saturating_add(self.forked_time) {
            HardForkState::LikelyForked
        } else if time >= last.time.saturating_add(self.update_time) {
            HardForkState::UpdateNeeded
        } else {
            HardForkState::Ready
        }
    }

    /// [`HardForkTracker::get_state`] for the current time.
    pub fn get_state_now(&self) -> HardForkState {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .as_ref()
            .map_or(0, Duration::as_secs);
        self.get_state(now)
    }

    //---------------------------------------------------------------------------------------------------- Accessors
    /// The amount of blocks whose votes are counted.
    pub const fn window_size(&self) -> u64 {
        self.window_size
    }

    /// The threshold of forks added with [`HardForkTracker::add_fork_with_default_threshold`].
    pub const fn default_threshold_percent(&self) -> u8 {
        self.default_threshold_percent
    }

    /// The version of blocks before the first fork.
    pub const fn original_version(&self) -> u8 {
        self.original_version
    }

    /// Blocks up to and including this height are always on [`HardForkTracker::original_version`].
    pub const fn original_version_till_height(&self) -> u64 {
        self.original_version_till_height
    }

    /// A copy of the fork schedule.
    pub fn forks(&self) -> Vec<ForkEntry> {
        self.lock().forks.clone()
    }

    /// The index of the current fork in [`HardForkTracker::forks`].
    pub fn current_fork_index(&self) -> usize {
        self.lock().current_fork_index
    }

    /// The database this tracker reads from.
    pub const fn database(&self) -> &D {
        &self.db
    }
}
