//! The rolling window of block votes.
use std::{
    collections::VecDeque,
    fmt::{Display, Formatter},
};

/// The votes of the last `window_size` blocks, with a running tally per version.
///
/// Every version is a valid index into the tally, so no vote is ever dropped.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct VoteWindow {
    votes: [u64; 256],
    vote_list: VecDeque<u8>,
    window_size: usize,
}

impl Display for VoteWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("VoteWindow ")?;
        f.debug_map()
            .entry(&"total", &self.total_votes())
            .entries(
                (0..=u8::MAX)
                    .map(|version| (version, self.votes_for(version)))
                    .filter(|(_, votes)| *votes != 0),
            )
            .finish()
    }
}

impl VoteWindow {
    pub(crate) fn new(window_size: u64) -> Self {
        let window_size = usize::try_from(window_size).unwrap_or(usize::MAX);

        Self {
            votes: [0; 256],
            vote_list: VecDeque::with_capacity(window_size.min(1 << 16)),
            window_size,
        }
    }

    /// Removes every vote.
    pub(crate) fn clear(&mut self) {
        self.votes = [0; 256];
        self.vote_list.clear();
    }

    /// Add the vote of the newest block, this function removes votes outside of the window.
    pub(crate) fn add_vote(&mut self, vote: u8) {
        while self.vote_list.len() >= self.window_size {
            let Some(old) = self.vote_list.pop_front() else {
                break;
            };
            self.votes[usize::from(old)] -= 1;
        }

        self.vote_list.push_back(vote);
        self.votes[usize::from(vote)] += 1;
    }

    /// Removes the vote of the newest block.
    pub(crate) fn pop_newest(&mut self) -> Option<u8> {
        let vote = self.vote_list.pop_back()?;
        self.votes[usize::from(vote)] -= 1;
        Some(vote)
    }

    /// Adds a vote below the oldest one, for a block re-entering the window after the top
    /// of the chain was popped.
    ///
    /// Ignored if the window is full.
    pub(crate) fn push_oldest(&mut self, vote: u8) {
        if self.vote_list.len() >= self.window_size {
            return;
        }

        self.vote_list.push_front(vote);
        self.votes[usize::from(vote)] += 1;
    }

    /// Returns the votes for exactly `version`.
    pub(crate) fn votes_for(&self, version: u8) -> u64 {
        self.votes[usize::from(version)]
    }

    /// Returns the votes for `version` or any later version.
    ///
    /// ref: <https://monero-book.cuprate.org/consensus_rules/hardforks.html#accepting-a-fork>
    pub(crate) fn votes_for_at_least(&self, version: u8) -> u64 {
        self.votes[usize::from(version)..].iter().sum()
    }

    /// Returns the total amount of votes being tracked.
    pub(crate) fn total_votes(&self) -> usize {
        self.vote_list.len()
    }

    /// Returns the votes oldest first.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.vote_list.iter().copied()
    }
}
