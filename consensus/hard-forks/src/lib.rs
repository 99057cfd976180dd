#![doc = include_str!("../README.md")]

mod block;
mod config;
mod database;
mod error;
mod schedule;
mod tracker;
mod votes;

#[cfg(test)]
mod tests;

pub use block::BlockVersionInfo;
pub use config::{HardForkConfig, Network, ParseNetworkError};
pub use database::{BatchGuard, HardForkDatabase};
pub use error::{BoxError, ConfigError, ForkScheduleError, HardForkError, RuntimeError};
pub use schedule::{check_block_version_vote, votes_needed, ForkEntry, HardForkState};
pub use tracker::{HardForkTracker, VotingInfo};
