//! Hard-fork tracker configuration.
//!
//! This module contains [`HardForkConfig`], every parameter of a
//! [`HardForkTracker`](crate::HardForkTracker) plus its fork schedule,
//! and the schedules of every [`Network`].
//!
//! # Example
//! ```rust
//! use forkline_hard_forks::{HardForkConfig, Network};
//!
//! let config = HardForkConfig::for_network(Network::Stagenet);
//!
//! assert_eq!(config.window_size, 10080);
//! assert_eq!(config.forks.len(), 16);
//! assert_eq!(config.forks.last().unwrap().version, 16);
//! ```

//---------------------------------------------------------------------------------------------------- Import
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

#[cfg(any(test, feature = "serde"))]
use serde::{Deserialize, Serialize};

use forkline_constants::hard_fork::{
    DEFAULT_FORKED_TIME, DEFAULT_ORIGINAL_VERSION, DEFAULT_ORIGINAL_VERSION_TILL_HEIGHT,
    DEFAULT_THRESHOLD_PERCENT, DEFAULT_UPDATE_TIME, DEFAULT_WINDOW_SIZE,
};

use crate::ForkEntry;

//---------------------------------------------------------------------------------------------------- Network
/// An enum representing every Monero network.
#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, Eq, PartialEq, Hash)]
#[cfg_attr(any(test, feature = "serde"), derive(Deserialize, Serialize))]
pub enum Network {
    /// Mainnet
    #[default]
    Mainnet,
    /// Testnet
    Testnet,
    /// Stagenet
    Stagenet,
}

/// The string was not the name of a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown network, expected one of: mainnet, testnet, stagenet")]
pub struct ParseNetworkError;

impl FromStr for Network {
    type Err = ParseNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "stagenet" => Ok(Self::Stagenet),
            _ => Err(ParseNetworkError),
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Stagenet => "stagenet",
        })
    }
}

//---------------------------------------------------------------------------------------------------- HardForkConfig
/// Configuration for a [`HardForkTracker`](crate::HardForkTracker).
///
/// For construction, use [`HardForkConfig::default`] for a blank schedule
/// or [`HardForkConfig::for_network`] for a real one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(any(test, feature = "serde"), derive(Serialize, Deserialize))]
#[cfg_attr(any(test, feature = "serde"), serde(deny_unknown_fields, default))]
pub struct HardForkConfig {
    /// The version of every block before the first fork.
    pub original_version: u8,
    /// Blocks up to and including this height are always on `original_version`.
    pub original_version_till_height: u64,
    /// Seconds after the last fork's time before this node is likely on a forked chain.
    pub forked_time: u64,
    /// Seconds after the last fork's time before this node likely needs an update.
    pub update_time: u64,
    /// The amount of blocks whose votes are counted.
    pub window_size: u64,
    /// The threshold used by [`HardForkTracker::add_fork_with_default_threshold`](crate::HardForkTracker::add_fork_with_default_threshold).
    pub default_threshold_percent: u8,
    /// The fork schedule, in activation order.
    pub forks: Vec<ForkEntry>,
}

impl Default for HardForkConfig {
    fn default() -> Self {
        Self {
            original_version: DEFAULT_ORIGINAL_VERSION,
            original_version_till_height: DEFAULT_ORIGINAL_VERSION_TILL_HEIGHT,
            forked_time: DEFAULT_FORKED_TIME,
            update_time: DEFAULT_UPDATE_TIME,
            window_size: DEFAULT_WINDOW_SIZE,
            default_threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            forks: Vec::new(),
        }
    }
}

impl HardForkConfig {
    /// Returns the config for `network`.
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::main_net(),
            Network::Testnet => Self::test_net(),
            Network::Stagenet => Self::stage_net(),
        }
    }

    /// Returns the main-net hard-fork config.
    ///
    /// ref: <https://monero-book.cuprate.org/consensus_rules/hardforks.html#Mainnet-Hard-Forks>
    pub fn main_net() -> Self {
        Self {
            original_version_till_height: 1_009_826,
            forks: vec![
                ForkEntry::new(1, 1, 0, 1_341_378_000),
                ForkEntry::new(2, 1_009_827, 0, 1_442_763_710),
                ForkEntry::new(3, 1_141_317, 0, 1_458_558_528),
                ForkEntry::new(4, 1_220_516, 0, 1_483_574_400),
                ForkEntry::new(5, 1_288_616, 0, 1_489_520_158),
                ForkEntry::new(6, 1_400_000, 0, 1_503_046_577),
                ForkEntry::new(7, 1_546_000, 0, 1_521_303_150),
                ForkEntry::new(8, 1_685_555, 0, 1_535_889_547),
                ForkEntry::new(9, 1_686_275, 0, 1_535_889_548),
                ForkEntry::new(10, 1_788_000, 0, 1_549_792_439),
                ForkEntry::new(11, 1_788_720, 0, 1_550_225_678),
                ForkEntry::new(12, 1_978_433, 0, 1_571_419_280),
                ForkEntry::new(13, 2_210_000, 0, 1_598_180_817),
                ForkEntry::new(14, 2_210_720, 0, 1_598_180_818),
                ForkEntry::new(15, 2_688_888, 0, 1_656_629_117),
                ForkEntry::new(16, 2_689_608, 0, 1_656_629_118),
            ],
            ..Default::default()
        }
    }

    /// Returns the test-net hard-fork config.
    ///
    /// ref: <https://monero-book.cuprate.org/consensus_rules/hardforks.html#Testnet-Hard-Forks>
    pub fn test_net() -> Self {
        Self {
            original_version_till_height: 624_633,
            forks: vec![
                ForkEntry::new(1, 1, 0, 1_341_378_000),
                ForkEntry::new(2, 624_634, 0, 1_445_355_000),
                ForkEntry::new(3, 800_500, 0, 1_472_415_034),
                ForkEntry::new(4, 801_219, 0, 1_472_415_035),
                // 180 days after v4
                ForkEntry::new(5, 802_660, 0, 1_472_415_036 + 86_400 * 180),
                ForkEntry::new(6, 971_400, 0, 1_501_709_789),
                ForkEntry::new(7, 1_057_027, 0, 1_512_211_236),
                ForkEntry::new(8, 1_057_058, 0, 1_533_211_200),
                ForkEntry::new(9, 1_057_778, 0, 1_533_297_600),
                ForkEntry::new(10, 1_154_318, 0, 1_550_153_694),
                ForkEntry::new(11, 1_155_038, 0, 1_550_225_678),
                ForkEntry::new(12, 1_308_737, 0, 1_569_582_000),
                ForkEntry::new(13, 1_543_939, 0, 1_599_069_376),
                ForkEntry::new(14, 1_544_659, 0, 1_599_069_377),
                ForkEntry::new(15, 1_982_800, 0, 1_652_727_000),
                ForkEntry::new(16, 1_983_520, 0, 1_652_813_400),
            ],
            ..Default::default()
        }
    }

    /// Returns the stage-net hard-fork config.
    ///
    /// ref: <https://monero-book.cuprate.org/consensus_rules/hardforks.html#Stagenet-Hard-Forks>
    pub fn stage_net() -> Self {
        Self {
            forks: vec![
                ForkEntry::new(1, 1, 0, 1_341_378_000),
                ForkEntry::new(2, 32_000, 0, 1_521_000_000),
                ForkEntry::new(3, 33_000, 0, 1_521_120_000),
                ForkEntry::new(4, 34_000, 0, 1_521_240_000),
                ForkEntry::new(5, 35_000, 0, 1_521_360_000),
                ForkEntry::new(6, 36_000, 0, 1_521_480_000),
                ForkEntry::new(7, 37_000, 0, 1_521_600_000),
                ForkEntry::new(8, 176_456, 0, 1_537_821_770),
                ForkEntry::new(9, 177_176, 0, 1_537_821_771),
                ForkEntry::new(10, 269_000, 0, 1_550_153_694),
                ForkEntry::new(11, 269_720, 0, 1_550_225_678),
                ForkEntry::new(12, 454_721, 0, 1_571_419_280),
                ForkEntry::new(13, 675_405, 0, 1_598_180_817),
                ForkEntry::new(14, 676_125, 0, 1_598_180_818),
                ForkEntry::new(15, 1_151_000, 0, 1_656_629_117),
                ForkEntry::new(16, 1_151_720, 0, 1_656_629_118),
            ],
            ..Default::default()
        }
    }
}

//---------------------------------------------------------------------------------------------------- Tests
#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn network_names() {
        for network in [Network::Mainnet, Network::Testnet, Network::Stagenet] {
            assert_eq!(network.to_string().parse::<Network>(), Ok(network));
        }
        assert_eq!("StageNet".parse::<Network>(), Ok(Network::Stagenet));
        assert_eq!("regtest".parse::<Network>(), Err(ParseNetworkError));
    }

    #[test]
    fn network_schedules_are_ordered() {
        for network in [Network::Mainnet, Network::Testnet, Network::Stagenet] {
            let config = HardForkConfig::for_network(network);
            assert_eq!(config.forks.len(), 16);

            for (version, fork) in (1..).zip(&config.forks) {
                assert_eq!(fork.version, version);
                assert_eq!(fork.threshold, 0);
            }
            for pair in config.forks.windows(2) {
                assert!(pair[0].height < pair[1].height);
                assert!(pair[0].time < pair[1].time);
            }
            assert!(config.original_version_till_height < config.forks[1].height);
        }
    }

    #[test]
    fn toml_round_trip() {
        let config = HardForkConfig::main_net();
        let string = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<HardForkConfig>(&string).unwrap(), config);
    }

    #[test]
    fn toml_missing_fields_are_default() {
        let config: HardForkConfig = toml::from_str(
            r"
            window_size = 4
            default_threshold_percent = 50

            [[forks]]
            version = 1
            height = 0
            threshold = 0
            time = 0

            [[forks]]
            version = 2
            height = 2
            threshold = 50
            time = 1
            ",
        )
        .unwrap();

        assert_eq!(
            config,
            HardForkConfig {
                window_size: 4,
                default_threshold_percent: 50,
                forks: vec![ForkEntry::new(1, 0, 0, 0), ForkEntry::new(2, 2, 50, 1)],
                ..Default::default()
            }
        );
    }

    #[test]
    fn toml_unknown_fields_are_rejected() {
        assert!(toml::from_str::<HardForkConfig>("window = 4").is_err());
    }
}
