//! The hard-fork fields of a block header.

/// The version and vote of a block.
///
/// ref: <https://monero-book.cuprate.org/consensus_rules/hardforks.html#blocks-version-and-vote>
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
pub struct BlockVersionInfo {
    /// The block's `major_version`.
    pub major_version: u8,
    /// The block's `minor_version`.
    pub minor_version: u8,
}

impl BlockVersionInfo {
    /// Create a new [`BlockVersionInfo`] from the header fields.
    pub const fn new(major_version: u8, minor_version: u8) -> Self {
        Self {
            major_version,
            minor_version,
        }
    }

    /// The hard-fork version this block claims to follow.
    pub const fn version(&self) -> u8 {
        self.major_version
    }

    /// The version this block votes for.
    ///
    /// Blocks before voting existed have a `minor_version` of `0`, that is a vote for version `1`.
    pub const fn vote(&self) -> u8 {
        match self.minor_version {
            0 => 1,
            vote => vote,
        }
    }
}
