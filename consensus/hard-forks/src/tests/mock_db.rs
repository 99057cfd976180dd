use std::sync::{Arc, RwLock};

use crate::{BlockVersionInfo, HardForkDatabase, RuntimeError};

#[derive(Debug, Default)]
struct MockChain {
    blocks: Vec<BlockVersionInfo>,
    /// Not truncated when blocks are removed.
    versions: Vec<u8>,

    supports_batches: bool,
    batch_active: bool,
    batches_stopped: u64,
    batches_aborted: u64,

    fail_block_reads_from: Option<u64>,
}

/// An in-memory chain, clones share the same chain.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockDatabase {
    chain: Arc<RwLock<MockChain>>,
}

impl MockDatabase {
    /// A database that starts a batch on [`HardForkDatabase::batch_start`].
    pub(crate) fn with_batches() -> Self {
        let db = Self::default();
        db.chain.write().unwrap().supports_batches = true;
        db
    }

    pub(crate) fn add_block(&self, block: BlockVersionInfo) {
        self.chain.write().unwrap().blocks.push(block);
    }

    pub(crate) fn remove_block(&self) {
        self.chain.write().unwrap().blocks.pop();
    }

    /// Makes reading any block at or above `height` fail.
    pub(crate) fn fail_block_reads_from(&self, height: u64) {
        self.chain.write().unwrap().fail_block_reads_from = Some(height);
    }

    /// Returns the amount of (stopped, aborted) batches.
    pub(crate) fn batches(&self) -> (u64, u64) {
        let chain = self.chain.read().unwrap();
        (chain.batches_stopped, chain.batches_aborted)
    }
}

impl HardForkDatabase for MockDatabase {
    fn height(&self) -> Result<u64, RuntimeError> {
        Ok(u64::try_from(self.chain.read().unwrap().blocks.len()).unwrap())
    }

    fn block_version_info(&self, height: u64) -> Result<BlockVersionInfo, RuntimeError> {
        let chain = self.chain.read().unwrap();

        if chain.fail_block_reads_from.is_some_and(|h| height >= h) {
            return Err(RuntimeError::Unknown("block read failed".into()));
        }

        chain
            .blocks
            .get(usize::try_from(height).unwrap())
            .copied()
            .ok_or(RuntimeError::KeyNotFound)
    }

    fn hard_fork_version(&self, height: u64) -> Result<u8, RuntimeError> {
        self.chain
            .read()
            .unwrap()
            .versions
            .get(usize::try_from(height).unwrap())
            .copied()
            .ok_or(RuntimeError::KeyNotFound)
    }

    fn set_hard_fork_version(&self, height: u64, version: u8) -> Result<(), RuntimeError> {
        let height = usize::try_from(height).unwrap();
        let mut chain = self.chain.write().unwrap();

        if chain.versions.len() <= height {
            chain.versions.resize(height + 1, 0);
        }
        chain.versions[height] = version;
        Ok(())
    }

    fn batch_start(&self) -> Result<bool, RuntimeError> {
        let mut chain = self.chain.write().unwrap();
        if !chain.supports_batches || chain.batch_active {
            return Ok(false);
        }
        chain.batch_active = true;
        Ok(true)
    }

    fn batch_stop(&self) -> Result<(), RuntimeError> {
        let mut chain = self.chain.write().unwrap();
        chain.batch_active = false;
        chain.batches_stopped += 1;
        Ok(())
    }

    fn batch_abort(&self) -> Result<(), RuntimeError> {
        let mut chain = self.chain.write().unwrap();
        chain.batch_active = false;
        chain.batches_aborted += 1;
        Ok(())
    }
}
