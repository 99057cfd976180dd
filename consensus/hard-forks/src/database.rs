//! The storage capability the tracker runs on.
//!
//! The tracker never owns blocks, it reads versions and votes from a [`HardForkDatabase`]
//! and writes back the version it decided on for each height.

//---------------------------------------------------------------------------------------------------- Import
use std::sync::Arc;

use tracing::error;

use crate::{BlockVersionInfo, RuntimeError};

//---------------------------------------------------------------------------------------------------- HardForkDatabase
/// Read and write access to the parts of the chain the tracker needs.
///
/// Every method takes `&self`, implementations that write must use interior mutability.
pub trait HardForkDatabase {
    /// The amount of blocks in the chain, i.e. the height of the next block.
    fn height(&self) -> Result<u64, RuntimeError>;

    /// The version and vote of the block at `height`.
    fn block_version_info(&self, height: u64) -> Result<BlockVersionInfo, RuntimeError>;

    /// The hard-fork version stored for `height`.
    fn hard_fork_version(&self, height: u64) -> Result<u8, RuntimeError>;

    /// Store the hard-fork version for `height`.
    fn set_hard_fork_version(&self, height: u64, version: u8) -> Result<(), RuntimeError>;

    /// Start a batch of writes.
    ///
    /// Returns `true` if a batch was started by this call and must be stopped by the caller,
    /// `false` if batches are not supported or one is already running.
    fn batch_start(&self) -> Result<bool, RuntimeError> {
        Ok(false)
    }

    /// Commit the batch started with [`HardForkDatabase::batch_start`].
    fn batch_stop(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Discard the batch started with [`HardForkDatabase::batch_start`].
    fn batch_abort(&self) -> Result<(), RuntimeError> {
        Ok(())
    }
}

impl<T: HardForkDatabase + ?Sized> HardForkDatabase for &T {
    fn height(&self) -> Result<u64, RuntimeError> {
        (**self).height()
    }

    fn block_version_info(&self, height: u64) -> Result<BlockVersionInfo, RuntimeError> {
        (**self).block_version_info(height)
    }

    fn hard_fork_version(&self, height: u64) -> Result<u8, RuntimeError> {
        (**self).hard_fork_version(height)
    }

    fn set_hard_fork_version(&self, height: u64, version: u8) -> Result<(), RuntimeError> {
        (**self).set_hard_fork_version(height, version)
    }

    fn batch_start(&self) -> Result<bool, RuntimeError> {
        (**self).batch_start()
    }

    fn batch_stop(&self) -> Result<(), RuntimeError> {
        (**self).batch_stop()
    }

    fn batch_abort(&self) -> Result<(), RuntimeError> {
        (**self).batch_abort()
    }
}

impl<T: HardForkDatabase + ?Sized> HardForkDatabase for Arc<T> {
    fn height(&self) -> Result<u64, RuntimeError> {
        (**self).height()
    }

    fn block_version_info(&self, height: u64) -> Result<BlockVersionInfo, RuntimeError> {
        (**self).block_version_info(height)
    }

    fn hard_fork_version(&self, height: u64) -> Result<u8, RuntimeError> {
        (**self).hard_fork_version(height)
    }

    fn set_hard_fork_version(&self, height: u64, version: u8) -> Result<(), RuntimeError> {
        (**self).set_hard_fork_version(height, version)
    }

    fn batch_start(&self) -> Result<bool, RuntimeError> {
        (**self).batch_start()
    }

    fn batch_stop(&self) -> Result<(), RuntimeError> {
        (**self).batch_stop()
    }

    fn batch_abort(&self) -> Result<(), RuntimeError> {
        (**self).batch_abort()
    }
}

//---------------------------------------------------------------------------------------------------- BatchGuard
/// A write batch that is aborted when dropped, unless [`BatchGuard::commit`] was called.
///
/// If the database did not start a batch for us, committing and dropping do nothing.
#[must_use = "dropping the guard aborts the batch"]
pub struct BatchGuard<'a, D: HardForkDatabase + ?Sized> {
    db: &'a D,
    active: bool,
}

impl<'a, D: HardForkDatabase + ?Sized> BatchGuard<'a, D> {
    /// Start a batch on `db`.
    pub fn start(db: &'a D) -> Result<Self, RuntimeError> {
        let active = db.batch_start()?;
        Ok(Self { db, active })
    }

    /// Returns `true` if this guard owns a running batch.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Commit the batch.
    ///
    /// If the commit fails the batch is aborted.
    pub fn commit(mut self) -> Result<(), RuntimeError> {
        if self.active {
            self.db.batch_stop()?;
            self.active = false;
        }
        Ok(())
    }
}

impl<D: HardForkDatabase + ?Sized> Drop for BatchGuard<'_, D> {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.db.batch_abort() {
                error!("Failed to abort database batch: {e}");
            }
        }
    }
}
