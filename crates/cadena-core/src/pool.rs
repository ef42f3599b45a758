//! Fixed-budget memory pools with allocation accounting.
//!
//! Targets with heterogeneous memory (tightly-coupled SRAM, internal RAM,
//! external SDRAM, DMA-capable regions) budget each region separately. The
//! engine models this as one ledger per [`PoolKind`]: every allocation is
//! charged against its pool's budget and fails cleanly when the budget is
//! exhausted, so placement bugs show up as allocation failures instead of
//! silent spills into the wrong region.
//!
//! Blocks are RAII: dropping a [`PoolBlock`] credits its bytes back. At
//! teardown [`MemoryPools::verify_all_returned`] turns any outstanding block
//! into a [`EngineError::LeakDetected`].

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::EngineError;

/// Memory region a block is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Tightly-coupled memory: fastest, smallest.
    Tcm,
    /// Internal SRAM.
    IntRam,
    /// External RAM.
    ExtRam,
    /// DMA-capable region.
    Dma,
}

impl PoolKind {
    /// All pools, in ledger order.
    pub const ALL: [Self; 4] = [Self::Tcm, Self::IntRam, Self::ExtRam, Self::Dma];

    const fn index(self) -> usize {
        match self {
            Self::Tcm => 0,
            Self::IntRam => 1,
            Self::ExtRam => 2,
            Self::Dma => 3,
        }
    }
}

/// Byte budgets for each pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBudgets {
    /// Budget for [`PoolKind::Tcm`].
    pub tcm: usize,
    /// Budget for [`PoolKind::IntRam`].
    pub int_ram: usize,
    /// Budget for [`PoolKind::ExtRam`].
    pub ext_ram: usize,
    /// Budget for [`PoolKind::Dma`].
    pub dma: usize,
}

impl Default for PoolBudgets {
    /// Budgets loosely modeled on a mid-range Cortex-M7 part.
    fn default() -> Self {
        Self { tcm: 64 * 1024, int_ram: 512 * 1024, ext_ram: 8 * 1024 * 1024, dma: 64 * 1024 }
    }
}

#[derive(Debug)]
struct PoolLedger {
    capacity: usize,
    used: AtomicUsize,
    blocks: AtomicUsize,
}

impl PoolLedger {
    fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self { capacity, used: AtomicUsize::new(0), blocks: AtomicUsize::new(0) })
    }
}

/// One ledger per [`PoolKind`]. Allocation is non-blocking and O(1).
#[derive(Debug, Clone)]
pub struct MemoryPools {
    ledgers: [Arc<PoolLedger>; 4],
}

impl MemoryPools {
    /// Creates pools with the given budgets.
    pub fn new(budgets: PoolBudgets) -> Self {
        Self {
            ledgers: [
                PoolLedger::new(budgets.tcm),
                PoolLedger::new(budgets.int_ram),
                PoolLedger::new(budgets.ext_ram),
                PoolLedger::new(budgets.dma),
            ],
        }
    }

    /// Allocates a zero-filled block from `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AllocationFailed`] when the request does not
    /// fit in the pool's remaining budget. The pool is left unchanged.
    pub fn allocate(&self, pool: PoolKind, bytes: usize) -> Result<PoolBlock, EngineError> {
        let ledger = &self.ledgers[pool.index()];
        let charged = ledger.used.fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
            let next = used.checked_add(bytes)?;
            (next <= ledger.capacity).then_some(next)
        });
        if charged.is_err() {
            return Err(EngineError::AllocationFailed { pool, requested: bytes });
        }
        ledger.blocks.fetch_add(1, Ordering::AcqRel);
        Ok(PoolBlock { data: vec![0; bytes], kind: pool, ledger: Arc::clone(ledger) })
    }

    /// Bytes currently checked out of `pool`.
    pub fn bytes_in_use(&self, pool: PoolKind) -> usize {
        self.ledgers[pool.index()].used.load(Ordering::Acquire)
    }

    /// Live blocks currently checked out of `pool`.
    pub fn blocks_in_use(&self, pool: PoolKind) -> usize {
        self.ledgers[pool.index()].blocks.load(Ordering::Acquire)
    }

    /// Remaining budget of `pool`.
    pub fn bytes_free(&self, pool: PoolKind) -> usize {
        let ledger = &self.ledgers[pool.index()];
        ledger.capacity - ledger.used.load(Ordering::Acquire)
    }

    /// Confirms every block has been returned.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LeakDetected`] naming the first pool with
    /// outstanding blocks.
    pub fn verify_all_returned(&self) -> Result<(), EngineError> {
        for pool in PoolKind::ALL {
            let blocks = self.blocks_in_use(pool);
            if blocks != 0 {
                return Err(EngineError::LeakDetected {
                    pool,
                    bytes: self.bytes_in_use(pool),
                    blocks,
                });
            }
        }
        Ok(())
    }
}

impl Default for MemoryPools {
    fn default() -> Self {
        Self::new(PoolBudgets::default())
    }
}

/// An owned block of pool memory. Dropping it returns the bytes.
#[derive(Debug)]
pub struct PoolBlock {
    data: Vec<u8>,
    kind: PoolKind,
    ledger: Arc<PoolLedger>,
}

impl PoolBlock {
    /// Pool this block was drawn from.
    pub fn kind(&self) -> PoolKind {
        self.kind
    }

    /// Block length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for zero-length blocks.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read access to the block.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Write access to the block.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrites the whole block with `byte`.
    pub fn fill(&mut self, byte: u8) {
        self.data.fill(byte);
    }
}

impl Drop for PoolBlock {
    fn drop(&mut self) {
        self.ledger.used.fetch_sub(self.data.len(), Ordering::AcqRel);
        self.ledger.blocks.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> MemoryPools {
        MemoryPools::new(PoolBudgets { tcm: 64, int_ram: 1024, ext_ram: 1024, dma: 0 })
    }

    #[test]
    fn allocation_charges_and_drop_credits() {
        let pools = tiny();
        let block = pools.allocate(PoolKind::IntRam, 100).unwrap();
        assert_eq!(pools.bytes_in_use(PoolKind::IntRam), 100);
        assert_eq!(pools.blocks_in_use(PoolKind::IntRam), 1);
        drop(block);
        assert_eq!(pools.bytes_in_use(PoolKind::IntRam), 0);
        assert!(pools.verify_all_returned().is_ok());
    }

    #[test]
    fn exhausted_pool_fails_cleanly() {
        let pools = tiny();
        let _keep = pools.allocate(PoolKind::Tcm, 60).unwrap();
        let err = pools.allocate(PoolKind::Tcm, 8).unwrap_err();
        assert_eq!(err, EngineError::AllocationFailed { pool: PoolKind::Tcm, requested: 8 });
        // failed request must not disturb the ledger
        assert_eq!(pools.bytes_in_use(PoolKind::Tcm), 60);
    }

    #[test]
    fn pools_are_independent() {
        let pools = tiny();
        assert!(pools.allocate(PoolKind::Dma, 1).is_err());
        let _a = pools.allocate(PoolKind::ExtRam, 1024).unwrap();
        assert!(pools.allocate(PoolKind::IntRam, 1024).is_ok());
    }

    #[test]
    fn leak_detection_names_the_pool() {
        let pools = tiny();
        let block = pools.allocate(PoolKind::ExtRam, 16).unwrap();
        let err = pools.verify_all_returned().unwrap_err();
        assert_eq!(err, EngineError::LeakDetected { pool: PoolKind::ExtRam, bytes: 16, blocks: 1 });
        drop(block);
        assert!(pools.verify_all_returned().is_ok());
    }

    #[test]
    fn zero_fill_on_allocation() {
        let pools = tiny();
        let block = pools.allocate(PoolKind::IntRam, 32).unwrap();
        assert!(block.bytes().iter().all(|&b| b == 0));
    }
}
