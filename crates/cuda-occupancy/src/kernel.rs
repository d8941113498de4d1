//! Kernel resource descriptors.

use serde::{Deserialize, Serialize};

use crate::error::{OccupancyError, Result};

/// Partitioned global cache preference of a kernel.
///
/// When the cache partition is reserved per block (`On`/`OnStrict`), a block
/// is confined to half of the multiprocessor's warp and register resources.
/// `On` falls back to `Off` when the partition cannot fit a single block;
/// `OnStrict` never falls back. Ignored on architectures without partitioned
/// global caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PartitionedGcConfig {
    /// Partitioned global caching disabled.
    #[default]
    Off,
    /// Partitioned global caching preferred, with automatic fallback.
    On,
    /// Partitioned global caching required.
    OnStrict,
}

/// Which per-block shared memory cap applies to a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShmemLimitConfig {
    /// The device's default per-block shared memory limit.
    #[default]
    Default,
    /// The kernel opted in to the extended per-block shared memory limit.
    Optin,
}

/// Per-block resource requirements of one compiled kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelAttributes {
    /// Largest block the kernel supports, `None` for unlimited.
    pub max_threads_per_block: Option<u32>,
    /// Registers used per thread.
    pub num_regs: u32,
    /// Static shared memory required per block, in bytes.
    pub static_smem_bytes: usize,
    /// Partitioned global cache preference.
    pub partitioned_gc: PartitionedGcConfig,
    /// Which per-block shared memory cap applies.
    pub shmem_limit: ShmemLimitConfig,
    /// Largest dynamic shared memory request the kernel declares, in bytes.
    pub max_dynamic_smem_bytes: usize,
    /// Hardware block barriers consumed per block. Only meaningful on
    /// architectures with block-level barrier resources.
    pub num_block_barriers: u32,
}

impl Default for KernelAttributes {
    fn default() -> Self {
        Self {
            max_threads_per_block: None,
            num_regs: 0,
            static_smem_bytes: 0,
            partitioned_gc: PartitionedGcConfig::Off,
            shmem_limit: ShmemLimitConfig::Default,
            max_dynamic_smem_bytes: 0,
            num_block_barriers: 0,
        }
    }
}

impl KernelAttributes {
    /// Creates an empty descriptor: no resource use, unlimited block size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to cap the block size the kernel supports.
    #[must_use]
    pub fn with_max_threads_per_block(mut self, max: u32) -> Self {
        self.max_threads_per_block = Some(max);
        self
    }

    /// Builder method to set registers per thread.
    #[must_use]
    pub fn with_num_regs(mut self, regs: u32) -> Self {
        self.num_regs = regs;
        self
    }

    /// Builder method to set static shared memory per block.
    #[must_use]
    pub fn with_static_smem_bytes(mut self, bytes: usize) -> Self {
        self.static_smem_bytes = bytes;
        self
    }

    /// Builder method to set the partitioned global cache preference.
    #[must_use]
    pub fn with_partitioned_gc(mut self, config: PartitionedGcConfig) -> Self {
        self.partitioned_gc = config;
        self
    }

    /// Builder method to select the per-block shared memory cap.
    #[must_use]
    pub fn with_shmem_limit(mut self, config: ShmemLimitConfig) -> Self {
        self.shmem_limit = config;
        self
    }

    /// Builder method to declare the largest dynamic shared memory request.
    #[must_use]
    pub fn with_max_dynamic_smem_bytes(mut self, bytes: usize) -> Self {
        self.max_dynamic_smem_bytes = bytes;
        self
    }

    /// Builder method to set hardware block barriers consumed per block.
    #[must_use]
    pub fn with_block_barriers(mut self, barriers: u32) -> Self {
        self.num_block_barriers = barriers;
        self
    }

    /// Verify the descriptor is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.max_threads_per_block == Some(0) {
            return Err(OccupancyError::invalid_input(
                "kernel block size limit must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let attrs = KernelAttributes::new()
            .with_num_regs(59)
            .with_static_smem_bytes(4096)
            .with_max_dynamic_smem_bytes(32768)
            .with_shmem_limit(ShmemLimitConfig::Optin)
            .with_block_barriers(1);

        assert_eq!(attrs.num_regs, 59);
        assert_eq!(attrs.static_smem_bytes, 4096);
        assert_eq!(attrs.max_dynamic_smem_bytes, 32768);
        assert_eq!(attrs.shmem_limit, ShmemLimitConfig::Optin);
        assert_eq!(attrs.num_block_barriers, 1);
        assert_eq!(attrs.max_threads_per_block, None);
        attrs.validate().unwrap();
    }

    #[test]
    fn test_zero_block_size_limit_rejected() {
        let attrs = KernelAttributes::new().with_max_threads_per_block(0);
        assert!(attrs.validate().is_err());
    }
}
