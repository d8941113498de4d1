//! Device capability descriptors.

use serde::{Deserialize, Serialize};

use crate::error::{OccupancyError, Result};

/// Hardware limits of one GPU model, as seen by the occupancy model.
///
/// One descriptor per physical GPU model; all fields are immutable once
/// constructed. The named constructors below cover common data-center and
/// workstation parts; fields are public so callers can describe any device
/// (for example, from a driver query crossing a process boundary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProperties {
    /// Compute capability major version.
    pub compute_major: u32,
    /// Compute capability minor version.
    pub compute_minor: u32,
    /// Maximum threads in a single block.
    pub max_threads_per_block: u32,
    /// Maximum resident threads on one multiprocessor.
    pub max_threads_per_multiprocessor: u32,
    /// Registers available to a single block.
    pub regs_per_block: u32,
    /// Registers available on one multiprocessor.
    pub regs_per_multiprocessor: u32,
    /// Threads per warp.
    pub warp_size: u32,
    /// Shared memory available to a block under the default limit, in bytes.
    pub shared_mem_per_block: usize,
    /// Shared memory on one multiprocessor, in bytes.
    pub shared_mem_per_multiprocessor: usize,
    /// Number of multiprocessors on the device.
    pub num_multiprocessors: u32,
    /// Shared memory available to a block that opts in to the extended
    /// limit, in bytes. At least `shared_mem_per_block`.
    pub shared_mem_per_block_optin: usize,
    /// Shared memory the driver reserves out of every block, in bytes.
    pub reserved_shared_mem_per_block: usize,
}

impl DeviceProperties {
    /// Tesla V100 (Volta, compute capability 7.0).
    #[must_use]
    pub fn sm70() -> Self {
        Self {
            compute_major: 7,
            compute_minor: 0,
            max_threads_per_block: 1024,
            max_threads_per_multiprocessor: 2048,
            regs_per_block: 65536,
            regs_per_multiprocessor: 65536,
            warp_size: 32,
            shared_mem_per_block: 49152,
            shared_mem_per_multiprocessor: 98304,
            num_multiprocessors: 80,
            shared_mem_per_block_optin: 98304,
            reserved_shared_mem_per_block: 0,
        }
    }

    /// Tesla T4 (Turing, compute capability 7.5).
    #[must_use]
    pub fn sm75() -> Self {
        Self {
            compute_major: 7,
            compute_minor: 5,
            max_threads_per_block: 1024,
            max_threads_per_multiprocessor: 1024,
            regs_per_block: 65536,
            regs_per_multiprocessor: 65536,
            warp_size: 32,
            shared_mem_per_block: 49152,
            shared_mem_per_multiprocessor: 65536,
            num_multiprocessors: 40,
            shared_mem_per_block_optin: 65536,
            reserved_shared_mem_per_block: 0,
        }
    }

    /// A100 (Ampere GA100, compute capability 8.0).
    #[must_use]
    pub fn sm80() -> Self {
        Self {
            compute_major: 8,
            compute_minor: 0,
            max_threads_per_block: 1024,
            max_threads_per_multiprocessor: 2048,
            regs_per_block: 65536,
            regs_per_multiprocessor: 65536,
            warp_size: 32,
            shared_mem_per_block: 49152,
            shared_mem_per_multiprocessor: 167936,
            num_multiprocessors: 108,
            shared_mem_per_block_optin: 166912,
            reserved_shared_mem_per_block: 1024,
        }
    }

    /// RTX A2000 (Ampere GA106, compute capability 8.6).
    #[must_use]
    pub fn sm86() -> Self {
        Self {
            compute_major: 8,
            compute_minor: 6,
            max_threads_per_block: 1024,
            max_threads_per_multiprocessor: 1536,
            regs_per_block: 65536,
            regs_per_multiprocessor: 65536,
            warp_size: 32,
            shared_mem_per_block: 49152,
            shared_mem_per_multiprocessor: 102400,
            num_multiprocessors: 26,
            shared_mem_per_block_optin: 101376,
            reserved_shared_mem_per_block: 1024,
        }
    }

    /// RTX 4090 (Ada Lovelace, compute capability 8.9).
    #[must_use]
    pub fn sm89() -> Self {
        Self {
            compute_major: 8,
            compute_minor: 9,
            max_threads_per_block: 1024,
            max_threads_per_multiprocessor: 1536,
            regs_per_block: 65536,
            regs_per_multiprocessor: 65536,
            warp_size: 32,
            shared_mem_per_block: 49152,
            shared_mem_per_multiprocessor: 102400,
            num_multiprocessors: 128,
            shared_mem_per_block_optin: 101376,
            reserved_shared_mem_per_block: 1024,
        }
    }

    /// H100 SXM (Hopper, compute capability 9.0).
    #[must_use]
    pub fn sm90() -> Self {
        Self {
            compute_major: 9,
            compute_minor: 0,
            max_threads_per_block: 1024,
            max_threads_per_multiprocessor: 2048,
            regs_per_block: 65536,
            regs_per_multiprocessor: 65536,
            warp_size: 32,
            shared_mem_per_block: 49152,
            shared_mem_per_multiprocessor: 233472,
            num_multiprocessors: 132,
            shared_mem_per_block_optin: 232448,
            reserved_shared_mem_per_block: 1024,
        }
    }

    /// Compute capability as a (major, minor) pair.
    #[must_use]
    pub fn compute_capability(&self) -> (u32, u32) {
        (self.compute_major, self.compute_minor)
    }

    /// Maximum resident warps on one multiprocessor.
    #[must_use]
    pub fn max_warps_per_multiprocessor(&self) -> u32 {
        self.max_threads_per_multiprocessor / self.warp_size
    }

    /// Verify the descriptor is internally consistent.
    ///
    /// Every count must be positive, the opt-in shared memory limit must not
    /// be below the default limit, and the multiprocessor thread capacity
    /// must be warp-granular.
    pub fn validate(&self) -> Result<()> {
        if self.max_threads_per_block == 0
            || self.max_threads_per_multiprocessor == 0
            || self.regs_per_block == 0
            || self.regs_per_multiprocessor == 0
            || self.warp_size == 0
            || self.shared_mem_per_block == 0
            || self.shared_mem_per_multiprocessor == 0
            || self.num_multiprocessors == 0
        {
            return Err(OccupancyError::invalid_input(
                "device limits must all be positive",
            ));
        }
        if self.shared_mem_per_block_optin < self.shared_mem_per_block {
            return Err(OccupancyError::invalid_input(
                "opt-in shared memory limit below the default per-block limit",
            ));
        }
        if self.max_threads_per_multiprocessor % self.warp_size != 0 {
            return Err(OccupancyError::invalid_input(
                "multiprocessor thread capacity is not a multiple of the warp size",
            ));
        }
        Ok(())
    }
}
