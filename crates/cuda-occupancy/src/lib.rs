//! # CUDA Occupancy
//!
//! A pure-Rust model of CUDA kernel launch occupancy: how many thread
//! blocks of a given size can reside concurrently on one streaming
//! multiprocessor, which hardware resource caps that number, and which
//! launch geometry maximizes it.
//!
//! No driver and no GPU are involved. Every query is a pure function of
//! three descriptors, so the same questions can be answered off-target, in
//! build pipelines, or for hardware the host does not have.
//!
//! ## Core Abstractions
//!
//! - [`DeviceProperties`] - Static resource limits of one GPU model
//! - [`KernelAttributes`] - Per-block resource demands of a compiled kernel
//! - [`DeviceState`] - Cache and carve-out preferences that shift the
//!   shared memory budget
//! - [`max_active_blocks_per_multiprocessor`] - The occupancy query itself
//! - [`max_potential_block_size`] - Occupancy-maximizing launch geometry
//! - [`available_dynamic_smem_per_block`] - Dynamic shared memory headroom
//!
//! ## Example
//!
//! ```
//! use cuda_occupancy::prelude::*;
//!
//! let device = DeviceProperties::sm86();
//! let kernel = KernelAttributes::new().with_num_regs(59);
//! let state = DeviceState::default();
//!
//! let result =
//!     max_active_blocks_per_multiprocessor(&device, &kernel, &state, 256, 0)?;
//! assert_eq!(result.active_blocks_per_multiprocessor, 4);
//! assert!(result.limiting_factors.contains(LimitingFactors::REGISTERS));
//! # Ok::<(), cuda_occupancy::OccupancyError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arch;
pub mod block_size;
pub mod device;
pub mod error;
pub mod kernel;
pub mod occupancy;
pub mod result;
pub mod smem;
pub mod state;

pub use arch::{smem_allocation_granularity, ArchLimits};
pub use block_size::{max_potential_block_size, max_potential_block_size_with, PotentialBlockSize};
pub use device::DeviceProperties;
pub use error::{OccupancyError, Result};
pub use kernel::{KernelAttributes, PartitionedGcConfig, ShmemLimitConfig};
pub use occupancy::max_active_blocks_per_multiprocessor;
pub use result::{LimitingFactors, OccupancyResult, UNLIMITED};
pub use smem::available_dynamic_smem_per_block;
pub use state::{CacheConfig, CarveoutConfig, DeviceState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::arch::{smem_allocation_granularity, ArchLimits};
    pub use crate::block_size::{
        max_potential_block_size, max_potential_block_size_with, PotentialBlockSize,
    };
    pub use crate::device::DeviceProperties;
    pub use crate::error::{OccupancyError, Result};
    pub use crate::kernel::{KernelAttributes, PartitionedGcConfig, ShmemLimitConfig};
    pub use crate::occupancy::max_active_blocks_per_multiprocessor;
    pub use crate::result::{LimitingFactors, OccupancyResult, UNLIMITED};
    pub use crate::smem::available_dynamic_smem_per_block;
    pub use crate::state::{CacheConfig, CarveoutConfig, DeviceState};
}
