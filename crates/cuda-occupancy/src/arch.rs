//! Per-generation architecture constants.
//!
//! The occupancy model depends on a handful of constants that are properties
//! of the compute capability generation, not of the kernel: allocation
//! granularities, the fixed resident-block ceiling, the register file
//! sub-partition layout, and the supported shared memory carve-out sizes.
//! These are lookup data calibrated against NVIDIA's published occupancy
//! model, kept in one table so that a new generation is a new entry rather
//! than another scattered conditional.

use crate::device::DeviceProperties;
use crate::error::{OccupancyError, Result};

const KB: usize = 1024;

/// Carve-out sizes supported by Volta and the embedded Volta variant (7.0, 7.2).
const CARVEOUT_VOLTA: &[usize] = &[0, 8 * KB, 16 * KB, 32 * KB, 64 * KB, 96 * KB];

/// Carve-out sizes supported by Turing (7.5).
const CARVEOUT_TURING: &[usize] = &[32 * KB, 64 * KB];

/// Carve-out sizes supported by GA100-class parts (8.0, 8.7).
const CARVEOUT_GA100: &[usize] = &[
    0,
    8 * KB,
    16 * KB,
    32 * KB,
    64 * KB,
    100 * KB,
    132 * KB,
    164 * KB,
];

/// Carve-out sizes supported by GA10x and Ada parts (8.6, 8.9).
const CARVEOUT_GA10X: &[usize] = &[0, 8 * KB, 16 * KB, 32 * KB, 64 * KB, 100 * KB];

/// Carve-out sizes supported by Hopper (9.0).
const CARVEOUT_HOPPER: &[usize] = &[
    0,
    8 * KB,
    16 * KB,
    32 * KB,
    64 * KB,
    100 * KB,
    132 * KB,
    164 * KB,
    196 * KB,
    228 * KB,
];

/// Resource model constants for one compute capability generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchLimits {
    /// Quantum a block's shared memory reservation is rounded up to, bytes.
    pub smem_alloc_granularity: usize,
    /// Quantum a warp's register reservation is rounded up to, registers.
    pub reg_alloc_granularity: u32,
    /// Largest per-thread register count the generation can allocate.
    pub max_regs_per_thread: u32,
    /// Register file sub-partitions per multiprocessor.
    pub sub_partitions: u32,
    /// Fixed ceiling on resident blocks per multiprocessor.
    pub max_blocks_per_multiprocessor: u32,
    /// Whether partitioned global caching can be enabled.
    pub partitioned_gc_supported: bool,
    /// Carve-out sizes the unified cache supports, ascending; empty on
    /// generations with dedicated shared memory.
    pub carveout_steps: &'static [usize],
    /// Hardware block barriers per multiprocessor; zero when the generation
    /// has no block-level barrier resources.
    pub block_barrier_budget: u32,
}

impl ArchLimits {
    /// Look up the resource model for a compute capability.
    ///
    /// Fails with [`OccupancyError::UnsupportedDevice`] when the generation
    /// has no entry.
    pub fn lookup(major: u32, minor: u32) -> Result<Self> {
        let limits = match major {
            3 => Self {
                smem_alloc_granularity: 256,
                reg_alloc_granularity: 256,
                max_regs_per_thread: 255,
                sub_partitions: 4,
                max_blocks_per_multiprocessor: 16,
                partitioned_gc_supported: false,
                carveout_steps: &[],
                block_barrier_budget: 0,
            },
            5 => Self {
                smem_alloc_granularity: 256,
                reg_alloc_granularity: 256,
                max_regs_per_thread: 255,
                sub_partitions: 4,
                max_blocks_per_multiprocessor: 32,
                partitioned_gc_supported: minor == 2 || minor == 3,
                carveout_steps: &[],
                block_barrier_budget: 0,
            },
            6 => Self {
                smem_alloc_granularity: 256,
                reg_alloc_granularity: 256,
                max_regs_per_thread: 255,
                // GP100 pairs its register banks differently from GP10x.
                sub_partitions: if minor == 0 { 2 } else { 4 },
                max_blocks_per_multiprocessor: 32,
                partitioned_gc_supported: minor != 0,
                carveout_steps: &[],
                block_barrier_budget: 0,
            },
            7 => Self {
                smem_alloc_granularity: 128,
                reg_alloc_granularity: 256,
                max_regs_per_thread: 256,
                sub_partitions: 4,
                max_blocks_per_multiprocessor: if minor == 5 { 16 } else { 32 },
                partitioned_gc_supported: false,
                carveout_steps: if minor == 5 {
                    CARVEOUT_TURING
                } else {
                    CARVEOUT_VOLTA
                },
                block_barrier_budget: 0,
            },
            8 => Self {
                smem_alloc_granularity: 128,
                reg_alloc_granularity: 256,
                max_regs_per_thread: 256,
                sub_partitions: 4,
                max_blocks_per_multiprocessor: match minor {
                    0 => 32,
                    9 => 24,
                    _ => 16,
                },
                partitioned_gc_supported: false,
                carveout_steps: if minor == 0 || minor == 7 {
                    CARVEOUT_GA100
                } else {
                    CARVEOUT_GA10X
                },
                block_barrier_budget: 0,
            },
            9 => Self {
                smem_alloc_granularity: 128,
                reg_alloc_granularity: 256,
                max_regs_per_thread: 256,
                sub_partitions: 4,
                max_blocks_per_multiprocessor: 32,
                partitioned_gc_supported: false,
                carveout_steps: CARVEOUT_HOPPER,
                // Two barriers per block slot.
                block_barrier_budget: 64,
            },
            _ => return Err(OccupancyError::unsupported(major, minor)),
        };
        Ok(limits)
    }

    /// Look up the resource model for a device descriptor.
    pub fn for_device(props: &DeviceProperties) -> Result<Self> {
        Self::lookup(props.compute_major, props.compute_minor)
    }

    /// Round a shared memory size up to the next supported carve-out size.
    ///
    /// Sizes above the largest step saturate at the largest step. On
    /// generations with dedicated shared memory the size passes through
    /// unchanged.
    #[must_use]
    pub fn align_up_carveout(&self, bytes: usize) -> usize {
        match self.carveout_steps.iter().find(|&&step| bytes <= step) {
            Some(&step) => step,
            None => self.carveout_steps.last().copied().unwrap_or(bytes),
        }
    }
}

/// Shared memory allocation granularity of a device, in bytes.
///
/// Every block's shared memory reservation is rounded up to a multiple of
/// this quantum before it is counted against the multiprocessor's budget.
///
/// # Errors
///
/// [`OccupancyError::InvalidInput`] for an inconsistent descriptor,
/// [`OccupancyError::UnsupportedDevice`] for an unknown compute capability.
pub fn smem_allocation_granularity(props: &DeviceProperties) -> Result<usize> {
    props.validate()?;
    Ok(ArchLimits::for_device(props)?.smem_alloc_granularity)
}
