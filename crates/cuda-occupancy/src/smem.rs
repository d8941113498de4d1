//! Dynamic shared memory headroom queries.

use crate::arch::ArchLimits;
use crate::device::DeviceProperties;
use crate::error::{OccupancyError, Result};
use crate::kernel::KernelAttributes;
use crate::occupancy::{
    max_active_blocks_per_multiprocessor, smem_per_block_limit, smem_per_multiprocessor,
};
use crate::state::DeviceState;

/// Largest dynamic shared memory request, in bytes, that still allows
/// `num_blocks` blocks of `block_size` threads to reside on one
/// multiprocessor.
///
/// The result respects the kernel's declared dynamic maximum, so launching
/// with exactly the returned amount reaches at least `num_blocks` active
/// blocks.
///
/// # Errors
///
/// [`OccupancyError::InvalidInput`] when `num_blocks` is zero or not
/// achievable at `block_size` even with no dynamic shared memory, plus the
/// argument errors of [`max_active_blocks_per_multiprocessor`].
pub fn available_dynamic_smem_per_block(
    props: &DeviceProperties,
    attrs: &KernelAttributes,
    state: &DeviceState,
    num_blocks: u32,
    block_size: u32,
) -> Result<usize> {
    if num_blocks == 0 {
        return Err(OccupancyError::invalid_input("block count must be positive"));
    }
    // The other resources must already admit the requested residency.
    let at_zero = max_active_blocks_per_multiprocessor(props, attrs, state, block_size, 0)?;
    let arch = ArchLimits::for_device(props)?;
    if at_zero.active_blocks_per_multiprocessor < num_blocks {
        return Err(OccupancyError::invalid_input(format!(
            "{num_blocks} blocks of {block_size} threads exceed the device's capacity of {}",
            at_zero.active_blocks_per_multiprocessor
        )));
    }

    let static_bytes = attrs
        .static_smem_bytes
        .saturating_add(props.reserved_shared_mem_per_block);
    let max_usage = static_bytes.saturating_add(attrs.max_dynamic_smem_bytes);
    let per_block_cap = smem_per_block_limit(props, attrs.shmem_limit, max_usage)?;

    let budget = if props.compute_major >= 7 {
        if num_blocks == 1 {
            // A single block can raise the carve-out to whatever it needs,
            // up to the per-block cap.
            per_block_cap
        } else {
            match smem_per_multiprocessor(props, &arch, state)? {
                // An all-L1 carve-out still yields the smallest shared
                // memory configuration once a kernel asks for any.
                0 => arch.align_up_carveout(1),
                preference => preference,
            }
        }
    } else {
        smem_per_multiprocessor(props, &arch, state)?
    };

    let share = (budget / num_blocks as usize).min(per_block_cap);
    let share = share / arch.smem_alloc_granularity * arch.smem_alloc_granularity;
    Ok(share
        .saturating_sub(static_bytes)
        .min(attrs.max_dynamic_smem_bytes))
}
