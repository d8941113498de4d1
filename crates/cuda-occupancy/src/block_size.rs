//! Occupancy-maximizing block size search.

use crate::device::DeviceProperties;
use crate::error::{OccupancyError, Result};
use crate::kernel::KernelAttributes;
use crate::occupancy::max_active_blocks_per_multiprocessor;
use crate::state::DeviceState;

/// A launch geometry suggestion that maximizes occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PotentialBlockSize {
    /// Largest block size that reaches the best achievable occupancy.
    pub block_size: u32,
    /// Smallest grid size that fills every multiprocessor at that occupancy.
    pub min_grid_size: u32,
}

/// Find the block size that maximizes occupancy for a fixed dynamic shared
/// memory request.
///
/// When several block sizes tie on occupancy in threads, the largest wins.
///
/// # Errors
///
/// [`OccupancyError::InvalidInput`] when the descriptors are inconsistent or
/// no block size can launch at all,
/// [`OccupancyError::UnsupportedDevice`] for unknown compute capabilities.
pub fn max_potential_block_size(
    props: &DeviceProperties,
    attrs: &KernelAttributes,
    state: &DeviceState,
    dynamic_smem_bytes: usize,
) -> Result<PotentialBlockSize> {
    sweep(props, attrs, state, |_| dynamic_smem_bytes)
}

/// Find the block size that maximizes occupancy when the dynamic shared
/// memory request depends on the block size.
///
/// `smem_for_block` maps a candidate block size to the dynamic shared memory
/// request that launch would make, in bytes.
pub fn max_potential_block_size_with<F>(
    props: &DeviceProperties,
    attrs: &KernelAttributes,
    state: &DeviceState,
    smem_for_block: F,
) -> Result<PotentialBlockSize>
where
    F: Fn(u32) -> usize,
{
    sweep(props, attrs, state, smem_for_block)
}

fn sweep<F>(
    props: &DeviceProperties,
    attrs: &KernelAttributes,
    state: &DeviceState,
    smem_for_block: F,
) -> Result<PotentialBlockSize>
where
    F: Fn(u32) -> usize,
{
    props.validate()?;
    attrs.validate()?;

    let limit = attrs
        .max_threads_per_block
        .unwrap_or(props.max_threads_per_block)
        .min(props.max_threads_per_block);
    let granularity = props.warp_size;
    let capacity = props.max_threads_per_multiprocessor;

    let mut best_size = 0u32;
    let mut best_blocks = 0u32;
    let mut best_threads = 0u32;
    let mut last_err = None;

    // Candidates walk down from the limit at warp granularity; the limit
    // itself is tried first even when unaligned.
    let mut aligned = limit.div_ceil(granularity) * granularity;
    while aligned > 0 {
        let candidate = aligned.min(limit);
        aligned -= granularity;

        let result = match max_active_blocks_per_multiprocessor(
            props,
            attrs,
            state,
            candidate,
            smem_for_block(candidate),
        ) {
            Ok(result) => result,
            Err(err) => {
                // A candidate the kernel cannot launch at does not fail the
                // search.
                last_err = Some(err);
                continue;
            }
        };

        let threads = result
            .active_blocks_per_multiprocessor
            .saturating_mul(candidate);
        if threads > best_threads {
            best_threads = threads;
            best_blocks = result.active_blocks_per_multiprocessor;
            best_size = candidate;
        }
        // Nothing smaller can beat a fully occupied multiprocessor.
        if threads >= capacity {
            break;
        }
    }

    if best_threads == 0 {
        return Err(last_err.unwrap_or_else(|| {
            OccupancyError::invalid_input("no block size yields nonzero occupancy")
        }));
    }

    tracing::debug!(
        block_size = best_size,
        active_blocks = best_blocks,
        occupancy_threads = best_threads,
        "selected block size"
    );

    Ok(PotentialBlockSize {
        block_size: best_size,
        min_grid_size: best_blocks.saturating_mul(props.num_multiprocessors),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_occupancy_picks_capacity_divisor() {
        // A kernel with no resource use fills the multiprocessor exactly at
        // 768 threads per block on a 1536-thread part.
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new();
        let state = DeviceState::default();

        let best = max_potential_block_size(&device, &kernel, &state, 0).unwrap();
        assert_eq!(best.block_size, 768);
        assert_eq!(best.min_grid_size, 2 * device.num_multiprocessors);
    }

    #[test]
    fn test_register_bound_kernel_prefers_largest_tie() {
        // 59 registers per thread caps the multiprocessor at 32 warps; 1024
        // and 512 both reach 1024 resident threads, the larger block wins.
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new().with_num_regs(59);
        let state = DeviceState::default();

        let best = max_potential_block_size(&device, &kernel, &state, 0).unwrap();
        assert_eq!(best.block_size, 1024);
        assert_eq!(best.min_grid_size, device.num_multiprocessors);
    }

    #[test]
    fn test_kernel_thread_limit_caps_candidates() {
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new().with_max_threads_per_block(500);
        let state = DeviceState::default();

        let best = max_potential_block_size(&device, &kernel, &state, 0).unwrap();
        // The unaligned cap itself is a candidate: 500 threads at 3 blocks
        // beats every warp-aligned size below it.
        assert_eq!(best.block_size, 500);
        assert_eq!(best.min_grid_size, 3 * device.num_multiprocessors);
    }

    #[test]
    fn test_variable_smem_sweep() {
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new()
            .with_shmem_limit(crate::kernel::ShmemLimitConfig::Optin)
            .with_max_dynamic_smem_bytes(101376);
        let state = DeviceState::default();

        let best =
            max_potential_block_size_with(&device, &kernel, &state, |bs| bs as usize * 96)
                .unwrap();
        assert_eq!(best.block_size, 1024);
        assert_eq!(best.min_grid_size, device.num_multiprocessors);
    }

    #[test]
    fn test_unlaunchable_kernel_is_an_error() {
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new().with_num_regs(257);
        let state = DeviceState::default();

        assert!(max_potential_block_size(&device, &kernel, &state, 0).is_err());
    }

    #[test]
    fn test_brute_force_agreement() {
        // The sweep must agree with an exhaustive scan over warp-aligned
        // block sizes.
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new()
            .with_num_regs(40)
            .with_static_smem_bytes(8192);
        let state = DeviceState::default();

        let mut best_threads = 0;
        for bs in (32..=1024).step_by(32) {
            if let Ok(result) =
                max_active_blocks_per_multiprocessor(&device, &kernel, &state, bs, 0)
            {
                best_threads = best_threads.max(result.active_blocks_per_multiprocessor * bs);
            }
        }

        let best = max_potential_block_size(&device, &kernel, &state, 0).unwrap();
        let at_best =
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, best.block_size, 0)
                .unwrap();
        assert_eq!(
            at_best.active_blocks_per_multiprocessor * best.block_size,
            best_threads
        );
    }
}
