//! Active-block limit calculation.
//!
//! The maximum number of blocks that can reside on one multiprocessor is the
//! minimum of five independent per-resource ceilings: warp slots, the
//! register file, shared memory, the fixed resident-block ceiling, and (on
//! architectures that have them) hardware block barriers. Every ceiling that
//! ties the minimum is reported in the limiting-factor set.

use crate::arch::ArchLimits;
use crate::device::DeviceProperties;
use crate::error::{OccupancyError, Result};
use crate::kernel::{KernelAttributes, PartitionedGcConfig, ShmemLimitConfig};
use crate::result::{LimitingFactors, OccupancyResult, UNLIMITED};
use crate::state::DeviceState;

/// Round `value` up to a multiple of `quantum`, saturating on overflow.
pub(crate) fn round_up_u32(value: u32, quantum: u32) -> u32 {
    debug_assert!(quantum > 0);
    value.div_ceil(quantum).saturating_mul(quantum)
}

/// Round `value` up to a multiple of `quantum`, saturating on overflow.
pub(crate) fn round_up_usize(value: usize, quantum: usize) -> usize {
    debug_assert!(quantum > 0);
    value.div_ceil(quantum).saturating_mul(quantum)
}

/// Compute the maximum number of concurrently resident blocks per
/// multiprocessor for one launch configuration.
///
/// `block_size` must be positive and within both the device's and the
/// kernel's per-block thread maximum; `dynamic_smem_bytes` must not exceed
/// the kernel's declared maximum. The query is a pure function of its
/// arguments.
///
/// # Errors
///
/// [`OccupancyError::InvalidInput`] on out-of-range arguments or
/// inconsistent descriptors, [`OccupancyError::UnsupportedDevice`] when the
/// compute capability has no resource model.
pub fn max_active_blocks_per_multiprocessor(
    props: &DeviceProperties,
    attrs: &KernelAttributes,
    state: &DeviceState,
    block_size: u32,
    dynamic_smem_bytes: usize,
) -> Result<OccupancyResult> {
    props.validate()?;
    attrs.validate()?;
    let arch = ArchLimits::for_device(props)?;

    if block_size == 0 {
        return Err(OccupancyError::invalid_input("block size must be positive"));
    }
    if block_size > props.max_threads_per_block {
        return Err(OccupancyError::invalid_input(format!(
            "block size {} exceeds device limit of {} threads per block",
            block_size, props.max_threads_per_block
        )));
    }
    if let Some(kernel_max) = attrs.max_threads_per_block {
        if block_size > kernel_max {
            return Err(OccupancyError::invalid_input(format!(
                "block size {block_size} exceeds kernel limit of {kernel_max} threads per block"
            )));
        }
    }
    if dynamic_smem_bytes > attrs.max_dynamic_smem_bytes {
        return Err(OccupancyError::invalid_input(format!(
            "dynamic shared memory request of {} bytes exceeds the kernel's declared maximum of {}",
            dynamic_smem_bytes, attrs.max_dynamic_smem_bytes
        )));
    }

    let mut gc = if arch.partitioned_gc_supported {
        attrs.partitioned_gc
    } else {
        PartitionedGcConfig::Off
    };

    let (mut limit_regs, allocated_regs) =
        register_ceiling(&arch, props, attrs, block_size, &mut gc);

    // A register-limited kernel that fits GP100 but not the GP10x register
    // bank layout is rejected on both, to keep launches portable within the
    // Pascal family.
    if props.compute_major == 6 && props.compute_minor == 0 && limit_regs != 0 {
        let gp10x = ArchLimits::lookup(6, 1)?;
        let mut gc_gp10x = gc;
        let (limit_gp10x, _) = register_ceiling(&gp10x, props, attrs, block_size, &mut gc_gp10x);
        if limit_gp10x == 0 {
            limit_regs = 0;
        }
    }

    let limit_warps = warp_ceiling(props, block_size, gc);
    let limit_blocks = arch.max_blocks_per_multiprocessor;
    let (limit_smem, allocated_smem) =
        smem_ceiling(&arch, props, attrs, state, dynamic_smem_bytes)?;
    let limit_barriers = barrier_ceiling(&arch, attrs);

    let active = limit_warps
        .min(limit_regs)
        .min(limit_smem)
        .min(limit_blocks)
        .min(limit_barriers);

    let mut limiting = LimitingFactors::empty();
    if active == limit_warps {
        limiting.insert(LimitingFactors::WARPS);
    }
    if active == limit_regs {
        limiting.insert(LimitingFactors::REGISTERS);
    }
    if active == limit_smem {
        limiting.insert(LimitingFactors::SHARED_MEMORY);
    }
    if active == limit_blocks {
        limiting.insert(LimitingFactors::BLOCKS);
    }
    if active == limit_barriers {
        limiting.insert(LimitingFactors::BARRIERS);
    }
    debug_assert!(!limiting.is_empty());

    tracing::trace!(
        block_size,
        warps = limit_warps,
        regs = limit_regs,
        smem = limit_smem,
        blocks = limit_blocks,
        barriers = limit_barriers,
        active,
        "per-resource block ceilings"
    );

    Ok(OccupancyResult {
        active_blocks_per_multiprocessor: active,
        limiting_factors: limiting,
        block_limit_regs: limit_regs,
        block_limit_shared_mem: limit_smem,
        block_limit_warps: limit_warps,
        block_limit_blocks: limit_blocks,
        block_limit_barriers: limit_barriers,
        allocated_regs_per_block: allocated_regs,
        allocated_smem_per_block: allocated_smem,
        partitioned_gc: gc,
    })
}

/// Register ceiling and the per-block register allocation.
///
/// Registers are allocated per warp, rounded up to the allocation
/// granularity, and served out of the multiprocessor's sub-partitions. With
/// partitioned global caching a block is confined to half the
/// sub-partitions; `On` (but not `OnStrict`) falls back to `Off` when the
/// half cannot fit a single block.
fn register_ceiling(
    arch: &ArchLimits,
    props: &DeviceProperties,
    attrs: &KernelAttributes,
    block_size: u32,
    gc: &mut PartitionedGcConfig,
) -> (u32, u32) {
    if attrs.num_regs > arch.max_regs_per_thread {
        // The compiler would refuse this kernel; it can never launch.
        return (0, 0);
    }
    if attrs.num_regs == 0 {
        return (UNLIMITED, 0);
    }

    let warps_per_block = block_size.div_ceil(props.warp_size);
    let regs_per_warp = round_up_u32(
        attrs.num_regs.saturating_mul(props.warp_size),
        arch.reg_alloc_granularity,
    );
    let allocated_per_block = regs_per_warp.saturating_mul(warps_per_block);

    // The hardware launch check assumes a block's warps are spread across
    // all sub-partitions at once.
    let assumed_per_block =
        regs_per_warp.saturating_mul(round_up_u32(warps_per_block, arch.sub_partitions));
    if props.regs_per_block < assumed_per_block {
        return (0, allocated_per_block);
    }

    let regs_per_sub_partition = props.regs_per_multiprocessor / arch.sub_partitions;
    let warps_per_sub_partition = regs_per_sub_partition / regs_per_warp;

    let mut limit = 0;
    if *gc != PartitionedGcConfig::Off {
        let warps_per_partition = warps_per_sub_partition * (arch.sub_partitions / 2);
        limit = warps_per_partition / warps_per_block * 2;
        if limit == 0 && *gc != PartitionedGcConfig::OnStrict {
            *gc = PartitionedGcConfig::Off;
        }
    }
    if *gc == PartitionedGcConfig::Off {
        let warps_per_sm = warps_per_sub_partition * arch.sub_partitions;
        limit = warps_per_sm / warps_per_block;
    }

    (limit, allocated_per_block)
}

/// Warp slot ceiling. Warps are allocated at block granularity; partitioned
/// global caching confines a block to half the multiprocessor's warp slots.
fn warp_ceiling(props: &DeviceProperties, block_size: u32, gc: PartitionedGcConfig) -> u32 {
    let max_warps = props.max_warps_per_multiprocessor();
    let warps_per_block = block_size.div_ceil(props.warp_size);
    if gc != PartitionedGcConfig::Off {
        max_warps / 2 / warps_per_block * 2
    } else {
        max_warps / warps_per_block
    }
}

/// Shared memory ceiling and the per-block shared memory allocation.
fn smem_ceiling(
    arch: &ArchLimits,
    props: &DeviceProperties,
    attrs: &KernelAttributes,
    state: &DeviceState,
    dynamic_smem_bytes: usize,
) -> Result<(u32, usize)> {
    let static_bytes = attrs
        .static_smem_bytes
        .saturating_add(props.reserved_shared_mem_per_block);
    let total = static_bytes.saturating_add(dynamic_smem_bytes);
    let allocated = round_up_usize(total, arch.smem_alloc_granularity);

    // The per-block cap is selected against the worst case the kernel
    // declares, not the current request.
    let max_usage = static_bytes.saturating_add(attrs.max_dynamic_smem_bytes);
    let per_block_limit = smem_per_block_limit(props, attrs.shmem_limit, max_usage)?;
    if allocated > per_block_limit {
        return Ok((0, allocated));
    }

    let preference = smem_per_multiprocessor(props, arch, state)?;
    let budget = if preference >= allocated {
        preference
    } else if props.compute_major >= 7 {
        // The carve-out preference yields to the kernel: raise the budget to
        // the next supported size that fits one block.
        arch.align_up_carveout(allocated)
    } else {
        preference
    };

    let limit = if allocated > 0 {
        (budget / allocated) as u32
    } else {
        UNLIMITED
    };
    Ok((limit, allocated))
}

/// Hardware block barrier ceiling; unconstrained when the generation has no
/// barrier resources or the kernel uses none.
fn barrier_ceiling(arch: &ArchLimits, attrs: &KernelAttributes) -> u32 {
    if arch.block_barrier_budget == 0 || attrs.num_block_barriers == 0 {
        UNLIMITED
    } else {
        arch.block_barrier_budget / attrs.num_block_barriers
    }
}

/// Per-block shared memory cap for the given limit configuration.
///
/// Opting in raises the cap to the extended limit only when the kernel's
/// declared worst case does not fit the default cap. Ampere and newer add
/// the driver reservation on top.
pub(crate) fn smem_per_block_limit(
    props: &DeviceProperties,
    shmem_limit: ShmemLimitConfig,
    max_usage: usize,
) -> Result<usize> {
    let mut cap = match props.compute_major {
        3 | 5 | 6 => props.shared_mem_per_block,
        7..=9 => match shmem_limit {
            ShmemLimitConfig::Default => props.shared_mem_per_block,
            ShmemLimitConfig::Optin => {
                if max_usage > props.shared_mem_per_block {
                    props.shared_mem_per_block_optin
                } else {
                    props.shared_mem_per_block
                }
            }
        },
        _ => return Err(OccupancyError::unsupported(props.compute_major, props.compute_minor)),
    };
    if props.compute_major >= 8 {
        cap = cap.saturating_add(props.reserved_shared_mem_per_block);
    }
    Ok(cap)
}

/// Shared memory budget of one multiprocessor under the current device
/// state.
///
/// Kepler trades shared memory against L1 through the legacy cache
/// preference (16 KB minimum, 48 KB maximum cache). Maxwell and Pascal have
/// dedicated shared memory. Volta and newer carve the unified array by
/// percentage, rounded up to a supported carve-out size.
pub(crate) fn smem_per_multiprocessor(
    props: &DeviceProperties,
    arch: &ArchLimits,
    state: &DeviceState,
) -> Result<usize> {
    let high = props.shared_mem_per_multiprocessor;
    match props.compute_major {
        3 => {
            const MIN_CACHE: usize = 16 * 1024;
            const MAX_CACHE: usize = 48 * 1024;
            let low = (high + MIN_CACHE).saturating_sub(MAX_CACHE);
            Ok(match state.cache_config {
                crate::state::CacheConfig::PreferNone
                | crate::state::CacheConfig::PreferShared => high,
                crate::state::CacheConfig::PreferL1 => low,
                crate::state::CacheConfig::PreferEqual => (high + low) / 2,
            })
        }
        5 | 6 => Ok(high),
        7..=9 => Ok(match state.effective_carveout_percent() {
            None => high,
            Some(percent) => {
                arch.align_up_carveout(high.saturating_mul(percent as usize) / 100)
            }
        }),
        _ => Err(OccupancyError::unsupported(props.compute_major, props.compute_minor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{CacheConfig, CarveoutConfig};

    #[test]
    fn test_round_up() {
        assert_eq!(round_up_u32(0, 256), 0);
        assert_eq!(round_up_u32(1, 256), 256);
        assert_eq!(round_up_u32(256, 256), 256);
        assert_eq!(round_up_usize(1025, 128), 1152);
    }

    #[test]
    fn test_register_and_warp_tie() {
        // 2048 threads/SM, 65536 regs/SM, 32 regs/thread, block size 256:
        // both the register file and the warp slots allow exactly 8 blocks.
        let mut device = DeviceProperties::sm80();
        device.reserved_shared_mem_per_block = 0;
        let kernel = KernelAttributes::new().with_num_regs(32);
        let state = DeviceState::default();

        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, 256, 0).unwrap();
        assert_eq!(result.active_blocks_per_multiprocessor, 8);
        assert!(result.limiting_factors.contains(LimitingFactors::WARPS));
        assert!(result.limiting_factors.contains(LimitingFactors::REGISTERS));
        assert!(!result.limiting_factors.contains(LimitingFactors::SHARED_MEMORY));
        assert_eq!(result.block_limit_warps, 8);
        assert_eq!(result.block_limit_regs, 8);
        assert_eq!(result.allocated_regs_per_block, 8192);
    }

    #[test]
    fn test_block_size_out_of_range() {
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new();
        let state = DeviceState::default();

        assert!(max_active_blocks_per_multiprocessor(&device, &kernel, &state, 0, 0).is_err());
        assert!(max_active_blocks_per_multiprocessor(&device, &kernel, &state, 1025, 0).is_err());

        let capped = KernelAttributes::new().with_max_threads_per_block(128);
        assert!(max_active_blocks_per_multiprocessor(&device, &capped, &state, 256, 0).is_err());
        assert!(max_active_blocks_per_multiprocessor(&device, &capped, &state, 128, 0).is_ok());
    }

    #[test]
    fn test_dynamic_smem_over_declared_max() {
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new().with_max_dynamic_smem_bytes(4096);
        let state = DeviceState::default();

        assert!(
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, 256, 8192).is_err()
        );
        assert!(max_active_blocks_per_multiprocessor(&device, &kernel, &state, 256, 4096).is_ok());
    }

    #[test]
    fn test_unsupported_device() {
        let mut device = DeviceProperties::sm86();
        device.compute_major = 99;
        device.compute_minor = 0;
        let kernel = KernelAttributes::new();
        let state = DeviceState::default();

        assert_eq!(
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, 256, 0),
            Err(OccupancyError::unsupported(99, 0))
        );
    }

    #[test]
    fn test_block_slot_ceiling_binds_small_blocks() {
        // 32-thread blocks with no other resource use run into the fixed
        // resident-block ceiling (16 on compute 8.6).
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new();
        let state = DeviceState::default();

        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, 32, 0).unwrap();
        assert_eq!(result.active_blocks_per_multiprocessor, 16);
        assert!(result.limiting_factors.contains(LimitingFactors::BLOCKS));
        assert_eq!(result.block_limit_warps, 48);
    }

    #[test]
    fn test_excessive_regs_per_thread_never_launches() {
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new().with_num_regs(257);
        let state = DeviceState::default();

        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, 256, 0).unwrap();
        assert_eq!(result.active_blocks_per_multiprocessor, 0);
        assert!(result.limiting_factors.contains(LimitingFactors::REGISTERS));
    }

    #[test]
    fn test_kepler_cache_config_budgets() {
        // Kepler K40-style part: 48 KB shared memory with PreferShared,
        // 16 KB with PreferL1.
        let device = DeviceProperties {
            compute_major: 3,
            compute_minor: 5,
            max_threads_per_block: 1024,
            max_threads_per_multiprocessor: 2048,
            regs_per_block: 65536,
            regs_per_multiprocessor: 65536,
            warp_size: 32,
            shared_mem_per_block: 49152,
            shared_mem_per_multiprocessor: 49152,
            num_multiprocessors: 15,
            shared_mem_per_block_optin: 49152,
            reserved_shared_mem_per_block: 0,
        };
        let kernel = KernelAttributes::new().with_static_smem_bytes(20 * 1024);

        let shared = DeviceState::new().with_cache_config(CacheConfig::PreferShared);
        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &shared, 256, 0).unwrap();
        assert_eq!(result.block_limit_shared_mem, 2);

        let l1 = DeviceState::new().with_cache_config(CacheConfig::PreferL1);
        let result = max_active_blocks_per_multiprocessor(&device, &kernel, &l1, 256, 0).unwrap();
        assert_eq!(result.active_blocks_per_multiprocessor, 0);
        assert!(result.limiting_factors.contains(LimitingFactors::SHARED_MEMORY));
    }

    #[test]
    fn test_carveout_shrinks_smem_budget() {
        // Half carve-out on compute 8.6: 51200 bytes rounds up to the 64 KB
        // step, fitting one 33792-byte block instead of three.
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new()
            .with_shmem_limit(ShmemLimitConfig::Optin)
            .with_max_dynamic_smem_bytes(49152);
        let request = 32768;

        let full = DeviceState::default();
        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &full, 256, request).unwrap();
        assert_eq!(result.block_limit_shared_mem, 3);

        let half = DeviceState::new().with_carveout(CarveoutConfig::Half);
        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &half, 256, request).unwrap();
        assert_eq!(result.block_limit_shared_mem, 1);
        assert_eq!(result.allocated_smem_per_block, 33792);
    }

    #[test]
    fn test_barriers_bind_on_hopper() {
        let device = DeviceProperties::sm90();
        let kernel = KernelAttributes::new().with_block_barriers(5);
        let state = DeviceState::default();

        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, 64, 0).unwrap();
        assert_eq!(result.block_limit_barriers, 12);
        assert_eq!(result.active_blocks_per_multiprocessor, 12);
        assert_eq!(result.limiting_factors, LimitingFactors::BARRIERS);
    }

    #[test]
    fn test_barriers_ignored_before_hopper() {
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new().with_block_barriers(5);
        let state = DeviceState::default();

        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, 64, 0).unwrap();
        assert_eq!(result.block_limit_barriers, UNLIMITED);
    }

    #[test]
    fn test_partitioned_gc_strict_halves_partitions() {
        // Maxwell GM204-style part, compute 5.2, 96-thread blocks: the full
        // multiprocessor fits 21 blocks by warps, a half-partition pair only
        // 20.
        let device = maxwell_sm52();
        let state = DeviceState::default();

        let strict = KernelAttributes::new()
            .with_num_regs(32)
            .with_partitioned_gc(PartitionedGcConfig::OnStrict);
        let result =
            max_active_blocks_per_multiprocessor(&device, &strict, &state, 96, 0).unwrap();
        assert_eq!(result.active_blocks_per_multiprocessor, 20);
        assert_eq!(result.partitioned_gc, PartitionedGcConfig::OnStrict);

        let off = KernelAttributes::new().with_num_regs(32);
        let result = max_active_blocks_per_multiprocessor(&device, &off, &state, 96, 0).unwrap();
        assert_eq!(result.active_blocks_per_multiprocessor, 21);
    }

    #[test]
    fn test_partitioned_gc_on_falls_back_when_partition_too_small() {
        // 128 regs/thread at 384-thread blocks: a half-partition pair cannot
        // fit one block, the full register file fits exactly one. `On` falls
        // back to `Off`; `OnStrict` pins the launch at zero blocks.
        let device = maxwell_sm52();
        let state = DeviceState::default();

        let on = KernelAttributes::new()
            .with_num_regs(128)
            .with_partitioned_gc(PartitionedGcConfig::On);
        let result = max_active_blocks_per_multiprocessor(&device, &on, &state, 384, 0).unwrap();
        assert_eq!(result.active_blocks_per_multiprocessor, 1);
        assert_eq!(result.partitioned_gc, PartitionedGcConfig::Off);

        let strict = KernelAttributes::new()
            .with_num_regs(128)
            .with_partitioned_gc(PartitionedGcConfig::OnStrict);
        let result =
            max_active_blocks_per_multiprocessor(&device, &strict, &state, 384, 0).unwrap();
        assert_eq!(result.active_blocks_per_multiprocessor, 0);
        assert!(result.limiting_factors.contains(LimitingFactors::REGISTERS));
    }

    #[test]
    fn test_partitioned_gc_ignored_where_unsupported() {
        let device = DeviceProperties::sm86();
        let kernel = KernelAttributes::new()
            .with_num_regs(32)
            .with_partitioned_gc(PartitionedGcConfig::OnStrict);
        let state = DeviceState::default();

        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, 96, 0).unwrap();
        assert_eq!(result.partitioned_gc, PartitionedGcConfig::Off);
    }

    fn maxwell_sm52() -> DeviceProperties {
        DeviceProperties {
            compute_major: 5,
            compute_minor: 2,
            max_threads_per_block: 1024,
            max_threads_per_multiprocessor: 2048,
            regs_per_block: 65536,
            regs_per_multiprocessor: 65536,
            warp_size: 32,
            shared_mem_per_block: 49152,
            shared_mem_per_multiprocessor: 98304,
            num_multiprocessors: 16,
            shared_mem_per_block_optin: 49152,
            reserved_shared_mem_per_block: 0,
        }
    }
}
