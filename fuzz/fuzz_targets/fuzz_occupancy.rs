//! Fuzz target for the occupancy queries.
//!
//! Exercises the model with arbitrary kernel descriptors and launch
//! arguments against the preset devices, verifying that queries never panic
//! and that results stay internally consistent.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use cuda_occupancy::{
    available_dynamic_smem_per_block, max_active_blocks_per_multiprocessor,
    max_potential_block_size, CacheConfig, CarveoutConfig, DeviceProperties, DeviceState,
    KernelAttributes, PartitionedGcConfig, ShmemLimitConfig,
};

/// Fuzz input: device selector, kernel descriptor, launch arguments.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    device: u8,
    max_threads_per_block: Option<u32>,
    num_regs: u32,
    static_smem_bytes: usize,
    max_dynamic_smem_bytes: usize,
    partitioned_gc: u8,
    optin: bool,
    num_block_barriers: u32,
    cache_config: u8,
    carveout: u8,
    block_size: u32,
    dynamic_smem_bytes: usize,
    num_blocks: u32,
}

fn pick_device(selector: u8) -> DeviceProperties {
    match selector % 6 {
        0 => DeviceProperties::sm70(),
        1 => DeviceProperties::sm75(),
        2 => DeviceProperties::sm80(),
        3 => DeviceProperties::sm86(),
        4 => DeviceProperties::sm89(),
        _ => DeviceProperties::sm90(),
    }
}

fuzz_target!(|input: FuzzInput| {
    let device = pick_device(input.device);

    let mut kernel = KernelAttributes::new()
        .with_num_regs(input.num_regs)
        .with_static_smem_bytes(input.static_smem_bytes)
        .with_max_dynamic_smem_bytes(input.max_dynamic_smem_bytes)
        .with_partitioned_gc(match input.partitioned_gc % 3 {
            0 => PartitionedGcConfig::Off,
            1 => PartitionedGcConfig::On,
            _ => PartitionedGcConfig::OnStrict,
        })
        .with_block_barriers(input.num_block_barriers);
    if input.optin {
        kernel = kernel.with_shmem_limit(ShmemLimitConfig::Optin);
    }
    if let Some(max) = input.max_threads_per_block {
        kernel = kernel.with_max_threads_per_block(max);
    }

    let state = DeviceState::new()
        .with_cache_config(match input.cache_config % 4 {
            0 => CacheConfig::PreferNone,
            1 => CacheConfig::PreferShared,
            2 => CacheConfig::PreferL1,
            _ => CacheConfig::PreferEqual,
        })
        .with_carveout(match input.carveout % 4 {
            0 => CarveoutConfig::Default,
            1 => CarveoutConfig::MaxShared,
            2 => CarveoutConfig::MaxL1,
            _ => CarveoutConfig::Half,
        });

    if let Ok(result) = max_active_blocks_per_multiprocessor(
        &device,
        &kernel,
        &state,
        input.block_size,
        input.dynamic_smem_bytes,
    ) {
        let active = result.active_blocks_per_multiprocessor;
        let min = result
            .block_limit_warps
            .min(result.block_limit_regs)
            .min(result.block_limit_shared_mem)
            .min(result.block_limit_blocks)
            .min(result.block_limit_barriers);
        assert_eq!(active, min, "active blocks must equal the tightest ceiling");
        assert!(!result.limiting_factors.is_empty());
        assert!(
            active.saturating_mul(input.block_size)
                <= device.max_threads_per_multiprocessor,
            "residency exceeds the multiprocessor's thread capacity"
        );
    }

    if let Ok(best) = max_potential_block_size(&device, &kernel, &state, input.dynamic_smem_bytes)
    {
        let result = max_active_blocks_per_multiprocessor(
            &device,
            &kernel,
            &state,
            best.block_size,
            input.dynamic_smem_bytes,
        )
        .unwrap();
        assert!(result.active_blocks_per_multiprocessor > 0);
    }

    if let Ok(avail) = available_dynamic_smem_per_block(
        &device,
        &kernel,
        &state,
        input.num_blocks,
        input.block_size,
    ) {
        let result =
            max_active_blocks_per_multiprocessor(&device, &kernel, &state, input.block_size, avail)
                .unwrap();
        assert!(
            result.active_blocks_per_multiprocessor >= input.num_blocks,
            "granted {avail} bytes but {} < {} blocks fit",
            result.active_blocks_per_multiprocessor,
            input.num_blocks
        );
    }
});
