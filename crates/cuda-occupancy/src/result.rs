//! Occupancy query results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kernel::PartitionedGcConfig;

/// Ceiling reported for a resource that does not constrain the launch.
pub const UNLIMITED: u32 = u32::MAX;

/// Set of resources that bind the active-block count.
///
/// Stored as a bitmask so the layout stays compatible with native callers;
/// ties are possible and every tied resource is reported.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LimitingFactors(u32);

impl LimitingFactors {
    /// Warp slots bind the block count.
    pub const WARPS: Self = Self(0x01);
    /// The register file binds the block count.
    pub const REGISTERS: Self = Self(0x02);
    /// Shared memory binds the block count.
    pub const SHARED_MEMORY: Self = Self(0x04);
    /// The fixed resident-block ceiling binds the block count.
    pub const BLOCKS: Self = Self(0x08);
    /// Hardware block barriers bind the block count.
    pub const BARRIERS: Self = Self(0x10);

    /// No factor recorded.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bitmask value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every factor in `other` is present.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Add the factors in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Whether no factor is recorded.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for LimitingFactors {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for LimitingFactors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::WARPS, "WARPS"),
            (Self::REGISTERS, "REGISTERS"),
            (Self::SHARED_MEMORY, "SHARED_MEMORY"),
            (Self::BLOCKS, "BLOCKS"),
            (Self::BARRIERS, "BARRIERS"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "(empty)")?;
        }
        Ok(())
    }
}

/// Result of an active-block query for one launch configuration.
///
/// Recomputed per call and owned by the caller; nothing is cached inside the
/// library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyResult {
    /// Blocks that can reside concurrently on one multiprocessor.
    pub active_blocks_per_multiprocessor: u32,
    /// Every resource whose individual ceiling equals the active-block count.
    pub limiting_factors: LimitingFactors,
    /// Block ceiling implied by the register file alone.
    pub block_limit_regs: u32,
    /// Block ceiling implied by shared memory alone.
    pub block_limit_shared_mem: u32,
    /// Block ceiling implied by warp slots alone.
    pub block_limit_warps: u32,
    /// The fixed architectural resident-block ceiling.
    pub block_limit_blocks: u32,
    /// Block ceiling implied by hardware block barriers alone.
    pub block_limit_barriers: u32,
    /// Registers actually reserved per block after granularity rounding.
    pub allocated_regs_per_block: u32,
    /// Shared memory actually reserved per block after granularity rounding,
    /// in bytes.
    pub allocated_smem_per_block: usize,
    /// The partitioned global cache configuration the model settled on.
    pub partitioned_gc: PartitionedGcConfig,
}
