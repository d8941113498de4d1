//! Mutable device configuration that affects the shared memory budget.

use serde::{Deserialize, Serialize};

/// Legacy cache preference, configurable per device on Kepler.
///
/// Deprecated on architectures with a unified data cache; there it is only
/// consulted as a fallback when no carve-out preference is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CacheConfig {
    /// No preference.
    #[default]
    PreferNone,
    /// Prefer a larger shared memory partition.
    PreferShared,
    /// Prefer a larger L1 cache partition.
    PreferL1,
    /// Split the partition evenly.
    PreferEqual,
}

/// Shared memory carve-out preference on architectures with a unified
/// L1/shared memory array (Volta and newer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CarveoutConfig {
    /// Let the driver choose.
    #[default]
    Default,
    /// Carve out the full array as shared memory.
    MaxShared,
    /// Carve out the full array as L1 cache.
    MaxL1,
    /// Split the array evenly.
    Half,
}

impl CarveoutConfig {
    /// The carve-out as a percentage of the array given to shared memory,
    /// `None` when the driver decides.
    #[must_use]
    pub fn percent(self) -> Option<u32> {
        match self {
            CarveoutConfig::Default => None,
            CarveoutConfig::MaxShared => Some(100),
            CarveoutConfig::MaxL1 => Some(0),
            CarveoutConfig::Half => Some(50),
        }
    }
}

/// Caller-controlled device state, reusable across queries.
///
/// Defaults to "no preference" on both knobs, which selects the device's
/// full shared memory capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceState {
    /// Legacy cache preference.
    pub cache_config: CacheConfig,
    /// Shared memory carve-out preference.
    pub carveout: CarveoutConfig,
}

impl DeviceState {
    /// Creates a state with no preference set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the legacy cache preference.
    #[must_use]
    pub fn with_cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Builder method to set the carve-out preference.
    #[must_use]
    pub fn with_carveout(mut self, carveout: CarveoutConfig) -> Self {
        self.carveout = carveout;
        self
    }

    /// Effective carve-out percentage on unified-cache architectures.
    ///
    /// The carve-out preference wins; when unset, the legacy cache
    /// preference is mapped onto the equivalent carve-out.
    pub(crate) fn effective_carveout_percent(&self) -> Option<u32> {
        match self.carveout {
            CarveoutConfig::Default => match self.cache_config {
                CacheConfig::PreferNone => None,
                CacheConfig::PreferShared => Some(100),
                CacheConfig::PreferL1 => Some(0),
                CacheConfig::PreferEqual => Some(50),
            },
            explicit => explicit.percent(),
        }
    }
}
