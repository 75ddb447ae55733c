//! Platform spatialization capability, read-only.
//!
//! The platform spatializer is an external collaborator: this crate only
//! asks whether it exists, whether the user enabled it and whether it can
//! render stereo content. Nothing here mutates platform state.

/// First platform API level that exposes a spatializer.
pub const MIN_SPATIALIZER_API_LEVEL: u32 = 32;

/// Platform spatializer queries.
pub trait SpatializerQuery: Send + Sync {
    /// Platform API level of the running system.
    fn api_level(&self) -> u32;

    /// A spatializer exists on this device.
    fn is_available(&self) -> bool;

    /// The user has spatial audio switched on.
    fn is_enabled(&self) -> bool;

    /// Stereo float content at the current output can be spatialized.
    fn can_spatialize(&self) -> bool;
}

/// Snapshot of spatialization support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpatialCapabilities {
    /// A spatializer exists.
    pub available: bool,
    /// The user enabled it.
    pub enabled: bool,
    /// Current content can be spatialized.
    pub can_spatialize: bool,
}

impl SpatialCapabilities {
    /// All three conditions hold.
    pub fn is_usable(&self) -> bool {
        self.available && self.enabled && self.can_spatialize
    }
}

/// Probes a [`SpatializerQuery`], reporting nothing below
/// [`MIN_SPATIALIZER_API_LEVEL`].
pub struct SpatialCapabilityProbe<Q> {
    query: Q,
}

impl<Q: SpatializerQuery> SpatialCapabilityProbe<Q> {
    /// Wrap a platform query.
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// Query current capabilities.
    pub fn probe(&self) -> SpatialCapabilities {
        let api_level = self.query.api_level();
        if api_level < MIN_SPATIALIZER_API_LEVEL {
            tracing::debug!(api_level, "platform predates spatializer");
            return SpatialCapabilities::default();
        }
        let available = self.query.is_available();
        SpatialCapabilities {
            available,
            enabled: available && self.query.is_enabled(),
            can_spatialize: available && self.query.can_spatialize(),
        }
    }
}

/// Fixed answers; desktop hosts and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticSpatializer {
    /// Reported API level.
    pub api_level: u32,
    /// Reported capabilities.
    pub capabilities: SpatialCapabilities,
}

impl StaticSpatializer {
    /// A host with no platform spatializer.
    pub const fn unsupported() -> Self {
        Self {
            api_level: 0,
            capabilities: SpatialCapabilities {
                available: false,
                enabled: false,
                can_spatialize: false,
            },
        }
    }
}

impl SpatializerQuery for StaticSpatializer {
    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn is_available(&self) -> bool {
        self.capabilities.available
    }

    fn is_enabled(&self) -> bool {
        self.capabilities.enabled
    }

    fn can_spatialize(&self) -> bool {
        self.capabilities.can_spatialize
    }
}
