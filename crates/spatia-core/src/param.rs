//! Lock-free `f32` parameters shared between control and audio threads.
//!
//! The value is stored as its bit pattern in an `AtomicU32`. Writers clamp
//! to the parameter's range; readers never block or allocate.

use std::sync::atomic::{AtomicU32, Ordering};

/// A thread-safe `f32` with range and default.
///
/// Control thread writes, audio thread reads.
#[derive(Debug)]
pub struct AtomicParam {
    value: AtomicU32,
    min: f32,
    max: f32,
    default: f32,
}

impl AtomicParam {
    /// Create a parameter holding `default`, clamped to `min..=max` on set.
    pub fn new(default: f32, min: f32, max: f32) -> Self {
        Self {
            value: AtomicU32::new(default.to_bits()),
            min,
            max,
            default,
        }
    }

    /// Unbounded parameter.
    pub fn unbounded(default: f32) -> Self {
        Self::new(default, f32::MIN, f32::MAX)
    }

    /// Store `v`, clamped to the range. NaN is ignored.
    #[inline]
    pub fn set(&self, v: f32) {
        if v.is_nan() {
            return;
        }
        let clamped = v.clamp(self.min, self.max);
        self.value.store(clamped.to_bits(), Ordering::Release);
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.value.load(Ordering::Acquire))
    }

    /// Restore the default.
    pub fn reset(&self) {
        self.value.store(self.default.to_bits(), Ordering::Release);
    }

    /// Lower bound.
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Default value.
    pub fn default_value(&self) -> f32 {
        self.default
    }
}

/// Decibels to linear gain.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Linear gain to decibels, floored at -120 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 1e-6 {
        return -120.0;
    }
    20.0 * linear.log10()
}
