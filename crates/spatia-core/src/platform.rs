//! Device output configuration query.

use crate::format::DEFAULT_SAMPLE_RATE_HZ;

/// Reports the sample rate the output device currently runs at.
pub trait OutputDeviceQuery: Send + Sync {
    /// Current output rate, `None` when the device does not report one.
    fn current_output_sample_rate(&self) -> Option<u32>;

    /// Current output rate, or [`DEFAULT_SAMPLE_RATE_HZ`] when unavailable.
    fn output_sample_rate_or_default(&self) -> u32 {
        match self.current_output_sample_rate() {
            Some(rate) if rate > 0 => rate,
            _ => {
                tracing::warn!(
                    fallback = DEFAULT_SAMPLE_RATE_HZ,
                    "output sample rate unavailable, using fallback"
                );
                DEFAULT_SAMPLE_RATE_HZ
            }
        }
    }
}

/// Output device with a fixed, known rate (or none).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOutputRate(pub Option<u32>);

impl OutputDeviceQuery for FixedOutputRate {
    fn current_output_sample_rate(&self) -> Option<u32> {
        self.0
    }
}
