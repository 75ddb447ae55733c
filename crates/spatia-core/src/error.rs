//! Error types for the spatia core.

use crate::format::SampleEncoding;
use thiserror::Error;

/// Errors produced by the routing engine and the native-chain contract.
#[derive(Debug, Error)]
pub enum Error {
    /// The pipeline offered a format the processor cannot adapt.
    ///
    /// Only interleaved stereo `Float32` or `Int16` is accepted. Callers must
    /// not retry with the same format.
    #[error("unsupported input format: {encoding:?}, {channel_count} channel(s) at {sample_rate_hz} Hz")]
    UnsupportedFormat {
        /// Encoding that was offered.
        encoding: SampleEncoding,
        /// Channel count that was offered.
        channel_count: u16,
        /// Sample rate that was offered.
        sample_rate_hz: u32,
    },

    /// A sample rate of zero (or otherwise unusable) was requested.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// A native entry point reported a failure.
    #[error("native chain error in {operation}: {message}")]
    Native {
        /// Entry point that failed (e.g. `create_chain`).
        operation: &'static str,
        /// Human-readable failure description.
        message: String,
    },

    /// The native library is missing or exposes an incompatible ABI.
    #[error("native DSP library unavailable: {0}")]
    NativeUnavailable(String),
}

impl Error {
    /// Create a native entry-point error.
    pub fn native(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Native {
            operation,
            message: message.into(),
        }
    }
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_factory_produces_correct_variant() {
        let err = Error::native("create_chain", "out of memory");
        assert!(matches!(
            err,
            Error::Native { operation: "create_chain", ref message } if message == "out of memory"
        ));
    }

    #[test]
    fn unsupported_format_display_names_the_shape() {
        let err = Error::UnsupportedFormat {
            encoding: SampleEncoding::Int16,
            channel_count: 6,
            sample_rate_hz: 44100,
        };
        let text = err.to_string();
        assert!(text.contains("Int16"));
        assert!(text.contains("6 channel"));
        assert!(text.contains("44100"));
    }
}
