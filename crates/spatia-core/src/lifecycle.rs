//! Idempotent ownership of the native DSP chain.
//!
//! [`ChainLifecycleHolder`] is the only component that calls
//! [`NativeChain::create_chain`] and [`NativeChain::destroy_chain`]. The chain
//! is keyed by output sample rate: asking for the rate it already runs at is a
//! lock-free no-op, asking for a different rate destroys and recreates it.
//!
//! ```text
//!   ensure(r) ──► fast check (atomic) ──same──► return r
//!                     │ differs
//!                     ▼
//!                lock ─► re-check ─► destroy (if live) ─► create(r) ─► publish r
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::native::NativeChain;
use crate::{Error, Result};

/// Snapshot of the chain's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainState {
    /// Whether a native chain currently exists.
    pub created: bool,
    /// Rate the chain was built for; meaningful only when `created`.
    pub sample_rate_hz: u32,
}

/// Creates, recreates and destroys the native chain exactly once per
/// transition.
///
/// Safe to share between threads. The common case (chain already live at the
/// requested rate) never takes the lock.
pub struct ChainLifecycleHolder {
    chain: Arc<dyn NativeChain>,
    /// Rate of the live chain, 0 while none exists.
    live_rate: AtomicU32,
    transition: Mutex<()>,
}

impl ChainLifecycleHolder {
    /// Wrap a native chain binding. No native call is made.
    pub fn new(chain: Arc<dyn NativeChain>) -> Self {
        Self {
            chain,
            live_rate: AtomicU32::new(0),
            transition: Mutex::new(()),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChainState {
        let rate = self.live_rate.load(Ordering::Acquire);
        ChainState {
            created: rate != 0,
            sample_rate_hz: rate,
        }
    }

    /// Whether a native chain currently exists.
    #[inline]
    pub fn is_created(&self) -> bool {
        self.live_rate.load(Ordering::Acquire) != 0
    }

    /// Rate of the live chain, if any.
    pub fn sample_rate(&self) -> Option<u32> {
        match self.live_rate.load(Ordering::Acquire) {
            0 => None,
            rate => Some(rate),
        }
    }

    /// Make sure a chain exists at `sample_rate_hz` and return that rate.
    ///
    /// If creation fails the holder stays not-created and the error is
    /// returned, so a later call retries from a clean state.
    pub fn ensure_native_chain(&self, sample_rate_hz: u32) -> Result<u32> {
        if sample_rate_hz == 0 {
            return Err(Error::InvalidSampleRate(sample_rate_hz));
        }
        if self.live_rate.load(Ordering::Acquire) == sample_rate_hz {
            return Ok(sample_rate_hz);
        }

        let _guard = self.transition.lock();
        let live = self.live_rate.load(Ordering::Acquire);
        if live == sample_rate_hz {
            return Ok(sample_rate_hz);
        }

        if live != 0 {
            tracing::info!(
                from = live,
                to = sample_rate_hz,
                "output rate changed, recreating native chain"
            );
            self.live_rate.store(0, Ordering::Release);
            self.chain.destroy_chain();
        }

        self.chain.create_chain(sample_rate_hz)?;
        self.live_rate.store(sample_rate_hz, Ordering::Release);
        tracing::info!(sample_rate = sample_rate_hz, "native chain created");
        Ok(sample_rate_hz)
    }

    /// Destroy the chain if one exists. Idempotent.
    pub fn release_native_chain(&self) {
        if self.live_rate.load(Ordering::Acquire) == 0 {
            return;
        }

        let _guard = self.transition.lock();
        if self.live_rate.load(Ordering::Acquire) == 0 {
            return;
        }
        self.live_rate.store(0, Ordering::Release);
        self.chain.destroy_chain();
        tracing::info!("native chain destroyed");
    }

    /// The wrapped binding, for non-lifecycle entry points.
    pub(crate) fn chain(&self) -> &Arc<dyn NativeChain> {
        &self.chain
    }
}

impl std::fmt::Debug for ChainLifecycleHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainLifecycleHolder")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingChain};

    fn holder() -> (Arc<RecordingChain>, ChainLifecycleHolder) {
        let chain = Arc::new(RecordingChain::new());
        let holder = ChainLifecycleHolder::new(chain.clone());
        (chain, holder)
    }

    #[test]
    fn repeated_ensure_creates_once() {
        let (chain, holder) = holder();
        for _ in 0..5 {
            assert_eq!(holder.ensure_native_chain(48000).unwrap(), 48000);
        }
        assert_eq!(chain.calls(), vec![Call::Create(48000)]);
        assert_eq!(
            holder.state(),
            ChainState {
                created: true,
                sample_rate_hz: 48000
            }
        );
    }

    #[test]
    fn rate_change_destroys_then_recreates() {
        let (chain, holder) = holder();
        holder.ensure_native_chain(44100).unwrap();
        holder.ensure_native_chain(48000).unwrap();
        assert_eq!(
            chain.calls(),
            vec![Call::Create(44100), Call::Destroy, Call::Create(48000)]
        );
        assert_eq!(holder.sample_rate(), Some(48000));
    }

    #[test]
    fn release_is_idempotent() {
        let (chain, holder) = holder();
        holder.release_native_chain();
        assert!(chain.calls().is_empty());

        holder.ensure_native_chain(48000).unwrap();
        holder.release_native_chain();
        holder.release_native_chain();
        assert_eq!(chain.calls(), vec![Call::Create(48000), Call::Destroy]);
        assert!(!holder.is_created());
    }

    #[test]
    fn failed_create_leaves_holder_uncreated() {
        let (chain, holder) = holder();
        chain.fail_next_create();

        assert!(holder.ensure_native_chain(48000).is_err());
        assert!(!holder.is_created());
        assert_eq!(holder.sample_rate(), None);

        // A retry starts from a clean state.
        assert_eq!(holder.ensure_native_chain(48000).unwrap(), 48000);
        assert!(holder.is_created());
    }

    #[test]
    fn zero_rate_is_rejected_without_native_calls() {
        let (chain, holder) = holder();
        assert!(matches!(
            holder.ensure_native_chain(0),
            Err(Error::InvalidSampleRate(0))
        ));
        assert!(chain.calls().is_empty());
    }

    #[test]
    fn concurrent_ensure_creates_once() {
        let (chain, holder) = holder();
        let holder = Arc::new(holder);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let holder = Arc::clone(&holder);
                std::thread::spawn(move || holder.ensure_native_chain(48000).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 48000);
        }
        assert_eq!(chain.count(|c| matches!(c, Call::Create(_))), 1);
    }
}
