//! Routing and policy orchestrator for the native DSP chain.
//!
//! [`AudioGraph`] is the single authority for "which path may touch the
//! native chain right now". It owns the [`ChainLifecycleHolder`], the routing
//! gate and the head-tracking policy, and is constructed once at composition
//! time and shared as `Arc<AudioGraph>`.
//!
//! # Routing gate
//!
//! Three flags packed into one atomic byte:
//!
//! | bit            | meaning                                   |
//! |----------------|-------------------------------------------|
//! | `CREATED`      | a native chain exists                     |
//! | `PULL_ALLOWED` | the pull path may call `process_buffer`   |
//! | `PREVIEW`      | the low-latency preview path is running   |
//!
//! `PREVIEW` set implies `PULL_ALLOWED` clear. Because the three flags live
//! in one word, the audio thread takes its routing decision from a single
//! load ([`AudioGraph::route`]), so preview cannot start between "check" and
//! "process".
//!
//! # Hand-over
//!
//! A [`RouteTicket`] that chose a native path increments an in-flight
//! counter before reading the gate and decrements it on drop. A control
//! thread turning a path off clears its bit and then waits for the counter
//! to drain before enabling the other path:
//!
//! ```text
//!   audio thread                    control thread
//!   in_flight += 1   (SeqCst)       gate &= !PULL_ALLOWED   (SeqCst)
//!   state = gate     (SeqCst)       while in_flight != 0 { spin }
//!   ...process...                   start_low_latency_io()
//!   in_flight -= 1                  gate |= PREVIEW
//! ```
//!
//! Either the control thread sees the ticket and waits for it, or the ticket
//! sees the cleared bit and passes through.
//!
//! # Policy
//!
//! Orientation tracking runs iff
//! `spatial_enabled && head_tracking_enabled && (is_foreground ||
//! (keep_in_background && is_playback_active))`. Every hook and setter ends
//! in [`AudioGraph::apply_policy`]; nothing else starts or stops the tracker
//! apart from attach/detach and teardown.

use std::sync::atomic::{AtomicU8, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::lifecycle::{ChainLifecycleHolder, ChainState};
use crate::native::{CompressorParams, NativeBufferHandle, NativeChain, ReverbParams};
use crate::orientation::{OrientationMode, OrientationTracker, YawCallback};
use crate::platform::OutputDeviceQuery;
use crate::{Error, Result};

const CREATED: u8 = 1 << 0;
const PULL_ALLOWED: u8 = 1 << 1;
const PREVIEW: u8 = 1 << 2;

/// Snapshot of the routing gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateState(u8);

impl GateState {
    /// A native chain exists.
    #[inline]
    pub const fn chain_created(self) -> bool {
        self.0 & CREATED != 0
    }

    /// The pull path is allowed to drive the chain.
    #[inline]
    pub const fn pull_path_allowed(self) -> bool {
        self.0 & PULL_ALLOWED != 0
    }

    /// The preview path is running.
    #[inline]
    pub const fn preview_running(self) -> bool {
        self.0 & PREVIEW != 0
    }

    /// Routing decision for one buffer.
    #[inline]
    pub const fn route(self) -> Route {
        if self.chain_created() && self.pull_path_allowed() {
            Route::Process
        } else if self.chain_created() && self.preview_running() {
            Route::Preview
        } else {
            Route::PassThrough
        }
    }
}

/// Lock-free routing flags.
#[derive(Debug)]
pub struct RoutingGate {
    bits: AtomicU8,
}

impl RoutingGate {
    fn new() -> Self {
        Self {
            bits: AtomicU8::new(PULL_ALLOWED),
        }
    }

    /// Current state.
    #[inline]
    pub fn load(&self) -> GateState {
        GateState(self.bits.load(Ordering::SeqCst))
    }

    fn set(&self, bit: u8) {
        self.bits.fetch_or(bit, Ordering::SeqCst);
    }

    fn clear(&self, bit: u8) {
        self.bits.fetch_and(!bit, Ordering::SeqCst);
    }
}

/// Which path handles the current buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Process in place through the native chain.
    Process,
    /// Forward to the preview path and silence the pull-path output.
    Preview,
    /// Leave the buffer untouched.
    PassThrough,
}

/// One routing decision, held for the duration of a buffer.
///
/// While a ticket for [`Route::Process`] or [`Route::Preview`] is alive the
/// control thread will not switch paths. Drop it as soon as the buffer has
/// been handed to the native chain.
#[must_use = "the routing decision is released on drop"]
pub struct RouteTicket<'g> {
    graph: &'g AudioGraph,
    route: Route,
}

impl RouteTicket<'_> {
    /// The decision.
    #[inline]
    pub fn route(&self) -> Route {
        self.route
    }

    /// Process `buffer` in place. Returns `false` (and does nothing) unless
    /// the ticket chose [`Route::Process`].
    pub fn process(&self, buffer: NativeBufferHandle<'_>, frames: usize, sample_rate_hz: u32) -> bool {
        if self.route != Route::Process {
            return false;
        }
        self.graph
            .lifecycle
            .chain()
            .process_buffer(buffer, frames, sample_rate_hz);
        true
    }

    /// Hand `buffer` to the preview path. Returns `false` (and does nothing)
    /// unless the ticket chose [`Route::Preview`].
    pub fn enqueue_preview(
        &self,
        buffer: NativeBufferHandle<'_>,
        frames: usize,
        sample_rate_hz: u32,
    ) -> bool {
        if self.route != Route::Preview {
            return false;
        }
        self.graph
            .lifecycle
            .chain()
            .enqueue_preview_pcm(buffer, frames, sample_rate_hz);
        true
    }
}

impl Drop for RouteTicket<'_> {
    fn drop(&mut self) {
        if self.route != Route::PassThrough {
            self.graph.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl std::fmt::Debug for RouteTicket<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTicket")
            .field("route", &self.route)
            .finish()
    }
}

/// Inputs of the head-tracking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialPolicy {
    /// Spatial rendering switched on.
    pub spatial_enabled: bool,
    /// Head tracking switched on.
    pub head_tracking_enabled: bool,
    /// Keep tracking while the app is in the background.
    pub keep_in_background: bool,
    /// App is visible.
    pub is_foreground: bool,
    /// Something is playing.
    pub is_playback_active: bool,
}

impl Default for SpatialPolicy {
    fn default() -> Self {
        Self {
            spatial_enabled: false,
            head_tracking_enabled: false,
            keep_in_background: false,
            is_foreground: true,
            is_playback_active: false,
        }
    }
}

impl SpatialPolicy {
    /// Whether the orientation sensor should be running.
    pub fn should_run_sensor(&self) -> bool {
        self.spatial_enabled
            && self.head_tracking_enabled
            && (self.is_foreground || (self.keep_in_background && self.is_playback_active))
    }

    /// Sensor mode matching the app's visibility.
    pub fn mode(&self) -> OrientationMode {
        if self.is_foreground {
            OrientationMode::Foreground
        } else {
            OrientationMode::BackgroundLowPower
        }
    }
}

struct PolicyState {
    policy: SpatialPolicy,
    tracker: Option<Arc<OrientationTracker>>,
}

/// Parameter and test-tone setters of the native chain.
///
/// Lifecycle and routing entry points are deliberately absent; those go
/// through [`AudioGraph`].
#[derive(Clone, Copy)]
pub struct DspControls<'g> {
    chain: &'g dyn NativeChain,
}

impl DspControls<'_> {
    /// Set one EQ band's gain.
    pub fn set_eq_band(&self, band_index: u32, gain_db: f32) {
        self.chain.set_eq_band(band_index, gain_db);
    }

    /// Set compressor parameters.
    pub fn set_compressor(&self, params: CompressorParams) {
        self.chain.set_compressor(params);
    }

    /// Set reverb parameters.
    pub fn set_reverb(&self, params: ReverbParams) {
        self.chain.set_reverb(params);
    }

    /// Switch the preview test tone on or off.
    pub fn set_test_tone_enabled(&self, enabled: bool) {
        self.chain.set_test_tone_enabled(enabled);
    }

    /// Test tone frequency in Hz.
    pub fn set_test_tone_frequency(&self, hz: f32) {
        self.chain.set_test_tone_frequency(hz);
    }

    /// Test tone level, clamped to 0..=1.
    pub fn set_test_tone_level(&self, level: f32) {
        self.chain.set_test_tone_level(level.clamp(0.0, 1.0));
    }
}

/// The routing and lifecycle orchestrator.
pub struct AudioGraph {
    lifecycle: ChainLifecycleHolder,
    gate: RoutingGate,
    in_flight: AtomicUsize,
    /// Serializes chain and preview transitions.
    control: Mutex<()>,
    policy: Mutex<PolicyState>,
    last_yaw_bits: AtomicU32,
}

impl AudioGraph {
    /// Build the orchestrator around a native chain binding. No native call
    /// is made until a chain is requested.
    pub fn new(chain: Arc<dyn NativeChain>) -> Self {
        Self {
            lifecycle: ChainLifecycleHolder::new(chain),
            gate: RoutingGate::new(),
            in_flight: AtomicUsize::new(0),
            control: Mutex::new(()),
            policy: Mutex::new(PolicyState {
                policy: SpatialPolicy::default(),
                tracker: None,
            }),
            last_yaw_bits: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    // --- chain lifecycle ---

    /// Make sure a chain exists at `sample_rate_hz`.
    ///
    /// A rate change stops a running preview (it was opened at the old rate)
    /// and waits for in-flight buffers before the chain is recreated.
    pub fn ensure_chain_created(&self, sample_rate_hz: u32) -> Result<u32> {
        if sample_rate_hz == 0 {
            return Err(Error::InvalidSampleRate(sample_rate_hz));
        }
        if self.lifecycle.sample_rate() == Some(sample_rate_hz) {
            return Ok(sample_rate_hz);
        }
        let _guard = self.control.lock();
        self.ensure_chain_locked(sample_rate_hz)
    }

    /// Ensure a chain at the device's current output rate.
    pub fn ensure_chain_for_output(&self, device: &dyn OutputDeviceQuery) -> Result<u32> {
        self.ensure_chain_created(device.output_sample_rate_or_default())
    }

    /// Tear everything down: stop preview, stop orientation tracking, destroy
    /// the chain, re-allow the pull path. Idempotent; an already idle graph
    /// returns without taking the control lock.
    pub fn destroy_chain_if_needed(&self) {
        let state = self.gate.load();
        if !state.chain_created()
            && !state.preview_running()
            && state.pull_path_allowed()
            && !self.lifecycle.is_created()
            && !self.tracker_running()
        {
            return;
        }
        let _guard = self.control.lock();
        self.stop_preview_locked();
        self.stop_tracker();

        if self.lifecycle.is_created() {
            self.gate.clear(CREATED);
            self.wait_for_in_flight();
            self.lifecycle.release_native_chain();
        }
        self.gate.set(PULL_ALLOWED);
    }

    /// Ordered teardown for app or player exit.
    pub fn shutdown(&self) {
        tracing::info!("audio graph shutting down");
        self.destroy_chain_if_needed();
    }

    /// Whether a native chain exists.
    pub fn is_chain_created(&self) -> bool {
        self.lifecycle.is_created()
    }

    /// Lifecycle snapshot.
    pub fn chain_state(&self) -> ChainState {
        self.lifecycle.state()
    }

    fn ensure_chain_locked(&self, sample_rate_hz: u32) -> Result<u32> {
        match self.lifecycle.sample_rate() {
            Some(live) if live == sample_rate_hz => return Ok(live),
            Some(_) => {
                self.stop_preview_locked();
                self.gate.clear(CREATED);
                self.wait_for_in_flight();
            }
            None => {}
        }

        let rate = self.lifecycle.ensure_native_chain(sample_rate_hz)?;
        self.gate.set(CREATED);
        // A fresh chain starts with head tracking off and teardown stopped
        // the tracker; the policy restores both.
        self.apply_policy();
        Ok(rate)
    }

    // --- preview path ---

    /// Start the low-latency preview path, creating the chain if needed.
    ///
    /// While preview runs the pull path no longer reaches the chain. If the
    /// native start fails the pull path is re-allowed and the error returned.
    pub fn start_preview(&self, sample_rate_hz: u32, frames_per_callback: u32) -> Result<()> {
        let _guard = self.control.lock();
        self.ensure_chain_locked(sample_rate_hz)?;

        if self.gate.load().preview_running() {
            tracing::debug!("preview already running");
            return Ok(());
        }

        self.gate.clear(PULL_ALLOWED);
        self.wait_for_in_flight();

        if let Err(err) = self
            .lifecycle
            .chain()
            .start_low_latency_io(sample_rate_hz, frames_per_callback)
        {
            self.gate.set(PULL_ALLOWED);
            return Err(err);
        }
        self.gate.set(PREVIEW);
        tracing::info!(
            sample_rate = sample_rate_hz,
            frames_per_callback,
            "preview started"
        );
        Ok(())
    }

    /// Stop the preview path and hand the chain back to the pull path.
    pub fn stop_preview_if_running(&self) {
        let _guard = self.control.lock();
        self.stop_preview_locked();
    }

    fn stop_preview_locked(&self) {
        if !self.gate.load().preview_running() {
            return;
        }
        self.gate.clear(PREVIEW);
        self.wait_for_in_flight();
        self.lifecycle.chain().stop_low_latency_io();
        self.gate.set(PULL_ALLOWED);
        tracing::info!("preview stopped");
    }

    // --- real-time reads ---

    /// Chain exists and the pull path may drive it. Lock-free.
    #[inline]
    pub fn should_process_from_pull_path(&self) -> bool {
        let state = self.gate.load();
        state.chain_created() && state.pull_path_allowed()
    }

    /// Preview path is running. Lock-free.
    #[inline]
    pub fn is_preview_running(&self) -> bool {
        self.gate.load().preview_running()
    }

    /// Current gate flags.
    pub fn gate_state(&self) -> GateState {
        self.gate.load()
    }

    /// Take the routing decision for one buffer. Lock-free and
    /// allocation-free.
    #[inline]
    pub fn route(&self) -> RouteTicket<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let route = self.gate.load().route();
        if route == Route::PassThrough {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        RouteTicket { graph: self, route }
    }

    fn wait_for_in_flight(&self) {
        let mut spins = 0u32;
        while self.in_flight.load(Ordering::SeqCst) != 0 {
            if spins < 64 {
                std::hint::spin_loop();
                spins += 1;
            } else {
                std::thread::yield_now();
            }
        }
    }

    // --- parameters ---

    /// Parameter and test-tone setters.
    pub fn dsp(&self) -> DspControls<'_> {
        DspControls {
            chain: self.lifecycle.chain().as_ref(),
        }
    }

    // --- head-tracking policy ---

    /// Current policy inputs.
    pub fn policy(&self) -> SpatialPolicy {
        self.policy.lock().policy
    }

    /// Re-evaluate the policy against the attached tracker.
    pub fn apply_policy(&self) {
        let state = self.policy.lock();
        self.apply_locked(&state);
    }

    /// App became visible.
    pub fn on_foreground(&self) {
        self.update_policy(|p| p.is_foreground = true);
    }

    /// App went to the background.
    pub fn on_background(&self) {
        self.update_policy(|p| p.is_foreground = false);
    }

    /// Toggle spatial rendering.
    pub fn set_spatial_enabled(&self, enabled: bool) {
        self.update_policy(|p| p.spatial_enabled = enabled);
    }

    /// Toggle head tracking.
    pub fn set_head_tracking_enabled(&self, enabled: bool) {
        self.update_policy(|p| p.head_tracking_enabled = enabled);
    }

    /// Toggle background tracking during playback.
    pub fn set_keep_in_background(&self, keep: bool) {
        self.update_policy(|p| p.keep_in_background = keep);
    }

    /// Report whether playback is active.
    pub fn set_playback_active(&self, active: bool) {
        self.update_policy(|p| p.is_playback_active = active);
    }

    /// Attach a tracker, replacing any previous one, and apply the current
    /// policy to it.
    pub fn attach_tracker(&self, tracker: Arc<OrientationTracker>) {
        let mut state = self.policy.lock();
        if let Some(previous) = state.tracker.replace(tracker) {
            if let Err(err) = previous.stop() {
                tracing::warn!(error = %err, "failed to stop superseded orientation tracker");
            }
        }
        self.apply_locked(&state);
    }

    /// Detach `tracker` if it is the attached one, stopping it. A tracker
    /// that was already superseded is left alone.
    pub fn detach_tracker(&self, tracker: &Arc<OrientationTracker>) {
        let mut state = self.policy.lock();
        let is_current = state
            .tracker
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, tracker));
        if !is_current {
            tracing::debug!("detach of superseded orientation tracker ignored");
            return;
        }
        state.tracker = None;
        if let Err(err) = tracker.stop() {
            tracing::warn!(error = %err, "failed to stop orientation tracker");
        }
    }

    /// Callback feeding yaw from a tracker into this graph.
    ///
    /// Holds only a weak reference, so a tracker outliving the graph does
    /// not keep it alive.
    pub fn yaw_sink(self: &Arc<Self>) -> YawCallback {
        let graph: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |yaw| {
            if let Some(graph) = graph.upgrade() {
                graph.report_yaw(yaw);
            }
        })
    }

    /// Forward a smoothed yaw reading to the chain.
    pub fn report_yaw(&self, yaw_deg: f32) {
        self.last_yaw_bits.store(yaw_deg.to_bits(), Ordering::Relaxed);
        if self.lifecycle.is_created() {
            self.lifecycle.chain().set_head_tracking_yaw(yaw_deg);
        }
    }

    /// Most recent yaw forwarded through [`report_yaw`](Self::report_yaw).
    pub fn last_yaw(&self) -> f32 {
        f32::from_bits(self.last_yaw_bits.load(Ordering::Relaxed))
    }

    fn update_policy(&self, change: impl FnOnce(&mut SpatialPolicy)) {
        let mut state = self.policy.lock();
        change(&mut state.policy);
        self.apply_locked(&state);
    }

    fn apply_locked(&self, state: &PolicyState) {
        let policy = state.policy;
        let should_run = policy.should_run_sensor();
        tracing::debug!(?policy, should_run, "applying spatial policy");

        if let Some(tracker) = &state.tracker {
            let outcome = if should_run {
                tracker.start(policy.mode())
            } else {
                tracker.stop()
            };
            if let Err(err) = outcome {
                tracing::warn!(error = %err, should_run, "orientation tracker transition failed");
            }
        }

        if self.lifecycle.is_created() {
            self.lifecycle.chain().set_head_tracking_enabled(should_run);
        }
    }

    fn tracker_running(&self) -> bool {
        self.policy
            .lock()
            .tracker
            .as_ref()
            .is_some_and(|tracker| tracker.is_tracking())
    }

    fn stop_tracker(&self) {
        let state = self.policy.lock();
        if let Some(tracker) = &state.tracker {
            if let Err(err) = tracker.stop() {
                tracing::warn!(error = %err, "failed to stop orientation tracker");
            }
        }
    }
}

impl std::fmt::Debug for AudioGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioGraph")
            .field("chain", &self.lifecycle.state())
            .field("gate", &self.gate.load())
            .finish_non_exhaustive()
    }
}
