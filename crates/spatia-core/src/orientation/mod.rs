//! Head-orientation tracking from a rotation-vector sensor.
//!
//! [`OrientationTracker`] subscribes to a [`RotationSensor`], compensates for
//! the display rotation, smooths the yaw with [`YawSmoother`] and reports it
//! through a callback.
//!
//! ```text
//!   Idle ──start(mode)──► Tracking(mode) ──stop()──► Idle
//!                            │  start(other mode)
//!                            └──► unregister ─► register(other mode)
//! ```
//!
//! Sensor events arrive on the sensor's own thread. Registration and mode
//! switches happen only on control threads; they are not real-time safe.

pub mod math;
mod replay;

pub use math::{
    DisplayRotation, RotationMatrix, RotationVector, YawSmoother, normalize_degrees, raw_yaw,
    shortest_delta,
};
pub use replay::ReplaySensor;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

/// Foreground sampling period (50 Hz).
pub const FOREGROUND_SAMPLING_PERIOD_US: u32 = 20_000;
/// Foreground batching latency (deliver immediately).
pub const FOREGROUND_MAX_REPORT_LATENCY_US: u32 = 0;
/// Background sampling period (10 Hz).
pub const BACKGROUND_SAMPLING_PERIOD_US: u32 = 100_000;
/// Background batching latency; lets the sensor hub batch events.
pub const BACKGROUND_MAX_REPORT_LATENCY_US: u32 = 500_000;

/// Sensor rate preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrientationMode {
    /// High rate, unbatched, while the app is visible.
    Foreground,
    /// Low rate, batched, while playing in the background.
    BackgroundLowPower,
}

impl OrientationMode {
    /// Requested interval between sensor events.
    pub const fn sampling_period_us(self) -> u32 {
        match self {
            OrientationMode::Foreground => FOREGROUND_SAMPLING_PERIOD_US,
            OrientationMode::BackgroundLowPower => BACKGROUND_SAMPLING_PERIOD_US,
        }
    }

    /// Maximum time the sensor may hold events before delivering them.
    pub const fn max_report_latency_us(self) -> u32 {
        match self {
            OrientationMode::Foreground => FOREGROUND_MAX_REPORT_LATENCY_US,
            OrientationMode::BackgroundLowPower => BACKGROUND_MAX_REPORT_LATENCY_US,
        }
    }
}

/// Orientation tracking failures. None of them affect playback.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The device has no rotation-vector sensor.
    #[error("no rotation-vector sensor available")]
    SensorUnavailable,

    /// The sensor refused the registration.
    #[error("sensor registration failed: {0}")]
    Registration(String),

    /// The sensor failed to unregister.
    #[error("sensor unregistration failed: {0}")]
    Unregistration(String),
}

/// Callback invoked by a sensor for every reading.
pub type SensorCallback = Arc<dyn Fn(RotationVector) + Send + Sync>;

/// Callback receiving smoothed yaw in degrees, (-180, 180].
pub type YawCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Rotation-vector sensor source.
pub trait RotationSensor: Send + Sync {
    /// Start delivering readings to `callback` at the rate of `mode`.
    fn register(&self, mode: OrientationMode, callback: SensorCallback)
    -> Result<(), TrackerError>;

    /// Stop delivering readings.
    fn unregister(&self) -> Result<(), TrackerError>;
}

/// Current display rotation in degrees (0, 90, 180 or 270).
pub trait DisplayRotationQuery: Send + Sync {
    /// Rotation in degrees; other values are treated as 0.
    fn rotation_degrees(&self) -> i32;
}

/// Display rotation that never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDisplayRotation(pub i32);

impl DisplayRotationQuery for FixedDisplayRotation {
    fn rotation_degrees(&self) -> i32 {
        self.0
    }
}

/// Smoothed head-yaw tracker.
pub struct OrientationTracker {
    sensor: Option<Arc<dyn RotationSensor>>,
    display: Arc<dyn DisplayRotationQuery>,
    on_yaw: YawCallback,
    mode: Mutex<Option<OrientationMode>>,
    smoother: Arc<Mutex<YawSmoother>>,
    /// Bumped on every registration and stop; events from an older
    /// registration are dropped.
    generation: Arc<AtomicU64>,
}

impl OrientationTracker {
    /// Create an idle tracker.
    ///
    /// Pass `None` for `sensor` on devices without a rotation-vector sensor;
    /// every `start` then fails with [`TrackerError::SensorUnavailable`].
    pub fn new(
        sensor: Option<Arc<dyn RotationSensor>>,
        display: Arc<dyn DisplayRotationQuery>,
        on_yaw: YawCallback,
    ) -> Self {
        Self {
            sensor,
            display,
            on_yaw,
            mode: Mutex::new(None),
            smoother: Arc::new(Mutex::new(YawSmoother::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether a sensor is present at all.
    pub fn has_sensor(&self) -> bool {
        self.sensor.is_some()
    }

    /// Mode currently registered, `None` while idle.
    pub fn mode(&self) -> Option<OrientationMode> {
        *self.mode.lock()
    }

    /// Whether the tracker is registered with the sensor.
    pub fn is_tracking(&self) -> bool {
        self.mode.lock().is_some()
    }

    /// Last smoothed yaw since the most recent start.
    pub fn last_yaw(&self) -> Option<f32> {
        self.smoother.lock().last()
    }

    /// Start tracking in `mode`.
    ///
    /// No-op when already tracking in `mode`; switches modes with an
    /// unregister/register cycle otherwise.
    pub fn start(&self, mode: OrientationMode) -> Result<(), TrackerError> {
        let mut current = self.mode.lock();
        if *current == Some(mode) {
            tracing::debug!(?mode, "orientation tracker already running");
            return Ok(());
        }
        let sensor = self
            .sensor
            .as_ref()
            .ok_or(TrackerError::SensorUnavailable)?;

        if current.is_some() {
            self.unregister_locked(&mut current, sensor.as_ref())?;
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        sensor.register(mode, self.event_callback(generation))?;
        *current = Some(mode);
        tracing::info!(
            ?mode,
            sampling_period_us = mode.sampling_period_us(),
            max_report_latency_us = mode.max_report_latency_us(),
            "orientation tracking started"
        );
        Ok(())
    }

    /// Stop tracking and forget the smoothing memory. No-op while idle.
    pub fn stop(&self) -> Result<(), TrackerError> {
        let mut current = self.mode.lock();
        if current.is_none() {
            return Ok(());
        }
        let Some(sensor) = self.sensor.as_ref() else {
            *current = None;
            return Ok(());
        };
        self.unregister_locked(&mut current, sensor.as_ref())?;
        tracing::info!("orientation tracking stopped");
        Ok(())
    }

    /// The tracker is marked idle even when the sensor reports an error, so
    /// a later `start` re-registers instead of assuming a live subscription.
    fn unregister_locked(
        &self,
        current: &mut Option<OrientationMode>,
        sensor: &dyn RotationSensor,
    ) -> Result<(), TrackerError> {
        self.generation.fetch_add(1, Ordering::AcqRel);
        *current = None;
        self.smoother.lock().reset();
        sensor.unregister()
    }

    fn event_callback(&self, generation: u64) -> SensorCallback {
        let display = Arc::clone(&self.display);
        let smoother = Arc::clone(&self.smoother);
        let on_yaw = Arc::clone(&self.on_yaw);
        let live = Arc::clone(&self.generation);

        Arc::new(move |rv: RotationVector| {
            if live.load(Ordering::Acquire) != generation {
                return;
            }
            let raw = raw_yaw(&rv, display.rotation_degrees());
            let smoothed = {
                let mut smoother = smoother.lock();
                // `stop` may have reset the filter since the first check.
                if live.load(Ordering::Acquire) != generation {
                    return;
                }
                smoother.update(raw)
            };
            on_yaw(smoothed);
        })
    }
}

impl std::fmt::Debug for OrientationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrientationTracker")
            .field("has_sensor", &self.has_sensor())
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collecting_tracker(
        sensor: Option<Arc<ReplaySensor>>,
        rotation: i32,
    ) -> (OrientationTracker, Arc<Mutex<Vec<f32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tracker = OrientationTracker::new(
            sensor.map(|s| s as Arc<dyn RotationSensor>),
            Arc::new(FixedDisplayRotation(rotation)),
            Arc::new(move |yaw| sink.lock().push(yaw)),
        );
        (tracker, seen)
    }

    #[test]
    fn mode_presets() {
        assert!(
            OrientationMode::Foreground.sampling_period_us()
                < OrientationMode::BackgroundLowPower.sampling_period_us()
        );
        assert_eq!(OrientationMode::Foreground.max_report_latency_us(), 0);
        assert!(OrientationMode::BackgroundLowPower.max_report_latency_us() > 0);
    }

    #[test]
    fn start_same_mode_is_noop() {
        let sensor = Arc::new(ReplaySensor::new());
        let (tracker, _) = collecting_tracker(Some(sensor.clone()), 0);

        tracker.start(OrientationMode::Foreground).unwrap();
        tracker.start(OrientationMode::Foreground).unwrap();
        assert_eq!(sensor.registrations(), 1);
        assert_eq!(sensor.mode(), Some(OrientationMode::Foreground));
    }

    #[test]
    fn mode_switch_reregisters() {
        let sensor = Arc::new(ReplaySensor::new());
        let (tracker, _) = collecting_tracker(Some(sensor.clone()), 0);

        tracker.start(OrientationMode::Foreground).unwrap();
        tracker.start(OrientationMode::BackgroundLowPower).unwrap();
        assert_eq!(sensor.registrations(), 2);
        assert_eq!(sensor.unregistrations(), 1);
        assert_eq!(tracker.mode(), Some(OrientationMode::BackgroundLowPower));
    }

    #[test]
    fn events_are_smoothed_and_reported() {
        let sensor = Arc::new(ReplaySensor::new());
        let (tracker, seen) = collecting_tracker(Some(sensor.clone()), 0);
        tracker.start(OrientationMode::Foreground).unwrap();

        // Azimuth is the negated rotation about +Z.
        sensor.emit(RotationVector::from_yaw(-179.0));
        sensor.emit(RotationVector::from_yaw(179.0));

        let seen = seen.lock().clone();
        assert_eq!(seen.len(), 2);
        assert!((seen[0] - 179.0).abs() < 1e-3);
        assert!((seen[1] - 179.3).abs() < 1e-2);
        assert_eq!(tracker.last_yaw(), Some(seen[1]));
    }

    #[test]
    fn stop_clears_smoothing_and_drops_late_events() {
        let sensor = Arc::new(ReplaySensor::new());
        let (tracker, seen) = collecting_tracker(Some(sensor.clone()), 0);
        tracker.start(OrientationMode::Foreground).unwrap();
        sensor.emit(RotationVector::from_yaw(-40.0));

        let stale = sensor.callback().unwrap();
        tracker.stop().unwrap();
        assert!(!tracker.is_tracking());
        assert_eq!(tracker.last_yaw(), None);

        stale(RotationVector::from_yaw(-50.0));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn restart_reseeds_from_first_sample() {
        let sensor = Arc::new(ReplaySensor::new());
        let (tracker, seen) = collecting_tracker(Some(sensor.clone()), 0);
        tracker.start(OrientationMode::Foreground).unwrap();
        sensor.emit(RotationVector::from_yaw(-10.0));
        tracker.stop().unwrap();
        tracker.start(OrientationMode::Foreground).unwrap();
        sensor.emit(RotationVector::from_yaw(-100.0));

        let seen = seen.lock().clone();
        assert!((seen[1] - 100.0).abs() < 1e-3);
    }

    #[test]
    fn missing_sensor_fails_start_and_stop_is_harmless() {
        let (tracker, _) = collecting_tracker(None, 0);
        assert!(matches!(
            tracker.start(OrientationMode::Foreground),
            Err(TrackerError::SensorUnavailable)
        ));
        assert!(!tracker.is_tracking());
        assert!(tracker.stop().is_ok());
    }

    #[test]
    fn display_rotation_is_applied() {
        let sensor = Arc::new(ReplaySensor::new());
        let (tracker, seen) = collecting_tracker(Some(sensor.clone()), 90);
        tracker.start(OrientationMode::Foreground).unwrap();
        sensor.emit(RotationVector::from_yaw(0.0));
        assert!((seen.lock()[0] - 90.0).abs() < 1e-3);
    }

    #[test]
    fn registration_failure_leaves_tracker_idle() {
        let sensor = Arc::new(ReplaySensor::new());
        sensor.fail_next_register();
        let (tracker, _) = collecting_tracker(Some(sensor.clone()), 0);
        assert!(matches!(
            tracker.start(OrientationMode::Foreground),
            Err(TrackerError::Registration(_))
        ));
        assert!(!tracker.is_tracking());
        tracker.start(OrientationMode::Foreground).unwrap();
        assert!(tracker.is_tracking());
    }

    /// Display query that parks the first event between the generation
    /// check and the smoother update.
    struct PausingDisplay {
        armed: std::sync::atomic::AtomicBool,
        entered: std::sync::Barrier,
        resume: std::sync::Barrier,
    }

    impl DisplayRotationQuery for PausingDisplay {
        fn rotation_degrees(&self) -> i32 {
            if self.armed.swap(false, Ordering::AcqRel) {
                self.entered.wait();
                self.resume.wait();
            }
            0
        }
    }

    #[test]
    fn event_racing_stop_does_not_seed_smoother() {
        let sensor = Arc::new(ReplaySensor::new());
        let display = Arc::new(PausingDisplay {
            armed: std::sync::atomic::AtomicBool::new(true),
            entered: std::sync::Barrier::new(2),
            resume: std::sync::Barrier::new(2),
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tracker = OrientationTracker::new(
            Some(sensor.clone() as Arc<dyn RotationSensor>),
            display.clone(),
            Arc::new(move |yaw| sink.lock().push(yaw)),
        );
        tracker.start(OrientationMode::Foreground).unwrap();

        let callback = sensor.callback().unwrap();
        let event = std::thread::spawn(move || callback(RotationVector::from_yaw(-40.0)));
        display.entered.wait();
        tracker.stop().unwrap();
        display.resume.wait();
        event.join().unwrap();

        assert_eq!(tracker.last_yaw(), None);
        assert!(seen.lock().is_empty());
    }
}
