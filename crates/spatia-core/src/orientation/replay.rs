//! In-process [`RotationSensor`] driven by the caller.
//!
//! Used by the CLI to replay recorded head motion and by tests. Readings are
//! delivered synchronously on the thread that calls [`ReplaySensor::emit`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{OrientationMode, RotationSensor, RotationVector, SensorCallback, TrackerError};

/// Sensor whose readings are pushed by the caller.
#[derive(Default)]
pub struct ReplaySensor {
    active: Mutex<Option<(OrientationMode, SensorCallback)>>,
    registrations: AtomicUsize,
    unregistrations: AtomicUsize,
    fail_register: AtomicBool,
}

impl ReplaySensor {
    /// Create an unregistered sensor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one reading. Dropped while nothing is registered.
    pub fn emit(&self, reading: RotationVector) {
        // Clone out so the callback runs without the registration lock.
        if let Some(callback) = self.callback() {
            callback(reading);
        }
    }

    /// Deliver every reading in order; returns how many were delivered.
    pub fn replay(&self, readings: impl IntoIterator<Item = RotationVector>) -> usize {
        let mut delivered = 0;
        for reading in readings {
            let Some(callback) = self.callback() else {
                break;
            };
            callback(reading);
            delivered += 1;
        }
        delivered
    }

    /// Currently registered callback.
    pub fn callback(&self) -> Option<SensorCallback> {
        self.active.lock().as_ref().map(|(_, cb)| cb.clone())
    }

    /// Mode of the current registration.
    pub fn mode(&self) -> Option<OrientationMode> {
        self.active.lock().as_ref().map(|(mode, _)| *mode)
    }

    /// Successful registrations so far.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::Relaxed)
    }

    /// Unregistrations so far.
    pub fn unregistrations(&self) -> usize {
        self.unregistrations.load(Ordering::Relaxed)
    }

    /// Make the next `register` call fail.
    pub fn fail_next_register(&self) {
        self.fail_register.store(true, Ordering::Relaxed);
    }
}

impl RotationSensor for ReplaySensor {
    fn register(
        &self,
        mode: OrientationMode,
        callback: SensorCallback,
    ) -> Result<(), TrackerError> {
        if self.fail_register.swap(false, Ordering::Relaxed) {
            return Err(TrackerError::Registration("replay sensor refused".into()));
        }
        *self.active.lock() = Some((mode, callback));
        self.registrations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn unregister(&self) -> Result<(), TrackerError> {
        self.active.lock().take();
        self.unregistrations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl std::fmt::Debug for ReplaySensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaySensor")
            .field("mode", &self.mode())
            .field("registrations", &self.registrations())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn replay_stops_delivering_after_unregister() {
        let sensor = ReplaySensor::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        sensor
            .register(
                OrientationMode::Foreground,
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
            )
            .unwrap();

        let readings = (0..4).map(|i| RotationVector::from_yaw(i as f32 * 10.0));
        assert_eq!(sensor.replay(readings), 4);
        sensor.unregister().unwrap();
        sensor.emit(RotationVector::from_yaw(0.0));
        assert_eq!(hits.load(Ordering::Relaxed), 4);
        assert_eq!(sensor.replay([RotationVector::from_yaw(1.0)]), 0);
    }
}
