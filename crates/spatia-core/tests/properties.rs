//! Property-based tests for spatia-core conversions and orientation math.
//!
//! Checks PCM clamping bounds, i16 round trips, yaw normalization and the
//! wrap-aware smoother using proptest for randomized input generation.

use proptest::prelude::*;
use spatia_core::orientation::{YawSmoother, normalize_degrees, shortest_delta};
use spatia_core::pcm::{I16_MAX_AS_F32, decode_i16_le, f32_to_i16, i16_to_f32, i16_to_le_bytes};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every 16-bit sample survives decode then encode unchanged.
    #[test]
    fn i16_round_trip(samples in proptest::collection::vec(any::<i16>(), 2..256)) {
        let bytes = i16_to_le_bytes(&samples);
        let mut staged = vec![0.0f32; samples.len()];
        let decoded = decode_i16_le(&bytes, &mut staged);
        prop_assert_eq!(decoded, samples.len());
        for (orig, s) in samples.iter().zip(&staged) {
            prop_assert!((-1.0..=I16_MAX_AS_F32).contains(s));
            prop_assert_eq!(f32_to_i16(*s), *orig);
        }
    }

    /// Any finite float encodes within one LSB of its clamped value, and
    /// never wraps.
    #[test]
    fn f32_encode_is_clamped(x in -4.0f32..4.0) {
        let encoded = f32_to_i16(x);
        if x >= I16_MAX_AS_F32 {
            prop_assert_eq!(encoded, i16::MAX);
        } else if x <= -1.0 {
            prop_assert_eq!(encoded, i16::MIN);
        } else {
            let expected = x * 32768.0;
            prop_assert!((f32::from(encoded) - expected).abs() <= 1.0);
            prop_assert_eq!(encoded.signum(), (expected.round() as i16).signum());
        }
        prop_assert!((i16_to_f32(encoded) - x.clamp(-1.0, I16_MAX_AS_F32)).abs() <= 1.0 / 32768.0);
    }

    /// Normalization lands in (-180, 180] and preserves the angle mod 360.
    #[test]
    fn normalize_range(deg in -10_000.0f32..10_000.0) {
        let n = normalize_degrees(deg);
        prop_assert!(n > -180.0 && n <= 180.0, "{} -> {}", deg, n);
        let diff = (deg - n).rem_euclid(360.0);
        prop_assert!(diff < 1e-2 || (360.0 - diff) < 1e-2);
    }

    /// The shortest delta never exceeds half a turn.
    #[test]
    fn delta_is_shortest(from in -180.0f32..=180.0, to in -180.0f32..=180.0) {
        let d = shortest_delta(from, to);
        prop_assert!((-180.0..=180.0).contains(&d));
        let landed = normalize_degrees(from + d);
        let target = normalize_degrees(to);
        let err = shortest_delta(landed, target).abs();
        prop_assert!(err < 1e-3);
    }

    /// Smoothed output stays normalized and each step moves at most 15% of
    /// the circular distance to the raw reading.
    #[test]
    fn smoother_steps_are_bounded(readings in proptest::collection::vec(-180.0f32..=180.0, 1..64)) {
        let mut smoother = YawSmoother::new();
        let mut previous: Option<f32> = None;
        for raw in readings {
            let out = smoother.update(raw);
            prop_assert!(out > -180.0 && out <= 180.0);
            if let Some(prev) = previous {
                let step = shortest_delta(prev, out).abs();
                let distance = shortest_delta(prev, raw).abs();
                prop_assert!(step <= 0.15 * distance + 1e-3);
            }
            previous = Some(out);
        }
    }
}
