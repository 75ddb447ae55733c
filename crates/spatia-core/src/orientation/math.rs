//! Rotation-vector math and wrap-aware yaw smoothing.
//!
//! All angles are degrees. Yaw lives on a circle, so every value that leaves
//! this module is normalized into (-180, 180] and every difference is taken
//! along the shorter arc.

/// Fraction of the angular delta applied per sample.
pub const SMOOTHING_FACTOR: f32 = 0.15;

/// Deltas below this many degrees are treated as sensor noise.
pub const NOISE_GATE_DEG: f32 = 0.2;

/// Row-major 3×3 rotation matrix.
pub type RotationMatrix = [f32; 9];

/// Identity rotation.
pub const IDENTITY: RotationMatrix = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Rotation-vector sensor reading: the vector part of a unit quaternion,
/// with the scalar part when the sensor reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationVector {
    /// `x · sin(θ/2)`
    pub x: f32,
    /// `y · sin(θ/2)`
    pub y: f32,
    /// `z · sin(θ/2)`
    pub z: f32,
    /// `cos(θ/2)`; derived from the vector part when absent.
    pub w: Option<f32>,
}

impl RotationVector {
    /// Reading with an explicit scalar component.
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w: Some(w) }
    }

    /// Reading from a sensor that omits the scalar component.
    pub const fn without_scalar(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: None }
    }

    /// Rotation of `yaw_deg` about the vertical (Z) axis.
    pub fn from_yaw(yaw_deg: f32) -> Self {
        let half = yaw_deg.to_radians() * 0.5;
        Self::new(0.0, 0.0, half.sin(), half.cos())
    }

    fn scalar(&self) -> f32 {
        self.w.unwrap_or_else(|| {
            let w2 = 1.0 - self.x * self.x - self.y * self.y - self.z * self.z;
            if w2 > 0.0 { w2.sqrt() } else { 0.0 }
        })
    }
}

/// Convert a rotation vector to a rotation matrix.
pub fn rotation_matrix(rv: &RotationVector) -> RotationMatrix {
    let (q1, q2, q3, q0) = (rv.x, rv.y, rv.z, rv.scalar());

    let sq_q1 = 2.0 * q1 * q1;
    let sq_q2 = 2.0 * q2 * q2;
    let sq_q3 = 2.0 * q3 * q3;
    let q1_q2 = 2.0 * q1 * q2;
    let q3_q0 = 2.0 * q3 * q0;
    let q1_q3 = 2.0 * q1 * q3;
    let q2_q0 = 2.0 * q2 * q0;
    let q2_q3 = 2.0 * q2 * q3;
    let q1_q0 = 2.0 * q1 * q0;

    [
        1.0 - sq_q2 - sq_q3,
        q1_q2 - q3_q0,
        q1_q3 + q2_q0,
        q1_q2 + q3_q0,
        1.0 - sq_q1 - sq_q3,
        q2_q3 - q1_q0,
        q1_q3 - q2_q0,
        q2_q3 + q1_q0,
        1.0 - sq_q1 - sq_q2,
    ]
}

/// Device axis, optionally negated, used to remap a rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// +X
    X,
    /// +Y
    Y,
    /// +Z
    Z,
    /// -X
    MinusX,
    /// -Y
    MinusY,
    /// -Z
    MinusZ,
}

impl Axis {
    const fn index(self) -> usize {
        match self {
            Axis::X | Axis::MinusX => 0,
            Axis::Y | Axis::MinusY => 1,
            Axis::Z | Axis::MinusZ => 2,
        }
    }

    const fn negated(self) -> bool {
        matches!(self, Axis::MinusX | Axis::MinusY | Axis::MinusZ)
    }
}

/// Express `r` in a coordinate system whose X and Y axes are the given
/// device axes. Z is implied by the right-hand rule.
///
/// Returns `None` when `x` and `y` name the same axis.
pub fn remap_coordinate_system(r: &RotationMatrix, x: Axis, y: Axis) -> Option<RotationMatrix> {
    let (xi, yi) = (x.index(), y.index());
    if xi == yi {
        return None;
    }
    let zi = 3 - xi - yi;
    // Z flips when the X/Y signs differ, and again when (x, y, z) is not a
    // cyclic permutation of the device axes.
    let cyclic = yi == (xi + 1) % 3;
    let z_negated = x.negated() ^ y.negated() ^ !cyclic;

    let mut out = [0.0; 9];
    for row in 0..3 {
        let base = row * 3;
        let pick = |col: usize, negate: bool| {
            let v = r[base + col];
            if negate { -v } else { v }
        };
        out[base + xi] = pick(0, x.negated());
        out[base + yi] = pick(1, y.negated());
        out[base + zi] = pick(2, z_negated);
    }
    Some(out)
}

/// Display rotation relative to the device's natural orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRotation {
    /// Natural orientation.
    Rotation0,
    /// Rotated 90°.
    Rotation90,
    /// Rotated 180°.
    Rotation180,
    /// Rotated 270°.
    Rotation270,
}

impl DisplayRotation {
    /// Parse a rotation in degrees; only 0, 90, 180 and 270 are recognized.
    pub const fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees {
            0 => Some(DisplayRotation::Rotation0),
            90 => Some(DisplayRotation::Rotation90),
            180 => Some(DisplayRotation::Rotation180),
            270 => Some(DisplayRotation::Rotation270),
            _ => None,
        }
    }

    /// Axis remap table for this rotation.
    pub const fn remap_axes(self) -> (Axis, Axis) {
        match self {
            DisplayRotation::Rotation0 => (Axis::X, Axis::Y),
            DisplayRotation::Rotation90 => (Axis::Y, Axis::MinusX),
            DisplayRotation::Rotation180 => (Axis::MinusX, Axis::MinusY),
            DisplayRotation::Rotation270 => (Axis::MinusY, Axis::X),
        }
    }
}

/// Remap `r` for the given display rotation in degrees.
///
/// Unrecognized rotations leave the matrix unchanged.
pub fn remap_for_display(r: &RotationMatrix, rotation_degrees: i32) -> RotationMatrix {
    DisplayRotation::from_degrees(rotation_degrees)
        .and_then(|rotation| {
            let (x, y) = rotation.remap_axes();
            remap_coordinate_system(r, x, y)
        })
        .unwrap_or(*r)
}

/// Azimuth of a rotation matrix in degrees, normalized into (-180, 180].
pub fn yaw_degrees(r: &RotationMatrix) -> f32 {
    normalize_degrees(r[1].atan2(r[4]).to_degrees())
}

/// Yaw of a raw sensor reading after display-rotation compensation.
pub fn raw_yaw(rv: &RotationVector, rotation_degrees: i32) -> f32 {
    let r = rotation_matrix(rv);
    yaw_degrees(&remap_for_display(&r, rotation_degrees))
}

/// Wrap an angle into (-180, 180].
pub fn normalize_degrees(deg: f32) -> f32 {
    let mut a = deg % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// Signed difference `to - from` along the shorter arc, in [-180, 180].
pub fn shortest_delta(from: f32, to: f32) -> f32 {
    let mut delta = to - from;
    if !delta.is_finite() {
        return 0.0;
    }
    while delta > 180.0 {
        delta -= 360.0;
    }
    while delta < -180.0 {
        delta += 360.0;
    }
    delta
}

/// Exponential yaw smoother that follows the shorter arc across ±180°.
#[derive(Debug, Clone, Copy, Default)]
pub struct YawSmoother {
    last: f32,
    has_last: bool,
}

impl YawSmoother {
    /// Empty smoother; the first sample seeds it.
    pub const fn new() -> Self {
        Self {
            last: 0.0,
            has_last: false,
        }
    }

    /// Feed a raw yaw and return the smoothed yaw.
    ///
    /// Non-finite input is ignored and the previous value returned.
    pub fn update(&mut self, raw_deg: f32) -> f32 {
        if !raw_deg.is_finite() {
            return self.last;
        }
        let raw = normalize_degrees(raw_deg);
        if !self.has_last {
            self.last = raw;
            self.has_last = true;
            return raw;
        }

        let delta = shortest_delta(self.last, raw);
        if delta.abs() < NOISE_GATE_DEG {
            return self.last;
        }
        self.last = normalize_degrees(self.last + SMOOTHING_FACTOR * delta);
        self.last
    }

    /// Last smoothed value, if any sample has been seen since the last reset.
    pub fn last(&self) -> Option<f32> {
        self.has_last.then_some(self.last)
    }

    /// Forget the smoothing memory.
    pub fn reset(&mut self) {
        self.has_last = false;
        self.last = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32, tol: f32) {
        assert!((a - b).abs() <= tol, "{a} vs {b} (tol {tol})");
    }

    #[test]
    fn normalization_range() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(180.0), 180.0);
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(190.0), -170.0);
        assert_eq!(normalize_degrees(-190.0), 170.0);
        assert_eq!(normalize_degrees(540.0), 180.0);
        assert_eq!(normalize_degrees(-720.0), 0.0);
    }

    #[test]
    fn shortest_delta_crosses_the_seam() {
        assert_close(shortest_delta(179.0, -179.0), 2.0, 1e-4);
        assert_close(shortest_delta(-179.0, 179.0), -2.0, 1e-4);
        assert_close(shortest_delta(10.0, 20.0), 10.0, 1e-6);
        assert_eq!(shortest_delta(0.0, f32::INFINITY), 0.0);
    }

    #[test]
    fn smoother_wraps_across_180() {
        let mut smoother = YawSmoother::new();
        assert_eq!(smoother.update(179.0), 179.0);
        let out = smoother.update(-179.0);
        assert_close(out, 179.3, 1e-4);
        assert!(out > -180.0 && out <= 180.0);
    }

    #[test]
    fn smoother_wraps_past_180_into_negative() {
        let mut smoother = YawSmoother::new();
        smoother.update(179.9);
        // delta = +4.1, step = 0.615 → 180.515 → -179.485
        let out = smoother.update(-176.0);
        assert_close(out, -179.485, 1e-3);
    }

    #[test]
    fn noise_gate_holds_previous_value() {
        let mut smoother = YawSmoother::new();
        smoother.update(10.0);
        assert_eq!(smoother.update(10.1), 10.0);
        assert_eq!(smoother.update(9.9), 10.0);
    }

    #[test]
    fn smoother_reset_reseeds() {
        let mut smoother = YawSmoother::new();
        smoother.update(45.0);
        smoother.reset();
        assert_eq!(smoother.last(), None);
        assert_eq!(smoother.update(-90.0), -90.0);
    }

    #[test]
    fn smoother_ignores_nan() {
        let mut smoother = YawSmoother::new();
        smoother.update(30.0);
        assert_eq!(smoother.update(f32::NAN), 30.0);
    }

    #[test]
    fn identity_quaternion_is_identity_matrix() {
        let r = rotation_matrix(&RotationVector::new(0.0, 0.0, 0.0, 1.0));
        for (a, b) in r.iter().zip(IDENTITY.iter()) {
            assert_close(*a, *b, 1e-6);
        }
    }

    #[test]
    fn scalar_is_derived_when_missing() {
        let with = rotation_matrix(&RotationVector::from_yaw(30.0));
        let rv = RotationVector::from_yaw(30.0);
        let without = rotation_matrix(&RotationVector::without_scalar(rv.x, rv.y, rv.z));
        for (a, b) in with.iter().zip(without.iter()) {
            assert_close(*a, *b, 1e-5);
        }
    }

    #[test]
    fn yaw_about_z_is_recovered_with_azimuth_sign() {
        // Azimuth grows clockwise seen from above, the opposite of a
        // counter-clockwise rotation about +Z.
        for &deg in &[0.0f32, 30.0, -45.0, 120.0, -170.0] {
            let yaw = raw_yaw(&RotationVector::from_yaw(deg), 0);
            assert_close(yaw, normalize_degrees(-deg), 1e-3);
        }
    }

    #[test]
    fn display_rotation_shifts_yaw_by_quarter_turns() {
        let rv = RotationVector::from_yaw(0.0);
        assert_close(raw_yaw(&rv, 90), 90.0, 1e-3);
        assert_close(raw_yaw(&rv, 180).abs(), 180.0, 1e-3);
        assert_close(raw_yaw(&rv, 270), -90.0, 1e-3);
    }

    #[test]
    fn unknown_display_rotation_is_identity() {
        let r = rotation_matrix(&RotationVector::from_yaw(25.0));
        assert_eq!(remap_for_display(&r, 45), r);
        assert_eq!(remap_for_display(&r, -1), r);
        assert_eq!(remap_for_display(&r, 0), r);
    }

    #[test]
    fn remap_rejects_repeated_axis() {
        assert!(remap_coordinate_system(&IDENTITY, Axis::X, Axis::MinusX).is_none());
    }

    #[test]
    fn remapped_matrix_stays_a_rotation() {
        let r = rotation_matrix(&RotationVector::new(0.1, 0.2, 0.3, 0.927));
        for deg in [90, 180, 270] {
            let m = remap_for_display(&r, deg);
            // det = +1 for a proper rotation
            let det = m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
                + m[2] * (m[3] * m[7] - m[4] * m[6]);
            assert_close(det, 1.0, 1e-2);
        }
    }
}
