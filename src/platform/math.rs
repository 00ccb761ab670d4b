//! Attitude composition with 3-2-1 rotation matrices
//!
//! An attitude `(heading, pitch, roll)` in degrees maps to the rotation
//! `Rz(heading) * Ry(pitch) * Rx(roll)`. Mounting offsets are composed by
//! multiplying these matrices and the result is split back into angles.

use serde::{Deserialize, Serialize};

/// A 3x3 rotation matrix, row major
pub type Matrix = [[f64; 3]; 3];

/// Angles in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Attitude {
    /// Heading (yaw) about the vertical axis
    pub heading: f64,
    /// Roll about the forward axis
    pub roll: f64,
    /// Pitch about the starboard axis
    pub pitch: f64,
}

impl Attitude {
    /// Create an attitude from heading, roll and pitch in degrees
    pub fn new(heading: f64, roll: f64, pitch: f64) -> Attitude {
        Attitude {
            heading,
            roll,
            pitch,
        }
    }

    /// Return `true` when all three angles are zero
    pub fn is_zero(&self) -> bool {
        self.heading == 0.0 && self.roll == 0.0 && self.pitch == 0.0
    }

    /// The rotation matrix of this attitude
    pub fn matrix(&self) -> Matrix {
        let (sh, ch) = self.heading.to_radians().sin_cos();
        let (sp, cp) = self.pitch.to_radians().sin_cos();
        let (sr, cr) = self.roll.to_radians().sin_cos();
        [
            [ch * cp, ch * sp * sr - sh * cr, ch * sp * cr + sh * sr],
            [sh * cp, sh * sp * sr + ch * cr, sh * sp * cr - ch * sr],
            [-sp, cp * sr, cp * cr],
        ]
    }

    /// Split a rotation matrix back into angles
    ///
    /// The heading is folded into [0, 360).
    pub fn from_matrix(m: &Matrix) -> Attitude {
        let pitch = (-m[2][0]).clamp(-1.0, 1.0).asin();
        let roll = m[2][1].atan2(m[2][2]);
        let heading = m[1][0].atan2(m[0][0]);
        Attitude {
            heading: crate::geodesy::fold_heading(heading.to_degrees()),
            roll: roll.to_degrees(),
            pitch: pitch.to_degrees(),
        }
    }
}

/// Matrix product `a * b`
pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let mut m = [[0.0; 3]; 3];
    for (i, row) in m.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    m
}

/// Matrix transpose, the inverse of a rotation
pub fn transpose(a: &Matrix) -> Matrix {
    let mut m = [[0.0; 3]; 3];
    for (i, row) in m.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = a[j][i];
        }
    }
    m
}

/// Attitude of the platform given the attitude measured by a sensor
/// mounted with `offset`
pub fn attitude_platform(measured: Attitude, offset: Attitude) -> Attitude {
    Attitude::from_matrix(&multiply(&measured.matrix(), &transpose(&offset.matrix())))
}

/// Mounting of a target sensor relative to the attitude sensor
pub fn attitude_offset(target: Attitude, reference: Attitude) -> Attitude {
    Attitude::from_matrix(&multiply(&transpose(&reference.matrix()), &target.matrix()))
}

/// Attitude of a target sensor given the measured attitude and the target
/// offset relative to the attitude sensor
pub fn attitude_target(measured: Attitude, offset: Attitude) -> Attitude {
    Attitude::from_matrix(&multiply(&measured.matrix(), &offset.matrix()))
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_attitude_eq(a: Attitude, b: Attitude) {
        assert_abs_diff_eq!(a.heading, b.heading, epsilon = 1e-9);
        assert_abs_diff_eq!(a.roll, b.roll, epsilon = 1e-9);
        assert_abs_diff_eq!(a.pitch, b.pitch, epsilon = 1e-9);
    }

    #[test]
    fn test_matrix_round_trip() {
        let a = Attitude::new(123.0, -4.5, 7.25);
        assert_attitude_eq(Attitude::from_matrix(&a.matrix()), a);
        let m = a.matrix();
        let i = multiply(&m, &transpose(&m));
        for (r, row) in i.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                assert_abs_diff_eq!(*v, if r == c { 1.0 } else { 0.0 }, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_zero_offset_is_identity() {
        let a = Attitude::new(45.0, 2.0, -1.0);
        assert_attitude_eq(attitude_platform(a, Attitude::default()), a);
        assert_attitude_eq(attitude_target(a, Attitude::default()), a);
        let o = attitude_offset(a, a);
        assert_abs_diff_eq!(o.roll, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(o.pitch, 0.0, epsilon = 1e-9);
        assert!(o.heading < 1e-9 || o.heading > 360.0 - 1e-9);
    }

    #[test]
    fn test_platform_then_target_recovers_measurement() {
        let measured = Attitude::new(10.0, 3.0, -2.0);
        let mount = Attitude::new(1.5, 0.5, 0.25);
        let platform = attitude_platform(measured, mount);
        assert_attitude_eq(attitude_target(platform, mount), measured);
    }

    #[test]
    fn test_heading_offset_adds() {
        let t = attitude_target(Attitude::new(350.0, 0.0, 0.0), Attitude::new(20.0, 0.0, 0.0));
        assert_abs_diff_eq!(t.heading, 10.0, epsilon = 1e-9);
    }
}
