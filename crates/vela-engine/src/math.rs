//! Small vector math used by components and adapters.
//!
//! Components store `f64`; the physics adapter converts to rapier's `Real` at
//! the boundary the same way positions cross into the solver.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::{Real, Vector};

/// A 3-component vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    /// Right.
    pub x: f64,
    /// Up.
    pub y: f64,
    /// Toward the default camera; forward is `-z`.
    pub z: f64,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Unit scale.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    /// World up, `+Y`.
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);

    /// Create a vector from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Dot product.
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Unit vector in the same direction; zero stays zero.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > f64::EPSILON {
            self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }

    /// Linear interpolation; `t = 0` gives `self`, `t = 1` gives `other`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self) * t
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Self) -> f64 {
        (other - self).length()
    }

    pub(crate) fn to_rapier(self) -> Vector<Real> {
        Vector::new(self.x as Real, self.y as Real, self.z as Real)
    }

    pub(crate) fn from_rapier(v: &Vector<Real>) -> Self {
        Self::new(v.x as f64, v.y as f64, v.z as f64)
    }

    /// `[x, y, z]`.
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// A rotation quaternion `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quat {
    /// Vector part, `i` component.
    pub x: f64,
    /// Vector part, `j` component.
    pub y: f64,
    /// Vector part, `k` component.
    pub z: f64,
    /// Scalar part.
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// No rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation from XYZ Euler angles in radians.
    pub fn from_euler(euler: Vec3) -> Self {
        Self::from_rapier(&UnitQuaternion::from_euler_angles(
            euler.x as Real,
            euler.y as Real,
            euler.z as Real,
        ))
    }

    /// XYZ Euler angles in radians.
    pub fn to_euler(self) -> Vec3 {
        let (roll, pitch, yaw) = self.to_rapier().euler_angles();
        Vec3::new(roll as f64, pitch as f64, yaw as f64)
    }

    pub(crate) fn to_rapier(self) -> UnitQuaternion<Real> {
        UnitQuaternion::from_quaternion(rapier3d::na::Quaternion::new(
            self.w as Real,
            self.x as Real,
            self.y as Real,
            self.z as Real,
        ))
    }

    pub(crate) fn from_rapier(q: &UnitQuaternion<Real>) -> Self {
        Self {
            x: q.i as f64,
            y: q.j as f64,
            z: q.k as f64,
            w: q.w as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_handles_zero() {
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
        let n = Vec3::new(3.0, 0.0, 4.0).normalized();
        assert!((n.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lerp_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 4.0, -2.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vec3::new(1.0, 2.0, -1.0));
    }

    #[test]
    fn euler_roundtrip_within_f32_precision() {
        let euler = Vec3::new(0.3, -0.7, 1.1);
        let back = Quat::from_euler(euler).to_euler();
        assert!((back.x - euler.x).abs() < 1e-5);
        assert!((back.y - euler.y).abs() < 1e-5);
        assert!((back.z - euler.z).abs() < 1e-5);
    }

    #[test]
    fn identity_quat_is_zero_euler() {
        let e = Quat::IDENTITY.to_euler();
        assert!(e.length() < 1e-9);
    }
}
