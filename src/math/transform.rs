use crate::math::{Rot, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Represents a rigid transformation in 2D space (position and rotation)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Transform2 {
    /// Position in 2D space
    pub position: Vec2,

    /// Rotation around the z axis
    pub rotation: Rot,
}

impl Transform2 {
    /// Creates a new transform with the given position and rotation
    #[inline]
    pub fn new(position: Vec2, rotation: Rot) -> Self {
        Self { position, rotation }
    }

    /// Creates a new identity transform (no translation, no rotation)
    #[inline]
    pub fn identity() -> Self {
        Self {
            position: Vec2::zero(),
            rotation: Rot::identity(),
        }
    }

    /// Creates a new transform from a position and an angle in radians
    #[inline]
    pub fn from_position_angle(position: Vec2, angle: f32) -> Self {
        Self {
            position,
            rotation: Rot::new(angle),
        }
    }

    /// Transforms a point from local space to world space
    #[inline]
    pub fn mul_point(&self, point: Vec2) -> Vec2 {
        self.rotation.rotate(point) + self.position
    }

    /// Transforms a point from world space to local space
    #[inline]
    pub fn mul_point_inverse(&self, point: Vec2) -> Vec2 {
        self.rotation.rotate_inverse(point - self.position)
    }

    /// Rotates a vector from local space to world space (ignores translation)
    #[inline]
    pub fn mul_vector(&self, v: Vec2) -> Vec2 {
        self.rotation.rotate(v)
    }

    /// Rotates a vector from world space to local space (ignores translation)
    #[inline]
    pub fn mul_vector_inverse(&self, v: Vec2) -> Vec2 {
        self.rotation.rotate_inverse(v)
    }

    /// Computes the transform that maps local space of `b` into local space of `a`
    #[inline]
    pub fn mul_transpose(a: &Transform2, b: &Transform2) -> Transform2 {
        Transform2 {
            rotation: a.rotation.mul_transpose(&b.rotation),
            position: a.rotation.rotate_inverse(b.position - a.position),
        }
    }
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::identity()
    }
}

/// Motion of a body's center of mass over one step, for TOI interpolation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Sweep {
    /// Local center of mass of the body
    pub local_center: Vec2,

    /// World center of mass at the start of the step
    pub c0: Vec2,

    /// World center of mass at the end of the step
    pub c: Vec2,

    /// Angle at the start of the step
    pub a0: f32,

    /// Angle at the end of the step
    pub a: f32,
}

impl Sweep {
    /// Interpolates the body transform at the normalized time `beta` in [0, 1]
    pub fn transform_at(&self, beta: f32) -> Transform2 {
        let center = self.c0.lerp(&self.c, beta);
        let angle = crate::math::lerp(self.a0, self.a, beta);
        let rotation = Rot::new(angle);

        Transform2 {
            position: center - rotation.rotate(self.local_center),
            rotation,
        }
    }

    /// Advances the start of the sweep to the normalized time `beta`
    pub fn advance(&mut self, beta: f32) {
        self.c0 = self.c0.lerp(&self.c, beta);
        self.a0 = crate::math::lerp(self.a0, self.a, beta);
    }

    /// Resets the start of the sweep to the current end state
    pub fn reset(&mut self) {
        self.c0 = self.c;
        self.a0 = self.a;
    }
}
