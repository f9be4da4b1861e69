use crate::error::PhysicsError;
use crate::math::{Aabb, Transform2, Vec2};
use crate::shapes::{RayCastInput, RayCastOutput};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Skin radius applied to edges so contacts form slightly before overlap
const EDGE_RADIUS: f32 = 0.01;

/// A single line segment collision shape
///
/// Edges are one-sided only in the sense that they have no interior; they
/// collide from both sides and contribute no mass.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct EdgeShape {
    /// First endpoint in local space
    pub v1: Vec2,

    /// Second endpoint in local space
    pub v2: Vec2,

    /// The skin radius of the edge
    pub radius: f32,
}

impl EdgeShape {
    /// Creates a new edge from two distinct local points
    pub fn new(v1: Vec2, v2: Vec2) -> Result<Self> {
        if v1.distance_squared(&v2) < 1.0e-8 {
            return Err(PhysicsError::InvalidGeometry(
                "edge endpoints must be distinct".to_string(),
            ));
        }

        Ok(Self {
            v1,
            v2,
            radius: EDGE_RADIUS,
        })
    }

    /// Computes the world-space AABB of the edge
    pub fn compute_aabb(&self, transform: &Transform2) -> Aabb {
        let p1 = transform.mul_point(self.v1);
        let p2 = transform.mul_point(self.v2);

        Aabb::new(p1.min(&p2), p1.max(&p2)).expanded(self.radius)
    }

    /// Casts a ray against the edge in world space
    pub fn ray_cast(&self, input: &RayCastInput, transform: &Transform2) -> Option<RayCastOutput> {
        let p1 = transform.mul_point_inverse(input.p1);
        let p2 = transform.mul_point_inverse(input.p2);
        let d = p2 - p1;

        let e = self.v2 - self.v1;
        let normal = e.perp().normalize();

        // Solve p1 + t * d = v1 + s * e
        let denominator = normal.dot(&d);
        if denominator.abs() < crate::math::EPSILON {
            return None;
        }

        let t = normal.dot(&(self.v1 - p1)) / denominator;
        if t < 0.0 || t > input.max_fraction {
            return None;
        }

        let q = p1 + d * t;

        let ee = e.length_squared();
        if ee < crate::math::EPSILON {
            return None;
        }

        let s = (q - self.v1).dot(&e) / ee;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        // Report the normal facing the ray origin
        let normal = if normal.dot(&d) > 0.0 { -normal } else { normal };

        Some(RayCastOutput {
            normal: transform.mul_vector(normal),
            fraction: t,
        })
    }
}
