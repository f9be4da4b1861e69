use crate::bodies::MassData;
use crate::error::PhysicsError;
use crate::math::{Aabb, Transform2, Vec2};
use crate::shapes::{RayCastInput, RayCastOutput};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A circular collision shape with a local center offset
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct CircleShape {
    /// The center of the circle in local space
    pub position: Vec2,

    /// The radius of the circle
    pub radius: f32,
}

impl CircleShape {
    /// Creates a new circle with the given radius, centered at the local origin
    pub fn new(radius: f32) -> Result<Self> {
        Self::with_position(Vec2::zero(), radius)
    }

    /// Creates a new circle with the given local center and radius
    pub fn with_position(position: Vec2, radius: f32) -> Result<Self> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(PhysicsError::InvalidGeometry(format!(
                "circle radius must be positive, got {radius}"
            )));
        }

        Ok(Self { position, radius })
    }

    /// Computes the mass properties of the circle for the given density
    pub fn compute_mass(&self, density: f32) -> MassData {
        let mass = density * std::f32::consts::PI * self.radius * self.radius;

        // Inertia about the local origin: disc inertia plus the parallel
        // axis term for the center offset
        let inertia = mass * (0.5 * self.radius * self.radius + self.position.length_squared());

        MassData {
            mass,
            center: self.position,
            inertia,
        }
    }

    /// Computes the world-space AABB of the circle
    pub fn compute_aabb(&self, transform: &Transform2) -> Aabb {
        let center = transform.mul_point(self.position);
        Aabb::from_center_half_extents(center, Vec2::new(self.radius, self.radius))
    }

    /// Tests whether a world-space point lies inside the circle
    pub fn test_point(&self, transform: &Transform2, point: Vec2) -> bool {
        let center = transform.mul_point(self.position);
        (point - center).length_squared() <= self.radius * self.radius
    }

    /// Casts a ray against the circle in world space
    pub fn ray_cast(&self, input: &RayCastInput, transform: &Transform2) -> Option<RayCastOutput> {
        let center = transform.mul_point(self.position);

        let s = input.p1 - center;
        let r = input.p2 - input.p1;

        let b = s.length_squared() - self.radius * self.radius;
        let rr = r.length_squared();

        if rr < crate::math::EPSILON {
            return None;
        }

        let c = s.dot(&r);
        let sigma = c * c - rr * b;

        if sigma < 0.0 {
            return None;
        }

        let t = -(c + sigma.sqrt()) / rr;

        if t >= 0.0 && t <= input.max_fraction {
            let normal = (s + r * t).normalize();
            return Some(RayCastOutput {
                normal,
                fraction: t,
            });
        }

        None
    }
}
