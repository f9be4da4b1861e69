use crate::bodies::MassData;
use crate::error::PhysicsError;
use crate::math::{Aabb, Transform2, Vec2};
use crate::shapes::{RayCastInput, RayCastOutput};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Maximum number of vertices a convex polygon may have
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Skin radius applied to polygons so contacts form slightly before overlap
const POLYGON_RADIUS: f32 = 0.01;

/// A convex polygon collision shape with counter-clockwise winding
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct PolygonShape {
    /// The vertices of the polygon in local space, counter-clockwise
    pub vertices: Vec<Vec2>,

    /// The outward edge normals, one per vertex
    pub normals: Vec<Vec2>,

    /// The centroid of the polygon in local space
    pub centroid: Vec2,

    /// The skin radius of the polygon
    pub radius: f32,
}

impl PolygonShape {
    /// Creates a convex polygon from the given vertices
    ///
    /// The vertices must describe a convex, counter-clockwise polygon with
    /// at least 3 and at most [`MAX_POLYGON_VERTICES`] points and non-zero
    /// area, otherwise `InvalidGeometry` is returned.
    pub fn new(vertices: &[Vec2]) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(PhysicsError::InvalidGeometry(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }

        if vertices.len() > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::InvalidGeometry(format!(
                "polygon supports at most {MAX_POLYGON_VERTICES} vertices, got {}",
                vertices.len()
            )));
        }

        let n = vertices.len();

        // Reject repeated or near-coincident vertices
        for i in 0..n {
            for j in (i + 1)..n {
                if vertices[i].distance_squared(&vertices[j]) < 1.0e-8 {
                    return Err(PhysicsError::InvalidGeometry(
                        "polygon has coincident vertices".to_string(),
                    ));
                }
            }
        }

        // All cross products of consecutive edges must be positive for a
        // convex counter-clockwise polygon
        let mut area = 0.0;
        for i in 0..n {
            let v0 = vertices[i];
            let v1 = vertices[(i + 1) % n];
            let v2 = vertices[(i + 2) % n];

            let e1 = v1 - v0;
            let e2 = v2 - v1;

            if e1.cross(&e2) <= 0.0 {
                return Err(PhysicsError::InvalidGeometry(
                    "polygon is not convex with counter-clockwise winding".to_string(),
                ));
            }

            area += v0.cross(&v1);
        }

        if area * 0.5 < crate::math::EPSILON {
            return Err(PhysicsError::InvalidGeometry(
                "polygon has zero area".to_string(),
            ));
        }

        let mut normals = Vec::with_capacity(n);
        for i in 0..n {
            let edge = vertices[(i + 1) % n] - vertices[i];
            normals.push(edge.perp_right().normalize());
        }

        let centroid = Self::compute_centroid(vertices);

        Ok(Self {
            vertices: vertices.to_vec(),
            normals,
            centroid,
            radius: POLYGON_RADIUS,
        })
    }

    /// Creates an axis-aligned box with the given half extents, centered at
    /// the local origin
    pub fn new_box(half_width: f32, half_height: f32) -> Result<Self> {
        Self::new(&[
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, -half_height),
            Vec2::new(half_width, half_height),
            Vec2::new(-half_width, half_height),
        ])
    }

    /// Creates a box with the given half extents, centered at `center` and
    /// rotated by `angle`
    pub fn new_box_at(half_width: f32, half_height: f32, center: Vec2, angle: f32) -> Result<Self> {
        let transform = Transform2::from_position_angle(center, angle);
        let corners = [
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, -half_height),
            Vec2::new(half_width, half_height),
            Vec2::new(-half_width, half_height),
        ];

        let vertices: Vec<Vec2> = corners.iter().map(|&v| transform.mul_point(v)).collect();
        Self::new(&vertices)
    }

    /// Returns the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn compute_centroid(vertices: &[Vec2]) -> Vec2 {
        let n = vertices.len();
        let mut centroid = Vec2::zero();
        let mut area = 0.0;

        // Use the first vertex as the fan origin
        let origin = vertices[0];

        for i in 1..(n - 1) {
            let e1 = vertices[i] - origin;
            let e2 = vertices[i + 1] - origin;

            let tri_area = 0.5 * e1.cross(&e2);
            area += tri_area;

            // Triangle centroid at 1/3 of the edge sum
            centroid += (e1 + e2) * (tri_area / 3.0);
        }

        origin + centroid / area
    }

    /// Computes the mass properties of the polygon for the given density
    pub fn compute_mass(&self, density: f32) -> MassData {
        let n = self.vertices.len();
        let origin = self.vertices[0];

        let mut area = 0.0;
        let mut center = Vec2::zero();
        let mut inertia = 0.0;

        for i in 1..(n - 1) {
            let e1 = self.vertices[i] - origin;
            let e2 = self.vertices[i + 1] - origin;

            let d = e1.cross(&e2);
            let tri_area = 0.5 * d;
            area += tri_area;

            center += (e1 + e2) * (tri_area / 3.0);

            // Second moment of the triangle about the fan origin
            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 / 3.0) * d * (intx2 + inty2);
        }

        let mass = density * area;
        center /= area;

        // Shift inertia from the fan origin to the local origin using the
        // parallel axis theorem twice
        let world_center = origin + center;
        let inertia_about_origin =
            density * inertia + mass * (world_center.length_squared() - center.length_squared());

        MassData {
            mass,
            center: world_center,
            inertia: inertia_about_origin,
        }
    }

    /// Computes the world-space AABB of the polygon
    pub fn compute_aabb(&self, transform: &Transform2) -> Aabb {
        let mut min = transform.mul_point(self.vertices[0]);
        let mut max = min;

        for v in self.vertices.iter().skip(1) {
            let p = transform.mul_point(*v);
            min = min.min(&p);
            max = max.max(&p);
        }

        Aabb::new(min, max).expanded(self.radius)
    }

    /// Tests whether a world-space point lies inside the polygon
    pub fn test_point(&self, transform: &Transform2, point: Vec2) -> bool {
        let local = transform.mul_point_inverse(point);

        for (vertex, normal) in self.vertices.iter().zip(self.normals.iter()) {
            if normal.dot(&(local - *vertex)) > 0.0 {
                return false;
            }
        }

        true
    }

    /// Casts a ray against the polygon in world space
    pub fn ray_cast(&self, input: &RayCastInput, transform: &Transform2) -> Option<RayCastOutput> {
        // Work in the polygon's local frame
        let p1 = transform.mul_point_inverse(input.p1);
        let p2 = transform.mul_point_inverse(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0f32;
        let mut upper = input.max_fraction;
        let mut hit_index: Option<usize> = None;

        for i in 0..self.vertices.len() {
            let numerator = self.normals[i].dot(&(self.vertices[i] - p1));
            let denominator = self.normals[i].dot(&d);

            if denominator.abs() < crate::math::EPSILON {
                if numerator < 0.0 {
                    return None;
                }
            } else {
                let t = numerator / denominator;
                if denominator < 0.0 && t > lower {
                    lower = t;
                    hit_index = Some(i);
                } else if denominator > 0.0 && t < upper {
                    upper = t;
                }
            }

            if upper < lower {
                return None;
            }
        }

        hit_index.map(|i| RayCastOutput {
            normal: transform.mul_vector(self.normals[i]),
            fraction: lower,
        })
    }
}
