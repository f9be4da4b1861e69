mod chain;
mod circle;
mod edge;
mod polygon;

pub use chain::ChainShape;
pub use circle::CircleShape;
pub use edge::EdgeShape;
pub use polygon::{PolygonShape, MAX_POLYGON_VERTICES};

use crate::bodies::MassData;
use crate::math::{Aabb, Transform2, Vec2};

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Input for a shape-level ray cast
#[derive(Debug, Clone, Copy)]
pub struct RayCastInput {
    /// Start point of the ray segment
    pub p1: Vec2,

    /// End point of the ray segment
    pub p2: Vec2,

    /// Maximum fraction of the segment to consider
    pub max_fraction: f32,
}

/// Output of a shape-level ray cast
#[derive(Debug, Clone, Copy)]
pub struct RayCastOutput {
    /// Surface normal at the hit point
    pub normal: Vec2,

    /// Fraction along the segment at which the hit occurred
    pub fraction: f32,
}

/// Immutable geometric description of a fixture
///
/// The shape set is closed, so collision dispatch is a fixed table over
/// variant pairs rather than open-ended virtual dispatch.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Shape {
    /// A circle with a local center offset
    Circle(CircleShape),

    /// A convex polygon with up to [`MAX_POLYGON_VERTICES`] vertices
    Polygon(PolygonShape),

    /// A single line segment
    Edge(EdgeShape),

    /// An ordered list of connected line segments
    Chain(ChainShape),
}

impl Shape {
    /// Returns the type name of the shape
    pub fn shape_type(&self) -> &'static str {
        match self {
            Shape::Circle(_) => "Circle",
            Shape::Polygon(_) => "Polygon",
            Shape::Edge(_) => "Edge",
            Shape::Chain(_) => "Chain",
        }
    }

    /// Returns the number of broad-phase children of the shape
    ///
    /// A chain has one child per segment; all other shapes have one.
    pub fn child_count(&self) -> usize {
        match self {
            Shape::Chain(chain) => chain.child_count(),
            _ => 1,
        }
    }

    /// Computes the mass, center of mass, and rotational inertia of the
    /// shape for the given density
    ///
    /// Edges and chains have no area and therefore contribute zero mass.
    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Circle(circle) => circle.compute_mass(density),
            Shape::Polygon(polygon) => polygon.compute_mass(density),
            Shape::Edge(edge) => MassData {
                mass: 0.0,
                center: (edge.v1 + edge.v2) * 0.5,
                inertia: 0.0,
            },
            Shape::Chain(_) => MassData::default(),
        }
    }

    /// Computes the world-space AABB of the given child of the shape
    pub fn compute_aabb(&self, transform: &Transform2, child_index: usize) -> Aabb {
        match self {
            Shape::Circle(circle) => circle.compute_aabb(transform),
            Shape::Polygon(polygon) => polygon.compute_aabb(transform),
            Shape::Edge(edge) => edge.compute_aabb(transform),
            Shape::Chain(chain) => chain.child_edge(child_index).compute_aabb(transform),
        }
    }

    /// Tests whether a world-space point lies inside the shape
    ///
    /// Edges and chains have no interior and always return false.
    pub fn test_point(&self, transform: &Transform2, point: Vec2) -> bool {
        match self {
            Shape::Circle(circle) => circle.test_point(transform, point),
            Shape::Polygon(polygon) => polygon.test_point(transform, point),
            Shape::Edge(_) | Shape::Chain(_) => false,
        }
    }

    /// Casts a ray against the shape in world space
    pub fn ray_cast(&self, input: &RayCastInput, transform: &Transform2) -> Option<RayCastOutput> {
        match self {
            Shape::Circle(circle) => circle.ray_cast(input, transform),
            Shape::Polygon(polygon) => polygon.ray_cast(input, transform),
            Shape::Edge(edge) => edge.ray_cast(input, transform),
            Shape::Chain(chain) => chain.ray_cast(input, transform),
        }
    }

    /// Returns the surface radius of the shape used by distance queries
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Circle(circle) => circle.radius,
            Shape::Polygon(polygon) => polygon.radius,
            Shape::Edge(edge) => edge.radius,
            Shape::Chain(chain) => chain.radius,
        }
    }
}
