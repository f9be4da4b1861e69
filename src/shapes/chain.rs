use crate::error::PhysicsError;
use crate::math::{Transform2, Vec2};
use crate::shapes::{EdgeShape, RayCastInput, RayCastOutput};
use crate::Result;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Skin radius applied to chain segments
const CHAIN_RADIUS: f32 = 0.01;

/// An ordered list of connected line segments
///
/// Chains have no interior and contribute no mass; they are intended for
/// static terrain. Each segment is an independent broad-phase child.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ChainShape {
    /// The vertices of the chain in local space
    pub vertices: Vec<Vec2>,

    /// Whether the last vertex connects back to the first
    pub looped: bool,

    /// The skin radius of the chain segments
    pub radius: f32,
}

impl ChainShape {
    /// Creates an open chain from an ordered list of points
    pub fn new(vertices: &[Vec2]) -> Result<Self> {
        Self::build(vertices, false)
    }

    /// Creates a closed loop from an ordered list of points
    pub fn new_loop(vertices: &[Vec2]) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(PhysicsError::InvalidGeometry(format!(
                "chain loop needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        Self::build(vertices, true)
    }

    fn build(vertices: &[Vec2], looped: bool) -> Result<Self> {
        if vertices.len() < 2 {
            return Err(PhysicsError::InvalidGeometry(format!(
                "chain needs at least 2 vertices, got {}",
                vertices.len()
            )));
        }

        for window in vertices.windows(2) {
            if window[0].distance_squared(&window[1]) < 1.0e-8 {
                return Err(PhysicsError::InvalidGeometry(
                    "chain has coincident consecutive vertices".to_string(),
                ));
            }
        }

        Ok(Self {
            vertices: vertices.to_vec(),
            looped,
            radius: CHAIN_RADIUS,
        })
    }

    /// Returns the number of edge children in the chain
    pub fn child_count(&self) -> usize {
        if self.looped {
            self.vertices.len()
        } else {
            self.vertices.len() - 1
        }
    }

    /// Returns the child segment at the given index as an edge
    pub fn child_edge(&self, index: usize) -> EdgeShape {
        let v1 = self.vertices[index];
        let v2 = self.vertices[(index + 1) % self.vertices.len()];

        EdgeShape {
            v1,
            v2,
            radius: self.radius,
        }
    }

    /// Casts a ray against the chain, returning the closest hit
    pub fn ray_cast(&self, input: &RayCastInput, transform: &Transform2) -> Option<RayCastOutput> {
        let mut best: Option<RayCastOutput> = None;

        for i in 0..self.child_count() {
            let edge = self.child_edge(i);
            if let Some(hit) = edge.ray_cast(input, transform) {
                match best {
                    Some(ref b) if b.fraction <= hit.fraction => {}
                    _ => best = Some(hit),
                }
            }
        }

        best
    }
}
