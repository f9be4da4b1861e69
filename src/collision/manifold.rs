use crate::math::Vec2;

/// Maximum number of contact points in a manifold
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// Stable identity of a manifold point across steps
///
/// Packs the vertex/edge indices of the contributing features on both
/// shapes. Warm-start impulses are carried over only when feature ids match
/// exactly; spatial proximity is never used for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureId(pub u32);

impl FeatureId {
    /// Feature kind: a polygon/chain vertex
    pub const VERTEX: u8 = 0;

    /// Feature kind: a polygon face or edge segment
    pub const FACE: u8 = 1;

    /// Packs the contributing feature of each shape into one id
    pub fn new(index_a: u8, type_a: u8, index_b: u8, type_b: u8) -> Self {
        Self(
            (index_a as u32)
                | ((type_a as u32) << 8)
                | ((index_b as u32) << 16)
                | ((type_b as u32) << 24),
        )
    }

    /// Returns the id with the roles of shape A and B exchanged
    pub fn swapped(&self) -> Self {
        let v = self.0;
        Self(((v & 0xFFFF) << 16) | (v >> 16))
    }
}

/// A single contact point within a manifold
#[derive(Debug, Clone, Copy)]
pub struct ManifoldPoint {
    /// The contact point in world space
    pub point: Vec2,

    /// Signed separation along the manifold normal; negative when penetrating
    pub separation: f32,

    /// Stable feature identity for warm-start matching
    pub feature: FeatureId,

    /// Accumulated normal impulse from the solver
    pub normal_impulse: f32,

    /// Accumulated tangent (friction) impulse from the solver
    pub tangent_impulse: f32,
}

impl ManifoldPoint {
    /// Creates a fresh contact point with zero accumulated impulses
    pub fn new(point: Vec2, separation: f32, feature: FeatureId) -> Self {
        Self {
            point,
            separation,
            feature,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
        }
    }
}

/// The contact points, shared normal, and penetration data for one
/// fixture-pair overlap
#[derive(Debug, Clone, Default)]
pub struct Manifold {
    /// The contact normal in world space, pointing from shape A to shape B
    pub normal: Vec2,

    /// The contact points, at most [`MAX_MANIFOLD_POINTS`]
    pub points: Vec<ManifoldPoint>,
}

impl Manifold {
    /// Creates an empty manifold
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the manifold has any contact points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Adds a contact point, dropping the shallower point when full
    pub fn push(&mut self, point: ManifoldPoint) {
        if self.points.len() < MAX_MANIFOLD_POINTS {
            self.points.push(point);
            return;
        }

        // Keep the deepest points
        let mut shallow = 0;
        for (i, p) in self.points.iter().enumerate().skip(1) {
            if p.separation > self.points[shallow].separation {
                shallow = i;
            }
        }

        if point.separation < self.points[shallow].separation {
            self.points[shallow] = point;
        }
    }

    /// Carries accumulated impulses over from the previous step's manifold
    /// where feature ids match
    pub fn warm_start_from(&mut self, previous: &Manifold) {
        for point in &mut self.points {
            for old in &previous.points {
                if old.feature == point.feature {
                    point.normal_impulse = old.normal_impulse;
                    point.tangent_impulse = old.tangent_impulse;
                    break;
                }
            }
        }
    }

    /// Returns the manifold with the normal flipped and feature roles swapped
    pub fn flipped(&self) -> Manifold {
        Manifold {
            normal: -self.normal,
            points: self
                .points
                .iter()
                .map(|p| ManifoldPoint {
                    feature: p.feature.swapped(),
                    ..*p
                })
                .collect(),
        }
    }
}
