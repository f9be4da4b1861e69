//! Constraints that restrict the relative motion of body pairs.
//!
//! Every joint is solved with warm-started sequential impulses inside the
//! island solver, mirroring the contact solver: velocity rows first, then a
//! position correction pass that never changes velocities.

mod distance;
mod prismatic;
mod revolute;

pub use distance::{DistanceJoint, DistanceJointDef};
pub use prismatic::{PrismaticJoint, PrismaticJointDef};
pub use revolute::{RevoluteJoint, RevoluteJointDef};

use crate::collision::{Position, Velocity};
use crate::math::Vec2;
use crate::world::BodyHandle;

/// Angular tolerance for joint position corrections, in radians
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * std::f32::consts::PI;

/// Common read access to any joint
pub trait Joint {
    /// First constrained body
    fn body_a(&self) -> BodyHandle;

    /// Second constrained body
    fn body_b(&self) -> BodyHandle;

    /// Whether contacts between the two bodies are still generated
    fn collide_connected(&self) -> bool;

    /// Anchor on body A, in body A's local frame
    fn local_anchor_a(&self) -> Vec2;

    /// Anchor on body B, in body B's local frame
    fn local_anchor_b(&self) -> Vec2;
}

/// Creation parameters for any joint type
#[derive(Debug, Clone)]
pub enum JointDef {
    Distance(DistanceJointDef),
    Revolute(RevoluteJointDef),
    Prismatic(PrismaticJointDef),
}

impl JointDef {
    pub fn body_a(&self) -> BodyHandle {
        match self {
            JointDef::Distance(def) => def.body_a,
            JointDef::Revolute(def) => def.body_a,
            JointDef::Prismatic(def) => def.body_a,
        }
    }

    pub fn body_b(&self) -> BodyHandle {
        match self {
            JointDef::Distance(def) => def.body_b,
            JointDef::Revolute(def) => def.body_b,
            JointDef::Prismatic(def) => def.body_b,
        }
    }
}

/// Maximum angular correction applied in a single position iteration,
/// in radians
pub(crate) const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * std::f32::consts::PI;

/// State of a joint limit relative to its range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LimitState {
    Inactive,
    AtLower,
    AtUpper,
    /// Lower and upper bound coincide, so the limit is an equality row
    Equal,
}

/// Per-body constants the island solver hands each joint before iterating
#[derive(Debug, Clone, Copy)]
pub(crate) struct JointBodyData {
    /// Index of the body in the island's state arrays
    pub index: usize,
    pub local_center: Vec2,
    pub inv_mass: f32,
    pub inv_inertia: f32,
}

/// Closed set of joint implementations stored by the world.
///
/// The solver hooks dispatch through this enum; user code sees joints
/// through the `Joint` trait.
#[derive(Debug)]
pub(crate) enum AnyJoint {
    Distance(DistanceJoint),
    Revolute(RevoluteJoint),
    Prismatic(PrismaticJoint),
}

impl AnyJoint {
    pub fn as_joint(&self) -> &dyn Joint {
        match self {
            AnyJoint::Distance(j) => j,
            AnyJoint::Revolute(j) => j,
            AnyJoint::Prismatic(j) => j,
        }
    }

    pub fn body_a(&self) -> BodyHandle {
        self.as_joint().body_a()
    }

    pub fn body_b(&self) -> BodyHandle {
        self.as_joint().body_b()
    }

    pub fn collide_connected(&self) -> bool {
        self.as_joint().collide_connected()
    }

    /// Builds the solver rows and applies last step's impulses
    pub fn init_velocity(
        &mut self,
        a: JointBodyData,
        b: JointBodyData,
        positions: &[Position],
        velocities: &mut [Velocity],
    ) {
        match self {
            AnyJoint::Distance(j) => j.init_velocity(a, b, positions, velocities),
            AnyJoint::Revolute(j) => j.init_velocity(a, b, positions, velocities),
            AnyJoint::Prismatic(j) => j.init_velocity(a, b, positions, velocities),
        }
    }

    pub fn solve_velocity(&mut self, velocities: &mut [Velocity]) {
        match self {
            AnyJoint::Distance(j) => j.solve_velocity(velocities),
            AnyJoint::Revolute(j) => j.solve_velocity(velocities),
            AnyJoint::Prismatic(j) => j.solve_velocity(velocities),
        }
    }

    pub fn solve_position(&mut self, positions: &mut [Position]) -> bool {
        match self {
            AnyJoint::Distance(j) => j.solve_position(positions),
            AnyJoint::Revolute(j) => j.solve_position(positions),
            AnyJoint::Prismatic(j) => j.solve_position(positions),
        }
    }
}

impl From<&JointDef> for AnyJoint {
    fn from(def: &JointDef) -> Self {
        match def {
            JointDef::Distance(d) => AnyJoint::Distance(DistanceJoint::new(d)),
            JointDef::Revolute(d) => AnyJoint::Revolute(RevoluteJoint::new(d)),
            JointDef::Prismatic(d) => AnyJoint::Prismatic(PrismaticJoint::new(d)),
        }
    }
}

/// Solves the symmetric 2x2 system `K x = -rhs` arising in block joint rows
pub(crate) fn solve_sym_2x2(k11: f32, k12: f32, k22: f32, rhs: Vec2) -> Vec2 {
    let det = k11 * k22 - k12 * k12;
    if det.abs() < crate::math::EPSILON {
        return Vec2::zero();
    }
    let inv_det = 1.0 / det;
    Vec2::new(
        inv_det * (k12 * rhs.y - k22 * rhs.x),
        inv_det * (k12 * rhs.x - k11 * rhs.y),
    )
}
