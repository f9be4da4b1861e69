use crate::collision::{Position, Velocity, LINEAR_SLOP, MAX_LINEAR_CORRECTION};
use crate::joints::{Joint, JointBodyData};
use crate::math::{cross_sv, Rot, Vec2};
use crate::world::BodyHandle;

/// Creation parameters for a [`DistanceJoint`]
#[derive(Debug, Clone)]
pub struct DistanceJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Anchor on body A in its local frame
    pub local_anchor_a: Vec2,
    /// Anchor on body B in its local frame
    pub local_anchor_b: Vec2,
    /// Rest length the joint maintains
    pub length: f32,
    pub collide_connected: bool,
}

impl DistanceJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, length: f32) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            length: length.max(LINEAR_SLOP),
            collide_connected: false,
        }
    }

    pub fn anchors(mut self, local_anchor_a: Vec2, local_anchor_b: Vec2) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    pub fn collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }
}

/// A rigid rod holding two anchor points at a fixed distance
#[derive(Debug)]
pub struct DistanceJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    length: f32,
    collide_connected: bool,

    /// Accumulated impulse along the rod, carried across steps
    impulse: f32,

    // Per-step solver state
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_inertia_a: f32,
    inv_inertia_b: f32,
    local_center_a: Vec2,
    local_center_b: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    /// Unit vector from anchor A to anchor B
    u: Vec2,
    mass: f32,
}

impl DistanceJoint {
    pub(crate) fn new(def: &DistanceJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length,
            collide_connected: def.collide_connected,
            impulse: 0.0,
            index_a: 0,
            index_b: 0,
            inv_mass_a: 0.0,
            inv_mass_b: 0.0,
            inv_inertia_a: 0.0,
            inv_inertia_b: 0.0,
            local_center_a: Vec2::zero(),
            local_center_b: Vec2::zero(),
            r_a: Vec2::zero(),
            r_b: Vec2::zero(),
            u: Vec2::zero(),
            mass: 0.0,
        }
    }

    /// Rest length of the rod
    pub fn length(&self) -> f32 {
        self.length
    }

    pub(crate) fn init_velocity(
        &mut self,
        a: JointBodyData,
        b: JointBodyData,
        positions: &[Position],
        velocities: &mut [Velocity],
    ) {
        self.index_a = a.index;
        self.index_b = b.index;
        self.inv_mass_a = a.inv_mass;
        self.inv_mass_b = b.inv_mass;
        self.inv_inertia_a = a.inv_inertia;
        self.inv_inertia_b = b.inv_inertia;
        self.local_center_a = a.local_center;
        self.local_center_b = b.local_center;

        let pos_a = positions[a.index];
        let pos_b = positions[b.index];

        let rot_a = Rot::new(pos_a.a);
        let rot_b = Rot::new(pos_b.a);

        self.r_a = rot_a.rotate(self.local_anchor_a - a.local_center);
        self.r_b = rot_b.rotate(self.local_anchor_b - b.local_center);

        let d = (pos_b.c + self.r_b) - (pos_a.c + self.r_a);
        let current = d.length();
        self.u = if current > LINEAR_SLOP {
            d / current
        } else {
            Vec2::zero()
        };

        let cr_a = self.r_a.cross(&self.u);
        let cr_b = self.r_b.cross(&self.u);
        let inv_mass = self.inv_mass_a
            + self.inv_mass_b
            + self.inv_inertia_a * cr_a * cr_a
            + self.inv_inertia_b * cr_b * cr_b;
        self.mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

        // Warm start with last step's impulse
        let p = self.u * self.impulse;
        let mut vel_a = velocities[a.index];
        let mut vel_b = velocities[b.index];

        vel_a.v -= p * self.inv_mass_a;
        vel_a.w -= self.inv_inertia_a * self.r_a.cross(&p);
        vel_b.v += p * self.inv_mass_b;
        vel_b.w += self.inv_inertia_b * self.r_b.cross(&p);

        velocities[a.index] = vel_a;
        velocities[b.index] = vel_b;
    }

    pub(crate) fn solve_velocity(&mut self, velocities: &mut [Velocity]) {
        let mut vel_a = velocities[self.index_a];
        let mut vel_b = velocities[self.index_b];

        let vp_a = vel_a.v + cross_sv(vel_a.w, self.r_a);
        let vp_b = vel_b.v + cross_sv(vel_b.w, self.r_b);
        let c_dot = self.u.dot(&(vp_b - vp_a));

        let lambda = -self.mass * c_dot;
        self.impulse += lambda;

        let p = self.u * lambda;
        vel_a.v -= p * self.inv_mass_a;
        vel_a.w -= self.inv_inertia_a * self.r_a.cross(&p);
        vel_b.v += p * self.inv_mass_b;
        vel_b.w += self.inv_inertia_b * self.r_b.cross(&p);

        velocities[self.index_a] = vel_a;
        velocities[self.index_b] = vel_b;
    }

    pub(crate) fn solve_position(&mut self, positions: &mut [Position]) -> bool {
        let mut pos_a = positions[self.index_a];
        let mut pos_b = positions[self.index_b];

        let rot_a = Rot::new(pos_a.a);
        let rot_b = Rot::new(pos_b.a);

        let r_a = rot_a.rotate(self.local_anchor_a - self.local_center_a);
        let r_b = rot_b.rotate(self.local_anchor_b - self.local_center_b);

        let d = (pos_b.c + r_b) - (pos_a.c + r_a);
        let current = d.length();
        if current < crate::math::EPSILON {
            return true;
        }
        let u = d / current;

        let c = crate::math::clamp(
            current - self.length,
            -MAX_LINEAR_CORRECTION,
            MAX_LINEAR_CORRECTION,
        );
        let impulse = -self.mass * c;
        let p = u * impulse;

        pos_a.c -= p * self.inv_mass_a;
        pos_a.a -= self.inv_inertia_a * r_a.cross(&p);
        pos_b.c += p * self.inv_mass_b;
        pos_b.a += self.inv_inertia_b * r_b.cross(&p);

        positions[self.index_a] = pos_a;
        positions[self.index_b] = pos_b;

        c.abs() < LINEAR_SLOP
    }
}

impl Joint for DistanceJoint {
    fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    fn local_anchor_a(&self) -> Vec2 {
        self.local_anchor_a
    }

    fn local_anchor_b(&self) -> Vec2 {
        self.local_anchor_b
    }
}
