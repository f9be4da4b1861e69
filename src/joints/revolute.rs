use crate::collision::{Position, Velocity, LINEAR_SLOP};
use crate::joints::{
    solve_sym_2x2, Joint, JointBodyData, LimitState, ANGULAR_SLOP, MAX_ANGULAR_CORRECTION,
};
use crate::math::{cross_sv, Rot, Vec2};
use crate::world::BodyHandle;

/// Creation parameters for a [`RevoluteJoint`]
#[derive(Debug, Clone)]
pub struct RevoluteJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Pivot on body A in its local frame
    pub local_anchor_a: Vec2,
    /// Pivot on body B in its local frame
    pub local_anchor_b: Vec2,
    /// Angle of body B relative to body A when the joint was created
    pub reference_angle: f32,
    pub enable_limit: bool,
    /// Lower joint angle bound, in radians
    pub lower_angle: f32,
    /// Upper joint angle bound, in radians
    pub upper_angle: f32,
    pub collide_connected: bool,
}

impl RevoluteJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            reference_angle: 0.0,
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            collide_connected: false,
        }
    }

    pub fn anchors(mut self, local_anchor_a: Vec2, local_anchor_b: Vec2) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    pub fn limit(mut self, lower_angle: f32, upper_angle: f32) -> Self {
        self.enable_limit = true;
        self.lower_angle = lower_angle;
        self.upper_angle = upper_angle;
        self
    }

    pub fn reference_angle(mut self, angle: f32) -> Self {
        self.reference_angle = angle;
        self
    }

    pub fn collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }
}

/// A pin forcing two anchor points to coincide, with an optional bound on
/// the relative rotation
#[derive(Debug)]
pub struct RevoluteJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f32,
    enable_limit: bool,
    lower_angle: f32,
    upper_angle: f32,
    collide_connected: bool,

    /// Accumulated point impulse across steps
    impulse: Vec2,
    /// Accumulated limit impulse across steps
    limit_impulse: f32,
    limit_state: LimitState,

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
    k11: f32,
    k12: f32,
    k22: f32,
    angular_mass: f32,
}

impl RevoluteJoint {
    pub(crate) fn new(def: &RevoluteJointDef) -> Self {
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_angle: def.lower_angle,
            upper_angle: def.upper_angle,
            collide_connected: def.collide_connected,
            impulse: Vec2::zero(),
            limit_impulse: 0.0,
            limit_state: LimitState::Inactive,
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
            k11: 0.0,
            k12: 0.0,
            k22: 0.0,
            angular_mass: 0.0,
        }
    }

    /// Current joint angle given the two body angles
    fn joint_angle(&self, angle_a: f32, angle_b: f32) -> f32 {
        angle_b - angle_a - self.reference_angle
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

        let (im_a, im_b) = (self.inv_mass_a, self.inv_mass_b);
        let (ii_a, ii_b) = (self.inv_inertia_a, self.inv_inertia_b);

        self.k11 = im_a + im_b + ii_a * self.r_a.y * self.r_a.y + ii_b * self.r_b.y * self.r_b.y;
        self.k12 = -ii_a * self.r_a.x * self.r_a.y - ii_b * self.r_b.x * self.r_b.y;
        self.k22 = im_a + im_b + ii_a * self.r_a.x * self.r_a.x + ii_b * self.r_b.x * self.r_b.x;

        let inv_angular = ii_a + ii_b;
        self.angular_mass = if inv_angular > 0.0 {
            1.0 / inv_angular
        } else {
            0.0
        };

        if self.enable_limit {
            let angle = self.joint_angle(pos_a.a, pos_b.a);
            let new_state = if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
                LimitState::Equal
            } else if angle <= self.lower_angle {
                LimitState::AtLower
            } else if angle >= self.upper_angle {
                LimitState::AtUpper
            } else {
                LimitState::Inactive
            };

            // Accumulated limit impulse is only meaningful while pressed
            // against the same bound.
            if new_state != self.limit_state {
                self.limit_impulse = 0.0;
            }
            self.limit_state = new_state;
        } else {
            self.limit_state = LimitState::Inactive;
            self.limit_impulse = 0.0;
        }

        // Warm start
        let p = self.impulse;
        let mut vel_a = velocities[a.index];
        let mut vel_b = velocities[b.index];

        vel_a.v -= p * im_a;
        vel_a.w -= ii_a * (self.r_a.cross(&p) + self.limit_impulse);
        vel_b.v += p * im_b;
        vel_b.w += ii_b * (self.r_b.cross(&p) + self.limit_impulse);

        velocities[a.index] = vel_a;
        velocities[b.index] = vel_b;
    }

    pub(crate) fn solve_velocity(&mut self, velocities: &mut [Velocity]) {
        let mut vel_a = velocities[self.index_a];
        let mut vel_b = velocities[self.index_b];

        // Limit row
        if self.limit_state != LimitState::Inactive {
            let c_dot = vel_b.w - vel_a.w;
            let lambda = -self.angular_mass * c_dot;

            let new_impulse = match self.limit_state {
                LimitState::AtLower => (self.limit_impulse + lambda).max(0.0),
                LimitState::AtUpper => (self.limit_impulse + lambda).min(0.0),
                _ => self.limit_impulse + lambda,
            };
            let delta = new_impulse - self.limit_impulse;
            self.limit_impulse = new_impulse;

            vel_a.w -= self.inv_inertia_a * delta;
            vel_b.w += self.inv_inertia_b * delta;
        }

        // Point-to-point block
        let c_dot = vel_b.v + cross_sv(vel_b.w, self.r_b)
            - vel_a.v
            - cross_sv(vel_a.w, self.r_a);
        let delta = solve_sym_2x2(self.k11, self.k12, self.k22, c_dot);
        self.impulse += delta;

        vel_a.v -= delta * self.inv_mass_a;
        vel_a.w -= self.inv_inertia_a * self.r_a.cross(&delta);
        vel_b.v += delta * self.inv_mass_b;
        vel_b.w += self.inv_inertia_b * self.r_b.cross(&delta);

        velocities[self.index_a] = vel_a;
        velocities[self.index_b] = vel_b;
    }

    pub(crate) fn solve_position(&mut self, positions: &mut [Position]) -> bool {
        let mut pos_a = positions[self.index_a];
        let mut pos_b = positions[self.index_b];

        let mut angular_error = 0.0_f32;

        if self.enable_limit && self.limit_state != LimitState::Inactive {
            let angle = self.joint_angle(pos_a.a, pos_b.a);
            let c = match self.limit_state {
                LimitState::Equal => crate::math::clamp(
                    angle - self.lower_angle,
                    -MAX_ANGULAR_CORRECTION,
                    MAX_ANGULAR_CORRECTION,
                ),
                LimitState::AtLower => crate::math::clamp(
                    angle - self.lower_angle + ANGULAR_SLOP,
                    -MAX_ANGULAR_CORRECTION,
                    0.0,
                ),
                LimitState::AtUpper => crate::math::clamp(
                    angle - self.upper_angle - ANGULAR_SLOP,
                    0.0,
                    MAX_ANGULAR_CORRECTION,
                ),
                LimitState::Inactive => 0.0,
            };

            let impulse = -self.angular_mass * c;
            pos_a.a -= self.inv_inertia_a * impulse;
            pos_b.a += self.inv_inertia_b * impulse;
            angular_error = c.abs();
        }

        // Point-to-point correction with geometry recomputed at the current
        // positions.
        let rot_a = Rot::new(pos_a.a);
        let rot_b = Rot::new(pos_b.a);

        let r_a = rot_a.rotate(self.local_anchor_a - self.local_center_a);
        let r_b = rot_b.rotate(self.local_anchor_b - self.local_center_b);

        let c = (pos_b.c + r_b) - (pos_a.c + r_a);
        let position_error = c.length();

        let (im_a, im_b) = (self.inv_mass_a, self.inv_mass_b);
        let (ii_a, ii_b) = (self.inv_inertia_a, self.inv_inertia_b);

        let k11 = im_a + im_b + ii_a * r_a.y * r_a.y + ii_b * r_b.y * r_b.y;
        let k12 = -ii_a * r_a.x * r_a.y - ii_b * r_b.x * r_b.y;
        let k22 = im_a + im_b + ii_a * r_a.x * r_a.x + ii_b * r_b.x * r_b.x;

        let impulse = solve_sym_2x2(k11, k12, k22, c);

        pos_a.c -= impulse * im_a;
        pos_a.a -= ii_a * r_a.cross(&impulse);
        pos_b.c += impulse * im_b;
        pos_b.a += ii_b * r_b.cross(&impulse);

        positions[self.index_a] = pos_a;
        positions[self.index_b] = pos_b;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }

    /// Lower and upper joint angle bounds, if the limit is enabled
    pub fn limit(&self) -> Option<(f32, f32)> {
        if self.enable_limit {
            Some((self.lower_angle, self.upper_angle))
        } else {
            None
        }
    }
}

impl Joint for RevoluteJoint {
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
