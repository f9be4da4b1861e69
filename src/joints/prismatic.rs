use crate::collision::{Position, Velocity, LINEAR_SLOP, MAX_LINEAR_CORRECTION};
use crate::joints::{solve_sym_2x2, Joint, JointBodyData, LimitState, ANGULAR_SLOP};
use crate::math::{cross_sv, Rot, Vec2};
use crate::world::BodyHandle;

/// Creation parameters for a [`PrismaticJoint`]
#[derive(Debug, Clone)]
pub struct PrismaticJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Anchor on body A in its local frame
    pub local_anchor_a: Vec2,
    /// Anchor on body B in its local frame
    pub local_anchor_b: Vec2,
    /// Sliding axis in body A's local frame; normalized on creation
    pub local_axis_a: Vec2,
    /// Angle of body B relative to body A when the joint was created
    pub reference_angle: f32,
    pub enable_limit: bool,
    /// Lower translation bound along the axis
    pub lower_translation: f32,
    /// Upper translation bound along the axis
    pub upper_translation: f32,
    pub collide_connected: bool,
}

impl PrismaticJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, local_axis_a: Vec2) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::zero(),
            local_anchor_b: Vec2::zero(),
            local_axis_a,
            reference_angle: 0.0,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            collide_connected: false,
        }
    }

    pub fn anchors(mut self, local_anchor_a: Vec2, local_anchor_b: Vec2) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    pub fn limit(mut self, lower_translation: f32, upper_translation: f32) -> Self {
        self.enable_limit = true;
        self.lower_translation = lower_translation;
        self.upper_translation = upper_translation;
        self
    }

    pub fn collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }
}

/// A slider: body B may only translate along one axis of body A, with no
/// relative rotation and an optional travel limit
#[derive(Debug)]
pub struct PrismaticJoint {
    body_a: BodyHandle,
    body_b: BodyHandle,
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    local_axis_a: Vec2,
    local_perp_a: Vec2,
    reference_angle: f32,
    enable_limit: bool,
    lower_translation: f32,
    upper_translation: f32,
    collide_connected: bool,

    /// Accumulated (perpendicular, angular) impulses across steps
    impulse: Vec2,
    /// Accumulated limit impulse along the axis
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
    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    axial_mass: f32,
    k11: f32,
    k12: f32,
    k22: f32,
}

impl PrismaticJoint {
    pub(crate) fn new(def: &PrismaticJointDef) -> Self {
        let local_axis_a = def.local_axis_a.normalize();
        Self {
            body_a: def.body_a,
            body_b: def.body_b,
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_axis_a,
            local_perp_a: local_axis_a.perp(),
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
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
            axis: Vec2::zero(),
            perp: Vec2::zero(),
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            axial_mass: 0.0,
            k11: 0.0,
            k12: 0.0,
            k22: 0.0,
        }
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

        let r_a = rot_a.rotate(self.local_anchor_a - a.local_center);
        let r_b = rot_b.rotate(self.local_anchor_b - b.local_center);
        let d = (pos_b.c + r_b) - (pos_a.c + r_a);

        let (im_a, im_b) = (self.inv_mass_a, self.inv_mass_b);
        let (ii_a, ii_b) = (self.inv_inertia_a, self.inv_inertia_b);

        self.axis = rot_a.rotate(self.local_axis_a);
        self.a1 = (d + r_a).cross(&self.axis);
        self.a2 = r_b.cross(&self.axis);

        let inv_axial = im_a + im_b + ii_a * self.a1 * self.a1 + ii_b * self.a2 * self.a2;
        self.axial_mass = if inv_axial > 0.0 { 1.0 / inv_axial } else { 0.0 };

        self.perp = rot_a.rotate(self.local_perp_a);
        self.s1 = (d + r_a).cross(&self.perp);
        self.s2 = r_b.cross(&self.perp);

        self.k11 = im_a + im_b + ii_a * self.s1 * self.s1 + ii_b * self.s2 * self.s2;
        self.k12 = ii_a * self.s1 + ii_b * self.s2;
        self.k22 = ii_a + ii_b;
        if self.k22 == 0.0 {
            // Both bodies have fixed rotation; the angular row is a no-op.
            self.k22 = 1.0;
        }

        if self.enable_limit {
            let translation = self.axis.dot(&d);
            let new_state =
                if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                    LimitState::Equal
                } else if translation <= self.lower_translation {
                    LimitState::AtLower
                } else if translation >= self.upper_translation {
                    LimitState::AtUpper
                } else {
                    LimitState::Inactive
                };

            if new_state != self.limit_state {
                self.limit_impulse = 0.0;
            }
            self.limit_state = new_state;
        } else {
            self.limit_state = LimitState::Inactive;
            self.limit_impulse = 0.0;
        }

        // Warm start
        let p = self.perp * self.impulse.x + self.axis * self.limit_impulse;
        let l_a = self.impulse.x * self.s1 + self.impulse.y + self.limit_impulse * self.a1;
        let l_b = self.impulse.x * self.s2 + self.impulse.y + self.limit_impulse * self.a2;

        let mut vel_a = velocities[a.index];
        let mut vel_b = velocities[b.index];

        vel_a.v -= p * im_a;
        vel_a.w -= ii_a * l_a;
        vel_b.v += p * im_b;
        vel_b.w += ii_b * l_b;

        velocities[a.index] = vel_a;
        velocities[b.index] = vel_b;
    }

    pub(crate) fn solve_velocity(&mut self, velocities: &mut [Velocity]) {
        let mut vel_a = velocities[self.index_a];
        let mut vel_b = velocities[self.index_b];

        let (im_a, im_b) = (self.inv_mass_a, self.inv_mass_b);
        let (ii_a, ii_b) = (self.inv_inertia_a, self.inv_inertia_b);

        // Travel limit row
        if self.limit_state != LimitState::Inactive {
            let c_dot =
                self.axis.dot(&(vel_b.v - vel_a.v)) + self.a2 * vel_b.w - self.a1 * vel_a.w;
            let lambda = -self.axial_mass * c_dot;

            let new_impulse = match self.limit_state {
                LimitState::AtLower => (self.limit_impulse + lambda).max(0.0),
                LimitState::AtUpper => (self.limit_impulse + lambda).min(0.0),
                _ => self.limit_impulse + lambda,
            };
            let delta = new_impulse - self.limit_impulse;
            self.limit_impulse = new_impulse;

            let p = self.axis * delta;
            vel_a.v -= p * im_a;
            vel_a.w -= ii_a * delta * self.a1;
            vel_b.v += p * im_b;
            vel_b.w += ii_b * delta * self.a2;
        }

        // Perpendicular and angular block
        let c_dot1 =
            self.perp.dot(&(vel_b.v - vel_a.v)) + self.s2 * vel_b.w - self.s1 * vel_a.w;
        let c_dot2 = vel_b.w - vel_a.w;

        let df = solve_sym_2x2(self.k11, self.k12, self.k22, Vec2::new(c_dot1, c_dot2));
        self.impulse += df;

        let p = self.perp * df.x;
        let l_a = df.x * self.s1 + df.y;
        let l_b = df.x * self.s2 + df.y;

        vel_a.v -= p * im_a;
        vel_a.w -= ii_a * l_a;
        vel_b.v += p * im_b;
        vel_b.w += ii_b * l_b;

        velocities[self.index_a] = vel_a;
        velocities[self.index_b] = vel_b;
    }

    pub(crate) fn solve_position(&mut self, positions: &mut [Position]) -> bool {
        let mut pos_a = positions[self.index_a];
        let mut pos_b = positions[self.index_b];

        let rot_a = Rot::new(pos_a.a);
        let rot_b = Rot::new(pos_b.a);

        let (im_a, im_b) = (self.inv_mass_a, self.inv_mass_b);
        let (ii_a, ii_b) = (self.inv_inertia_a, self.inv_inertia_b);

        let r_a = rot_a.rotate(self.local_anchor_a - self.local_center_a);
        let r_b = rot_b.rotate(self.local_anchor_b - self.local_center_b);
        let d = (pos_b.c + r_b) - (pos_a.c + r_a);

        let axis = rot_a.rotate(self.local_axis_a);
        let a1 = (d + r_a).cross(&axis);
        let a2 = r_b.cross(&axis);
        let perp = rot_a.rotate(self.local_perp_a);
        let s1 = (d + r_a).cross(&perp);
        let s2 = r_b.cross(&perp);

        let c1 = perp.dot(&d);
        let c2 = pos_b.a - pos_a.a - self.reference_angle;

        let mut linear_error = c1.abs();
        let angular_error = c2.abs();

        // Travel limit correction
        if self.enable_limit {
            let translation = axis.dot(&d);
            let c = if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP
            {
                crate::math::clamp(translation, -MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION)
            } else if translation <= self.lower_translation {
                crate::math::clamp(
                    translation - self.lower_translation + LINEAR_SLOP,
                    -MAX_LINEAR_CORRECTION,
                    0.0,
                )
            } else if translation >= self.upper_translation {
                crate::math::clamp(
                    translation - self.upper_translation - LINEAR_SLOP,
                    0.0,
                    MAX_LINEAR_CORRECTION,
                )
            } else {
                0.0
            };

            if c != 0.0 {
                let inv_axial = im_a + im_b + ii_a * a1 * a1 + ii_b * a2 * a2;
                let impulse = if inv_axial > 0.0 { -c / inv_axial } else { 0.0 };

                let p = axis * impulse;
                pos_a.c -= p * im_a;
                pos_a.a -= ii_a * impulse * a1;
                pos_b.c += p * im_b;
                pos_b.a += ii_b * impulse * a2;

                linear_error = linear_error.max(c.abs());
            }
        }

        let k11 = im_a + im_b + ii_a * s1 * s1 + ii_b * s2 * s2;
        let k12 = ii_a * s1 + ii_b * s2;
        let mut k22 = ii_a + ii_b;
        if k22 == 0.0 {
            k22 = 1.0;
        }

        let impulse = solve_sym_2x2(k11, k12, k22, Vec2::new(c1, c2));

        let p = perp * impulse.x;
        let l_a = impulse.x * s1 + impulse.y;
        let l_b = impulse.x * s2 + impulse.y;

        pos_a.c -= p * im_a;
        pos_a.a -= ii_a * l_a;
        pos_b.c += p * im_b;
        pos_b.a += ii_b * l_b;

        positions[self.index_a] = pos_a;
        positions[self.index_b] = pos_b;

        linear_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }

    /// Lower and upper translation bounds, if the limit is enabled
    pub fn limit(&self) -> Option<(f32, f32)> {
        if self.enable_limit {
            Some((self.lower_translation, self.upper_translation))
        } else {
            None
        }
    }
}

impl Joint for PrismaticJoint {
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
