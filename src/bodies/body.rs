use crate::bodies::{body_flags::BodyFlags, BodyType, MassData};
use crate::math::{Sweep, Transform2, Vec2};
use crate::world::FixtureHandle;

/// Definition used to create a body
#[derive(Debug, Clone)]
pub struct BodyDef {
    /// The type of the body
    pub body_type: BodyType,

    /// Initial world position of the body origin
    pub position: Vec2,

    /// Initial rotation angle in radians
    pub angle: f32,

    /// Initial linear velocity
    pub linear_velocity: Vec2,

    /// Initial angular velocity in radians per second
    pub angular_velocity: f32,

    /// Linear velocity damping in [0, 1] per second scale
    pub linear_damping: f32,

    /// Angular velocity damping in [0, 1] per second scale
    pub angular_damping: f32,

    /// Scale applied to world gravity for this body
    pub gravity_scale: f32,

    /// Whether the body may never rotate
    pub fixed_rotation: bool,

    /// Whether the body uses continuous collision detection against
    /// dynamic bodies as well as static geometry
    pub bullet: bool,

    /// Whether the body may go to sleep
    pub allow_sleep: bool,

    /// Whether the body starts awake
    pub awake: bool,

    /// Opaque user data attached to the body
    pub user_data: u64,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::zero(),
            angle: 0.0,
            linear_velocity: Vec2::zero(),
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            fixed_rotation: false,
            bullet: false,
            allow_sleep: true,
            awake: true,
            user_data: 0,
        }
    }
}

impl BodyDef {
    /// Creates a definition for a dynamic body at the given position
    pub fn dynamic(position: Vec2) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position,
            ..Default::default()
        }
    }

    /// Creates a definition for a static body at the given position
    pub fn fixed(position: Vec2) -> Self {
        Self {
            body_type: BodyType::Static,
            position,
            ..Default::default()
        }
    }

    /// Creates a definition for a kinematic body at the given position
    pub fn kinematic(position: Vec2) -> Self {
        Self {
            body_type: BodyType::Kinematic,
            position,
            ..Default::default()
        }
    }
}

/// A rigid body owned by a [`World`](crate::world::World)
///
/// Mass properties derive from the attached fixtures unless overridden via
/// [`Body::set_mass_data`].
pub struct Body {
    /// The body's transform in world space
    transform: Transform2,

    /// Center-of-mass motion over the current step, for CCD
    pub(crate) sweep: Sweep,

    /// The body's linear velocity
    linear_velocity: Vec2,

    /// The body's angular velocity
    angular_velocity: f32,

    /// Accumulated force for the next integration
    force: Vec2,

    /// Accumulated torque for the next integration
    torque: f32,

    /// The body's type (dynamic, kinematic, or static)
    body_type: BodyType,

    /// The body's mass
    mass: f32,

    /// Inverse of the body's mass (zero for non-dynamic bodies)
    inv_mass: f32,

    /// Rotational inertia about the center of mass
    inertia: f32,

    /// Inverse rotational inertia (zero for fixed-rotation bodies)
    inv_inertia: f32,

    /// The body's linear damping
    linear_damping: f32,

    /// The body's angular damping
    angular_damping: f32,

    /// Scale applied to world gravity for this body
    gravity_scale: f32,

    /// The body's flags
    flags: BodyFlags,

    /// How long the body has been below the sleep thresholds
    pub(crate) sleep_time: f32,

    /// Handles of the fixtures attached to this body
    pub(crate) fixtures: Vec<FixtureHandle>,

    /// Opaque user data attached to the body
    user_data: u64,
}

impl Body {
    /// Creates a new body from a definition
    pub(crate) fn new(def: &BodyDef) -> Self {
        let mut flags = BodyFlags::ENABLED;
        if def.allow_sleep {
            flags.insert(BodyFlags::CAN_SLEEP);
        }
        if def.awake {
            flags.insert(BodyFlags::AWAKE);
        }
        if def.bullet {
            flags.insert(BodyFlags::BULLET);
        }
        if def.fixed_rotation {
            flags.insert(BodyFlags::FIXED_ROTATION);
        }

        let transform = Transform2::from_position_angle(def.position, def.angle);

        let sweep = Sweep {
            local_center: Vec2::zero(),
            c0: def.position,
            c: def.position,
            a0: def.angle,
            a: def.angle,
        };

        let (mass, inv_mass) = if def.body_type == BodyType::Dynamic {
            (1.0, 1.0)
        } else {
            (0.0, 0.0)
        };

        Self {
            transform,
            sweep,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            force: Vec2::zero(),
            torque: 0.0,
            body_type: def.body_type,
            mass,
            inv_mass,
            inertia: 0.0,
            inv_inertia: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            flags,
            sleep_time: 0.0,
            fixtures: Vec::new(),
            user_data: def.user_data,
        }
    }

    /// Returns the body's transform
    pub fn transform(&self) -> Transform2 {
        self.transform
    }

    /// Sets the body's transform and wakes it up
    ///
    /// Broad-phase proxies re-synchronize at the start of the next step.
    pub fn set_transform(&mut self, position: Vec2, angle: f32) {
        self.transform = Transform2::from_position_angle(position, angle);
        self.sweep.c = self.transform.mul_point(self.sweep.local_center);
        self.sweep.a = angle;
        self.sweep.reset();
        self.set_awake(true);
    }

    /// Returns the body's position (the transform origin, not the center of mass)
    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Returns the body's rotation angle in radians
    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    /// Returns the world position of the body's center of mass
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    /// Returns the local position of the body's center of mass
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    /// Converts a local point to world coordinates
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.transform.mul_point(local)
    }

    /// Converts a world point to local coordinates
    pub fn local_point(&self, world: Vec2) -> Vec2 {
        self.transform.mul_point_inverse(world)
    }

    /// Returns the body's linear velocity
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Sets the body's linear velocity
    pub fn set_linear_velocity(&mut self, velocity: Vec2) {
        if self.body_type == BodyType::Static {
            return;
        }
        if velocity.length_squared() > 0.0 {
            self.set_awake(true);
        }
        self.linear_velocity = velocity;
    }

    /// Returns the body's angular velocity
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Sets the body's angular velocity
    pub fn set_angular_velocity(&mut self, velocity: f32) {
        if self.body_type == BodyType::Static {
            return;
        }
        if velocity * velocity > 0.0 {
            self.set_awake(true);
        }
        self.angular_velocity = velocity;
    }

    /// Returns the velocity of a world point on the body
    pub fn velocity_at_world_point(&self, point: Vec2) -> Vec2 {
        self.linear_velocity + crate::math::cross_sv(self.angular_velocity, point - self.sweep.c)
    }

    /// Returns the body type
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Returns the body's mass
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Returns the body's inverse mass
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Returns the body's rotational inertia about its center of mass
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Returns the body's inverse rotational inertia
    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Returns the body's mass data (mass, center, inertia about the origin)
    pub fn mass_data(&self) -> MassData {
        MassData {
            mass: self.mass,
            center: self.sweep.local_center,
            inertia: self.inertia + self.mass * self.sweep.local_center.length_squared(),
        }
    }

    /// Overrides the body's mass data
    ///
    /// The override holds exactly until
    /// [`World::reset_mass_data`](crate::world::World::reset_mass_data)
    /// recomputes mass from the fixtures. Ignored for non-dynamic bodies.
    pub fn set_mass_data(&mut self, data: &MassData) {
        if self.body_type != BodyType::Dynamic {
            return;
        }

        self.mass = data.mass.max(crate::math::EPSILON);
        self.inv_mass = 1.0 / self.mass;

        // Stored inertia is about the center of mass
        let inertia_about_center = data.inertia - self.mass * data.center.length_squared();
        if inertia_about_center > 0.0 && !self.flags.contains(BodyFlags::FIXED_ROTATION) {
            self.inertia = inertia_about_center;
            self.inv_inertia = 1.0 / inertia_about_center;
        } else {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }

        // Move the center of mass, preserving the velocity of the new center
        let old_center = self.sweep.c;
        self.sweep.local_center = data.center;
        self.sweep.c = self.transform.mul_point(data.center);
        self.sweep.c0 = self.sweep.c;

        self.linear_velocity += crate::math::cross_sv(self.angular_velocity, self.sweep.c - old_center);
    }

    /// Directly applies recomputed mass properties (used by the world
    /// when fixtures change)
    pub(crate) fn apply_computed_mass(&mut self, data: MassData) {
        if self.body_type != BodyType::Dynamic {
            self.mass = 0.0;
            self.inv_mass = 0.0;
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
            self.sweep.local_center = Vec2::zero();
            self.sweep.c = self.transform.position;
            self.sweep.c0 = self.sweep.c;
            return;
        }

        self.mass = if data.mass > 0.0 { data.mass } else { 1.0 };
        self.inv_mass = 1.0 / self.mass;

        let inertia_about_center = data.inertia - data.mass * data.center.length_squared();
        if inertia_about_center > 0.0 && !self.flags.contains(BodyFlags::FIXED_ROTATION) {
            self.inertia = inertia_about_center;
            self.inv_inertia = 1.0 / inertia_about_center;
        } else {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }

        let old_center = self.sweep.c;
        self.sweep.local_center = data.center;
        self.sweep.c = self.transform.mul_point(data.center);
        self.sweep.c0 = self.sweep.c;

        self.linear_velocity += crate::math::cross_sv(self.angular_velocity, self.sweep.c - old_center);
    }

    /// Sets the body's linear damping
    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping.max(0.0);
    }

    /// Returns the body's linear damping
    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    /// Sets the body's angular damping
    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping.max(0.0);
    }

    /// Returns the body's angular damping
    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    /// Sets the gravity scale of the body
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    /// Returns the gravity scale of the body
    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    /// Returns whether the body is awake
    pub fn is_awake(&self) -> bool {
        self.flags.contains(BodyFlags::AWAKE)
    }

    /// Wakes the body or puts it to sleep
    ///
    /// Sleeping zeroes the velocities and force accumulators.
    pub fn set_awake(&mut self, awake: bool) {
        if self.body_type == BodyType::Static {
            return;
        }

        if awake {
            self.flags.insert(BodyFlags::AWAKE);
            self.sleep_time = 0.0;
        } else {
            self.flags.remove(BodyFlags::AWAKE);
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::zero();
            self.angular_velocity = 0.0;
            self.force = Vec2::zero();
            self.torque = 0.0;
        }
    }

    /// Returns whether the body may go to sleep
    pub fn is_sleeping_allowed(&self) -> bool {
        self.flags.contains(BodyFlags::CAN_SLEEP)
    }

    /// Sets whether the body may go to sleep
    pub fn set_sleeping_allowed(&mut self, allowed: bool) {
        if allowed {
            self.flags.insert(BodyFlags::CAN_SLEEP);
        } else {
            self.flags.remove(BodyFlags::CAN_SLEEP);
            self.set_awake(true);
        }
    }

    /// Returns whether the body is a bullet
    pub fn is_bullet(&self) -> bool {
        self.flags.contains(BodyFlags::BULLET)
    }

    /// Sets whether the body is a bullet
    pub fn set_bullet(&mut self, bullet: bool) {
        if bullet {
            self.flags.insert(BodyFlags::BULLET);
        } else {
            self.flags.remove(BodyFlags::BULLET);
        }
    }

    /// Returns whether the body has fixed rotation
    pub fn is_fixed_rotation(&self) -> bool {
        self.flags.contains(BodyFlags::FIXED_ROTATION)
    }

    /// Returns whether the body participates in the simulation
    pub fn is_enabled(&self) -> bool {
        self.flags.contains(BodyFlags::ENABLED)
    }

    /// Returns the handles of the fixtures attached to the body
    pub fn fixtures(&self) -> &[FixtureHandle] {
        &self.fixtures
    }

    /// Returns the user data attached to the body
    pub fn user_data(&self) -> u64 {
        self.user_data
    }

    /// Sets the user data attached to the body
    pub fn set_user_data(&mut self, user_data: u64) {
        self.user_data = user_data;
    }

    /// Applies a force at the center of mass, waking the body
    pub fn apply_force(&mut self, force: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.force += force;
    }

    /// Applies a force at a world point, waking the body
    pub fn apply_force_at_point(&mut self, force: Vec2, point: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.force += force;
        self.torque += (point - self.sweep.c).cross(&force);
    }

    /// Applies a torque, waking the body
    pub fn apply_torque(&mut self, torque: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.torque += torque;
    }

    /// Applies a linear impulse at the center of mass, waking the body
    pub fn apply_linear_impulse(&mut self, impulse: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.linear_velocity += impulse * self.inv_mass;
    }

    /// Applies a linear impulse at a world point, waking the body
    pub fn apply_linear_impulse_at_point(&mut self, impulse: Vec2, point: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * (point - self.sweep.c).cross(&impulse);
    }

    /// Applies an angular impulse, waking the body
    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.angular_velocity += self.inv_inertia * impulse;
    }

    /// Integrates forces to update velocities (semi-implicit Euler, first half)
    pub(crate) fn integrate_forces(&mut self, gravity: Vec2, dt: f32) {
        if self.body_type != BodyType::Dynamic || !self.is_awake() {
            return;
        }

        self.linear_velocity += (gravity * self.gravity_scale + self.force * self.inv_mass) * dt;
        self.angular_velocity += self.inv_inertia * self.torque * dt;

        // Solution of dv/dt = -damping * v, approximated by the Padé form
        self.linear_velocity *= 1.0 / (1.0 + dt * self.linear_damping);
        self.angular_velocity *= 1.0 / (1.0 + dt * self.angular_damping);
    }

    /// Writes solver results without touching the awake state or sleep timer
    pub(crate) fn set_solved_velocities(&mut self, linear: Vec2, angular: f32) {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
    }

    /// Clears the force and torque accumulators
    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec2::zero();
        self.torque = 0.0;
    }

    /// Recomputes the body transform from the sweep end state
    pub(crate) fn synchronize_transform(&mut self) {
        self.transform = Transform2::from_position_angle(Vec2::zero(), self.sweep.a);
        self.transform.position = self.sweep.c - self.transform.mul_vector(self.sweep.local_center);
    }
}
