use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::bodies::{Body, BodyDef, BodyType, Fixture, FixtureDef, MassData};
use crate::collision::{
    evaluate_manifold, time_of_impact, Contact, ContactConstraintDef, ContactKey, ContactSolver,
    DistanceProxy, Position, ToiInput, ToiState, Velocity, AABB_MARGIN, VELOCITY_THRESHOLD,
};
use crate::error::PhysicsError;
use crate::joints::{AnyJoint, Joint, JointBodyData, JointDef};
use crate::math::{Aabb, Vec2};
use crate::shapes::RayCastInput;
use crate::world::events::EventQueue;
use crate::world::{
    Arena, BodyEvent, BodyHandle, ContactEvent, FixtureHandle, Island, IslandBuilder, JointHandle,
};
use crate::Result;

/// Stamps each world instance so handles cannot cross worlds undetected
static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);

/// Largest translation of a body in a single step; faster motion is clamped
/// and left to the CCD pass
const MAX_TRANSLATION: f32 = 2.0;

/// Largest rotation of a body in a single step
const MAX_ROTATION: f32 = 0.5 * std::f32::consts::PI;

/// Tuning knobs for a world
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldConfig {
    /// Gauss-Seidel sweeps over the velocity constraints per step
    pub velocity_iterations: usize,

    /// Position correction sweeps per step
    pub position_iterations: usize,

    /// Linear speed below which a body counts as resting, in m/s
    pub linear_sleep_tolerance: f32,

    /// Angular speed below which a body counts as resting, in rad/s
    pub angular_sleep_tolerance: f32,

    /// Continuous resting time after which an island falls asleep, in s
    pub time_to_sleep: f32,

    /// Relative normal speed below which restitution is ignored
    pub restitution_threshold: f32,

    /// Whether islands are allowed to fall asleep at all
    pub allow_sleeping: bool,

    /// Whether the continuous collision pass runs after the solver
    pub continuous: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            velocity_iterations: 8,
            position_iterations: 3,
            linear_sleep_tolerance: 0.01,
            angular_sleep_tolerance: 2.0 / 180.0 * std::f32::consts::PI,
            time_to_sleep: 0.5,
            restitution_threshold: VELOCITY_THRESHOLD,
            allow_sleeping: true,
            continuous: true,
        }
    }
}

/// Synchronous notification hooks invoked while the world is stepping.
///
/// Callbacks receive the world mutably, but the world is locked for the
/// whole step: any structural mutation fails with `WorldLocked`. The one
/// sanctioned mutation is [`World::set_contact_enabled`] from `pre_solve`,
/// which removes a contact from the current step's solve only.
#[allow(unused_variables)]
pub trait ContactListener {
    /// Two fixtures started touching this step
    fn begin_contact(&mut self, world: &mut World, fixture_a: FixtureHandle, fixture_b: FixtureHandle) {}

    /// Two fixtures stopped touching this step
    fn end_contact(&mut self, world: &mut World, fixture_a: FixtureHandle, fixture_b: FixtureHandle) {}

    /// A touching contact is about to be solved
    fn pre_solve(&mut self, world: &mut World, fixture_a: FixtureHandle, fixture_b: FixtureHandle) {}

    /// The solver finished a touching contact, reporting its impulses
    fn post_solve(
        &mut self,
        world: &mut World,
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
        normal_impulse: f32,
        tangent_impulse: f32,
    ) {
    }
}

/// One ray cast intersection, reported in increasing fraction order
#[derive(Debug, Clone, Copy)]
pub struct RayCastHit {
    pub fixture: FixtureHandle,
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Fraction along the ray segment, in [0, 1]
    pub fraction: f32,
}

/// The simulation container.
///
/// Owns all bodies, fixtures, joints and contacts; advances them with
/// [`World::step`]. A step is single-threaded and deterministic: every
/// internal iteration runs in handle order, so identical inputs produce
/// identical outputs.
pub struct World {
    id: u32,
    gravity: Vec2,
    config: WorldConfig,
    bodies: Arena<Body>,
    fixtures: Arena<Fixture>,
    joints: Arena<AnyJoint>,
    contacts: BTreeMap<ContactKey, Contact>,
    broad_phase: crate::collision::BroadPhase,
    events: EventQueue,
    listener: Option<Box<dyn ContactListener>>,
    locked: bool,
}

impl World {
    /// Creates an empty world with the given gravity
    pub fn new(gravity: Vec2, allow_sleeping: bool) -> Self {
        let config = WorldConfig {
            allow_sleeping,
            ..WorldConfig::default()
        };
        Self::with_config(gravity, config)
    }

    /// Creates an empty world with explicit tuning parameters
    pub fn with_config(gravity: Vec2, config: WorldConfig) -> Self {
        Self {
            id: NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed),
            gravity,
            config,
            bodies: Arena::new(),
            fixtures: Arena::new(),
            joints: Arena::new(),
            contacts: BTreeMap::new(),
            broad_phase: crate::collision::BroadPhase::new(),
            events: EventQueue::new(),
            listener: None,
            locked: false,
        }
    }

    /// World gravity, in m/s^2
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Replaces the world gravity and wakes every dynamic body
    pub fn set_gravity(&mut self, gravity: Vec2) -> Result<()> {
        self.check_unlocked()?;
        self.gravity = gravity;
        for (_, _, body) in self.bodies.iter_mut() {
            if body.body_type() == BodyType::Dynamic {
                body.set_awake(true);
            }
        }
        Ok(())
    }

    /// Whether a step is currently in progress
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Installs the contact listener invoked during steps
    pub fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>) -> Result<()> {
        self.check_unlocked()?;
        self.listener = Some(listener);
        Ok(())
    }

    /// Removes the contact listener
    pub fn clear_contact_listener(&mut self) -> Result<()> {
        self.check_unlocked()?;
        self.listener = None;
        Ok(())
    }

    // ----- lifecycle -----------------------------------------------------

    /// Creates a body and returns its handle
    pub fn create_body(&mut self, def: &BodyDef) -> Result<BodyHandle> {
        self.check_unlocked()?;
        let (index, generation) = self.bodies.insert(Body::new(def));
        Ok(BodyHandle::new(index, generation, self.id))
    }

    /// Destroys a body, cascading to its fixtures, contacts and joints
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.check_unlocked()?;
        self.check_body(handle)?;

        // Joints referencing the body go first
        let doomed: Vec<JointHandle> = self
            .joints
            .iter()
            .filter(|(_, _, joint)| joint.body_a() == handle || joint.body_b() == handle)
            .map(|(index, generation, _)| JointHandle::new(index, generation, self.id))
            .collect();
        for joint_handle in doomed {
            self.destroy_joint(joint_handle)?;
        }

        let fixture_handles = self
            .bodies
            .get(handle.index, handle.generation)
            .map(|body| body.fixtures.clone())
            .unwrap_or_default();
        for fixture_handle in fixture_handles {
            self.remove_fixture_internal(fixture_handle);
        }

        self.bodies.remove(handle.index, handle.generation);
        Ok(())
    }

    /// Attaches a fixture to a body and recomputes the body's mass
    pub fn create_fixture(&mut self, body: BodyHandle, def: &FixtureDef) -> Result<FixtureHandle> {
        self.check_unlocked()?;
        self.check_body(body)?;

        let (index, generation) = self.fixtures.insert(Fixture::new(body, def));
        let handle = FixtureHandle::new(index, generation, self.id);

        // One broad-phase proxy per shape child
        let transform = self
            .bodies
            .get(body.index, body.generation)
            .map(|b| b.transform())
            .unwrap_or_else(crate::math::Transform2::identity);
        if let Some(fixture) = self.fixtures.get_mut(index, generation) {
            for child in 0..fixture.shape().child_count() {
                let aabb = fixture.shape().compute_aabb(&transform, child);
                let proxy = self.broad_phase.create_proxy(aabb, (handle, child as u32));
                fixture.proxies.push(proxy);
            }
        }

        if let Some(b) = self.bodies.get_mut(body.index, body.generation) {
            b.fixtures.push(handle);
        }

        self.reset_mass_data(body)?;
        Ok(handle)
    }

    /// Detaches and destroys a fixture, recomputing the body's mass
    pub fn destroy_fixture(&mut self, handle: FixtureHandle) -> Result<()> {
        self.check_unlocked()?;
        self.check_fixture(handle)?;

        let body = self
            .fixtures
            .get(handle.index, handle.generation)
            .map(|f| f.body);
        self.remove_fixture_internal(handle);

        if let Some(body) = body {
            if let Some(b) = self.bodies.get_mut(body.index, body.generation) {
                b.fixtures.retain(|&f| f != handle);
            }
            if self.bodies.contains(body.index, body.generation) {
                self.reset_mass_data(body)?;
            }
        }
        Ok(())
    }

    /// Creates a joint between two bodies of this world
    pub fn create_joint(&mut self, def: &JointDef) -> Result<JointHandle> {
        self.check_unlocked()?;
        self.check_body(def.body_a())?;
        self.check_body(def.body_b())?;

        let body_a = def.body_a();
        let body_b = def.body_b();
        let joint = AnyJoint::from(def);

        // Existing contacts between newly constrained bodies are dropped so
        // the suppression takes effect this step.
        if !joint.collide_connected() {
            let doomed: Vec<ContactKey> = self
                .contacts
                .iter()
                .filter(|(_, c)| {
                    (c.body_a == body_a && c.body_b == body_b)
                        || (c.body_a == body_b && c.body_b == body_a)
                })
                .map(|(&key, _)| key)
                .collect();
            for key in doomed {
                self.remove_contact(key);
            }
        }

        let (index, generation) = self.joints.insert(joint);

        self.wake_body(body_a);
        self.wake_body(body_b);

        Ok(JointHandle::new(index, generation, self.id))
    }

    /// Destroys a joint, waking the bodies it constrained
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<()> {
        self.check_unlocked()?;
        self.check_joint(handle)?;

        if let Some(joint) = self.joints.remove(handle.index, handle.generation) {
            self.wake_body(joint.body_a());
            self.wake_body(joint.body_b());

            // The joint was suppressing contacts between its bodies; let the
            // broad phase re-examine their overlapping proxies
            if !joint.collide_connected() {
                self.mark_body_fixtures_for_refilter(joint.body_a());
                self.mark_body_fixtures_for_refilter(joint.body_b());
            }
        }
        Ok(())
    }

    fn mark_body_fixtures_for_refilter(&mut self, handle: BodyHandle) {
        let fixtures = match self.bodies.get(handle.index, handle.generation) {
            Some(body) => body.fixtures.clone(),
            None => return,
        };
        for fixture_handle in fixtures {
            if let Some(fixture) = self
                .fixtures
                .get_mut(fixture_handle.index, fixture_handle.generation)
            {
                fixture.refilter = true;
            }
        }
    }

    // ----- accessors ------------------------------------------------------

    pub fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.check_body(handle)?;
        self.bodies
            .get(handle.index, handle.generation)
            .ok_or(PhysicsError::UseAfterDestroy)
    }

    /// Mutable body access; fails while a step is running
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.check_unlocked()?;
        self.check_body(handle)?;
        self.bodies
            .get_mut(handle.index, handle.generation)
            .ok_or(PhysicsError::UseAfterDestroy)
    }

    pub fn fixture(&self, handle: FixtureHandle) -> Result<&Fixture> {
        self.check_fixture(handle)?;
        self.fixtures
            .get(handle.index, handle.generation)
            .ok_or(PhysicsError::UseAfterDestroy)
    }

    /// Mutable fixture access; fails while a step is running
    pub fn fixture_mut(&mut self, handle: FixtureHandle) -> Result<&mut Fixture> {
        self.check_unlocked()?;
        self.check_fixture(handle)?;
        self.fixtures
            .get_mut(handle.index, handle.generation)
            .ok_or(PhysicsError::UseAfterDestroy)
    }

    pub fn joint(&self, handle: JointHandle) -> Result<&dyn Joint> {
        self.check_joint(handle)?;
        self.joints
            .get(handle.index, handle.generation)
            .map(|j| j.as_joint())
            .ok_or(PhysicsError::UseAfterDestroy)
    }

    /// The persistent contact between two fixtures, if the pair overlaps
    pub fn contact(&self, fixture_a: FixtureHandle, fixture_b: FixtureHandle) -> Option<&Contact> {
        self.contacts.get(&ContactKey::new(fixture_a, fixture_b))
    }

    /// All persistent contacts in key order
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values()
    }

    /// Excludes a touching contact from the current step's solve.
    ///
    /// This is the one mutation permitted while the world is locked; the
    /// contact is re-enabled when it is next evaluated.
    pub fn set_contact_enabled(
        &mut self,
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
        enabled: bool,
    ) -> Result<()> {
        self.check_fixture(fixture_a)?;
        self.check_fixture(fixture_b)?;
        let key = ContactKey::new(fixture_a, fixture_b);
        let contact = self
            .contacts
            .get_mut(&key)
            .ok_or(PhysicsError::UseAfterDestroy)?;
        contact.enabled = enabled;
        Ok(())
    }

    /// Recomputes a body's mass properties from its fixtures
    pub fn reset_mass_data(&mut self, handle: BodyHandle) -> Result<()> {
        self.check_unlocked()?;
        self.check_body(handle)?;

        let mut total = MassData::default();
        if let Some(body) = self.bodies.get(handle.index, handle.generation) {
            if body.body_type() == BodyType::Dynamic {
                let mut weighted_center = Vec2::zero();
                for &fixture_handle in &body.fixtures {
                    if let Some(fixture) =
                        self.fixtures.get(fixture_handle.index, fixture_handle.generation)
                    {
                        if fixture.density() <= 0.0 {
                            continue;
                        }
                        let data = fixture.shape().compute_mass(fixture.density());
                        total.mass += data.mass;
                        weighted_center += data.center * data.mass;
                        total.inertia += data.inertia;
                    }
                }
                if total.mass > 0.0 {
                    total.center = weighted_center / total.mass;
                }
            }
        }

        if let Some(body) = self.bodies.get_mut(handle.index, handle.generation) {
            body.apply_computed_mass(total);
        }
        Ok(())
    }

    // ----- events ---------------------------------------------------------

    /// Removes and returns the contact events buffered by the last step
    pub fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        self.events.drain_contact_events()
    }

    /// Removes and returns the body events buffered by the last step
    pub fn drain_body_events(&mut self) -> Vec<BodyEvent> {
        self.events.drain_body_events()
    }

    // ----- queries ----------------------------------------------------------

    /// Visits every fixture whose AABB overlaps `aabb`.
    ///
    /// The callback returns false to stop the enumeration early.
    pub fn query_aabb(&self, aabb: &Aabb, mut callback: impl FnMut(FixtureHandle) -> bool) {
        let tree = self.broad_phase.tree();
        let mut seen = BTreeSet::new();

        tree.query(aabb, |proxy| {
            let (fixture_handle, child) = tree.key(proxy);
            let fixture = match self.fixtures.get(fixture_handle.index, fixture_handle.generation)
            {
                Some(f) => f,
                None => return true,
            };
            let body = match self.bodies.get(fixture.body.index, fixture.body.generation) {
                Some(b) => b,
                None => return true,
            };

            // The tree stores fattened boxes; confirm with the tight AABB.
            let tight = fixture
                .shape()
                .compute_aabb(&body.transform(), child as usize);
            if !tight.intersects(aabb) {
                return true;
            }

            if seen.insert(fixture_handle) {
                callback(fixture_handle)
            } else {
                true
            }
        });
    }

    /// Tests whether a world-space point lies inside a fixture's shape,
    /// using the owning body's current transform
    pub fn test_point(&self, handle: FixtureHandle, point: Vec2) -> Result<bool> {
        let fixture = self.fixture(handle)?;
        let body = self.body(fixture.body())?;
        Ok(fixture.test_point(&body.transform(), point))
    }

    /// Visits every fixture intersected by the segment `p1..p2`, closest
    /// hit first. The callback returns false to stop the enumeration.
    pub fn ray_cast(&self, p1: Vec2, p2: Vec2, mut callback: impl FnMut(&RayCastHit) -> bool) {
        let tree = self.broad_phase.tree();
        let mut seen = BTreeSet::new();
        let mut hits: Vec<RayCastHit> = Vec::new();

        tree.ray_cast(p1, p2, |proxy| {
            let (fixture_handle, _child) = tree.key(proxy);
            if !seen.insert(fixture_handle) {
                return true;
            }

            let fixture = match self.fixtures.get(fixture_handle.index, fixture_handle.generation)
            {
                Some(f) => f,
                None => return true,
            };
            let body = match self.bodies.get(fixture.body.index, fixture.body.generation) {
                Some(b) => b,
                None => return true,
            };

            let input = RayCastInput {
                p1,
                p2,
                max_fraction: 1.0,
            };
            if let Some(output) = fixture.shape().ray_cast(&input, &body.transform()) {
                hits.push(RayCastHit {
                    fixture: fixture_handle,
                    point: p1 + (p2 - p1) * output.fraction,
                    normal: output.normal,
                    fraction: output.fraction,
                });
            }
            true
        });

        hits.sort_by(|a, b| {
            a.fraction
                .partial_cmp(&b.fraction)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.fixture.cmp(&b.fixture))
        });

        for hit in &hits {
            if !callback(hit) {
                return;
            }
        }
    }

    // ----- stepping ---------------------------------------------------------

    /// Advances the simulation by `dt` seconds.
    ///
    /// Strict phase order: proxy synchronization, broad-phase pair update,
    /// narrow-phase contact update, island build and solve, continuous
    /// collision, sleep update. Re-entrant calls fail with `WorldLocked`.
    pub fn step(&mut self, dt: f32) -> Result<()> {
        self.check_unlocked()?;
        if dt <= 0.0 {
            return Ok(());
        }

        self.locked = true;

        self.synchronize_proxies();
        self.flush_refilters();
        self.find_new_contacts();
        self.update_contacts();
        let islands = self.solve_islands(dt);
        if self.config.continuous {
            self.solve_continuous();
        }
        for island in &islands {
            self.update_sleep(island, dt);
        }
        self.clear_all_forces();

        self.locked = false;
        Ok(())
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(PhysicsError::WorldLocked)
        } else {
            Ok(())
        }
    }

    fn check_body(&self, handle: BodyHandle) -> Result<()> {
        if handle.world != self.id {
            return Err(PhysicsError::CrossWorldReference);
        }
        if !self.bodies.contains(handle.index, handle.generation) {
            return Err(PhysicsError::UseAfterDestroy);
        }
        Ok(())
    }

    fn check_fixture(&self, handle: FixtureHandle) -> Result<()> {
        if handle.world != self.id {
            return Err(PhysicsError::CrossWorldReference);
        }
        if !self.fixtures.contains(handle.index, handle.generation) {
            return Err(PhysicsError::UseAfterDestroy);
        }
        Ok(())
    }

    fn check_joint(&self, handle: JointHandle) -> Result<()> {
        if handle.world != self.id {
            return Err(PhysicsError::CrossWorldReference);
        }
        if !self.joints.contains(handle.index, handle.generation) {
            return Err(PhysicsError::UseAfterDestroy);
        }
        Ok(())
    }

    fn wake_body(&mut self, handle: BodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle.index, handle.generation) {
            if !body.is_awake() && body.body_type() != BodyType::Static {
                body.set_awake(true);
                self.events.push_body(BodyEvent::Woke(handle));
            }
        }
    }

    /// Removes a fixture's proxies and contacts; does not touch its body
    fn remove_fixture_internal(&mut self, handle: FixtureHandle) {
        let doomed: Vec<ContactKey> = self
            .contacts
            .keys()
            .filter(|key| key.fixture_a == handle || key.fixture_b == handle)
            .copied()
            .collect();
        for key in doomed {
            self.remove_contact(key);
        }

        if let Some(fixture) = self.fixtures.get_mut(handle.index, handle.generation) {
            let proxies = std::mem::take(&mut fixture.proxies);
            for proxy in proxies {
                self.broad_phase.destroy_proxy(proxy);
            }
        }
        self.fixtures.remove(handle.index, handle.generation);
    }

    /// Drops a contact, reporting the end of touch if it was touching
    fn remove_contact(&mut self, key: ContactKey) {
        if let Some(contact) = self.contacts.remove(&key) {
            if contact.touching {
                self.events.push_contact(ContactEvent::End {
                    fixture_a: key.fixture_a,
                    fixture_b: key.fixture_b,
                });
                self.with_listener(|listener, world| {
                    listener.end_contact(world, key.fixture_a, key.fixture_b);
                });
            }
        }
    }

    fn with_listener(&mut self, f: impl FnOnce(&mut dyn ContactListener, &mut World)) {
        if let Some(mut listener) = self.listener.take() {
            f(listener.as_mut(), self);
            self.listener = Some(listener);
        }
    }

    /// Moves every proxy to its fixture's current AABB.
    ///
    /// Covers both solver motion from the previous step and user transform
    /// changes made between steps; proxies that leave their fattened box are
    /// re-inserted and queued for pair generation.
    fn synchronize_proxies(&mut self) {
        let bodies = &self.bodies;
        let broad_phase = &mut self.broad_phase;

        for (_, _, fixture) in self.fixtures.iter() {
            let body = match bodies.get(fixture.body.index, fixture.body.generation) {
                Some(b) => b,
                None => continue,
            };
            let transform = body.transform();
            let displacement = body.sweep.c - body.sweep.c0;

            for (child, &proxy) in fixture.proxies.iter().enumerate() {
                let aabb = fixture.shape().compute_aabb(&transform, child);
                broad_phase.move_proxy(proxy, aabb, displacement);
            }
        }
    }

    /// Re-queues the proxies of fixtures whose filter or sensor flag changed
    /// since the last step, so overlapping pairs the old filter rejected are
    /// re-examined by `find_new_contacts`
    fn flush_refilters(&mut self) {
        let mut touched: Vec<u32> = Vec::new();
        for (_, _, fixture) in self.fixtures.iter_mut() {
            if fixture.refilter {
                fixture.refilter = false;
                touched.extend_from_slice(&fixture.proxies);
            }
        }
        for proxy in touched {
            self.broad_phase.touch_proxy(proxy);
        }
    }

    /// Creates contacts for newly overlapping fixture pairs
    fn find_new_contacts(&mut self) {
        let fixtures = &self.fixtures;
        let bodies = &self.bodies;
        let joints = &self.joints;
        let contacts = &mut self.contacts;

        self.broad_phase.update_pairs(|key_a, key_b| {
            let (handle_a, _) = key_a;
            let (handle_b, _) = key_b;

            let key = ContactKey::new(handle_a, handle_b);
            if contacts.contains_key(&key) {
                return;
            }

            let fixture_a = match fixtures.get(handle_a.index, handle_a.generation) {
                Some(f) => f,
                None => return,
            };
            let fixture_b = match fixtures.get(handle_b.index, handle_b.generation) {
                Some(f) => f,
                None => return,
            };
            if fixture_a.body == fixture_b.body {
                return;
            }

            let body_a = match bodies.get(fixture_a.body.index, fixture_a.body.generation) {
                Some(b) => b,
                None => return,
            };
            let body_b = match bodies.get(fixture_b.body.index, fixture_b.body.generation) {
                Some(b) => b,
                None => return,
            };

            // At least one participant must be able to respond
            if body_a.body_type() != BodyType::Dynamic && body_b.body_type() != BodyType::Dynamic {
                return;
            }

            if !fixture_a.filter().should_collide(&fixture_b.filter()) {
                return;
            }

            // A joint with collide_connected == false suppresses the pair
            let suppressed = joints.iter().any(|(_, _, joint)| {
                !joint.collide_connected()
                    && ((joint.body_a() == fixture_a.body && joint.body_b() == fixture_b.body)
                        || (joint.body_a() == fixture_b.body && joint.body_b() == fixture_a.body))
            });
            if suppressed {
                return;
            }

            contacts.insert(
                key,
                Contact::new(
                    key.fixture_a,
                    key.fixture_b,
                    if key.fixture_a == handle_a {
                        fixture_a.body
                    } else {
                        fixture_b.body
                    },
                    if key.fixture_a == handle_a {
                        fixture_b.body
                    } else {
                        fixture_a.body
                    },
                    fixture_a.friction(),
                    fixture_b.friction(),
                    fixture_a.restitution(),
                    fixture_b.restitution(),
                    fixture_a.is_sensor() || fixture_b.is_sensor(),
                ),
            );
        });
    }

    /// Narrow phase: refreshes manifolds, destroys stale contacts and fires
    /// begin/end/pre-solve notifications
    fn update_contacts(&mut self) {
        enum Update {
            Remove(ContactKey),
            Manifold(ContactKey, crate::collision::Manifold, bool),
        }

        let mut updates: Vec<Update> = Vec::new();

        for (&key, contact) in &self.contacts {
            let fixture_a = match self
                .fixtures
                .get(key.fixture_a.index, key.fixture_a.generation)
            {
                Some(f) => f,
                None => {
                    updates.push(Update::Remove(key));
                    continue;
                }
            };
            let fixture_b = match self
                .fixtures
                .get(key.fixture_b.index, key.fixture_b.generation)
            {
                Some(f) => f,
                None => {
                    updates.push(Update::Remove(key));
                    continue;
                }
            };

            // A filter change takes effect here: the pair is dropped and the
            // broad phase decides next step whether it comes back
            if !fixture_a.filter().should_collide(&fixture_b.filter()) {
                updates.push(Update::Remove(key));
                continue;
            }

            let body_a = match self.bodies.get(contact.body_a.index, contact.body_a.generation) {
                Some(b) => b,
                None => {
                    updates.push(Update::Remove(key));
                    continue;
                }
            };
            let body_b = match self.bodies.get(contact.body_b.index, contact.body_b.generation) {
                Some(b) => b,
                None => {
                    updates.push(Update::Remove(key));
                    continue;
                }
            };

            // Sleeping pairs keep their state untouched
            let awake_a = body_a.is_awake() && body_a.body_type() != BodyType::Static;
            let awake_b = body_b.is_awake() && body_b.body_type() != BodyType::Static;
            if !awake_a && !awake_b {
                continue;
            }

            // Destroy the contact once the fattened boxes stop overlapping
            let mut any_overlap = false;
            'outer: for &proxy_a in &fixture_a.proxies {
                let fat_a = self.broad_phase.fat_aabb(proxy_a);
                for &proxy_b in &fixture_b.proxies {
                    if fat_a.intersects(&self.broad_phase.fat_aabb(proxy_b)) {
                        any_overlap = true;
                        break 'outer;
                    }
                }
            }
            if !any_overlap {
                updates.push(Update::Remove(key));
                continue;
            }

            let manifold = evaluate_manifold(
                fixture_a.shape(),
                &body_a.transform(),
                fixture_b.shape(),
                &body_b.transform(),
            );
            let sensor = fixture_a.is_sensor() || fixture_b.is_sensor();
            updates.push(Update::Manifold(key, manifold, sensor));
        }

        let mut began: Vec<ContactKey> = Vec::new();
        let mut ended: Vec<ContactKey> = Vec::new();
        let mut removals: Vec<ContactKey> = Vec::new();

        for update in updates {
            match update {
                Update::Remove(key) => removals.push(key),
                Update::Manifold(key, manifold, sensor) => {
                    if let Some(contact) = self.contacts.get_mut(&key) {
                        // A pre-solve disable lasts one step only
                        contact.enabled = true;
                        contact.is_sensor = sensor;
                        let (b, e) = contact.update_manifold(manifold);
                        if b {
                            began.push(key);
                        }
                        if e {
                            ended.push(key);
                        }
                    }
                }
            }
        }

        for key in removals {
            self.remove_contact(key);
        }

        for key in began {
            // Touching wakes both sides so the pair gets solved
            if let Some((a, b)) = self.contacts.get(&key).map(|c| (c.body_a, c.body_b)) {
                self.wake_body(a);
                self.wake_body(b);
            }
            self.events.push_contact(ContactEvent::Begin {
                fixture_a: key.fixture_a,
                fixture_b: key.fixture_b,
            });
            self.with_listener(|listener, world| {
                listener.begin_contact(world, key.fixture_a, key.fixture_b);
            });
        }

        for key in ended {
            self.events.push_contact(ContactEvent::End {
                fixture_a: key.fixture_a,
                fixture_b: key.fixture_b,
            });
            self.with_listener(|listener, world| {
                listener.end_contact(world, key.fixture_a, key.fixture_b);
            });
        }

        // Pre-solve hook for everything about to be solved
        let solvable: Vec<ContactKey> = self
            .contacts
            .iter()
            .filter(|(_, c)| c.touching && c.enabled && !c.is_sensor)
            .map(|(&key, _)| key)
            .collect();
        for key in solvable {
            self.with_listener(|listener, world| {
                listener.pre_solve(world, key.fixture_a, key.fixture_b);
            });
        }
    }

    /// Builds islands, runs the solver on each and returns them so the
    /// caller can apply the sleep pass after continuous collision
    fn solve_islands(&mut self, dt: f32) -> Vec<Island> {
        let mut builder = IslandBuilder::new(
            self.bodies
                .iter()
                .filter(|(_, _, body)| body.body_type() != BodyType::Static)
                .map(|(index, generation, _)| BodyHandle::new(index, generation, self.id)),
        );

        for contact in self.contacts.values() {
            if contact.touching && contact.enabled && !contact.is_sensor {
                builder.union(contact.body_a, contact.body_b);
            }
        }
        for (_, _, joint) in self.joints.iter() {
            builder.union(joint.body_a(), joint.body_b());
        }

        let (mut islands, island_of_root) = builder.islands();

        for (&key, contact) in &self.contacts {
            if !(contact.touching && contact.enabled && !contact.is_sensor) {
                continue;
            }
            let anchor = if builder.contains(contact.body_a) {
                contact.body_a
            } else {
                contact.body_b
            };
            if let Some(root) = builder.root_of(anchor) {
                islands[island_of_root[&root]].contacts.push(key);
            }
        }

        for (index, generation, joint) in self.joints.iter() {
            let handle = JointHandle::new(index, generation, self.id);
            let anchor = if builder.contains(joint.body_a()) {
                joint.body_a()
            } else {
                joint.body_b()
            };
            if let Some(root) = builder.root_of(anchor) {
                islands[island_of_root[&root]].joints.push(handle);
            }
        }

        let mut post_solve: Vec<(ContactKey, f32, f32)> = Vec::new();
        for island in &islands {
            self.solve_island(island, dt, &mut post_solve);
        }

        for (key, normal_impulse, tangent_impulse) in post_solve {
            self.events.push_contact(ContactEvent::PostSolve {
                fixture_a: key.fixture_a,
                fixture_b: key.fixture_b,
                normal_impulse,
                tangent_impulse,
            });
            self.with_listener(|listener, world| {
                listener.post_solve(
                    world,
                    key.fixture_a,
                    key.fixture_b,
                    normal_impulse,
                    tangent_impulse,
                );
            });
        }

        islands
    }

    fn solve_island(
        &mut self,
        island: &Island,
        dt: f32,
        post_solve: &mut Vec<(ContactKey, f32, f32)>,
    ) {
        // A fully sleeping island is skipped outright
        let any_awake = island.bodies.iter().any(|&h| {
            self.bodies
                .get(h.index, h.generation)
                .map(|b| b.is_awake())
                .unwrap_or(false)
        });
        if !any_awake {
            return;
        }

        // Contact with an awake island wakes every member
        for &handle in &island.bodies {
            self.wake_body(handle);
        }

        // Island-local body order: non-static members first, then the static
        // anchors referenced by constraints.
        let mut index_of: BTreeMap<BodyHandle, usize> = BTreeMap::new();
        let mut handles: Vec<BodyHandle> = Vec::with_capacity(island.bodies.len());
        let mut add = |handle: BodyHandle,
                       index_of: &mut BTreeMap<BodyHandle, usize>,
                       handles: &mut Vec<BodyHandle>| {
            index_of.entry(handle).or_insert_with(|| {
                handles.push(handle);
                handles.len() - 1
            });
        };
        for &handle in &island.bodies {
            add(handle, &mut index_of, &mut handles);
        }
        for key in &island.contacts {
            if let Some(contact) = self.contacts.get(key) {
                add(contact.body_a, &mut index_of, &mut handles);
                add(contact.body_b, &mut index_of, &mut handles);
            }
        }
        for &joint_handle in &island.joints {
            if let Some(joint) = self.joints.get(joint_handle.index, joint_handle.generation) {
                add(joint.body_a(), &mut index_of, &mut handles);
                add(joint.body_b(), &mut index_of, &mut handles);
            }
        }

        // Integrate forces and capture the solver state
        let gravity = self.gravity;
        let mut positions: Vec<Position> = Vec::with_capacity(handles.len());
        let mut velocities: Vec<Velocity> = Vec::with_capacity(handles.len());
        for &handle in &handles {
            let body = match self.bodies.get_mut(handle.index, handle.generation) {
                Some(b) => b,
                None => continue,
            };
            body.integrate_forces(gravity, dt);
            positions.push(Position {
                c: body.sweep.c,
                a: body.sweep.a,
            });
            velocities.push(Velocity {
                v: body.linear_velocity(),
                w: body.angular_velocity(),
            });
        }

        // Contact constraints
        let mut defs: Vec<ContactConstraintDef> = Vec::with_capacity(island.contacts.len());
        for (contact_index, key) in island.contacts.iter().enumerate() {
            let contact = match self.contacts.get(key) {
                Some(c) => c,
                None => continue,
            };
            let body_a = match self.bodies.get(contact.body_a.index, contact.body_a.generation) {
                Some(b) => b,
                None => continue,
            };
            let body_b = match self.bodies.get(contact.body_b.index, contact.body_b.generation) {
                Some(b) => b,
                None => continue,
            };

            defs.push(ContactConstraintDef {
                contact_index,
                index_a: index_of[&contact.body_a],
                index_b: index_of[&contact.body_b],
                inv_mass_a: body_a.inv_mass(),
                inv_mass_b: body_b.inv_mass(),
                inv_inertia_a: body_a.inv_inertia(),
                inv_inertia_b: body_b.inv_inertia(),
                friction: contact.friction,
                restitution: contact.restitution,
                normal: contact.manifold.normal,
                points: contact
                    .manifold
                    .points
                    .iter()
                    .map(|p| (p.point, p.separation, p.normal_impulse, p.tangent_impulse))
                    .collect(),
            });
        }

        let mut solver = ContactSolver::new(
            &defs,
            &positions,
            &velocities,
            self.config.restitution_threshold,
        );

        // Joint constraints
        for &joint_handle in &island.joints {
            let (body_a, body_b) = match self
                .joints
                .get(joint_handle.index, joint_handle.generation)
            {
                Some(j) => (j.body_a(), j.body_b()),
                None => continue,
            };
            let data_a = match self.bodies.get(body_a.index, body_a.generation) {
                Some(b) => JointBodyData {
                    index: index_of[&body_a],
                    local_center: b.local_center(),
                    inv_mass: b.inv_mass(),
                    inv_inertia: b.inv_inertia(),
                },
                None => continue,
            };
            let data_b = match self.bodies.get(body_b.index, body_b.generation) {
                Some(b) => JointBodyData {
                    index: index_of[&body_b],
                    local_center: b.local_center(),
                    inv_mass: b.inv_mass(),
                    inv_inertia: b.inv_inertia(),
                },
                None => continue,
            };

            if let Some(joint) = self
                .joints
                .get_mut(joint_handle.index, joint_handle.generation)
            {
                joint.init_velocity(data_a, data_b, &positions, &mut velocities);
            }
        }

        solver.warm_start(&mut velocities);

        for _ in 0..self.config.velocity_iterations {
            for &joint_handle in &island.joints {
                if let Some(joint) = self
                    .joints
                    .get_mut(joint_handle.index, joint_handle.generation)
                {
                    joint.solve_velocity(&mut velocities);
                }
            }
            solver.solve_velocity(&mut velocities);
        }

        // Integrate velocities into positions, clamping runaway motion
        for i in 0..handles.len() {
            let translation = velocities[i].v * dt;
            if translation.length_squared() > MAX_TRANSLATION * MAX_TRANSLATION {
                velocities[i].v *= MAX_TRANSLATION / translation.length();
            }
            let rotation = velocities[i].w * dt;
            if rotation.abs() > MAX_ROTATION {
                velocities[i].w *= MAX_ROTATION / rotation.abs();
            }

            positions[i].c += velocities[i].v * dt;
            positions[i].a += velocities[i].w * dt;
        }

        // Position correction
        for _ in 0..self.config.position_iterations {
            let contacts_ok = solver.solve_position(&mut positions);

            let mut joints_ok = true;
            for &joint_handle in &island.joints {
                if let Some(joint) = self
                    .joints
                    .get_mut(joint_handle.index, joint_handle.generation)
                {
                    joints_ok &= joint.solve_position(&mut positions);
                }
            }

            if contacts_ok && joints_ok {
                break;
            }
        }

        // Write results back, keeping the step-start state in the sweep for
        // the continuous pass.
        for (i, &handle) in handles.iter().enumerate() {
            let body = match self.bodies.get_mut(handle.index, handle.generation) {
                Some(b) => b,
                None => continue,
            };
            if body.body_type() == BodyType::Static {
                continue;
            }

            body.sweep.c0 = body.sweep.c;
            body.sweep.a0 = body.sweep.a;
            body.sweep.c = positions[i].c;
            body.sweep.a = positions[i].a;
            body.set_solved_velocities(velocities[i].v, velocities[i].w);
            body.synchronize_transform();
        }

        // Accumulated impulses go back into the manifolds for warm starting
        // and the post-solve report.
        let contacts = &mut self.contacts;
        let mut max_impulses: Vec<(f32, f32)> = vec![(0.0, 0.0); island.contacts.len()];
        solver.for_each_result(|contact_index, point_index, normal, tangent| {
            if let Some(contact) = contacts.get_mut(&island.contacts[contact_index]) {
                if let Some(point) = contact.manifold.points.get_mut(point_index) {
                    point.normal_impulse = normal;
                    point.tangent_impulse = tangent;
                }
            }
            let entry = &mut max_impulses[contact_index];
            entry.0 = entry.0.max(normal);
            entry.1 = entry.1.max(tangent.abs());
        });
        for (contact_index, &(normal, tangent)) in max_impulses.iter().enumerate() {
            if normal > 0.0 || tangent > 0.0 {
                post_solve.push((island.contacts[contact_index], normal, tangent));
            }
        }
    }

    /// Puts the island to sleep once every member has rested long enough
    fn update_sleep(&mut self, island: &Island, dt: f32) {
        if !self.config.allow_sleeping {
            return;
        }

        let linear_tolerance_sq =
            self.config.linear_sleep_tolerance * self.config.linear_sleep_tolerance;
        let angular_tolerance_sq =
            self.config.angular_sleep_tolerance * self.config.angular_sleep_tolerance;

        let mut min_sleep_time = f32::MAX;
        for &handle in &island.bodies {
            let body = match self.bodies.get_mut(handle.index, handle.generation) {
                Some(b) => b,
                None => continue,
            };

            let resting = body.is_sleeping_allowed()
                && body.linear_velocity().length_squared() <= linear_tolerance_sq
                && body.angular_velocity() * body.angular_velocity() <= angular_tolerance_sq;

            if resting {
                body.sleep_time += dt;
                min_sleep_time = min_sleep_time.min(body.sleep_time);
            } else {
                body.sleep_time = 0.0;
                min_sleep_time = 0.0;
            }
        }

        if min_sleep_time >= self.config.time_to_sleep {
            for &handle in &island.bodies {
                if let Some(body) = self.bodies.get_mut(handle.index, handle.generation) {
                    if body.is_awake() {
                        body.set_awake(false);
                        self.events.push_body(BodyEvent::Slept(handle));
                    }
                }
            }
        }
    }

    /// Continuous collision: sweeps fast bodies against obstacles and rolls
    /// them back to the earliest impact so they never end a step inside or
    /// beyond a thin obstacle.
    fn solve_continuous(&mut self) {
        let movers: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, _, body)| body.body_type() == BodyType::Dynamic && body.is_awake())
            .map(|(index, generation, _)| BodyHandle::new(index, generation, self.id))
            .collect();

        for handle in movers {
            let (sweep, bullet, fixture_handles) =
                match self.bodies.get(handle.index, handle.generation) {
                    Some(body) => (body.sweep, body.is_bullet(), body.fixtures.clone()),
                    None => continue,
                };

            // Slow bodies cannot tunnel; the discrete solver covers them.
            let displacement = (sweep.c - sweep.c0).length();
            if displacement < AABB_MARGIN {
                continue;
            }

            let mut min_t = 1.0_f32;

            for fixture_handle in &fixture_handles {
                let fixture = match self
                    .fixtures
                    .get(fixture_handle.index, fixture_handle.generation)
                {
                    Some(f) => f,
                    None => continue,
                };
                if fixture.is_sensor() {
                    continue;
                }

                for child in 0..fixture.shape().child_count() {
                    // Swept bounds of this child over the whole step
                    let start = fixture
                        .shape()
                        .compute_aabb(&sweep.transform_at(0.0), child);
                    let end = fixture.shape().compute_aabb(&sweep.transform_at(1.0), child);
                    let swept = start.combine(&end);

                    let mut candidates: Vec<(FixtureHandle, u32)> = Vec::new();
                    {
                        let tree = self.broad_phase.tree();
                        tree.query(&swept, |proxy| {
                            candidates.push(tree.key(proxy));
                            true
                        });
                    }

                    for (other_handle, other_child) in candidates {
                        if other_handle == *fixture_handle {
                            continue;
                        }
                        let other = match self
                            .fixtures
                            .get(other_handle.index, other_handle.generation)
                        {
                            Some(f) => f,
                            None => continue,
                        };
                        if other.body == fixture.body || other.is_sensor() {
                            continue;
                        }
                        if !fixture.filter().should_collide(&other.filter()) {
                            continue;
                        }

                        let other_body =
                            match self.bodies.get(other.body.index, other.body.generation) {
                                Some(b) => b,
                                None => continue,
                            };
                        // Only bullets are swept against dynamic obstacles
                        if other_body.body_type() == BodyType::Dynamic && !bullet {
                            continue;
                        }

                        let input = ToiInput {
                            proxy_a: DistanceProxy::new(fixture.shape(), child),
                            proxy_b: DistanceProxy::new(other.shape(), other_child as usize),
                            sweep_a: sweep,
                            sweep_b: other_body.sweep,
                            t_max: min_t,
                        };
                        let output = time_of_impact(&input);
                        if output.state == ToiState::Touching && output.t < min_t {
                            min_t = output.t;
                        }
                    }
                }
            }

            if min_t < 1.0 {
                if let Some(body) = self.bodies.get_mut(handle.index, handle.generation) {
                    // Hold at the impact time; the next step's discrete
                    // solver resolves the new contact.
                    body.sweep.c = body.sweep.c0.lerp(&body.sweep.c, min_t);
                    body.sweep.a = crate::math::lerp(body.sweep.a0, body.sweep.a, min_t);
                    body.synchronize_transform();
                }
            }
        }
    }

    fn clear_all_forces(&mut self) {
        for (_, _, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("fixtures", &self.fixtures.len())
            .field("joints", &self.joints.len())
            .field("contacts", &self.contacts.len())
            .field("locked", &self.locked)
            .finish()
    }
}
