use crate::collision::Filter;
use crate::math::{Transform2, Vec2};
use crate::shapes::Shape;
use crate::world::BodyHandle;

/// Definition used to attach a fixture to a body
#[derive(Debug, Clone)]
pub struct FixtureDef {
    /// The shape of the fixture
    pub shape: Shape,

    /// The density used to compute the parent body's mass, in kg/m^2
    pub density: f32,

    /// Coulomb friction coefficient, conventionally in [0, 1]
    pub friction: f32,

    /// Coefficient of restitution (bounciness) in [0, 1]
    pub restitution: f32,

    /// Whether the fixture detects overlap without collision response
    pub sensor: bool,

    /// Collision filtering data
    pub filter: Filter,
}

impl FixtureDef {
    /// Creates a definition with default material values for the given shape
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            sensor: false,
            filter: Filter::default(),
        }
    }

    /// Sets the density and returns the definition
    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    /// Sets the friction coefficient and returns the definition
    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Sets the restitution coefficient and returns the definition
    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Marks the fixture as a sensor and returns the definition
    pub fn sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    /// Sets the collision filter and returns the definition
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Binds a shape to a body with material properties and collision filtering
pub struct Fixture {
    /// The shape of the fixture (immutable after creation)
    shape: Shape,

    /// The handle of the owning body
    pub(crate) body: BodyHandle,

    /// The density used for mass computation
    density: f32,

    /// Coulomb friction coefficient
    friction: f32,

    /// Coefficient of restitution
    restitution: f32,

    /// Whether the fixture is a sensor
    sensor: bool,

    /// Collision filtering data
    filter: Filter,

    /// Broad-phase proxy ids, one per shape child
    pub(crate) proxies: Vec<u32>,

    /// Set when the filter or sensor flag changed; the world re-touches the
    /// proxies at the start of the next step so dropped pairs can come back
    pub(crate) refilter: bool,
}

impl Fixture {
    /// Creates a new fixture from a definition
    pub(crate) fn new(body: BodyHandle, def: &FixtureDef) -> Self {
        Self {
            shape: def.shape.clone(),
            body,
            density: def.density.max(0.0),
            friction: def.friction,
            restitution: def.restitution,
            sensor: def.sensor,
            filter: def.filter,
            proxies: Vec::new(),
            refilter: false,
        }
    }

    /// Returns the shape of the fixture
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the handle of the owning body
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Returns the density of the fixture
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Sets the density of the fixture
    ///
    /// Call [`World::reset_mass_data`](crate::world::World::reset_mass_data)
    /// on the owning body for the change to take effect on its mass.
    pub fn set_density(&mut self, density: f32) {
        self.density = density.max(0.0);
    }

    /// Returns the friction coefficient
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Sets the friction coefficient
    ///
    /// Existing contacts keep their mixed friction until reset.
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    /// Returns the restitution coefficient
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Sets the restitution coefficient
    ///
    /// Existing contacts keep their mixed restitution until reset.
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    /// Returns whether the fixture is a sensor
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Sets whether the fixture is a sensor
    ///
    /// Takes effect on the next step.
    pub fn set_sensor(&mut self, sensor: bool) {
        if self.sensor != sensor {
            self.sensor = sensor;
            self.refilter = true;
        }
    }

    /// Returns the collision filter
    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Sets the collision filter
    ///
    /// Takes effect on the next step: existing contacts re-run the filter
    /// and previously suppressed overlapping pairs are re-examined.
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
        self.refilter = true;
    }

    /// Tests whether a world-space point lies inside the fixture's shape
    pub fn test_point(&self, transform: &Transform2, point: Vec2) -> bool {
        self.shape.test_point(transform, point)
    }
}
