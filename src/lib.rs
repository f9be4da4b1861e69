pub mod math;
pub mod shapes;
pub mod bodies;
pub mod collision;
pub mod joints;
pub mod world;

/// Re-export common types for easier usage
pub use crate::bodies::{Body, BodyDef, BodyType, Fixture, FixtureDef, MassData};
pub use crate::collision::Filter;
pub use crate::joints::{
    DistanceJointDef, Joint, JointDef, PrismaticJointDef, RevoluteJointDef,
};
pub use crate::math::Vec2;
pub use crate::shapes::Shape;
pub use crate::world::{
    BodyEvent, BodyHandle, ContactEvent, ContactListener, FixtureHandle, JointHandle, RayCastHit,
    World, WorldConfig,
};

/// Error types for the physics engine
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum PhysicsError {
        #[error("use after destroy: the referenced object no longer exists")]
        UseAfterDestroy,

        #[error("world is locked: mutation is not allowed during a step")]
        WorldLocked,

        #[error("invalid geometry: {0}")]
        InvalidGeometry(String),

        #[error("cross-world reference: object belongs to a different world")]
        CrossWorldReference,

        #[error("invalid filter range: category/mask must fit in 16 bits, group in i16")]
        InvalidFilterRange,
    }
}

/// Result type for physics engine operations
pub type Result<T> = std::result::Result<T, error::PhysicsError>;

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
