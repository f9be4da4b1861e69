mod body;
mod fixture;

pub use body::{Body, BodyDef};
pub use fixture::{Fixture, FixtureDef};

use crate::math::Vec2;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Type of body, determining how it behaves in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum BodyType {
    /// Static bodies don't move and have zero mass
    Static,

    /// Kinematic bodies move by velocity but ignore forces and collisions
    Kinematic,

    /// Dynamic bodies are fully simulated
    Dynamic,
}

/// Mass, center of mass, and rotational inertia of a body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct MassData {
    /// The mass in kilograms
    pub mass: f32,

    /// The center of mass in the body's local space
    pub center: Vec2,

    /// The rotational inertia about the local origin
    pub inertia: f32,
}

/// Flags for controlling body behavior
pub mod body_flags {
    use bitflags::bitflags;

    bitflags! {
        /// Flags for controlling the behavior of bodies
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct BodyFlags: u32 {
            /// Body can go to sleep when inactive
            const CAN_SLEEP = 0x01;

            /// Body is currently awake
            const AWAKE = 0x02;

            /// Body uses continuous collision detection against all bodies
            const BULLET = 0x04;

            /// Body never rotates (infinite rotational inertia)
            const FIXED_ROTATION = 0x08;

            /// Body participates in simulation and queries
            const ENABLED = 0x10;
        }
    }

    impl Default for BodyFlags {
        fn default() -> Self {
            BodyFlags::CAN_SLEEP | BodyFlags::AWAKE | BodyFlags::ENABLED
        }
    }
}
