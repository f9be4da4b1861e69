//! The simulation container: object storage, stepping, islands and events.

mod events;
mod island;
mod storage;
#[allow(clippy::module_inception)]
mod world;

pub use events::{BodyEvent, ContactEvent};
pub use world::{ContactListener, RayCastHit, World, WorldConfig};

pub(crate) use island::{Island, IslandBuilder};
pub(crate) use storage::Arena;

use std::fmt;

/// Stable reference to a body in a specific world.
///
/// Handles are generation-checked slot indices stamped with the id of the
/// world that issued them: using a handle after its object was destroyed
/// fails `UseAfterDestroy`, and using it against another world fails
/// `CrossWorldReference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    pub(crate) world: u32,
}

impl BodyHandle {
    pub(crate) fn new(index: u32, generation: u32, world: u32) -> Self {
        Self {
            index,
            generation,
            world,
        }
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body({}v{})", self.index, self.generation)
    }
}

/// Stable reference to a fixture in a specific world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixtureHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    pub(crate) world: u32,
}

impl FixtureHandle {
    pub(crate) fn new(index: u32, generation: u32, world: u32) -> Self {
        Self {
            index,
            generation,
            world,
        }
    }
}

impl fmt::Display for FixtureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fixture({}v{})", self.index, self.generation)
    }
}

/// Stable reference to a joint in a specific world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JointHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    pub(crate) world: u32,
}

impl JointHandle {
    pub(crate) fn new(index: u32, generation: u32, world: u32) -> Self {
        Self {
            index,
            generation,
            world,
        }
    }
}

impl fmt::Display for JointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "joint({}v{})", self.index, self.generation)
    }
}
