use crate::world::{BodyHandle, FixtureHandle};

/// Immutable record of a contact transition or solver result.
///
/// Events accumulate during a step and are drained after the world unlocks,
/// so reading them can never observe a half-stepped world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactEvent {
    /// Two fixtures started touching
    Begin {
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
    },

    /// Two fixtures stopped touching
    End {
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
    },

    /// Impulses the solver applied to a touching contact this step
    PostSolve {
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
        normal_impulse: f32,
        tangent_impulse: f32,
    },
}

/// Immutable record of a body state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEvent {
    /// The body's island fell asleep
    Slept(BodyHandle),

    /// The body woke up
    Woke(BodyHandle),
}

/// Buffered observability channel for a stepping world
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    contact_events: Vec<ContactEvent>,
    body_events: Vec<BodyEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_contact(&mut self, event: ContactEvent) {
        self.contact_events.push(event);
    }

    pub fn push_body(&mut self, event: BodyEvent) {
        self.body_events.push(event);
    }

    /// Removes and returns all buffered contact events in emission order
    pub fn drain_contact_events(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.contact_events)
    }

    /// Removes and returns all buffered body events in emission order
    pub fn drain_body_events(&mut self) -> Vec<BodyEvent> {
        std::mem::take(&mut self.body_events)
    }
}
