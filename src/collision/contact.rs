use crate::collision::manifold::Manifold;
use crate::world::{BodyHandle, FixtureHandle};

/// Ordered fixture pair identifying a persistent contact.
///
/// The smaller handle always comes first so the same pair maps to the same
/// key no matter which broad-phase proxy reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContactKey {
    pub fixture_a: FixtureHandle,
    pub fixture_b: FixtureHandle,
}

impl ContactKey {
    pub fn new(a: FixtureHandle, b: FixtureHandle) -> Self {
        if a <= b {
            Self { fixture_a: a, fixture_b: b }
        } else {
            Self { fixture_a: b, fixture_b: a }
        }
    }
}

/// A persistent contact between two fixtures.
///
/// Created when the fattened AABBs begin to overlap and destroyed when they
/// stop; `touching` tracks whether the shapes actually intersect. Accumulated
/// impulses are carried inside the manifold points for warm starting.
#[derive(Debug)]
pub struct Contact {
    pub fixture_a: FixtureHandle,
    pub fixture_b: FixtureHandle,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub manifold: Manifold,
    pub touching: bool,
    pub enabled: bool,
    pub is_sensor: bool,
    pub friction: f32,
    pub restitution: f32,
}

impl Contact {
    pub(crate) fn new(
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
        body_a: BodyHandle,
        body_b: BodyHandle,
        friction_a: f32,
        friction_b: f32,
        restitution_a: f32,
        restitution_b: f32,
        is_sensor: bool,
    ) -> Self {
        Self {
            fixture_a,
            fixture_b,
            body_a,
            body_b,
            manifold: Manifold::new(),
            touching: false,
            enabled: true,
            is_sensor,
            friction: mix_friction(friction_a, friction_b),
            restitution: mix_restitution(restitution_a, restitution_b),
        }
    }

    pub fn key(&self) -> ContactKey {
        ContactKey::new(self.fixture_a, self.fixture_b)
    }

    /// Returns whether the shapes currently intersect
    pub fn is_touching(&self) -> bool {
        self.touching
    }

    /// Returns whether the solver will process this contact this step
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mixed friction coefficient for this pair
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Mixed restitution coefficient for this pair
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Overrides the mixed friction until the next reset
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    /// Overrides the mixed restitution until the next reset
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    /// Restores the friction mixed from the two fixtures
    pub fn reset_friction(&mut self, friction_a: f32, friction_b: f32) {
        self.friction = mix_friction(friction_a, friction_b);
    }

    /// Restores the restitution mixed from the two fixtures
    pub fn reset_restitution(&mut self, restitution_a: f32, restitution_b: f32) {
        self.restitution = mix_restitution(restitution_a, restitution_b);
    }

    /// Installs a freshly evaluated manifold, carrying accumulated impulses
    /// over from matching points of the previous one. Returns
    /// `(began, ended)` touch transitions.
    pub(crate) fn update_manifold(&mut self, mut manifold: Manifold) -> (bool, bool) {
        let was_touching = self.touching;

        manifold.warm_start_from(&self.manifold);
        self.touching = !manifold.is_empty();
        self.manifold = manifold;

        (
            self.touching && !was_touching,
            was_touching && !self.touching,
        )
    }
}

/// Geometric mean, so one slippery surface dominates
fn mix_friction(a: f32, b: f32) -> f32 {
    (a * b).sqrt()
}

/// The bouncier surface wins
fn mix_restitution(a: f32, b: f32) -> f32 {
    a.max(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_order_independent() {
        let a = FixtureHandle::new(1, 0, 7);
        let b = FixtureHandle::new(2, 0, 7);
        assert_eq!(ContactKey::new(a, b), ContactKey::new(b, a));
    }

    #[test]
    fn friction_mixes_geometrically() {
        assert!((mix_friction(0.4, 0.9) - 0.6).abs() < 1.0e-6);
        assert_eq!(mix_friction(0.0, 1.0), 0.0);
    }

    #[test]
    fn restitution_takes_the_larger() {
        assert_eq!(mix_restitution(0.2, 0.8), 0.8);
    }
}
