use impulse2d::error::PhysicsError;
use impulse2d::math::Aabb;
use impulse2d::shapes::{CircleShape, PolygonShape};
use impulse2d::{
    BodyDef, BodyEvent, ContactEvent, ContactListener, DistanceJointDef, Filter, FixtureDef,
    FixtureHandle, JointDef, Shape, Vec2, World,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const DT: f32 = 1.0 / 60.0;

fn circle(radius: f32) -> Shape {
    Shape::Circle(CircleShape::new(radius).unwrap())
}

fn boxed(half_width: f32, half_height: f32) -> Shape {
    Shape::Polygon(PolygonShape::new_box(half_width, half_height).unwrap())
}

#[test]
fn test_destroyed_body_cascades_to_fixtures_and_joints() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let anchor = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    let body = world
        .create_body(&BodyDef::dynamic(Vec2::new(2.0, 0.0)))
        .unwrap();
    let fixture = world
        .create_fixture(body, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();
    let joint = world
        .create_joint(&JointDef::Distance(DistanceJointDef::new(anchor, body, 2.0)))
        .unwrap();

    world.destroy_body(body).unwrap();

    assert_eq!(world.body(body).err(), Some(PhysicsError::UseAfterDestroy));
    assert_eq!(
        world.fixture(fixture).err(),
        Some(PhysicsError::UseAfterDestroy)
    );
    assert!(world.joint(joint).is_err());
    assert_eq!(world.body_count(), 1);
    assert_eq!(world.fixture_count(), 0);
    assert_eq!(world.joint_count(), 0);

    // The survivor still works
    assert!(world.body(anchor).is_ok());
    world.step(DT).unwrap();
}

#[test]
fn test_handles_are_not_valid_across_worlds() {
    let mut world_a = World::new(Vec2::zero(), true);
    let world_b = World::new(Vec2::zero(), true);

    let handle = world_a.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();

    assert_eq!(
        world_b.body(handle).err(),
        Some(PhysicsError::CrossWorldReference)
    );
}

#[test]
fn test_slot_reuse_does_not_resurrect_old_handles() {
    let mut world = World::new(Vec2::zero(), true);

    let first = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    world.destroy_body(first).unwrap();

    // The new body may reuse the slot, but the old handle stays dead
    let second = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    assert_eq!(world.body(first).err(), Some(PhysicsError::UseAfterDestroy));
    assert!(world.body(second).is_ok());
}

#[test]
fn test_disjoint_filter_masks_prevent_contact() {
    let mut world = World::new(Vec2::zero(), false);

    let a = world
        .create_body(&BodyDef::dynamic(Vec2::new(-0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(
            a,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .filter(Filter::new(0x0002, 0x0004, 0).unwrap()),
        )
        .unwrap();

    let b = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(
            b,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .filter(Filter::new(0x0008, 0x0001, 0).unwrap()),
        )
        .unwrap();

    for _ in 0..10 {
        world.step(DT).unwrap();
    }

    // Deeply overlapping, yet no contact is ever created
    assert_eq!(world.contact_count(), 0);
    assert!(world.drain_contact_events().is_empty());
}

#[test]
fn test_negative_group_prevents_contact_despite_masks() {
    let mut world = World::new(Vec2::zero(), false);

    let filter = Filter::new(0x0001, 0xFFFF, -5).unwrap();
    let a = world
        .create_body(&BodyDef::dynamic(Vec2::new(-0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(a, &FixtureDef::new(circle(0.5)).density(1.0).filter(filter))
        .unwrap();
    let b = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(b, &FixtureDef::new(circle(0.5)).density(1.0).filter(filter))
        .unwrap();

    world.step(DT).unwrap();
    assert_eq!(world.contact_count(), 0);
}

#[test]
fn test_positive_group_forces_contact_despite_masks() {
    let mut world = World::new(Vec2::zero(), false);

    // Masks say no, the shared positive group says yes
    let a = world
        .create_body(&BodyDef::dynamic(Vec2::new(-0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(
            a,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .filter(Filter::new(0x0002, 0x0004, 5).unwrap()),
        )
        .unwrap();
    let b = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(
            b,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .filter(Filter::new(0x0008, 0x0001, 5).unwrap()),
        )
        .unwrap();

    world.step(DT).unwrap();

    let began = world
        .drain_contact_events()
        .iter()
        .any(|e| matches!(e, ContactEvent::Begin { .. }));
    assert!(began);
}

#[test]
fn test_sensor_reports_overlap_without_collision_response() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    // A sensor region the ball falls straight through
    let region = world
        .create_body(&BodyDef::fixed(Vec2::new(0.0, 0.0)))
        .unwrap();
    world
        .create_fixture(
            region,
            &FixtureDef::new(boxed(2.0, 0.5)).density(1.0).sensor(true),
        )
        .unwrap();

    let ball = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 3.0)))
        .unwrap();
    world
        .create_fixture(ball, &FixtureDef::new(circle(0.25)).density(1.0))
        .unwrap();

    let mut saw_begin = false;
    let mut saw_end = false;
    for _ in 0..240 {
        world.step(DT).unwrap();
        for event in world.drain_contact_events() {
            match event {
                ContactEvent::Begin { .. } => saw_begin = true,
                ContactEvent::End { .. } => saw_end = true,
                ContactEvent::PostSolve { .. } => {
                    panic!("sensor contact must never be solved")
                }
            }
        }
    }

    assert!(saw_begin);
    assert!(saw_end);
    // The ball dropped through without slowing down
    assert!(world.body(ball).unwrap().position().y < -2.0);
}

#[derive(Default)]
struct LockProbe {
    begins: Arc<AtomicUsize>,
    post_solves: Arc<AtomicUsize>,
    locked_rejections: Arc<AtomicUsize>,
}

impl ContactListener for LockProbe {
    fn begin_contact(&mut self, world: &mut World, _a: FixtureHandle, _b: FixtureHandle) {
        self.begins.fetch_add(1, Ordering::SeqCst);
        // Structural mutation from inside a step must be rejected
        if world.create_body(&BodyDef::dynamic(Vec2::zero())).err()
            == Some(PhysicsError::WorldLocked)
        {
            self.locked_rejections.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn post_solve(
        &mut self,
        world: &mut World,
        _a: FixtureHandle,
        _b: FixtureHandle,
        normal_impulse: f32,
        _tangent_impulse: f32,
    ) {
        assert!(world.is_locked());
        assert!(normal_impulse >= 0.0);
        self.post_solves.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_listener_runs_inside_locked_world() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let ground = world
        .create_body(&BodyDef::fixed(Vec2::new(0.0, -0.5)))
        .unwrap();
    world
        .create_fixture(ground, &FixtureDef::new(boxed(5.0, 0.5)).density(1.0))
        .unwrap();
    let ball = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 1.0)))
        .unwrap();
    world
        .create_fixture(ball, &FixtureDef::new(circle(0.25)).density(1.0))
        .unwrap();

    let begins = Arc::new(AtomicUsize::new(0));
    let post_solves = Arc::new(AtomicUsize::new(0));
    let locked_rejections = Arc::new(AtomicUsize::new(0));
    world
        .set_contact_listener(Box::new(LockProbe {
            begins: begins.clone(),
            post_solves: post_solves.clone(),
            locked_rejections: locked_rejections.clone(),
        }))
        .unwrap();

    for _ in 0..120 {
        world.step(DT).unwrap();
    }

    assert!(begins.load(Ordering::SeqCst) > 0);
    assert!(post_solves.load(Ordering::SeqCst) > 0);
    assert_eq!(
        locked_rejections.load(Ordering::SeqCst),
        begins.load(Ordering::SeqCst)
    );
    // Nothing leaked into the world from the rejected calls
    assert_eq!(world.body_count(), 2);
}

struct PassThrough;

impl ContactListener for PassThrough {
    fn pre_solve(&mut self, world: &mut World, a: FixtureHandle, b: FixtureHandle) {
        // Disabling from pre-solve is the one permitted in-step mutation
        world.set_contact_enabled(a, b, false).unwrap();
    }
}

#[test]
fn test_pre_solve_disable_skips_collision_response() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let platform = world
        .create_body(&BodyDef::fixed(Vec2::new(0.0, 0.0)))
        .unwrap();
    world
        .create_fixture(platform, &FixtureDef::new(boxed(5.0, 0.25)).density(1.0))
        .unwrap();
    let ball = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 1.0)))
        .unwrap();
    world
        .create_fixture(ball, &FixtureDef::new(circle(0.25)).density(1.0))
        .unwrap();

    world.set_contact_listener(Box::new(PassThrough)).unwrap();

    for _ in 0..180 {
        world.step(DT).unwrap();
    }

    // With every contact disabled the ball falls straight through
    assert!(world.body(ball).unwrap().position().y < -1.0);
}

#[test]
fn test_resting_island_falls_asleep_and_stays_put() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let ground = world
        .create_body(&BodyDef::fixed(Vec2::new(0.0, -0.5)))
        .unwrap();
    world
        .create_fixture(ground, &FixtureDef::new(boxed(10.0, 0.5)).density(1.0))
        .unwrap();
    let crate_handle = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 1.0)))
        .unwrap();
    world
        .create_fixture(
            crate_handle,
            &FixtureDef::new(boxed(0.5, 0.5)).density(1.0).friction(0.5),
        )
        .unwrap();

    let mut slept = false;
    for _ in 0..600 {
        world.step(DT).unwrap();
        for event in world.drain_body_events() {
            if event == BodyEvent::Slept(crate_handle) {
                slept = true;
            }
        }
    }

    assert!(slept, "resting body never fell asleep");
    let body = world.body(crate_handle).unwrap();
    assert!(!body.is_awake());
    assert_eq!(body.linear_velocity().length_squared(), 0.0);

    // A sleeping body is bit-stable across further steps
    let position = body.position();
    for _ in 0..60 {
        world.step(DT).unwrap();
    }
    let after = world.body(crate_handle).unwrap().position();
    assert_eq!(position.x, after.x);
    assert_eq!(position.y, after.y);
}

#[test]
fn test_bullet_does_not_tunnel_through_thin_wall() {
    let mut world = World::new(Vec2::zero(), false);

    let wall = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    world
        .create_fixture(wall, &FixtureDef::new(boxed(0.05, 2.0)).density(1.0))
        .unwrap();

    let mut def = BodyDef::dynamic(Vec2::new(-5.0, 0.0));
    def.bullet = true;
    def.linear_velocity = Vec2::new(200.0, 0.0);
    let bullet = world.create_body(&def).unwrap();
    world
        .create_fixture(bullet, &FixtureDef::new(circle(0.1)).density(1.0))
        .unwrap();

    // One step covers over 3 meters; discrete stepping alone would skip
    // the 0.1 meter wall entirely.
    for _ in 0..10 {
        world.step(DT).unwrap();
    }

    let x = world.body(bullet).unwrap().position().x;
    assert!(x < 0.0, "bullet ended up past the wall at x = {}", x);
    assert!(x > -5.0, "bullet never moved");
}

#[test]
fn test_ray_cast_reports_closest_hit_first() {
    let mut world = World::new(Vec2::zero(), true);

    let near = world
        .create_body(&BodyDef::fixed(Vec2::new(5.0, 0.0)))
        .unwrap();
    world
        .create_fixture(near, &FixtureDef::new(boxed(1.0, 1.0)).density(1.0))
        .unwrap();
    let far = world
        .create_body(&BodyDef::fixed(Vec2::new(8.0, 0.0)))
        .unwrap();
    let far_fixture = world
        .create_fixture(far, &FixtureDef::new(boxed(1.0, 1.0)).density(1.0))
        .unwrap();

    let mut hits = Vec::new();
    world.ray_cast(Vec2::zero(), Vec2::new(10.0, 0.0), |hit| {
        hits.push(*hit);
        true
    });

    assert_eq!(hits.len(), 2);
    assert!((hits[0].fraction - 0.4).abs() < 1e-3);
    assert!((hits[0].point.x - 4.0).abs() < 1e-3);
    assert!((hits[0].normal.x + 1.0).abs() < 1e-3);
    assert!(hits[0].fraction < hits[1].fraction);

    // Early termination stops after the first hit
    let mut first_only = Vec::new();
    world.ray_cast(Vec2::zero(), Vec2::new(10.0, 0.0), |hit| {
        first_only.push(hit.fixture);
        false
    });
    assert_eq!(first_only.len(), 1);
    assert_ne!(first_only[0], far_fixture);
}

#[test]
fn test_query_aabb_finds_overlapping_fixtures() {
    let mut world = World::new(Vec2::zero(), true);

    let inside = world
        .create_body(&BodyDef::fixed(Vec2::new(1.0, 1.0)))
        .unwrap();
    let inside_fixture = world
        .create_fixture(inside, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();
    let outside = world
        .create_body(&BodyDef::fixed(Vec2::new(20.0, 20.0)))
        .unwrap();
    world
        .create_fixture(outside, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();

    let mut found = Vec::new();
    world.query_aabb(
        &Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0)),
        |fixture| {
            found.push(fixture);
            true
        },
    );

    assert_eq!(found, vec![inside_fixture]);
}

#[test]
fn test_identical_worlds_step_identically() {
    let build = || {
        let mut rng = StdRng::seed_from_u64(42);
        let mut world = World::new(Vec2::new(0.0, -10.0), true);

        let ground = world
            .create_body(&BodyDef::fixed(Vec2::new(0.0, -0.5)))
            .unwrap();
        world
            .create_fixture(
                ground,
                &FixtureDef::new(boxed(20.0, 0.5)).density(1.0).friction(0.4),
            )
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..30 {
            let x = rng.gen_range(-8.0..8.0);
            let y = rng.gen_range(1.0..10.0);
            let handle = world
                .create_body(&BodyDef::dynamic(Vec2::new(x, y)))
                .unwrap();
            let shape = if rng.gen_bool(0.5) {
                circle(0.3)
            } else {
                boxed(0.3, 0.3)
            };
            world
                .create_fixture(
                    handle,
                    &FixtureDef::new(shape).density(1.0).friction(0.4),
                )
                .unwrap();
            handles.push(handle);
        }
        (world, handles)
    };

    let (mut world_a, handles_a) = build();
    let (mut world_b, handles_b) = build();

    for _ in 0..180 {
        world_a.step(DT).unwrap();
        world_b.step(DT).unwrap();
    }

    // Bit-identical trajectories, not merely close ones
    for (&ha, &hb) in handles_a.iter().zip(&handles_b) {
        let a = world_a.body(ha).unwrap();
        let b = world_b.body(hb).unwrap();
        assert_eq!(a.position().x, b.position().x);
        assert_eq!(a.position().y, b.position().y);
        assert_eq!(a.angle(), b.angle());
        assert_eq!(a.linear_velocity().x, b.linear_velocity().x);
        assert_eq!(a.linear_velocity().y, b.linear_velocity().y);
    }
}

#[test]
fn test_joint_suppresses_contact_between_connected_bodies() {
    let mut world = World::new(Vec2::zero(), false);

    let a = world
        .create_body(&BodyDef::dynamic(Vec2::new(-0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(a, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();
    let b = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(b, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();

    // collide_connected defaults to false
    world
        .create_joint(&JointDef::Distance(DistanceJointDef::new(a, b, 0.8)))
        .unwrap();

    for _ in 0..10 {
        world.step(DT).unwrap();
    }

    assert_eq!(world.contact_count(), 0);
}

#[test]
fn test_zero_dt_step_is_a_no_op() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);
    let handle = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 5.0)))
        .unwrap();
    world
        .create_fixture(handle, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();

    world.step(0.0).unwrap();

    let body = world.body(handle).unwrap();
    assert_eq!(body.position().y, 5.0);
    assert_eq!(body.linear_velocity().y, 0.0);
}

#[test]
fn test_filter_change_regenerates_contact_for_overlapping_pair() {
    let mut world = World::new(Vec2::zero(), false);

    let never = Filter::new(0x0001, 0xFFFF, -5).unwrap();
    let a = world
        .create_body(&BodyDef::dynamic(Vec2::new(-0.4, 0.0)))
        .unwrap();
    let fa = world
        .create_fixture(a, &FixtureDef::new(circle(0.5)).density(1.0).filter(never))
        .unwrap();
    let b = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.4, 0.0)))
        .unwrap();
    let fb = world
        .create_fixture(b, &FixtureDef::new(circle(0.5)).density(1.0).filter(never))
        .unwrap();

    for _ in 0..3 {
        world.step(DT).unwrap();
    }
    assert_eq!(world.contact_count(), 0);
    world.drain_contact_events();

    // Neither proxy moves, so only the filter change can bring the pair back
    let always = Filter::new(0x0001, 0xFFFF, 5).unwrap();
    world.fixture_mut(fa).unwrap().set_filter(always);
    world.fixture_mut(fb).unwrap().set_filter(always);

    for _ in 0..3 {
        world.step(DT).unwrap();
    }

    assert!(world.contact_count() > 0);
    let began = world
        .drain_contact_events()
        .iter()
        .any(|e| matches!(e, ContactEvent::Begin { .. }));
    assert!(began);
}

#[test]
fn test_destroying_joint_restores_contact_between_connected_bodies() {
    let mut world = World::new(Vec2::zero(), false);

    let a = world
        .create_body(&BodyDef::dynamic(Vec2::new(-0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(a, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();
    let b = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.4, 0.0)))
        .unwrap();
    world
        .create_fixture(b, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();

    let joint = world
        .create_joint(&JointDef::Distance(DistanceJointDef::new(a, b, 0.8)))
        .unwrap();

    for _ in 0..3 {
        world.step(DT).unwrap();
    }
    assert_eq!(world.contact_count(), 0);

    world.destroy_joint(joint).unwrap();
    for _ in 0..3 {
        world.step(DT).unwrap();
    }

    assert!(world.contact_count() > 0);
}

#[test]
fn test_world_test_point_uses_body_transform() {
    let mut world = World::new(Vec2::zero(), false);

    let handle = world
        .create_body(&BodyDef::dynamic(Vec2::new(2.0, 3.0)))
        .unwrap();
    let fixture = world
        .create_fixture(handle, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();

    assert!(world.test_point(fixture, Vec2::new(2.1, 3.1)).unwrap());
    assert!(!world.test_point(fixture, Vec2::new(4.0, 4.0)).unwrap());

    // The test follows the body when it moves
    world
        .body_mut(handle)
        .unwrap()
        .set_transform(Vec2::new(-5.0, 0.0), 0.0);
    assert!(world.test_point(fixture, Vec2::new(-5.2, 0.0)).unwrap());
    assert!(!world.test_point(fixture, Vec2::new(2.0, 3.0)).unwrap());
}
