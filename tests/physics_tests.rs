use approx::assert_relative_eq;
use impulse2d::{
    Body, BodyDef, BodyType, DistanceJointDef, FixtureDef, JointDef, MassData, PrismaticJointDef,
    RevoluteJointDef, Shape, Vec2, World,
};
use impulse2d::shapes::{CircleShape, PolygonShape};
use std::f32::consts::PI;

const DT: f32 = 1.0 / 60.0;

fn circle(radius: f32) -> Shape {
    Shape::Circle(CircleShape::new(radius).unwrap())
}

fn boxed(half_width: f32, half_height: f32) -> Shape {
    Shape::Polygon(PolygonShape::new_box(half_width, half_height).unwrap())
}

fn kinetic_energy(body: &Body) -> f32 {
    0.5 * body.mass() * body.linear_velocity().length_squared()
        + 0.5 * body.inertia() * body.angular_velocity() * body.angular_velocity()
}

#[test]
fn test_body_creation_and_mass() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let handle = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 5.0)))
        .unwrap();
    world
        .create_fixture(handle, &FixtureDef::new(circle(1.0)).density(2.0))
        .unwrap();

    // Disc mass is pi * r^2 * density
    let body = world.body(handle).unwrap();
    assert_relative_eq!(body.mass(), PI * 2.0, epsilon = 1e-4);
    assert_eq!(body.body_type(), BodyType::Dynamic);
    assert!(body.is_awake());
}

#[test]
fn test_static_body_has_zero_mass() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let handle = world
        .create_body(&BodyDef::fixed(Vec2::zero()))
        .unwrap();
    world
        .create_fixture(handle, &FixtureDef::new(boxed(10.0, 0.5)).density(1.0))
        .unwrap();

    let body = world.body(handle).unwrap();
    assert_eq!(body.mass(), 0.0);
    assert_eq!(body.inv_mass(), 0.0);
}

#[test]
fn test_free_fall_matches_gravity() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let handle = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 100.0)))
        .unwrap();
    world
        .create_fixture(handle, &FixtureDef::new(circle(0.5)).density(1.0))
        .unwrap();

    for _ in 0..60 {
        world.step(DT).unwrap();
    }

    // Semi-implicit Euler: v = g * t exactly after n steps
    let body = world.body(handle).unwrap();
    assert_relative_eq!(body.linear_velocity().y, -10.0, epsilon = 1e-3);
    assert!(body.position().y < 100.0);
}

#[test]
fn test_static_body_never_moves() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let ground = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    world
        .create_fixture(ground, &FixtureDef::new(boxed(10.0, 0.5)).density(1.0))
        .unwrap();

    // A heavy box landing on it must not push it
    let falling = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 3.0)))
        .unwrap();
    world
        .create_fixture(falling, &FixtureDef::new(boxed(0.5, 0.5)).density(50.0))
        .unwrap();

    for _ in 0..180 {
        world.step(DT).unwrap();
    }

    let body = world.body(ground).unwrap();
    assert_eq!(body.position().x, 0.0);
    assert_eq!(body.position().y, 0.0);
    assert_eq!(body.linear_velocity().length_squared(), 0.0);
}

#[test]
fn test_box_rests_on_ground() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    // Ground surface at y = 0
    let ground = world
        .create_body(&BodyDef::fixed(Vec2::new(0.0, -0.5)))
        .unwrap();
    world
        .create_fixture(ground, &FixtureDef::new(boxed(10.0, 0.5)).density(1.0))
        .unwrap();

    let falling = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 2.0)))
        .unwrap();
    world
        .create_fixture(
            falling,
            &FixtureDef::new(boxed(0.5, 0.5)).density(1.0).friction(0.5),
        )
        .unwrap();

    for _ in 0..180 {
        world.step(DT).unwrap();
    }

    // Box settles with its bottom on the surface, within solver slop
    let body = world.body(falling).unwrap();
    assert_relative_eq!(body.position().y, 0.5, epsilon = 0.03);
    assert!(body.linear_velocity().length() < 0.05);
}

#[test]
fn test_perfectly_elastic_head_on_collision_exchanges_velocities() {
    let mut world = World::new(Vec2::zero(), false);

    let left = world
        .create_body(&BodyDef::dynamic(Vec2::new(-2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(
            left,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .friction(0.0)
                .restitution(1.0),
        )
        .unwrap();
    world.body_mut(left).unwrap().set_linear_velocity(Vec2::new(5.0, 0.0));

    let right = world
        .create_body(&BodyDef::dynamic(Vec2::new(2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(
            right,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .friction(0.0)
                .restitution(1.0),
        )
        .unwrap();
    world
        .body_mut(right)
        .unwrap()
        .set_linear_velocity(Vec2::new(-5.0, 0.0));

    for _ in 0..120 {
        world.step(DT).unwrap();
    }

    // Equal masses swap velocities in a perfectly elastic impact
    let v_left = world.body(left).unwrap().linear_velocity();
    let v_right = world.body(right).unwrap().linear_velocity();
    assert_relative_eq!(v_left.x, -5.0, epsilon = 0.5);
    assert_relative_eq!(v_right.x, 5.0, epsilon = 0.5);
}

#[test]
fn test_inelastic_collision_reaches_common_velocity() {
    let mut world = World::new(Vec2::zero(), false);

    let mover = world
        .create_body(&BodyDef::dynamic(Vec2::new(-2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(
            mover,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .friction(0.0)
                .restitution(0.0),
        )
        .unwrap();
    world
        .body_mut(mover)
        .unwrap()
        .set_linear_velocity(Vec2::new(4.0, 0.0));

    let target = world
        .create_body(&BodyDef::dynamic(Vec2::new(2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(
            target,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .friction(0.0)
                .restitution(0.0),
        )
        .unwrap();

    for _ in 0..120 {
        world.step(DT).unwrap();
    }

    // Momentum splits evenly across equal masses
    let v_mover = world.body(mover).unwrap().linear_velocity();
    let v_target = world.body(target).unwrap().linear_velocity();
    assert_relative_eq!(v_mover.x, 2.0, epsilon = 0.3);
    assert_relative_eq!(v_target.x, 2.0, epsilon = 0.3);
}

#[test]
fn test_collision_never_adds_kinetic_energy() {
    let mut world = World::new(Vec2::zero(), false);

    let a = world
        .create_body(&BodyDef::dynamic(Vec2::new(-1.5, 0.1)))
        .unwrap();
    world
        .create_fixture(
            a,
            &FixtureDef::new(boxed(0.5, 0.5)).density(1.0).friction(0.3),
        )
        .unwrap();
    world.body_mut(a).unwrap().set_linear_velocity(Vec2::new(6.0, 0.0));

    let b = world
        .create_body(&BodyDef::dynamic(Vec2::new(1.5, -0.1)))
        .unwrap();
    world
        .create_fixture(
            b,
            &FixtureDef::new(boxed(0.5, 0.5)).density(1.0).friction(0.3),
        )
        .unwrap();

    let initial = kinetic_energy(world.body(a).unwrap()) + kinetic_energy(world.body(b).unwrap());

    for _ in 0..120 {
        world.step(DT).unwrap();
        let current =
            kinetic_energy(world.body(a).unwrap()) + kinetic_energy(world.body(b).unwrap());
        assert!(
            current <= initial * 1.01,
            "kinetic energy grew from {} to {}",
            initial,
            current
        );
    }
}

#[test]
fn test_bounce_preserves_most_speed_with_full_restitution() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let ground = world
        .create_body(&BodyDef::fixed(Vec2::new(0.0, -0.5)))
        .unwrap();
    world
        .create_fixture(
            ground,
            &FixtureDef::new(boxed(10.0, 0.5)).density(1.0).friction(0.0),
        )
        .unwrap();

    let ball = world
        .create_body(&BodyDef::dynamic(Vec2::new(0.0, 2.0)))
        .unwrap();
    world
        .create_fixture(
            ball,
            &FixtureDef::new(circle(0.5))
                .density(1.0)
                .friction(0.0)
                .restitution(1.0),
        )
        .unwrap();

    let mut max_fall_speed = 0.0_f32;
    let mut bounce_speed = None;
    for _ in 0..240 {
        world.step(DT).unwrap();
        let v = world.body(ball).unwrap().linear_velocity().y;
        if v < 0.0 {
            max_fall_speed = max_fall_speed.max(-v);
        } else if v > 0.1 && bounce_speed.is_none() {
            bounce_speed = Some(v);
        }
    }

    let bounce_speed = bounce_speed.expect("ball never bounced");
    assert!(max_fall_speed > 4.0);
    assert!(
        bounce_speed > 0.7 * max_fall_speed,
        "bounce speed {} too low for impact speed {}",
        bounce_speed,
        max_fall_speed
    );
}

#[test]
fn test_set_mass_data_round_trip() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let handle = world
        .create_body(&BodyDef::dynamic(Vec2::zero()))
        .unwrap();
    world
        .create_fixture(handle, &FixtureDef::new(circle(1.0)).density(1.0))
        .unwrap();

    let override_mass = MassData {
        mass: 7.0,
        center: Vec2::new(0.25, 0.0),
        inertia: 3.0,
    };
    world.body_mut(handle).unwrap().set_mass_data(&override_mass);

    let data = world.body(handle).unwrap().mass_data();
    assert_relative_eq!(data.mass, 7.0);
    assert_relative_eq!(data.center.x, 0.25);

    // Recomputing from fixtures discards the override
    world.reset_mass_data(handle).unwrap();
    assert_relative_eq!(world.body(handle).unwrap().mass(), PI, epsilon = 1e-4);
}

#[test]
fn test_distance_joint_maintains_length() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let anchor = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    let bob = world
        .create_body(&BodyDef::dynamic(Vec2::new(2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(bob, &FixtureDef::new(circle(0.2)).density(1.0))
        .unwrap();

    world
        .create_joint(&JointDef::Distance(DistanceJointDef::new(anchor, bob, 2.0)))
        .unwrap();

    for _ in 0..180 {
        world.step(DT).unwrap();
    }

    let distance = world.body(bob).unwrap().position().length();
    assert_relative_eq!(distance, 2.0, epsilon = 0.05);
}

#[test]
fn test_revolute_joint_pins_anchor_points_together() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let pivot = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    let arm = world
        .create_body(&BodyDef::dynamic(Vec2::new(2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(arm, &FixtureDef::new(boxed(2.0, 0.1)).density(1.0))
        .unwrap();

    world
        .create_joint(&JointDef::Revolute(
            RevoluteJointDef::new(pivot, arm).anchors(Vec2::zero(), Vec2::new(-2.0, 0.0)),
        ))
        .unwrap();

    for _ in 0..120 {
        world.step(DT).unwrap();
    }

    // The arm's anchor point must stay at the pivot while it swings
    let arm_body = world.body(arm).unwrap();
    let anchor_world = arm_body.world_point(Vec2::new(-2.0, 0.0));
    assert!(anchor_world.length() < 0.05, "anchor drifted to {:?}", anchor_world);
    // And it must have swung downward
    assert!(arm_body.position().y < -0.1);
}

#[test]
fn test_revolute_joint_limit_clamps_angle() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let pivot = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    let arm = world
        .create_body(&BodyDef::dynamic(Vec2::new(2.0, 0.0)))
        .unwrap();
    world
        .create_fixture(arm, &FixtureDef::new(boxed(2.0, 0.1)).density(1.0))
        .unwrap();

    let lower = -PI / 8.0;
    world
        .create_joint(&JointDef::Revolute(
            RevoluteJointDef::new(pivot, arm)
                .anchors(Vec2::zero(), Vec2::new(-2.0, 0.0))
                .limit(lower, PI / 8.0),
        ))
        .unwrap();

    for _ in 0..300 {
        world.step(DT).unwrap();
    }

    // Gravity pulls toward the lower limit; the angle must not pass it
    let angle = world.body(arm).unwrap().angle();
    assert!(angle >= lower - 0.02, "angle {} passed limit {}", angle, lower);
    assert_relative_eq!(angle, lower, epsilon = 0.05);
}

#[test]
fn test_prismatic_joint_constrains_motion_to_axis() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let frame = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    let slider = world
        .create_body(&BodyDef::dynamic(Vec2::zero()))
        .unwrap();
    world
        .create_fixture(slider, &FixtureDef::new(boxed(0.5, 0.5)).density(1.0))
        .unwrap();

    // Horizontal axis: gravity must not move the slider off it
    world
        .create_joint(&JointDef::Prismatic(PrismaticJointDef::new(
            frame,
            slider,
            Vec2::new(1.0, 0.0),
        )))
        .unwrap();
    world
        .body_mut(slider)
        .unwrap()
        .set_linear_velocity(Vec2::new(3.0, 0.0));

    for _ in 0..120 {
        world.step(DT).unwrap();
    }

    let body = world.body(slider).unwrap();
    assert!(body.position().x > 1.0, "slider did not slide along the axis");
    assert_relative_eq!(body.position().y, 0.0, epsilon = 0.02);
    assert_relative_eq!(body.angle(), 0.0, epsilon = 0.02);
}

#[test]
fn test_prismatic_joint_limit_stops_travel() {
    let mut world = World::new(Vec2::zero(), false);

    let frame = world.create_body(&BodyDef::fixed(Vec2::zero())).unwrap();
    let slider = world
        .create_body(&BodyDef::dynamic(Vec2::zero()))
        .unwrap();
    world
        .create_fixture(slider, &FixtureDef::new(boxed(0.5, 0.5)).density(1.0))
        .unwrap();

    world
        .create_joint(&JointDef::Prismatic(
            PrismaticJointDef::new(frame, slider, Vec2::new(1.0, 0.0)).limit(-1.0, 1.0),
        ))
        .unwrap();
    world
        .body_mut(slider)
        .unwrap()
        .set_linear_velocity(Vec2::new(10.0, 0.0));

    for _ in 0..120 {
        world.step(DT).unwrap();
    }

    let x = world.body(slider).unwrap().position().x;
    assert!(x <= 1.05, "slider passed its upper limit: {}", x);
    assert_relative_eq!(x, 1.0, epsilon = 0.05);
}

#[test]
fn test_stack_of_boxes_stays_upright() {
    let mut world = World::new(Vec2::new(0.0, -10.0), true);

    let ground = world
        .create_body(&BodyDef::fixed(Vec2::new(0.0, -0.5)))
        .unwrap();
    world
        .create_fixture(
            ground,
            &FixtureDef::new(boxed(10.0, 0.5)).density(1.0).friction(0.6),
        )
        .unwrap();

    let mut stack = Vec::new();
    for i in 0..5 {
        let handle = world
            .create_body(&BodyDef::dynamic(Vec2::new(0.0, 0.5 + i as f32 * 1.01)))
            .unwrap();
        world
            .create_fixture(
                handle,
                &FixtureDef::new(boxed(0.5, 0.5)).density(1.0).friction(0.6),
            )
            .unwrap();
        stack.push(handle);
    }

    for _ in 0..300 {
        world.step(DT).unwrap();
    }

    // Every box must still be near its column position and in order
    for (i, &handle) in stack.iter().enumerate() {
        let body = world.body(handle).unwrap();
        assert!(
            body.position().x.abs() < 0.2,
            "box {} drifted to x = {}",
            i,
            body.position().x
        );
        assert_relative_eq!(body.position().y, 0.5 + i as f32, epsilon = 0.1);
    }
}
