use approx::assert_relative_eq;
use impulse2d::math::{lerp, Aabb, Rot, Sweep, Transform2, Vec2};
use std::f32::consts::PI;

#[test]
fn test_vec2_operations() {
    let v1 = Vec2::new(1.0, 2.0);
    let v2 = Vec2::new(3.0, -4.0);

    // Addition and subtraction
    let sum = v1 + v2;
    assert_eq!(sum.x, 4.0);
    assert_eq!(sum.y, -2.0);

    let diff = v2 - v1;
    assert_eq!(diff.x, 2.0);
    assert_eq!(diff.y, -6.0);

    // Scalar multiplication
    let scaled = v1 * 2.0;
    assert_eq!(scaled.x, 2.0);
    assert_eq!(scaled.y, 4.0);

    // Dot and 2D cross products
    assert_eq!(v1.dot(&v2), 1.0 * 3.0 + 2.0 * -4.0);
    assert_eq!(v1.cross(&v2), 1.0 * -4.0 - 2.0 * 3.0);

    // Length and normalization
    let length = v2.length();
    assert_relative_eq!(length, 5.0);
    let unit = v2.normalize();
    assert_relative_eq!(unit.length(), 1.0);
    assert_relative_eq!(unit.x, 3.0 / 5.0);
    assert_relative_eq!(unit.y, -4.0 / 5.0);
}

#[test]
fn test_vec2_perpendiculars() {
    let v = Vec2::new(1.0, 0.0);

    // perp rotates counter-clockwise, perp_right clockwise
    let left = v.perp();
    assert_relative_eq!(left.x, 0.0);
    assert_relative_eq!(left.y, 1.0);

    let right = v.perp_right();
    assert_relative_eq!(right.x, 0.0);
    assert_relative_eq!(right.y, -1.0);

    // Both are orthogonal to the input
    assert_relative_eq!(v.dot(&left), 0.0);
    assert_relative_eq!(v.dot(&right), 0.0);
}

#[test]
fn test_rotation_operations() {
    let rot = Rot::new(PI / 2.0);

    // Rotating the x axis by 90 degrees yields the y axis
    let rotated = rot.rotate(Vec2::new(1.0, 0.0));
    assert_relative_eq!(rotated.x, 0.0, epsilon = 1e-6);
    assert_relative_eq!(rotated.y, 1.0, epsilon = 1e-6);

    // Inverse rotation undoes the rotation
    let back = rot.rotate_inverse(rotated);
    assert_relative_eq!(back.x, 1.0, epsilon = 1e-6);
    assert_relative_eq!(back.y, 0.0, epsilon = 1e-6);

    // Composition adds angles
    let quarter = Rot::new(PI / 4.0);
    let composed = quarter.mul(&quarter);
    assert_relative_eq!(composed.angle(), PI / 2.0, epsilon = 1e-6);
}

#[test]
fn test_transform_point_round_trip() {
    let transform = Transform2::from_position_angle(Vec2::new(3.0, -1.0), PI / 6.0);
    let point = Vec2::new(0.5, 2.0);

    let world = transform.mul_point(point);
    let local = transform.mul_point_inverse(world);

    assert_relative_eq!(local.x, point.x, epsilon = 1e-5);
    assert_relative_eq!(local.y, point.y, epsilon = 1e-5);

    // Vectors ignore the translation part
    let v = transform.mul_vector(Vec2::new(1.0, 0.0));
    assert_relative_eq!(v.length(), 1.0, epsilon = 1e-6);
}

#[test]
fn test_aabb_operations() {
    let a = Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
    let b = Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 3.0));
    let c = Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(6.0, 6.0));

    assert!(a.intersects(&b));
    assert!(!a.intersects(&c));

    // Union covers both inputs
    let union = a.combine(&b);
    assert!(union.contains_aabb(&a));
    assert!(union.contains_aabb(&b));

    // Expansion grows symmetrically
    let fat = a.expanded(0.5);
    assert_relative_eq!(fat.min.x, -0.5);
    assert_relative_eq!(fat.max.y, 2.5);
    assert!(fat.contains_aabb(&a));

    assert!(a.contains_point(Vec2::new(1.0, 1.0)));
    assert!(!a.contains_point(Vec2::new(-1.0, 1.0)));
}

#[test]
fn test_aabb_ray_intersect() {
    let aabb = Aabb::new(Vec2::new(1.0, -1.0), Vec2::new(2.0, 1.0));

    // Ray along the x axis enters at x = 1
    let hit = aabb.ray_intersect(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0));
    assert!(hit.is_some());
    assert_relative_eq!(hit.unwrap(), 0.25, epsilon = 1e-6);

    // Ray pointing away misses
    let miss = aabb.ray_intersect(Vec2::new(0.0, 0.0), Vec2::new(-4.0, 0.0));
    assert!(miss.is_none());
}

#[test]
fn test_sweep_interpolation() {
    let sweep = Sweep {
        local_center: Vec2::zero(),
        c0: Vec2::new(0.0, 0.0),
        c: Vec2::new(10.0, 0.0),
        a0: 0.0,
        a: PI,
    };

    let start = sweep.transform_at(0.0);
    assert_relative_eq!(start.position.x, 0.0, epsilon = 1e-6);

    let mid = sweep.transform_at(0.5);
    assert_relative_eq!(mid.position.x, 5.0, epsilon = 1e-6);
    assert_relative_eq!(mid.rotation.angle(), PI / 2.0, epsilon = 1e-5);

    let end = sweep.transform_at(1.0);
    assert_relative_eq!(end.position.x, 10.0, epsilon = 1e-6);
}

#[test]
fn test_scalar_lerp() {
    assert_relative_eq!(lerp(2.0, 4.0, 0.0), 2.0);
    assert_relative_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    assert_relative_eq!(lerp(2.0, 4.0, 1.0), 4.0);
}
