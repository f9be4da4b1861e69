use crate::collision::manifold::{FeatureId, Manifold, ManifoldPoint};
use crate::math::{Transform2, Vec2};
use crate::shapes::{CircleShape, EdgeShape, PolygonShape};

/// Computes the manifold between two circles (closed form)
pub fn collide_circles(
    circle_a: &CircleShape,
    xf_a: &Transform2,
    circle_b: &CircleShape,
    xf_b: &Transform2,
) -> Manifold {
    let mut manifold = Manifold::new();

    let pa = xf_a.mul_point(circle_a.position);
    let pb = xf_b.mul_point(circle_b.position);

    let d = pb - pa;
    let dist_sq = d.length_squared();
    let total_radius = circle_a.radius + circle_b.radius;

    if dist_sq > total_radius * total_radius {
        return manifold;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > crate::math::EPSILON {
        d / dist
    } else {
        Vec2::unit_x()
    };

    manifold.normal = normal;

    // Midpoint of the two surface points
    let point = (pa + normal * circle_a.radius + pb - normal * circle_b.radius) * 0.5;
    let separation = dist - total_radius;

    manifold.push(ManifoldPoint::new(
        point,
        separation,
        FeatureId::new(0, FeatureId::VERTEX, 0, FeatureId::VERTEX),
    ));

    manifold
}

/// Computes the manifold between a polygon (A) and a circle (B)
pub fn collide_polygon_circle(
    polygon: &PolygonShape,
    xf_a: &Transform2,
    circle: &CircleShape,
    xf_b: &Transform2,
) -> Manifold {
    let mut manifold = Manifold::new();

    // Circle center in the polygon's local frame
    let center_world = xf_b.mul_point(circle.position);
    let center = xf_a.mul_point_inverse(center_world);

    let total_radius = polygon.radius + circle.radius;
    let n = polygon.vertex_count();

    // Face of maximum separation
    let mut best_face = 0;
    let mut best_separation = f32::MIN;
    for i in 0..n {
        let s = polygon.normals[i].dot(&(center - polygon.vertices[i]));
        if s > total_radius {
            return manifold;
        }
        if s > best_separation {
            best_separation = s;
            best_face = i;
        }
    }

    let v1 = polygon.vertices[best_face];
    let v2 = polygon.vertices[(best_face + 1) % n];

    // Center deep inside the polygon: use the reference face normal
    if best_separation < crate::math::EPSILON {
        let normal = xf_a.mul_vector(polygon.normals[best_face]);
        manifold.normal = normal;
        manifold.push(ManifoldPoint::new(
            center_world - normal * circle.radius,
            best_separation - total_radius,
            FeatureId::new(best_face as u8, FeatureId::FACE, 0, FeatureId::VERTEX),
        ));
        return manifold;
    }

    // Voronoi region of the face
    let u1 = (center - v1).dot(&(v2 - v1));
    let u2 = (center - v2).dot(&(v1 - v2));

    let (closest, feature) = if u1 <= 0.0 {
        (v1, FeatureId::new(best_face as u8, FeatureId::VERTEX, 0, FeatureId::VERTEX))
    } else if u2 <= 0.0 {
        (
            v2,
            FeatureId::new(((best_face + 1) % n) as u8, FeatureId::VERTEX, 0, FeatureId::VERTEX),
        )
    } else {
        let separation = (center - v1).dot(&polygon.normals[best_face]);
        if separation > total_radius {
            return manifold;
        }

        let normal = xf_a.mul_vector(polygon.normals[best_face]);
        manifold.normal = normal;
        manifold.push(ManifoldPoint::new(
            center_world - normal * circle.radius,
            separation - total_radius,
            FeatureId::new(best_face as u8, FeatureId::FACE, 0, FeatureId::VERTEX),
        ));
        return manifold;
    };

    let d = center - closest;
    let dist_sq = d.length_squared();
    if dist_sq > total_radius * total_radius {
        return manifold;
    }

    let dist = dist_sq.sqrt();
    let local_normal = if dist > crate::math::EPSILON {
        d / dist
    } else {
        polygon.normals[best_face]
    };

    let normal = xf_a.mul_vector(local_normal);
    manifold.normal = normal;
    manifold.push(ManifoldPoint::new(
        center_world - normal * circle.radius,
        dist - total_radius,
        feature,
    ));

    manifold
}

/// Computes the manifold between an edge segment (A) and a circle (B)
pub fn collide_edge_circle(
    edge: &EdgeShape,
    xf_a: &Transform2,
    circle: &CircleShape,
    xf_b: &Transform2,
    child_index: usize,
) -> Manifold {
    let mut manifold = Manifold::new();

    let center_world = xf_b.mul_point(circle.position);
    let center = xf_a.mul_point_inverse(center_world);

    let e = edge.v2 - edge.v1;
    let ee = e.length_squared();
    if ee < crate::math::EPSILON {
        return manifold;
    }

    let total_radius = edge.radius + circle.radius;

    // Clamp to the segment
    let t = crate::math::clamp((center - edge.v1).dot(&e) / ee, 0.0, 1.0);
    let closest = edge.v1 + e * t;

    let d = center - closest;
    let dist_sq = d.length_squared();
    if dist_sq > total_radius * total_radius {
        return manifold;
    }

    let dist = dist_sq.sqrt();
    let local_normal = if dist > crate::math::EPSILON {
        d / dist
    } else {
        // Center exactly on the segment: push out along the edge normal
        e.perp().normalize()
    };

    let feature_type = if t <= 0.0 || t >= 1.0 {
        FeatureId::VERTEX
    } else {
        FeatureId::FACE
    };

    let normal = xf_a.mul_vector(local_normal);
    manifold.normal = normal;
    manifold.push(ManifoldPoint::new(
        center_world - normal * circle.radius,
        dist - total_radius,
        FeatureId::new(child_index as u8, feature_type, 0, FeatureId::VERTEX),
    ));

    manifold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separated_circles_produce_no_manifold() {
        let a = CircleShape::new(1.0).unwrap();
        let b = CircleShape::new(1.0).unwrap();

        let xf_a = Transform2::identity();
        let xf_b = Transform2::from_position_angle(Vec2::new(3.0, 0.0), 0.0);

        assert!(collide_circles(&a, &xf_a, &b, &xf_b).is_empty());
    }

    #[test]
    fn touching_circles_produce_one_point() {
        let a = CircleShape::new(1.0).unwrap();
        let b = CircleShape::new(1.0).unwrap();

        let xf_a = Transform2::identity();
        let xf_b = Transform2::from_position_angle(Vec2::new(1.5, 0.0), 0.0);

        let m = collide_circles(&a, &xf_a, &b, &xf_b);
        assert_eq!(m.points.len(), 1);
        assert!((m.normal.x - 1.0).abs() < 1.0e-6);
        assert!(m.points[0].separation < 0.0);
    }

    #[test]
    fn circle_above_box_face() {
        let polygon = PolygonShape::new_box(1.0, 1.0).unwrap();
        let circle = CircleShape::new(0.5).unwrap();

        let xf_a = Transform2::identity();
        let xf_b = Transform2::from_position_angle(Vec2::new(0.0, 1.4), 0.0);

        let m = collide_polygon_circle(&polygon, &xf_a, &circle, &xf_b);
        assert_eq!(m.points.len(), 1);
        assert!(m.normal.y > 0.99);
    }
}
