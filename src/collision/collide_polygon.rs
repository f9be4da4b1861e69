use crate::collision::manifold::{FeatureId, Manifold, ManifoldPoint};
use crate::collision::LINEAR_SLOP;
use crate::math::{Transform2, Vec2};
use crate::shapes::{EdgeShape, PolygonShape};

/// A vertex produced by clipping, tagged with the features that created it
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    v: Vec2,
    id: FeatureId,
}

/// Finds the face of hull A with the greatest separation from hull B.
///
/// Vertices are in local space; separations are measured in world space.
fn max_separation(
    verts_a: &[Vec2],
    normals_a: &[Vec2],
    xf_a: &Transform2,
    verts_b: &[Vec2],
    xf_b: &Transform2,
) -> (usize, f32) {
    let mut best_index = 0;
    let mut best_separation = f32::MIN;

    for i in 0..verts_a.len() {
        let n = xf_a.mul_vector(normals_a[i]);
        let v = xf_a.mul_point(verts_a[i]);

        let mut min_dot = f32::MAX;
        for &vb in verts_b {
            let s = n.dot(&(xf_b.mul_point(vb) - v));
            if s < min_dot {
                min_dot = s;
            }
        }

        if min_dot > best_separation {
            best_separation = min_dot;
            best_index = i;
        }
    }

    (best_index, best_separation)
}

/// Picks the edge of the incident hull most anti-parallel to the reference
/// face normal. Returns the edge endpoints in world space.
fn find_incident_edge(
    ref_index: usize,
    ref_normals: &[Vec2],
    xf_ref: &Transform2,
    inc_verts: &[Vec2],
    inc_normals: &[Vec2],
    xf_inc: &Transform2,
) -> [ClipVertex; 2] {
    // Reference normal in the incident hull's frame
    let normal = xf_inc
        .rotation
        .rotate_inverse(xf_ref.mul_vector(ref_normals[ref_index]));

    let mut incident = 0;
    let mut min_dot = f32::MAX;
    for (i, n) in inc_normals.iter().enumerate() {
        let dot = normal.dot(n);
        if dot < min_dot {
            min_dot = dot;
            incident = i;
        }
    }

    let i1 = incident;
    let i2 = (incident + 1) % inc_verts.len();

    [
        ClipVertex {
            v: xf_inc.mul_point(inc_verts[i1]),
            id: FeatureId::new(ref_index as u8, FeatureId::FACE, i1 as u8, FeatureId::VERTEX),
        },
        ClipVertex {
            v: xf_inc.mul_point(inc_verts[i2]),
            id: FeatureId::new(ref_index as u8, FeatureId::FACE, i2 as u8, FeatureId::VERTEX),
        },
    ]
}

/// Sutherland-Hodgman clip of a segment against a half plane.
///
/// Returns `None` when fewer than two points survive; a stable two point
/// manifold needs both.
fn clip_segment(
    input: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index: u8,
) -> Option<[ClipVertex; 2]> {
    let d0 = normal.dot(&input[0].v) - offset;
    let d1 = normal.dot(&input[1].v) - offset;

    let mut out = [input[0], input[1]];
    let mut count = 0;

    if d0 <= 0.0 {
        out[count] = input[0];
        count += 1;
    }
    if d1 <= 0.0 {
        out[count] = input[1];
        count += 1;
    }

    if d0 * d1 < 0.0 && count < 2 {
        let t = d0 / (d0 - d1);
        out[count] = ClipVertex {
            v: input[0].v + (input[1].v - input[0].v) * t,
            id: FeatureId::new(
                vertex_index,
                FeatureId::VERTEX,
                input[0].id.0 as u8,
                FeatureId::FACE,
            ),
        };
        count += 1;
    }

    if count < 2 {
        None
    } else {
        Some(out)
    }
}

/// SAT plus reference-face clipping for two convex hulls given as CCW
/// vertex/normal lists. The manifold normal points from A to B.
#[allow(clippy::too_many_arguments)]
fn collide_hulls(
    verts_a: &[Vec2],
    normals_a: &[Vec2],
    radius_a: f32,
    xf_a: &Transform2,
    verts_b: &[Vec2],
    normals_b: &[Vec2],
    radius_b: f32,
    xf_b: &Transform2,
) -> Manifold {
    let manifold = Manifold::new();
    let total_radius = radius_a + radius_b;

    let (edge_a, separation_a) = max_separation(verts_a, normals_a, xf_a, verts_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }

    let (edge_b, separation_b) = max_separation(verts_b, normals_b, xf_b, verts_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    // Bias toward the first axis so the reference face does not flip-flop
    // between steps and ruin warm starting.
    let flip = separation_b > separation_a + 0.1 * LINEAR_SLOP;

    let (ref_verts, ref_normals, xf_ref, inc_verts, inc_normals, xf_inc, ref_index) = if flip {
        (verts_b, normals_b, xf_b, verts_a, normals_a, xf_a, edge_b)
    } else {
        (verts_a, normals_a, xf_a, verts_b, normals_b, xf_b, edge_a)
    };

    let incident = find_incident_edge(ref_index, ref_normals, xf_ref, inc_verts, inc_normals, xf_inc);

    let i1 = ref_index;
    let i2 = (ref_index + 1) % ref_verts.len();

    let v11 = xf_ref.mul_point(ref_verts[i1]);
    let v12 = xf_ref.mul_point(ref_verts[i2]);

    let tangent = (v12 - v11).normalize();
    let normal = tangent.perp_right();

    let front_offset = normal.dot(&v11);
    let side_offset1 = -tangent.dot(&v11) + total_radius;
    let side_offset2 = tangent.dot(&v12) + total_radius;

    let clipped = match clip_segment(&incident, -tangent, side_offset1, i1 as u8)
        .and_then(|c| clip_segment(&c, tangent, side_offset2, i2 as u8))
    {
        Some(c) => c,
        None => return manifold,
    };

    let mut result = Manifold::new();
    result.normal = normal;

    for cv in &clipped {
        let separation = normal.dot(&cv.v) - front_offset - total_radius;
        if separation <= 0.0 {
            result.push(ManifoldPoint::new(cv.v, separation, cv.id));
        }
    }

    if flip {
        result.flipped()
    } else {
        result
    }
}

/// Computes the manifold between two convex polygons
pub fn collide_polygons(
    polygon_a: &PolygonShape,
    xf_a: &Transform2,
    polygon_b: &PolygonShape,
    xf_b: &Transform2,
) -> Manifold {
    collide_hulls(
        &polygon_a.vertices,
        &polygon_a.normals,
        polygon_a.radius,
        xf_a,
        &polygon_b.vertices,
        &polygon_b.normals,
        polygon_b.radius,
        xf_b,
    )
}

/// Computes the manifold between an edge segment (A) and a polygon (B).
///
/// The segment is treated as a degenerate two sided hull so the same
/// clipping path applies.
pub fn collide_edge_polygon(
    edge: &EdgeShape,
    xf_a: &Transform2,
    polygon: &PolygonShape,
    xf_b: &Transform2,
) -> Manifold {
    let axis = edge.v2 - edge.v1;
    if axis.length_squared() < crate::math::EPSILON {
        return Manifold::new();
    }

    let n = axis.perp_right().normalize();
    let verts = [edge.v1, edge.v2];
    let normals = [n, -n];

    collide_hulls(
        &verts,
        &normals,
        edge.radius,
        xf_a,
        &polygon.vertices,
        &polygon.normals,
        polygon.radius,
        xf_b,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separated_boxes_produce_no_manifold() {
        let a = PolygonShape::new_box(1.0, 1.0).unwrap();
        let b = PolygonShape::new_box(1.0, 1.0).unwrap();

        let xf_a = Transform2::identity();
        let xf_b = Transform2::from_position_angle(Vec2::new(5.0, 0.0), 0.0);

        assert!(collide_polygons(&a, &xf_a, &b, &xf_b).is_empty());
    }

    #[test]
    fn stacked_boxes_produce_two_points() {
        let a = PolygonShape::new_box(1.0, 1.0).unwrap();
        let b = PolygonShape::new_box(1.0, 1.0).unwrap();

        let xf_a = Transform2::identity();
        let xf_b = Transform2::from_position_angle(Vec2::new(0.0, 1.95), 0.0);

        let m = collide_polygons(&a, &xf_a, &b, &xf_b);
        assert_eq!(m.points.len(), 2);
        assert!(m.normal.y > 0.99);
        for p in &m.points {
            assert!(p.separation < 0.0);
        }
    }

    #[test]
    fn box_resting_on_edge() {
        let edge = EdgeShape::new(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)).unwrap();
        let b = PolygonShape::new_box(0.5, 0.5).unwrap();

        let xf_a = Transform2::identity();
        let xf_b = Transform2::from_position_angle(Vec2::new(0.0, 0.45), 0.0);

        let m = collide_edge_polygon(&edge, &xf_a, &b, &xf_b);
        assert_eq!(m.points.len(), 2);
        assert!(m.normal.y > 0.99);
    }
}
