use crate::math::{Transform2, Vec2};
use crate::shapes::Shape;

/// Maximum number of iterations for the GJK distance loop
const MAX_ITERATIONS: usize = 20;

/// A shape reduced to a vertex cloud with a surface radius, as consumed by
/// the GJK distance query
#[derive(Debug, Clone)]
pub struct DistanceProxy {
    /// The convex hull vertices in shape-local space
    pub vertices: Vec<Vec2>,

    /// The surface radius around the hull
    pub radius: f32,
}

impl DistanceProxy {
    /// Builds a proxy for the given child of a shape
    pub fn new(shape: &Shape, child_index: usize) -> Self {
        match shape {
            Shape::Circle(circle) => Self {
                vertices: vec![circle.position],
                radius: circle.radius,
            },
            Shape::Polygon(polygon) => Self {
                vertices: polygon.vertices.clone(),
                radius: polygon.radius,
            },
            Shape::Edge(edge) => Self {
                vertices: vec![edge.v1, edge.v2],
                radius: edge.radius,
            },
            Shape::Chain(chain) => {
                let edge = chain.child_edge(child_index);
                Self {
                    vertices: vec![edge.v1, edge.v2],
                    radius: edge.radius,
                }
            }
        }
    }

    /// Returns the index of the vertex with maximum projection along `d`
    fn support(&self, d: Vec2) -> usize {
        let mut best = 0;
        let mut best_value = self.vertices[0].dot(&d);

        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let value = v.dot(&d);
            if value > best_value {
                best = i;
                best_value = value;
            }
        }

        best
    }
}

/// Result of a closest-distance query between two shape proxies
#[derive(Debug, Clone, Copy)]
pub struct DistanceOutput {
    /// Closest point on shape A in world space
    pub point_a: Vec2,

    /// Closest point on shape B in world space
    pub point_b: Vec2,

    /// Distance between the closest points (zero when overlapping)
    pub distance: f32,
}

/// A vertex of the GJK simplex in the Minkowski difference
#[derive(Debug, Clone, Copy)]
struct SimplexVertex {
    /// Support point on proxy A in world space
    wa: Vec2,

    /// Support point on proxy B in world space
    wb: Vec2,

    /// Minkowski difference point (wb - wa)
    w: Vec2,

    /// Barycentric weight of this vertex in the closest point
    a: f32,

    /// Support vertex indices used for the duplicate check
    index_a: usize,
    index_b: usize,
}

/// The simplex is a point, line, or triangle in the Minkowski difference
struct Simplex {
    vertices: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.vertices[0].w,
            2 => {
                let e = self.vertices[1].w - self.vertices[0].w;
                let sign = e.cross(&-self.vertices[0].w);
                if sign > 0.0 {
                    // Origin is left of the edge
                    e.perp()
                } else {
                    e.perp_right()
                }
            }
            _ => Vec2::zero(),
        }
    }

    fn closest_point(&self) -> Vec2 {
        match self.count {
            1 => self.vertices[0].w,
            2 => self.vertices[0].w * self.vertices[0].a + self.vertices[1].w * self.vertices[1].a,
            _ => Vec2::zero(),
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        match self.count {
            1 => (self.vertices[0].wa, self.vertices[0].wb),
            2 => {
                let a0 = self.vertices[0].a;
                let a1 = self.vertices[1].a;
                (
                    self.vertices[0].wa * a0 + self.vertices[1].wa * a1,
                    self.vertices[0].wb * a0 + self.vertices[1].wb * a1,
                )
            }
            _ => {
                let a0 = self.vertices[0].a;
                let a1 = self.vertices[1].a;
                let a2 = self.vertices[2].a;
                let p = self.vertices[0].wa * a0
                    + self.vertices[1].wa * a1
                    + self.vertices[2].wa * a2;
                (p, p)
            }
        }
    }

    /// Reduces a line segment to the feature closest to the origin
    fn solve2(&mut self) {
        let w1 = self.vertices[0].w;
        let w2 = self.vertices[1].w;
        let e = w2 - w1;

        let d12_2 = -w1.dot(&e);
        if d12_2 <= 0.0 {
            self.vertices[0].a = 1.0;
            self.count = 1;
            return;
        }

        let d12_1 = w2.dot(&e);
        if d12_1 <= 0.0 {
            self.vertices[0] = self.vertices[1];
            self.vertices[0].a = 1.0;
            self.count = 1;
            return;
        }

        let inv = 1.0 / (d12_1 + d12_2);
        self.vertices[0].a = d12_1 * inv;
        self.vertices[1].a = d12_2 * inv;
        self.count = 2;
    }

    /// Reduces a triangle to the feature closest to the origin
    fn solve3(&mut self) {
        let w1 = self.vertices[0].w;
        let w2 = self.vertices[1].w;
        let w3 = self.vertices[2].w;

        let e12 = w2 - w1;
        let d12_1 = w2.dot(&e12);
        let d12_2 = -w1.dot(&e12);

        let e13 = w3 - w1;
        let d13_1 = w3.dot(&e13);
        let d13_2 = -w1.dot(&e13);

        let e23 = w3 - w2;
        let d23_1 = w3.dot(&e23);
        let d23_2 = -w2.dot(&e23);

        let n123 = e12.cross(&e13);

        let d123_1 = n123 * w2.cross(&w3);
        let d123_2 = n123 * w3.cross(&w1);
        let d123_3 = n123 * w1.cross(&w2);

        // Vertex 1 region
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.vertices[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Edge 1-2 region
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv = 1.0 / (d12_1 + d12_2);
            self.vertices[0].a = d12_1 * inv;
            self.vertices[1].a = d12_2 * inv;
            self.count = 2;
            return;
        }

        // Edge 1-3 region
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv = 1.0 / (d13_1 + d13_2);
            self.vertices[0].a = d13_1 * inv;
            self.vertices[1] = self.vertices[2];
            self.vertices[1].a = d13_2 * inv;
            self.count = 2;
            return;
        }

        // Vertex 2 region
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.vertices[0] = self.vertices[1];
            self.vertices[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Vertex 3 region
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.vertices[0] = self.vertices[2];
            self.vertices[0].a = 1.0;
            self.count = 1;
            return;
        }

        // Edge 2-3 region
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv = 1.0 / (d23_1 + d23_2);
            self.vertices[1].a = d23_2 * inv;
            self.vertices[0] = self.vertices[2];
            self.vertices[0].a = d23_1 * inv;
            self.count = 2;
            return;
        }

        // Interior: the origin is inside the triangle
        let inv = 1.0 / (d123_1 + d123_2 + d123_3);
        self.vertices[0].a = d123_1 * inv;
        self.vertices[1].a = d123_2 * inv;
        self.vertices[2].a = d123_3 * inv;
        self.count = 3;
    }
}

fn support_vertex(
    proxy_a: &DistanceProxy,
    xf_a: &Transform2,
    proxy_b: &DistanceProxy,
    xf_b: &Transform2,
    d: Vec2,
) -> SimplexVertex {
    let index_a = proxy_a.support(xf_a.mul_vector_inverse(-d));
    let index_b = proxy_b.support(xf_b.mul_vector_inverse(d));

    let wa = xf_a.mul_point(proxy_a.vertices[index_a]);
    let wb = xf_b.mul_point(proxy_b.vertices[index_b]);

    SimplexVertex {
        wa,
        wb,
        w: wb - wa,
        a: 1.0,
        index_a,
        index_b,
    }
}

/// Computes the closest distance between two shape proxies using GJK
///
/// The returned witness points account for the surface radii of both
/// proxies; overlapping shapes report distance zero.
pub fn shape_distance(
    proxy_a: &DistanceProxy,
    xf_a: &Transform2,
    proxy_b: &DistanceProxy,
    xf_b: &Transform2,
) -> DistanceOutput {
    let initial = support_vertex(proxy_a, xf_a, proxy_b, xf_b, Vec2::unit_x());

    let mut simplex = Simplex {
        vertices: [initial; 3],
        count: 1,
    };

    for _ in 0..MAX_ITERATIONS {
        match simplex.count {
            1 => {}
            2 => simplex.solve2(),
            _ => simplex.solve3(),
        }

        // Interior of the triangle means overlap
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();
        if d.length_squared() < crate::math::EPSILON * crate::math::EPSILON {
            break;
        }

        let vertex = support_vertex(proxy_a, xf_a, proxy_b, xf_b, d);

        // A repeated support vertex means no further progress is possible
        let duplicate = simplex.vertices[..simplex.count]
            .iter()
            .any(|v| v.index_a == vertex.index_a && v.index_b == vertex.index_b);
        if duplicate {
            break;
        }

        simplex.vertices[simplex.count] = vertex;
        simplex.count += 1;
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut distance = simplex.closest_point().length();

    if simplex.count == 3 {
        distance = 0.0;
    }

    // Peel off the surface radii
    let ra = proxy_a.radius;
    let rb = proxy_b.radius;

    if distance > ra + rb && distance > crate::math::EPSILON {
        distance -= ra + rb;
        let normal = (point_b - point_a).normalize();
        point_a += normal * ra;
        point_b -= normal * rb;
    } else {
        let mid = (point_a + point_b) * 0.5;
        point_a = mid;
        point_b = mid;
        distance = 0.0;
    }

    DistanceOutput {
        point_a,
        point_b,
        distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{CircleShape, PolygonShape, Shape};

    #[test]
    fn circle_circle_distance() {
        let a = Shape::Circle(CircleShape::new(1.0).unwrap());
        let b = Shape::Circle(CircleShape::new(1.0).unwrap());

        let pa = DistanceProxy::new(&a, 0);
        let pb = DistanceProxy::new(&b, 0);

        let xf_a = Transform2::from_position_angle(Vec2::zero(), 0.0);
        let xf_b = Transform2::from_position_angle(Vec2::new(5.0, 0.0), 0.0);

        let out = shape_distance(&pa, &xf_a, &pb, &xf_b);
        assert!((out.distance - 3.0).abs() < 1.0e-4);
    }

    #[test]
    fn overlapping_boxes_report_zero() {
        let a = Shape::Polygon(PolygonShape::new_box(1.0, 1.0).unwrap());
        let b = Shape::Polygon(PolygonShape::new_box(1.0, 1.0).unwrap());

        let pa = DistanceProxy::new(&a, 0);
        let pb = DistanceProxy::new(&b, 0);

        let xf_a = Transform2::from_position_angle(Vec2::zero(), 0.0);
        let xf_b = Transform2::from_position_angle(Vec2::new(0.5, 0.0), 0.0);

        let out = shape_distance(&pa, &xf_a, &pb, &xf_b);
        assert_eq!(out.distance, 0.0);
    }
}
