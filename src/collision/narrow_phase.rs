use crate::collision::collide_circle::{collide_circles, collide_edge_circle, collide_polygon_circle};
use crate::collision::collide_polygon::{collide_edge_polygon, collide_polygons};
use crate::collision::manifold::Manifold;
use crate::math::Transform2;
use crate::shapes::{ChainShape, Shape};

/// Computes the contact manifold between two shapes.
///
/// The manifold normal always points from shape A toward shape B. Chain
/// shapes are evaluated per segment and the deepest child manifold wins,
/// which keeps the contact key stable while a body slides along the chain.
pub fn evaluate_manifold(
    shape_a: &Shape,
    xf_a: &Transform2,
    shape_b: &Shape,
    xf_b: &Transform2,
) -> Manifold {
    match (shape_a, shape_b) {
        (Shape::Circle(a), Shape::Circle(b)) => collide_circles(a, xf_a, b, xf_b),

        (Shape::Polygon(a), Shape::Circle(b)) => collide_polygon_circle(a, xf_a, b, xf_b),
        (Shape::Circle(a), Shape::Polygon(b)) => {
            collide_polygon_circle(b, xf_b, a, xf_a).flipped()
        }

        (Shape::Polygon(a), Shape::Polygon(b)) => collide_polygons(a, xf_a, b, xf_b),

        (Shape::Edge(a), Shape::Circle(b)) => collide_edge_circle(a, xf_a, b, xf_b, 0),
        (Shape::Circle(a), Shape::Edge(b)) => {
            collide_edge_circle(b, xf_b, a, xf_a, 0).flipped()
        }

        (Shape::Edge(a), Shape::Polygon(b)) => collide_edge_polygon(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Edge(b)) => {
            collide_edge_polygon(b, xf_b, a, xf_a).flipped()
        }

        (Shape::Chain(a), _) => collide_chain(a, xf_a, shape_b, xf_b),
        (_, Shape::Chain(b)) => collide_chain(b, xf_b, shape_a, xf_a).flipped(),

        // Two edges (or an edge against a chain already handled above)
        // have zero measure and never generate contacts.
        (Shape::Edge(_), Shape::Edge(_)) => Manifold::new(),
    }
}

/// Evaluates every chain segment against the other shape and keeps the
/// manifold with the deepest penetration.
fn collide_chain(chain: &ChainShape, xf_a: &Transform2, other: &Shape, xf_b: &Transform2) -> Manifold {
    let mut best = Manifold::new();
    let mut best_depth = f32::MAX;

    for i in 0..chain.child_count() {
        let edge = chain.child_edge(i);
        let manifold = match other {
            Shape::Circle(circle) => collide_edge_circle(&edge, xf_a, circle, xf_b, i),
            Shape::Polygon(polygon) => collide_edge_polygon(&edge, xf_a, polygon, xf_b),
            // Chain against edge or chain has zero measure.
            Shape::Edge(_) | Shape::Chain(_) => Manifold::new(),
        };

        if let Some(depth) = manifold.points.iter().map(|p| p.separation).reduce(f32::min) {
            if depth < best_depth {
                best_depth = depth;
                best = manifold;
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::shapes::{CircleShape, PolygonShape};

    #[test]
    fn flipped_pair_negates_normal() {
        let polygon = Shape::Polygon(PolygonShape::new_box(1.0, 1.0).unwrap());
        let circle = Shape::Circle(CircleShape::new(0.5).unwrap());

        let xf_a = Transform2::identity();
        let xf_b = Transform2::from_position_angle(Vec2::new(0.0, 1.4), 0.0);

        let m1 = evaluate_manifold(&polygon, &xf_a, &circle, &xf_b);
        let m2 = evaluate_manifold(&circle, &xf_b, &polygon, &xf_a);

        assert_eq!(m1.points.len(), 1);
        assert_eq!(m2.points.len(), 1);
        assert!((m1.normal + m2.normal).length() < 1.0e-6);
    }

    #[test]
    fn chain_keeps_deepest_segment() {
        let chain = Shape::Chain(
            ChainShape::new(&[
                Vec2::new(-4.0, 0.0),
                Vec2::new(0.0, 0.0),
                Vec2::new(4.0, 0.0),
            ])
            .unwrap(),
        );
        let circle = Shape::Circle(CircleShape::new(0.5).unwrap());

        let xf_a = Transform2::identity();
        let xf_b = Transform2::from_position_angle(Vec2::new(-2.0, 0.3), 0.0);

        let m = evaluate_manifold(&chain, &xf_a, &circle, &xf_b);
        assert_eq!(m.points.len(), 1);
        assert!(m.normal.y > 0.99);
    }
}
