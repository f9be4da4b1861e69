use crate::collision::distance::{shape_distance, DistanceProxy};
use crate::collision::LINEAR_SLOP;
use crate::math::Sweep;

/// Maximum conservative-advancement iterations before giving up and
/// reporting the current time as the impact time
const MAX_TOI_ITERATIONS: usize = 20;

/// Input to a time-of-impact query: two swept shape proxies
#[derive(Debug, Clone)]
pub struct ToiInput {
    pub proxy_a: DistanceProxy,
    pub proxy_b: DistanceProxy,
    pub sweep_a: Sweep,
    pub sweep_b: Sweep,
    /// Fraction of the sweep to search, in [0, 1]
    pub t_max: f32,
}

/// Outcome of a time-of-impact query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToiState {
    /// The shapes already overlap at the start of the sweep
    Overlapped,
    /// The shapes come within the target gap at time `t`
    Touching,
    /// The shapes stay separated over the whole sweep
    Separated,
}

#[derive(Debug, Clone, Copy)]
pub struct ToiOutput {
    pub state: ToiState,
    pub t: f32,
}

/// Finds the earliest time in `[0, t_max]` at which the two swept shapes
/// come within a small target gap of each other.
///
/// Conservative advancement: at each iteration the remaining closest
/// distance is divided by an upper bound on the approach rate, so the
/// sweep never steps past the first contact. Rotation is bounded by the
/// largest proxy vertex radius about the center of mass.
pub fn time_of_impact(input: &ToiInput) -> ToiOutput {
    let target = LINEAR_SLOP;
    let tolerance = 0.25 * LINEAR_SLOP;

    let r_max_a = max_proxy_radius(&input.proxy_a, &input.sweep_a);
    let r_max_b = max_proxy_radius(&input.proxy_b, &input.sweep_b);

    let delta_c =
        (input.sweep_b.c - input.sweep_b.c0) - (input.sweep_a.c - input.sweep_a.c0);
    let delta_a_a = (input.sweep_a.a - input.sweep_a.a0).abs();
    let delta_a_b = (input.sweep_b.a - input.sweep_b.a0).abs();

    let mut t = 0.0_f32;

    for iteration in 0..MAX_TOI_ITERATIONS {
        let xf_a = input.sweep_a.transform_at(t);
        let xf_b = input.sweep_b.transform_at(t);

        let output = shape_distance(&input.proxy_a, &xf_a, &input.proxy_b, &xf_b);

        if output.distance <= 0.0 {
            return ToiOutput {
                state: if iteration == 0 {
                    ToiState::Overlapped
                } else {
                    ToiState::Touching
                },
                t,
            };
        }

        if output.distance < target + tolerance {
            return ToiOutput {
                state: ToiState::Touching,
                t,
            };
        }

        let normal = (output.point_b - output.point_a) / output.distance;

        // Upper bound on how fast the gap can close per unit sweep time
        let approach_rate =
            (-delta_c.dot(&normal)).max(0.0) + delta_a_a * r_max_a + delta_a_b * r_max_b;
        if approach_rate < crate::math::EPSILON {
            return ToiOutput {
                state: ToiState::Separated,
                t: input.t_max,
            };
        }

        t += (output.distance - target) / approach_rate;
        if t >= input.t_max {
            return ToiOutput {
                state: ToiState::Separated,
                t: input.t_max,
            };
        }
    }

    // Iteration budget exhausted: report the conservative time reached so
    // far, which is never past the true impact.
    ToiOutput {
        state: ToiState::Touching,
        t,
    }
}

/// Largest distance from the center of mass to any point on the proxy
fn max_proxy_radius(proxy: &DistanceProxy, sweep: &Sweep) -> f32 {
    let mut r: f32 = 0.0;
    for v in &proxy.vertices {
        r = r.max((*v - sweep.local_center).length());
    }
    r + proxy.radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::shapes::{CircleShape, PolygonShape, Shape};

    fn stationary_sweep(position: Vec2) -> Sweep {
        Sweep {
            local_center: Vec2::zero(),
            c0: position,
            c: position,
            a0: 0.0,
            a: 0.0,
        }
    }

    #[test]
    fn fast_circle_hits_thin_wall() {
        let bullet = Shape::Circle(CircleShape::new(0.1).unwrap());
        let wall = Shape::Polygon(PolygonShape::new_box(0.05, 2.0).unwrap());

        let input = ToiInput {
            proxy_a: DistanceProxy::new(&bullet, 0),
            proxy_b: DistanceProxy::new(&wall, 0),
            sweep_a: Sweep {
                local_center: Vec2::zero(),
                c0: Vec2::new(-5.0, 0.0),
                c: Vec2::new(5.0, 0.0),
                a0: 0.0,
                a: 0.0,
            },
            sweep_b: stationary_sweep(Vec2::zero()),
            t_max: 1.0,
        };

        let output = time_of_impact(&input);
        assert_eq!(output.state, ToiState::Touching);
        // Impact happens just before the wall face at x = -0.05
        assert!(output.t > 0.4 && output.t < 0.5);
    }

    #[test]
    fn diverging_shapes_never_touch() {
        let a = Shape::Circle(CircleShape::new(0.5).unwrap());
        let b = Shape::Circle(CircleShape::new(0.5).unwrap());

        let input = ToiInput {
            proxy_a: DistanceProxy::new(&a, 0),
            proxy_b: DistanceProxy::new(&b, 0),
            sweep_a: Sweep {
                local_center: Vec2::zero(),
                c0: Vec2::new(0.0, 0.0),
                c: Vec2::new(-5.0, 0.0),
                a0: 0.0,
                a: 0.0,
            },
            sweep_b: stationary_sweep(Vec2::new(3.0, 0.0)),
            t_max: 1.0,
        };

        let output = time_of_impact(&input);
        assert_eq!(output.state, ToiState::Separated);
    }

    #[test]
    fn initial_overlap_is_reported() {
        let a = Shape::Circle(CircleShape::new(1.0).unwrap());
        let b = Shape::Circle(CircleShape::new(1.0).unwrap());

        let input = ToiInput {
            proxy_a: DistanceProxy::new(&a, 0),
            proxy_b: DistanceProxy::new(&b, 0),
            sweep_a: stationary_sweep(Vec2::zero()),
            sweep_b: stationary_sweep(Vec2::new(1.0, 0.0)),
            t_max: 1.0,
        };

        let output = time_of_impact(&input);
        assert_eq!(output.state, ToiState::Overlapped);
        assert_eq!(output.t, 0.0);
    }
}
