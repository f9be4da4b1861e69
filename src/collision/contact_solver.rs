use crate::collision::{BAUMGARTE, LINEAR_SLOP, MAX_LINEAR_CORRECTION};
use crate::math::{cross_sv, Rot, Vec2};

/// Positional state of one island body during solving
#[derive(Debug, Clone, Copy)]
pub(crate) struct Position {
    pub c: Vec2,
    pub a: f32,
}

/// Velocity state of one island body during solving
#[derive(Debug, Clone, Copy)]
pub(crate) struct Velocity {
    pub v: Vec2,
    pub w: f32,
}

/// Per-contact input assembled by the island before solving
#[derive(Debug)]
pub(crate) struct ContactConstraintDef {
    /// Index of the contact in the island's contact list
    pub contact_index: usize,
    /// Island indices of the two bodies
    pub index_a: usize,
    pub index_b: usize,
    pub inv_mass_a: f32,
    pub inv_mass_b: f32,
    pub inv_inertia_a: f32,
    pub inv_inertia_b: f32,
    pub friction: f32,
    pub restitution: f32,
    /// World-space contact normal, pointing from A to B
    pub normal: Vec2,
    /// World point, separation, accumulated normal and tangent impulse
    pub points: Vec<(Vec2, f32, f32, f32)>,
}

#[derive(Debug, Clone, Copy)]
struct VelocityConstraintPoint {
    r_a: Vec2,
    r_b: Vec2,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
}

#[derive(Debug)]
struct VelocityConstraint {
    contact_index: usize,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_inertia_a: f32,
    inv_inertia_b: f32,
    friction: f32,
    normal: Vec2,
    points: Vec<VelocityConstraintPoint>,
}

#[derive(Debug, Clone, Copy)]
struct PositionConstraintPoint {
    /// Anchor relative to the body center, in the body frame at step start
    local_r_a: Vec2,
    local_r_b: Vec2,
    separation: f32,
}

#[derive(Debug)]
struct PositionConstraint {
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_inertia_a: f32,
    inv_inertia_b: f32,
    /// Contact normal in body A's frame at step start
    local_normal: Vec2,
    points: Vec<PositionConstraintPoint>,
}

/// Sequential-impulse solver over the contacts of one island.
///
/// Velocity constraints remove approach velocity (plus a restitution bias for
/// fast impacts); penetration is corrected afterwards by a non-linear
/// Gauss-Seidel pass over positions only, so overlap resolution never adds
/// kinetic energy.
#[derive(Debug)]
pub(crate) struct ContactSolver {
    velocity_constraints: Vec<VelocityConstraint>,
    position_constraints: Vec<PositionConstraint>,
}

impl ContactSolver {
    pub fn new(
        defs: &[ContactConstraintDef],
        positions: &[Position],
        velocities: &[Velocity],
        restitution_threshold: f32,
    ) -> Self {
        let mut velocity_constraints = Vec::with_capacity(defs.len());
        let mut position_constraints = Vec::with_capacity(defs.len());

        for def in defs {
            let pos_a = positions[def.index_a];
            let pos_b = positions[def.index_b];
            let vel_a = velocities[def.index_a];
            let vel_b = velocities[def.index_b];

            let rot_a = Rot::new(pos_a.a);
            let rot_b = Rot::new(pos_b.a);

            let normal = def.normal;
            let tangent = normal.perp_right();

            let mut vc_points = Vec::with_capacity(def.points.len());
            let mut pc_points = Vec::with_capacity(def.points.len());

            for &(point, separation, normal_impulse, tangent_impulse) in &def.points {
                let r_a = point - pos_a.c;
                let r_b = point - pos_b.c;

                let rn_a = r_a.cross(&normal);
                let rn_b = r_b.cross(&normal);
                let k_normal = def.inv_mass_a
                    + def.inv_mass_b
                    + def.inv_inertia_a * rn_a * rn_a
                    + def.inv_inertia_b * rn_b * rn_b;

                let rt_a = r_a.cross(&tangent);
                let rt_b = r_b.cross(&tangent);
                let k_tangent = def.inv_mass_a
                    + def.inv_mass_b
                    + def.inv_inertia_a * rt_a * rt_a
                    + def.inv_inertia_b * rt_b * rt_b;

                // Restitution applies only above the threshold so resting
                // contacts do not jitter.
                let rel_v =
                    vel_b.v + cross_sv(vel_b.w, r_b) - vel_a.v - cross_sv(vel_a.w, r_a);
                let vn = rel_v.dot(&normal);
                let velocity_bias = if vn < -restitution_threshold {
                    -def.restitution * vn
                } else {
                    0.0
                };

                vc_points.push(VelocityConstraintPoint {
                    r_a,
                    r_b,
                    normal_mass: if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 },
                    tangent_mass: if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 },
                    velocity_bias,
                    normal_impulse,
                    tangent_impulse,
                });

                pc_points.push(PositionConstraintPoint {
                    local_r_a: rot_a.rotate_inverse(r_a),
                    local_r_b: rot_b.rotate_inverse(r_b),
                    separation,
                });
            }

            velocity_constraints.push(VelocityConstraint {
                contact_index: def.contact_index,
                index_a: def.index_a,
                index_b: def.index_b,
                inv_mass_a: def.inv_mass_a,
                inv_mass_b: def.inv_mass_b,
                inv_inertia_a: def.inv_inertia_a,
                inv_inertia_b: def.inv_inertia_b,
                friction: def.friction,
                normal,
                points: vc_points,
            });

            position_constraints.push(PositionConstraint {
                index_a: def.index_a,
                index_b: def.index_b,
                inv_mass_a: def.inv_mass_a,
                inv_mass_b: def.inv_mass_b,
                inv_inertia_a: def.inv_inertia_a,
                inv_inertia_b: def.inv_inertia_b,
                local_normal: rot_a.rotate_inverse(normal),
                points: pc_points,
            });
        }

        Self {
            velocity_constraints,
            position_constraints,
        }
    }

    /// Applies the impulses accumulated last step before iterating
    pub fn warm_start(&mut self, velocities: &mut [Velocity]) {
        for vc in &self.velocity_constraints {
            let tangent = vc.normal.perp_right();

            let mut vel_a = velocities[vc.index_a];
            let mut vel_b = velocities[vc.index_b];

            for p in &vc.points {
                let impulse = vc.normal * p.normal_impulse + tangent * p.tangent_impulse;

                vel_a.v -= impulse * vc.inv_mass_a;
                vel_a.w -= vc.inv_inertia_a * p.r_a.cross(&impulse);
                vel_b.v += impulse * vc.inv_mass_b;
                vel_b.w += vc.inv_inertia_b * p.r_b.cross(&impulse);
            }

            velocities[vc.index_a] = vel_a;
            velocities[vc.index_b] = vel_b;
        }
    }

    /// One Gauss-Seidel sweep over all velocity constraints
    pub fn solve_velocity(&mut self, velocities: &mut [Velocity]) {
        for vc in &mut self.velocity_constraints {
            let normal = vc.normal;
            let tangent = normal.perp_right();

            let mut vel_a = velocities[vc.index_a];
            let mut vel_b = velocities[vc.index_b];

            // Friction first, using last iteration's normal impulse bound
            for p in &mut vc.points {
                let rel_v = vel_b.v + cross_sv(vel_b.w, p.r_b)
                    - vel_a.v
                    - cross_sv(vel_a.w, p.r_a);
                let vt = rel_v.dot(&tangent);

                let lambda = -p.tangent_mass * vt;
                let max_friction = vc.friction * p.normal_impulse;
                let new_impulse =
                    crate::math::clamp(p.tangent_impulse + lambda, -max_friction, max_friction);
                let delta = new_impulse - p.tangent_impulse;
                p.tangent_impulse = new_impulse;

                let impulse = tangent * delta;
                vel_a.v -= impulse * vc.inv_mass_a;
                vel_a.w -= vc.inv_inertia_a * p.r_a.cross(&impulse);
                vel_b.v += impulse * vc.inv_mass_b;
                vel_b.w += vc.inv_inertia_b * p.r_b.cross(&impulse);
            }

            // Normal impulses, accumulated and clamped to be repulsive
            for p in &mut vc.points {
                let rel_v = vel_b.v + cross_sv(vel_b.w, p.r_b)
                    - vel_a.v
                    - cross_sv(vel_a.w, p.r_a);
                let vn = rel_v.dot(&normal);

                let lambda = -p.normal_mass * (vn - p.velocity_bias);
                let new_impulse = (p.normal_impulse + lambda).max(0.0);
                let delta = new_impulse - p.normal_impulse;
                p.normal_impulse = new_impulse;

                let impulse = normal * delta;
                vel_a.v -= impulse * vc.inv_mass_a;
                vel_a.w -= vc.inv_inertia_a * p.r_a.cross(&impulse);
                vel_b.v += impulse * vc.inv_mass_b;
                vel_b.w += vc.inv_inertia_b * p.r_b.cross(&impulse);
            }

            velocities[vc.index_a] = vel_a;
            velocities[vc.index_b] = vel_b;
        }
    }

    /// One position correction sweep. Returns true once the worst remaining
    /// penetration is within tolerance.
    pub fn solve_position(&mut self, positions: &mut [Position]) -> bool {
        let mut min_separation: f32 = 0.0;

        for pc in &self.position_constraints {
            let mut pos_a = positions[pc.index_a];
            let mut pos_b = positions[pc.index_b];

            for p in &pc.points {
                let rot_a = Rot::new(pos_a.a);
                let rot_b = Rot::new(pos_b.a);

                let normal = rot_a.rotate(pc.local_normal);
                let r_a = rot_a.rotate(p.local_r_a);
                let r_b = rot_b.rotate(p.local_r_b);

                // Anchors coincided at step start, so the drift between them
                // measures how the gap has changed since.
                let drift = (pos_b.c + r_b) - (pos_a.c + r_a);
                let separation = p.separation + drift.dot(&normal);
                min_separation = min_separation.min(separation);

                let correction = crate::math::clamp(
                    BAUMGARTE * (separation + LINEAR_SLOP),
                    -MAX_LINEAR_CORRECTION,
                    0.0,
                );

                let rn_a = r_a.cross(&normal);
                let rn_b = r_b.cross(&normal);
                let k = pc.inv_mass_a
                    + pc.inv_mass_b
                    + pc.inv_inertia_a * rn_a * rn_a
                    + pc.inv_inertia_b * rn_b * rn_b;

                if k <= 0.0 {
                    continue;
                }

                let impulse = normal * (-correction / k);

                pos_a.c -= impulse * pc.inv_mass_a;
                pos_a.a -= pc.inv_inertia_a * r_a.cross(&impulse);
                pos_b.c += impulse * pc.inv_mass_b;
                pos_b.a += pc.inv_inertia_b * r_b.cross(&impulse);
            }

            positions[pc.index_a] = pos_a;
            positions[pc.index_b] = pos_b;
        }

        min_separation >= -3.0 * LINEAR_SLOP
    }

    /// Hands the accumulated impulses back for warm starting and reporting
    pub fn for_each_result(&self, mut f: impl FnMut(usize, usize, f32, f32)) {
        for vc in &self.velocity_constraints {
            for (i, p) in vc.points.iter().enumerate() {
                f(vc.contact_index, i, p.normal_impulse, p.tangent_impulse);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_on_def() -> ContactConstraintDef {
        ContactConstraintDef {
            contact_index: 0,
            index_a: 0,
            index_b: 1,
            inv_mass_a: 1.0,
            inv_mass_b: 1.0,
            inv_inertia_a: 0.0,
            inv_inertia_b: 0.0,
            friction: 0.0,
            restitution: 1.0,
            normal: Vec2::unit_x(),
            points: vec![(Vec2::new(0.5, 0.0), 0.0, 0.0, 0.0)],
        }
    }

    #[test]
    fn elastic_head_on_impact_exchanges_velocity() {
        let positions = [
            Position { c: Vec2::new(0.0, 0.0), a: 0.0 },
            Position { c: Vec2::new(1.0, 0.0), a: 0.0 },
        ];
        let mut velocities = [
            Velocity { v: Vec2::new(2.0, 0.0), w: 0.0 },
            Velocity { v: Vec2::new(-2.0, 0.0), w: 0.0 },
        ];

        let defs = [head_on_def()];
        let mut solver = ContactSolver::new(&defs, &positions, &velocities, 1.0);

        solver.warm_start(&mut velocities);
        for _ in 0..8 {
            solver.solve_velocity(&mut velocities);
        }

        // Equal masses with restitution 1 swap velocities
        assert!((velocities[0].v.x - -2.0).abs() < 1.0e-3);
        assert!((velocities[1].v.x - 2.0).abs() < 1.0e-3);
    }

    #[test]
    fn inelastic_impact_reaches_common_velocity() {
        let positions = [
            Position { c: Vec2::new(0.0, 0.0), a: 0.0 },
            Position { c: Vec2::new(1.0, 0.0), a: 0.0 },
        ];
        let mut velocities = [
            Velocity { v: Vec2::new(3.0, 0.0), w: 0.0 },
            Velocity { v: Vec2::new(-1.0, 0.0), w: 0.0 },
        ];

        let mut def = head_on_def();
        def.restitution = 0.0;
        let defs = [def];
        let mut solver = ContactSolver::new(&defs, &positions, &velocities, 1.0);

        solver.warm_start(&mut velocities);
        for _ in 0..8 {
            solver.solve_velocity(&mut velocities);
        }

        assert!((velocities[0].v.x - 1.0).abs() < 1.0e-3);
        assert!((velocities[1].v.x - 1.0).abs() < 1.0e-3);
    }

    #[test]
    fn position_pass_separates_overlap() {
        let mut positions = [
            Position { c: Vec2::new(0.0, 0.0), a: 0.0 },
            Position { c: Vec2::new(0.9, 0.0), a: 0.0 },
        ];
        let velocities = [
            Velocity { v: Vec2::zero(), w: 0.0 },
            Velocity { v: Vec2::zero(), w: 0.0 },
        ];

        let mut def = head_on_def();
        def.points = vec![(Vec2::new(0.45, 0.0), -0.1, 0.0, 0.0)];
        let defs = [def];
        let mut solver = ContactSolver::new(&defs, &positions, &velocities, 1.0);

        let mut solved = false;
        for _ in 0..20 {
            if solver.solve_position(&mut positions) {
                solved = true;
                break;
            }
        }

        assert!(solved);
        assert!(positions[1].c.x - positions[0].c.x > 0.95);
    }
}
