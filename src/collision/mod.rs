mod broad_phase;
mod collide_circle;
mod collide_polygon;
mod contact;
mod contact_solver;
mod continuous;
mod distance;
mod filter;
mod manifold;
mod narrow_phase;

pub use broad_phase::{BroadPhase, DynamicTree, NULL_PROXY};
pub use contact::{Contact, ContactKey};
pub(crate) use contact_solver::{ContactConstraintDef, ContactSolver, Position, Velocity};
pub use continuous::{time_of_impact, ToiInput, ToiOutput, ToiState};
pub use distance::{shape_distance, DistanceProxy};
pub use filter::Filter;
pub use manifold::{FeatureId, Manifold, ManifoldPoint, MAX_MANIFOLD_POINTS};
pub use narrow_phase::evaluate_manifold;

/// Collision tolerance: contacts are allowed to overlap by this much before
/// the position solver intervenes
pub const LINEAR_SLOP: f32 = 0.005;

/// Maximum position correction applied in a single solver iteration
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Baumgarte factor scaling the position correction per iteration
pub const BAUMGARTE: f32 = 0.2;

/// Relative normal speed below which restitution is ignored
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Fixed margin added to broad-phase fat AABBs
pub const AABB_MARGIN: f32 = 0.1;

/// Scale applied to predicted displacement when fattening moving proxies
pub const AABB_MULTIPLIER: f32 = 2.0;
