//! Collide-and-slide resolver
//!
//! Moves an axis-aligned hull through the static world for one step:
//!
//! 1. If the hull starts embedded deeper than the skin, push it out along
//!    the overlap normal.
//! 2. Sweep along the remaining motion. No hit: take the whole motion.
//! 3. On a hit, advance to the contact minus the skin (or restore the skin
//!    when already closer than that), remember the plane, and clip the
//!    leftover motion against every remembered plane.
//! 4. Repeat until the motion is used up or the iteration budget runs out.
//! 5. Clip the original velocity against all planes touched this step.
//!
//! Without an engine or a hull the step degrades to plain Euler
//! integration.

use log::{debug, trace};
use smallvec::SmallVec;

use super::engine::CollisionEngine;
use crate::core::SlideSettings;
use crate::ecs::BoxColliderComponent;
use crate::foundation::math::{units::hu_to_m, utils::normalize_with_length, Vec3};

/// Clipped motion may still dip this far into a plane
const CLIP_TOLERANCE: f32 = 1e-5;

/// Planes touched during one step
pub type ClipPlanes = SmallVec<[Vec3; 8]>;

/// Result of one resolver step
#[derive(Debug, Clone, PartialEq)]
pub struct SlideOutcome {
    /// Final hull center
    pub position: Vec3,
    /// Velocity after clipping against every touched plane
    pub velocity: Vec3,
    /// Distinct plane normals touched this step
    pub planes: ClipPlanes,
    /// Sweeps performed
    pub iterations: u32,
    /// `true` if the hull started embedded and was pushed out
    pub depenetrated: bool,
    /// Walkable plane touched this step, if any
    pub ground_normal: Option<Vec3>,
}

impl SlideOutcome {
    fn unobstructed(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position,
            velocity,
            planes: ClipPlanes::new(),
            iterations: 0,
            depenetrated: false,
            ground_normal: None,
        }
    }

    /// `true` if a walkable plane was touched
    pub fn grounded(&self) -> bool {
        self.ground_normal.is_some()
    }
}

/// Collide-and-slide solver
#[derive(Debug, Clone, Default)]
pub struct SlideResolver {
    settings: SlideSettings,
}

impl SlideResolver {
    /// Create a resolver
    pub fn new(settings: SlideSettings) -> Self {
        Self { settings }
    }

    /// Active settings
    pub fn settings(&self) -> &SlideSettings {
        &self.settings
    }

    /// Skin width in world units
    pub fn skin(&self) -> f32 {
        hu_to_m(self.settings.skin_hu)
    }

    /// Advance `position` by `velocity * dt`, sliding along static geometry
    pub fn resolve(
        &self,
        engine: Option<&CollisionEngine>,
        hull: Option<&BoxColliderComponent>,
        position: Vec3,
        velocity: Vec3,
        dt: f32,
    ) -> SlideOutcome {
        let (Some(engine), Some(hull)) = (engine, hull) else {
            return SlideOutcome::unobstructed(position + velocity * dt, velocity);
        };
        if dt <= 0.0 {
            return SlideOutcome::unobstructed(position, velocity);
        }

        let skin = self.skin();
        let push_out = hu_to_m(self.settings.push_out_hu);
        let mut outcome = SlideOutcome::unobstructed(position, velocity);

        if let Some(overlap) = engine.box_overlap(&hull.shape_at(outcome.position)) {
            if overlap.depth > skin {
                outcome.position += overlap.normal * (overlap.depth + push_out);
                outcome.depenetrated = true;
                debug!("Pushed hull out of triangle {} by {:.4}", overlap.tri_index, overlap.depth + push_out);
            }
        }

        let mut remaining = velocity * dt;
        while outcome.iterations < self.settings.max_iterations {
            let Some((dir, dist)) = normalize_with_length(&remaining) else {
                break;
            };
            outcome.iterations += 1;

            let Some(hit) = engine.box_cast(&hull.shape_at(outcome.position), &dir, dist + skin) else {
                outcome.position += remaining;
                remaining = Vec3::zeros();
                break;
            };

            let travel = (hit.t - skin).clamp(0.0, dist);
            if hit.t < skin {
                // Restore only the missing skin; a full push-out every tick jitters at rest
                outcome.position += hit.normal * (skin - hit.t).min(push_out);
            } else {
                outcome.position += dir * travel;
            }

            let leftover = dir * (dist - travel);
            remaining = if self.record_plane(&mut outcome.planes, hit.normal) {
                clip_to_planes(&leftover, &outcome.planes)
            } else {
                trace!("Plane budget exhausted, clipping against the extra plane only for this sweep");
                let mut planes = outcome.planes.clone();
                planes.push(hit.normal);
                clip_to_planes(&leftover, &planes)
            };
            trace!(
                "Slide iteration {}: hit tri {} at {:.4}, {} planes",
                outcome.iterations,
                hit.tri_index,
                hit.t,
                outcome.planes.len()
            );
        }

        if remaining.norm_squared() > 0.0 && outcome.iterations >= self.settings.max_iterations {
            debug!("Slide budget of {} iterations exhausted", self.settings.max_iterations);
        }

        if !outcome.planes.is_empty() {
            outcome.velocity = clip_to_planes(&velocity, &outcome.planes);
            if outcome.velocity.norm() < self.settings.stop_speed {
                outcome.velocity = Vec3::zeros();
            }
        }
        outcome.ground_normal = outcome
            .planes
            .iter()
            .copied()
            .find(|n| n.y >= self.settings.walkable_cos);
        outcome
    }

    /// Remember `normal` unless a near-identical plane is known; `false`
    /// when it is new but the plane list is already full
    fn record_plane(&self, planes: &mut ClipPlanes, normal: Vec3) -> bool {
        if planes.iter().any(|p| p.dot(&normal) > self.settings.plane_merge_cos) {
            return true;
        }
        if planes.len() >= self.settings.max_planes {
            return false;
        }
        planes.push(normal);
        true
    }
}

/// Remove the into-plane component of `v` for every plane it points into.
///
/// When two or more planes are involved and the result still points into
/// one of them, the motion is projected onto the crease of the first two;
/// if even that is blocked it stops.
pub fn clip_to_planes(v: &Vec3, planes: &[Vec3]) -> Vec3 {
    let mut out = *v;
    for n in planes {
        let into = out.dot(n);
        if into < 0.0 {
            out -= n * into;
        }
    }

    let blocked = |candidate: &Vec3| planes.iter().any(|n| candidate.dot(n) < -CLIP_TOLERANCE);
    if planes.len() < 2 || !blocked(&out) {
        return out;
    }

    let Some(crease) = planes[0].cross(&planes[1]).try_normalize(1e-6) else {
        return Vec3::zeros();
    };
    let along = crease * crease.dot(v);
    if blocked(&along) {
        Vec3::zeros()
    } else {
        along
    }
}
