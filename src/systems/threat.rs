use crate::config::Tuning;
use crate::systems::targets::TargetList;
use crate::world::{Entity, EntityKind, Vec3, WorldSession, nearest};

// ============================================================
// THREAT DETECTOR — Anything hostile near us or near the boss
// ============================================================

#[derive(Debug, Clone, Copy)]
pub struct Threat<'a> {
    pub entity: &'a Entity,
    /// Distance from the agent, not from the subject.
    pub distance: f64,
}

/// Nearest hostile or tracked entity within the near radius of the agent, or
/// within the guard radius of a valid guarded subject.
pub fn find_threat<'a>(
    world: &'a dyn WorldSession,
    targets: &TargetList,
    subject: Option<&Entity>,
    tuning: &Tuning,
) -> Option<Threat<'a>> {
    let me = world.me();
    let origin = me.position?;
    let subject_pos = subject.filter(|s| s.valid).and_then(|s| s.position);

    nearest(world.entities(), origin, |e, distance| {
        if e.id == me.id || subject.is_some_and(|s| s.id == e.id) {
            return false;
        }
        if e.kind != EntityKind::Hostile && !targets.tracks(e) {
            return false;
        }
        if distance < tuning.near_radius {
            return true;
        }
        match (subject_pos, e.position) {
            (Some(s), Some(p)) => p.distance_to(s) < tuning.guard_radius,
            _ => false,
        }
    })
    .map(|(entity, distance)| Threat { entity, distance })
}

/// Hostile positions within `radius` of `origin`, for the flee planner.
pub fn hostiles_within(
    world: &dyn WorldSession,
    targets: &TargetList,
    origin: Vec3,
    radius: f64,
) -> Vec<Vec3> {
    world
        .entities()
        .iter()
        .filter(|e| e.is_usable())
        .filter(|e| e.kind == EntityKind::Hostile || targets.tracks(e))
        .filter_map(|e| e.position)
        .filter(|p| p.distance_to(origin) < radius)
        .collect()
}
