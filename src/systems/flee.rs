use crate::world::Vec3;
use rand::Rng;
use std::f64::consts::TAU;

// ============================================================
// FLEE VECTOR — Run away from the middle of the crowd
// ============================================================

pub fn centroid(points: &[Vec3]) -> Option<Vec3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::ZERO, |acc, p| acc + *p);
    Some(sum.scaled(1.0 / points.len() as f64))
}

/// Random unit vector in the horizontal plane.
pub fn random_heading<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let angle = rng.gen_range(0.0..TAU);
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

/// Unit vector pointing from `center` to `me`. Standing exactly on the
/// centroid picks a random horizontal direction.
pub fn away_from<R: Rng + ?Sized>(me: Vec3, center: Vec3, rng: &mut R) -> Vec3 {
    (me - center)
        .normalized()
        .unwrap_or_else(|| random_heading(rng))
}

/// Point `distance` blocks away from the hostiles' centroid, or `None` when
/// there is nothing to run from.
pub fn flee_point<R: Rng + ?Sized>(
    me: Vec3,
    hostiles: &[Vec3],
    distance: f64,
    rng: &mut R,
) -> Option<Vec3> {
    let center = centroid(hostiles)?;
    Some(me + away_from(me, center, rng).scaled(distance))
}
