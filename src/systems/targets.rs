use crate::world::{Entity, EntityKind, WorldSession, nearest};
use tracing::{debug, info};

// ============================================================
// TARGET TRACKER — Who hit us, and who is still around
// ============================================================

/// Identities the agent protects and takes orders from.
#[derive(Debug, Clone, Default)]
pub struct BossList {
    names: Vec<String>,
}

impl BossList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.names.iter().any(|n| n == identity)
    }

    pub fn is_boss(&self, entity: &Entity) -> bool {
        entity.identity().is_some_and(|id| self.contains(&id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Insertion-ordered attacker identities. Never holds a boss.
#[derive(Debug, Clone, Default)]
pub struct TargetList {
    entries: Vec<String>,
}

impl TargetList {
    /// Seed from a saved list, dropping duplicates and bosses.
    pub fn seeded<I: IntoIterator<Item = String>>(names: I, bosses: &BossList) -> Self {
        let mut list = Self::default();
        for name in names {
            list.insert(name, bosses);
        }
        list
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.iter().any(|e| e == identity)
    }

    pub fn tracks(&self, entity: &Entity) -> bool {
        entity.identity().is_some_and(|id| self.contains(&id))
    }

    /// Returns true when the identity was newly added.
    pub fn insert(&mut self, identity: String, bosses: &BossList) -> bool {
        if bosses.contains(&identity) || self.contains(&identity) {
            return false;
        }
        self.entries.push(identity);
        true
    }

    pub fn remove(&mut self, identity: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != identity);
        before != self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Nearest mob or player within `radius` of the hurt entity that could have
/// dealt the blow. Bosses, the victim and the agent itself are never blamed.
pub fn find_attacker<'a>(
    world: &'a dyn WorldSession,
    hurt: &Entity,
    bosses: &BossList,
    radius: f64,
) -> Option<&'a Entity> {
    let origin = hurt.position?;
    let me = world.me().id;
    nearest(world.entities(), origin, |e, distance| {
        distance < radius
            && (e.kind.is_mob() || e.kind == EntityKind::Player)
            && e.id != hurt.id
            && e.id != me
            && !bosses.is_boss(e)
    })
    .map(|(e, _)| e)
}

/// Attribute a hurt signal to an attacker and track it. Returns the newly
/// tracked identity, if any.
pub fn attribute(
    targets: &mut TargetList,
    world: &dyn WorldSession,
    hurt: &Entity,
    bosses: &BossList,
    radius: f64,
) -> Option<String> {
    let attacker = find_attacker(world, hurt, bosses, radius)?;
    let Some(identity) = attacker.identity() else {
        debug!("[TARGETS] attacker {} has no identity, not tracked", attacker.id);
        return None;
    };
    if !targets.insert(identity.clone(), bosses) {
        return None;
    }
    info!("[TARGETS] 🎯 {} attacked {}, now tracked", identity, hurt.label());
    Some(identity)
}
