use serde::{Deserialize, Serialize};
use std::future::Future;
use std::ops::{Add, Sub};
use std::pin::Pin;
use uuid::Uuid;

// ============================================================
// WORLD — What the agent can see and the hands it can use
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance_to(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    pub fn scaled(self, factor: f64) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    pub fn normalized(self) -> Option<Vec3> {
        let len = self.length();
        if len <= f64::EPSILON {
            return None;
        }
        Some(self.scaled(1.0 / len))
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn center(self) -> Vec3 {
        Vec3::new(
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        )
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Hostile,
    Passive,
    Player,
    #[default]
    Other,
}

impl EntityKind {
    pub fn is_mob(self) -> bool {
        matches!(self, EntityKind::Hostile | EntityKind::Passive)
    }
}

fn valid_by_default() -> bool {
    true
}

/// Read-only snapshot of one entity, as reported by the world session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default = "valid_by_default")]
    pub valid: bool,
    #[serde(default)]
    pub kind: EntityKind,
}

impl Entity {
    /// Stable identity used by the target list and the guarded subject:
    /// the username for players, otherwise the UUID.
    pub fn identity(&self) -> Option<String> {
        self.username
            .clone()
            .or_else(|| self.uuid.map(|u| u.to_string()))
    }

    pub fn label(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.display_name)
    }

    /// Valid and positioned; anything else must not be acted upon.
    pub fn is_usable(&self) -> bool {
        self.valid && self.position.is_some()
    }

    pub fn distance_to(&self, point: Vec3) -> Option<f64> {
        self.position.map(|p| p.distance_to(point))
    }

    pub fn answers_to(&self, name: &str) -> bool {
        self.display_name == name || self.username.as_deref() == Some(name)
    }
}

/// Nearest usable entity to `origin` satisfying `pred`. Exact ties keep the
/// first one in enumeration order.
pub fn nearest<'a, F>(entities: &'a [Entity], origin: Vec3, pred: F) -> Option<(&'a Entity, f64)>
where
    F: Fn(&Entity, f64) -> bool,
{
    let mut best: Option<(&Entity, f64)> = None;
    for entity in entities.iter().filter(|e| e.is_usable()) {
        let Some(distance) = entity.distance_to(origin) else {
            continue;
        };
        if !pred(entity, distance) {
            continue;
        }
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((entity, distance));
        }
    }
    best
}

// ============================================================
// COLLABORATORS
// ============================================================

/// The world client's view of the agent and its surroundings, plus the
/// primitive actions the engine may request.
pub trait WorldSession {
    fn me(&self) -> &Entity;
    /// Every other entity currently loaded.
    fn entities(&self) -> &[Entity];
    fn health(&self) -> f32;
    fn food(&self) -> u32;
    fn held_item(&self) -> Option<&str>;
    fn count(&self, item: &str) -> u32;
    fn inventory_is_empty(&self) -> bool;

    fn equip(&self, item: &str) -> anyhow::Result<()>;
    fn consume(&self) -> anyhow::Result<()>;
    fn attack(&self, target: &Entity) -> anyhow::Result<()>;
    fn deposit_all(&self, chest: BlockPos) -> anyhow::Result<()>;
    /// Hold or release the jump control.
    fn set_jump(&self, on: bool) -> anyhow::Result<()>;

    fn position(&self) -> Option<Vec3> {
        self.me().position
    }

    fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities().iter().find(|e| e.id == id)
    }

    fn by_identity(&self, identity: &str) -> Option<&Entity> {
        self.entities()
            .iter()
            .find(|e| e.identity().as_deref() == Some(identity))
    }

    /// Nearest entity called `name`, by display name or username.
    fn find_named(&self, name: &str) -> Option<&Entity> {
        let origin = self.position()?;
        nearest(self.entities(), origin, |e, _| e.answers_to(name)).map(|(e, _)| e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Goal {
    Follow { entity: u32, range: f64 },
    Near { point: Vec3, tolerance: f64 },
}

/// Pathfinding lives on the other side of this trait. Goals are
/// fire-and-forget; a rejected goal is reported as an error and ignored.
pub trait Navigator {
    fn set_goal(&self, goal: &Goal) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

pub type ShotFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Executes one ranged attack attempt; the future resolves when the arrow
/// has been loosed or the attempt failed.
pub trait Marksman {
    fn shoot(&self, target: &Entity) -> ShotFuture;
    /// Abandon whatever attempt is still in flight.
    fn stand_down(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Chat,
    Whisper(String),
    Supervisor,
}

pub trait Outbox {
    fn say(&self, channel: &Channel, text: &str);
    fn pong(&self);
}

/// Everything a decision call may touch outside the agent itself.
pub struct Ports<'a> {
    pub world: &'a dyn WorldSession,
    pub navigator: &'a dyn Navigator,
    pub marksman: &'a dyn Marksman,
    pub outbox: &'a dyn Outbox,
}
