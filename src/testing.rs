//! In-memory collaborators for unit tests.

use crate::world::{
    BlockPos, Channel, Entity, EntityKind, Goal, Marksman, Navigator, Outbox, Ports, ShotFuture,
    Vec3, WorldSession,
};
use anyhow::anyhow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use uuid::Uuid;

pub fn mob(id: u32, kind: EntityKind, pos: Vec3) -> Entity {
    let display_name = match kind {
        EntityKind::Hostile => "zombie",
        EntityKind::Passive => "cow",
        _ => "armor_stand",
    };
    Entity {
        id,
        uuid: Some(Uuid::from_u128(id as u128)),
        username: None,
        display_name: display_name.to_string(),
        position: Some(pos),
        valid: true,
        kind,
    }
}

pub fn player(id: u32, name: &str, pos: Vec3) -> Entity {
    Entity {
        id,
        uuid: Some(Uuid::from_u128(id as u128)),
        username: Some(name.to_string()),
        display_name: "Player".to_string(),
        position: Some(pos),
        valid: true,
        kind: EntityKind::Player,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Equip(String),
    Consume,
    Attack(u32),
    Deposit(BlockPos),
    Jump(bool),
}

pub struct FakeWorld {
    pub me: Entity,
    pub entities: Vec<Entity>,
    pub health: f32,
    pub food: u32,
    pub held: Option<String>,
    pub inventory: HashMap<String, u32>,
    pub fail_deposit: bool,
    log: RefCell<Vec<Action>>,
}

impl FakeWorld {
    pub fn new(pos: Vec3) -> Self {
        Self {
            me: player(1, "warden", pos),
            entities: Vec::new(),
            health: 20.0,
            food: 20,
            held: None,
            inventory: HashMap::new(),
            fail_deposit: false,
            log: RefCell::new(Vec::new()),
        }
    }

    pub fn with(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn remove(&mut self, id: u32) {
        self.entities.retain(|e| e.id != id);
    }

    pub fn actions(&self) -> Vec<Action> {
        self.log.borrow().clone()
    }
}

impl WorldSession for FakeWorld {
    fn me(&self) -> &Entity {
        &self.me
    }

    fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn health(&self) -> f32 {
        self.health
    }

    fn food(&self) -> u32 {
        self.food
    }

    fn held_item(&self) -> Option<&str> {
        self.held.as_deref()
    }

    fn count(&self, item: &str) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    fn inventory_is_empty(&self) -> bool {
        self.inventory.values().all(|&n| n == 0)
    }

    fn equip(&self, item: &str) -> anyhow::Result<()> {
        self.log.borrow_mut().push(Action::Equip(item.to_string()));
        Ok(())
    }

    fn consume(&self) -> anyhow::Result<()> {
        self.log.borrow_mut().push(Action::Consume);
        Ok(())
    }

    fn attack(&self, target: &Entity) -> anyhow::Result<()> {
        self.log.borrow_mut().push(Action::Attack(target.id));
        Ok(())
    }

    fn deposit_all(&self, chest: BlockPos) -> anyhow::Result<()> {
        if self.fail_deposit {
            return Err(anyhow!("chest is full"));
        }
        self.log.borrow_mut().push(Action::Deposit(chest));
        Ok(())
    }

    fn set_jump(&self, on: bool) -> anyhow::Result<()> {
        self.log.borrow_mut().push(Action::Jump(on));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub fail: Cell<bool>,
    log: RefCell<Vec<Option<Goal>>>,
}

impl RecordingNavigator {
    /// Every accepted request in order; `None` is a clear.
    pub fn calls(&self) -> Vec<Option<Goal>> {
        self.log.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn set_goal(&self, goal: &Goal) -> anyhow::Result<()> {
        if self.fail.get() {
            return Err(anyhow!("no path"));
        }
        self.log.borrow_mut().push(Some(goal.clone()));
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.log.borrow_mut().push(None);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMarksman {
    hold: Cell<bool>,
    fail: Cell<bool>,
    shots: RefCell<Vec<u32>>,
    stand_downs: Cell<usize>,
}

impl FakeMarksman {
    /// Shots never resolve until the test drops them.
    pub fn hold(&self) {
        self.hold.set(true);
    }

    pub fn fail(&self) {
        self.fail.set(true);
    }

    pub fn shots(&self) -> Vec<u32> {
        self.shots.borrow().clone()
    }

    pub fn stand_downs(&self) -> usize {
        self.stand_downs.get()
    }
}

impl Marksman for FakeMarksman {
    fn shoot(&self, target: &Entity) -> ShotFuture {
        self.shots.borrow_mut().push(target.id);
        if self.hold.get() {
            return Box::pin(std::future::pending());
        }
        if self.fail.get() {
            return Box::pin(async { Err::<(), _>(anyhow!("target out of sight")) });
        }
        Box::pin(async { Ok::<(), anyhow::Error>(()) })
    }

    fn stand_down(&self) {
        self.stand_downs.set(self.stand_downs.get() + 1);
    }
}

#[derive(Default)]
pub struct RecordingOutbox {
    said: RefCell<Vec<(Channel, String)>>,
    pongs: Cell<usize>,
}

impl RecordingOutbox {
    pub fn said(&self) -> Vec<(Channel, String)> {
        self.said.borrow().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.said.borrow().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn pongs(&self) -> usize {
        self.pongs.get()
    }
}

impl Outbox for RecordingOutbox {
    fn say(&self, channel: &Channel, text: &str) {
        self.said.borrow_mut().push((channel.clone(), text.to_string()));
    }

    fn pong(&self) {
        self.pongs.set(self.pongs.get() + 1);
    }
}

/// A full set of fakes wired into `Ports`.
pub struct Rig {
    pub world: FakeWorld,
    pub navigator: RecordingNavigator,
    pub marksman: FakeMarksman,
    pub outbox: RecordingOutbox,
}

impl Rig {
    pub fn new(pos: Vec3) -> Self {
        Self {
            world: FakeWorld::new(pos),
            navigator: RecordingNavigator::default(),
            marksman: FakeMarksman::default(),
            outbox: RecordingOutbox::default(),
        }
    }

    pub fn ports(&self) -> Ports<'_> {
        Ports {
            world: &self.world,
            navigator: &self.navigator,
            marksman: &self.marksman,
            outbox: &self.outbox,
        }
    }
}
