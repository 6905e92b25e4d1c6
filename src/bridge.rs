//! Line-delimited JSON link to the world client.
//!
//! The client owns the protocol connection, pathfinding and the bow. Every
//! line it sends is one [`Inbound`] message; every line we send back is one
//! [`Outbound`] request. World snapshots arrive with each tick and are what
//! the engine reads until the next one.

use crate::bot::{self, Agent, Event};
use crate::world::{
    BlockPos, Channel, Entity, Goal, Marksman, Navigator, Outbox, Ports, ShotFuture, WorldSession,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq)]
pub enum BridgeError {
    #[error("bridge connection closed")]
    Closed,
    #[error("shot {0} timed out")]
    Timeout(u64),
    #[error("shot {0} failed")]
    ShotFailed(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Via {
    Chat,
    Whisper,
    Supervisor,
}

impl Via {
    /// Where replies to a command from `from` should go.
    pub fn reply_channel(self, from: &str) -> Channel {
        match self {
            Via::Chat => Channel::Chat,
            Via::Whisper => Channel::Whisper(from.to_string()),
            Via::Supervisor => Channel::Supervisor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub me: Entity,
    #[serde(default)]
    pub entities: Vec<Entity>,
    pub health: f32,
    pub food: u32,
    #[serde(default)]
    pub held_item: Option<String>,
    #[serde(default)]
    pub inventory: HashMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Login,
    Tick {
        world: Snapshot,
    },
    Hurt {
        entity: Entity,
    },
    Gone {
        entity: Entity,
    },
    Command {
        tokens: Vec<String>,
        from: String,
        via: Via,
    },
    ShotDone {
        id: u64,
        ok: bool,
    },
    GoalFailed {
        #[serde(default)]
        reason: String,
    },
    Ping,
    Disconnect {
        #[serde(default)]
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Goal { goal: Option<Goal> },
    Shoot { id: u64, target: u32 },
    HoldFire,
    Attack { target: u32 },
    Equip { item: String },
    Consume,
    Deposit { chest: BlockPos },
    Jump { on: bool },
    Say { channel: Channel, text: String },
    Pong,
}

type PendingShots = Arc<Mutex<HashMap<u64, oneshot::Sender<bool>>>>;

fn lock(pending: &PendingShots) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<bool>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outbound half of the bridge. Navigator, marksman and outbox requests all
/// become queued lines for the writer task.
pub struct BridgeLink {
    out: mpsc::UnboundedSender<Outbound>,
    pending: PendingShots,
    next_shot: AtomicU64,
    shot_timeout: Duration,
}

impl BridgeLink {
    pub fn new(out: mpsc::UnboundedSender<Outbound>, shot_timeout: Duration) -> Self {
        Self {
            out,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_shot: AtomicU64::new(1),
            shot_timeout,
        }
    }

    pub fn send(&self, message: Outbound) -> Result<(), BridgeError> {
        self.out.send(message).map_err(|_| BridgeError::Closed)
    }

    /// The client reported how shot `id` went.
    pub fn resolve(&self, id: u64, ok: bool) {
        match lock(&self.pending).remove(&id) {
            Some(tx) => {
                let _ = tx.send(ok);
            }
            None => debug!("[BRIDGE] result for unknown or expired shot {}", id),
        }
    }

    /// Fail every shot still waiting on the client.
    pub fn abandon_shots(&self) {
        let dropped = lock(&self.pending).drain().count();
        if dropped > 0 {
            debug!("[BRIDGE] abandoned {} pending shots", dropped);
        }
    }

    #[cfg(test)]
    pub fn pending_shots(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl Navigator for BridgeLink {
    fn set_goal(&self, goal: &Goal) -> anyhow::Result<()> {
        self.send(Outbound::Goal {
            goal: Some(goal.clone()),
        })?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.send(Outbound::Goal { goal: None })?;
        Ok(())
    }
}

impl Marksman for BridgeLink {
    fn shoot(&self, target: &Entity) -> ShotFuture {
        let id = self.next_shot.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        if let Err(e) = self.send(Outbound::Shoot {
            id,
            target: target.id,
        }) {
            lock(&self.pending).remove(&id);
            return Box::pin(async move { Err::<(), _>(anyhow::Error::from(e)) });
        }

        let pending = Arc::clone(&self.pending);
        let timeout = self.shot_timeout;
        Box::pin(async move {
            let outcome = match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(true)) => return Ok(()),
                Ok(Ok(false)) => BridgeError::ShotFailed(id),
                Ok(Err(_)) => BridgeError::Closed,
                Err(_) => {
                    lock(&pending).remove(&id);
                    BridgeError::Timeout(id)
                }
            };
            Err::<(), _>(anyhow::Error::from(outcome))
        })
    }

    fn stand_down(&self) {
        self.abandon_shots();
        if self.send(Outbound::HoldFire).is_err() {
            debug!("[BRIDGE] dropped hold-fire");
        }
    }
}

impl Outbox for BridgeLink {
    fn say(&self, channel: &Channel, text: &str) {
        let message = Outbound::Say {
            channel: channel.clone(),
            text: text.to_string(),
        };
        if self.send(message).is_err() {
            debug!("[BRIDGE] dropped message: {}", text);
        }
    }

    fn pong(&self) {
        if self.send(Outbound::Pong).is_err() {
            debug!("[BRIDGE] dropped pong");
        }
    }
}

/// The latest snapshot, with actions routed through the link.
pub struct BridgeWorld<'a> {
    pub snapshot: &'a Snapshot,
    pub link: &'a BridgeLink,
}

impl WorldSession for BridgeWorld<'_> {
    fn me(&self) -> &Entity {
        &self.snapshot.me
    }

    fn entities(&self) -> &[Entity] {
        &self.snapshot.entities
    }

    fn health(&self) -> f32 {
        self.snapshot.health
    }

    fn food(&self) -> u32 {
        self.snapshot.food
    }

    fn held_item(&self) -> Option<&str> {
        self.snapshot.held_item.as_deref()
    }

    fn count(&self, item: &str) -> u32 {
        self.snapshot.inventory.get(item).copied().unwrap_or(0)
    }

    fn inventory_is_empty(&self) -> bool {
        self.snapshot.inventory.values().all(|&n| n == 0)
    }

    fn equip(&self, item: &str) -> anyhow::Result<()> {
        self.link.send(Outbound::Equip {
            item: item.to_string(),
        })?;
        Ok(())
    }

    fn consume(&self) -> anyhow::Result<()> {
        self.link.send(Outbound::Consume)?;
        Ok(())
    }

    fn attack(&self, target: &Entity) -> anyhow::Result<()> {
        self.link.send(Outbound::Attack { target: target.id })?;
        Ok(())
    }

    fn deposit_all(&self, chest: BlockPos) -> anyhow::Result<()> {
        self.link.send(Outbound::Deposit { chest })?;
        Ok(())
    }

    fn set_jump(&self, on: bool) -> anyhow::Result<()> {
        self.link.send(Outbound::Jump { on })?;
        Ok(())
    }
}

/// Turn one inbound message into an agent event. Shot results are settled
/// here and never reach the agent.
fn dispatch(message: Inbound, snapshot: &mut Snapshot, link: &BridgeLink) -> Option<Event> {
    let event = match message {
        Inbound::Login => Event::Login,
        Inbound::Tick { world } => {
            *snapshot = world;
            Event::Tick
        }
        Inbound::Hurt { entity } => Event::Hurt(entity),
        Inbound::Gone { entity } => Event::Gone(entity),
        Inbound::Command { tokens, from, via } => Event::Command {
            tokens,
            channel: via.reply_channel(&from),
            from,
        },
        Inbound::ShotDone { id, ok } => {
            link.resolve(id, ok);
            return None;
        }
        Inbound::GoalFailed { reason } => Event::GoalFailed(reason),
        Inbound::Ping => Event::Ping,
        Inbound::Disconnect { reason } => Event::Disconnect(reason),
    };
    Some(event)
}

fn deliver(agent: &mut Agent, event: Event, snapshot: &Snapshot, link: &BridgeLink) {
    let world = BridgeWorld { snapshot, link };
    let ports = Ports {
        world: &world,
        navigator: link,
        marksman: link,
        outbox: link,
    };
    if let Err(e) = bot::handle(agent, event, &ports, Instant::now()) {
        warn!("[BRIDGE] event handler failed: {}", e);
    }
}

/// Drive one bridge session until the client disconnects. The agent
/// survives the session; only in-flight shots are abandoned.
pub async fn run<S>(stream: S, agent: &mut Agent, shot_timeout: Duration) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let mut line = serde_json::to_string(&message)?;
            line.push('\n');
            writer.write_all(line.as_bytes()).await?;
        }
        writer.flush().await?;
        Ok::<(), anyhow::Error>(())
    });

    let link = BridgeLink::new(tx, shot_timeout);
    let mut snapshot = Snapshot::default();
    let mut lines = BufReader::new(reader).lines();
    let mut said_goodbye = false;

    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(anyhow::Error::from(e)),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message = match serde_json::from_str::<Inbound>(line) {
            Ok(message) => message,
            Err(e) => {
                warn!("[BRIDGE] unreadable message ({}): {}", e, line);
                continue;
            }
        };
        said_goodbye = matches!(message, Inbound::Disconnect { .. });
        if let Some(event) = dispatch(message, &mut snapshot, &link) {
            deliver(agent, event, &snapshot, &link);
        }
        if said_goodbye {
            break Ok(());
        }
    };

    if !said_goodbye {
        deliver(
            agent,
            Event::Disconnect(Some("connection closed".to_string())),
            &snapshot,
            &link,
        );
    }
    link.abandon_shots();
    drop(link);

    match writer_task.await {
        Ok(Err(e)) => debug!("[BRIDGE] writer stopped: {}", e),
        Err(e) => warn!("[BRIDGE] writer task failed: {}", e),
        Ok(Ok(())) => {}
    }
    info!("[BRIDGE] session ended");
    result
}
