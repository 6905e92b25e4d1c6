use crate::config::{Config, Tuning};
use crate::plugins;
use crate::plugins::arbiter::Mode;
use crate::plugins::errand::Errand;
use crate::plugins::ping::Heartbeat;
use crate::storage::locations::LocationStore;
use crate::storage::rosters;
use crate::systems::combat::Engagement;
use crate::systems::motor::Motor;
use crate::systems::targets::{self, BossList, TargetList};
use crate::systems::vitals::VitalMonitor;
use crate::world::{Channel, Entity, Ports};
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info};

/// Everything one agent knows and decides with. Nothing here is global, so
/// several agents can run side by side.
pub struct Agent {
    pub name: String,
    pub tuning: Tuning,
    pub bosses: BossList,
    pub targets: TargetList,
    /// Identity of the protected subject, re-resolved every tick.
    pub guarded: Option<String>,
    /// Cleared by `stop` and while fleeing.
    pub guarding: bool,
    pub guarding_before_flee: bool,
    pub vitals: VitalMonitor,
    pub engagement: Engagement,
    pub motor: Motor,
    pub chests: LocationStore,
    pub errand: Option<Errand>,
    /// Mode chosen on the previous tick.
    pub mode: Mode,
    pub ticks: u64,
    pub flee_since: u64,
    pub heartbeat: Heartbeat,
    pub spawned_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        tuning: Tuning,
        bosses: BossList,
        targets: TargetList,
        chests: LocationStore,
    ) -> Self {
        Self {
            name: name.into(),
            engagement: Engagement::new(&tuning),
            tuning,
            bosses,
            targets,
            guarded: None,
            guarding: true,
            guarding_before_flee: true,
            vitals: VitalMonitor::default(),
            motor: Motor::default(),
            chests,
            errand: None,
            mode: Mode::Idle,
            ticks: 0,
            flee_since: 0,
            heartbeat: Heartbeat::default(),
            spawned_at: Utc::now(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let bosses = BossList::new(rosters::load_names(&config.boss_list));
        let targets = TargetList::seeded(rosters::load_names(&config.target_list), &bosses);
        info!(
            "[BOT] {} protecting {} bosses, {} known targets",
            config.bot_name,
            bosses.len(),
            targets.len()
        );
        Self::new(
            config.bot_name.clone(),
            config.tuning.clone(),
            bosses,
            targets,
            LocationStore::load(&config.chests_file),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Login,
    Tick,
    Hurt(Entity),
    Gone(Entity),
    Command {
        tokens: Vec<String>,
        from: String,
        channel: Channel,
    },
    GoalFailed(String),
    Ping,
    Disconnect(Option<String>),
}

pub fn handle(agent: &mut Agent, event: Event, ports: &Ports<'_>, now: Instant) -> anyhow::Result<()> {
    match event {
        Event::Login => {
            info!("[BOT] ✅ Joined the world as {}", agent.name);
            ports.outbox.say(&Channel::Chat, "I'm a robot.");
        }
        Event::Tick => {
            let mode = plugins::arbiter::handle(agent, ports, now);
            agent
                .engagement
                .land_crit(ports.world, &agent.tuning, now, agent.ticks);
            plugins::ping::tick(&mut agent.heartbeat, mode, now);
        }
        Event::Hurt(entity) => on_hurt(agent, entity, ports),
        Event::Gone(entity) => {
            if let Some(identity) = entity.identity() {
                if agent.targets.remove(&identity) {
                    info!("[TARGETS] {} is gone, no longer tracked", identity);
                }
            }
        }
        Event::Command {
            tokens,
            from,
            channel,
        } => plugins::commands::handle(agent, ports, &tokens, &from, &channel, now),
        Event::GoalFailed(reason) => {
            debug!("[BOT] navigator gave up: {}", reason);
            agent.motor.forget();
        }
        Event::Ping => plugins::ping::answer(&mut agent.heartbeat, ports.outbox),
        Event::Disconnect(reason) => {
            info!(
                "[DISCONNECT] {}",
                reason.as_deref().unwrap_or("No reason provided.")
            );
            // The next session starts with an empty navigator.
            agent.motor.forget();
            agent.engagement.disengage();
            agent.engagement.drop_crit();
            agent.engagement.ranged.reset();
        }
    }
    Ok(())
}

fn on_hurt(agent: &mut Agent, entity: Entity, ports: &Ports<'_>) {
    let world = ports.world;
    let subject = agent
        .guarded
        .as_deref()
        .and_then(|g| world.by_identity(g))
        .map(|s| s.id);
    if entity.id != world.me().id && Some(entity.id) != subject {
        return;
    }

    // Prefer the live snapshot when the event carries no position.
    let hurt = if entity.position.is_some() {
        entity
    } else if let Some(live) = world.entity(entity.id) {
        live.clone()
    } else if entity.id == world.me().id {
        world.me().clone()
    } else {
        entity
    };
    ports
        .outbox
        .say(&Channel::Supervisor, &format!("{} was hurt!", hurt.label()));
    targets::attribute(
        &mut agent.targets,
        world,
        &hurt,
        &agent.bosses,
        agent.tuning.attribution_radius,
    );
}

#[cfg(test)]
pub(crate) fn test_agent(bosses: &[&str]) -> Agent {
    let chests = LocationStore::load(
        std::env::temp_dir().join(format!("warden-agent-{}.json", uuid::Uuid::new_v4())),
    );
    Agent::new(
        "warden",
        Tuning::default(),
        BossList::new(bosses.iter().copied()),
        TargetList::default(),
        chests,
    )
}
