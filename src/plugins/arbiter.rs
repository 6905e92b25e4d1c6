use crate::bot::Agent;
use crate::config::Tuning;
use crate::plugins::{auto_eat, errand};
use crate::systems::flee::flee_point;
use crate::systems::threat::{find_threat, hostiles_within};
use crate::systems::vitals::VitalShift;
use crate::world::{Channel, Entity, Goal, Ports, WorldSession, nearest};
use std::time::Instant;
use tracing::{info, warn};

// ============================================================
// MODE ARBITER — One decision per tick: Flee > Combat > Guard > Idle
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Guard,
    Combat,
    Flee,
}

/// Everything mode selection depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inputs {
    pub fleeing: bool,
    pub guarding: bool,
    pub threat: bool,
    pub subject: bool,
}

struct Transition {
    mode: Mode,
    when: fn(&Inputs) -> bool,
}

/// Highest priority first; the first guard that holds wins.
const TRANSITIONS: [Transition; 5] = [
    Transition { mode: Mode::Flee, when: |i| i.fleeing },
    Transition { mode: Mode::Idle, when: |i| !i.guarding },
    Transition { mode: Mode::Combat, when: |i| i.threat },
    Transition { mode: Mode::Guard, when: |i| i.subject },
    Transition { mode: Mode::Idle, when: |_| true },
];

pub fn select_mode(inputs: &Inputs) -> Mode {
    TRANSITIONS
        .iter()
        .find(|t| (t.when)(inputs))
        .map_or(Mode::Idle, |t| t.mode)
}

/// Obligations of the mode being left: whatever it steered toward is
/// cleared, and combat forgets its target.
pub fn leave(agent: &mut Agent, mode: Mode, ports: &Ports<'_>) {
    if mode == Mode::Combat {
        agent.engagement.disengage();
    }
    agent.motor.halt(ports.navigator);
}

pub fn handle(agent: &mut Agent, ports: &Ports<'_>, now: Instant) -> Mode {
    let world = ports.world;
    let tuning = agent.tuning.clone();
    agent.ticks += 1;

    match agent.vitals.update(world.health(), &tuning) {
        VitalShift::EnteredFlee => {
            agent.guarding_before_flee = agent.guarding;
            agent.guarding = false;
            warn!("[VITALS] 🏃 health at {}, fleeing", world.health());
            ports.outbox.say(
                &Channel::Supervisor,
                &format!("health at {}, retreating!", world.health()),
            );
        }
        VitalShift::ExitedFlee => {
            agent.guarding = agent.guarding_before_flee;
            agent.motor.halt(ports.navigator);
            info!("[VITALS] 💪 health back to {}, done fleeing", world.health());
        }
        VitalShift::Steady => {}
    }
    auto_eat::handle(agent, ports, now, &tuning);

    let fleeing = agent.vitals.is_fleeing();
    let guarding = agent.guarding && agent.errand.is_none();
    let subject = guarded_subject(agent, world, !fleeing);
    let threat = if fleeing || !guarding {
        None
    } else {
        find_threat(world, &agent.targets, subject, &tuning)
    };

    let mode = select_mode(&Inputs {
        fleeing,
        guarding,
        threat: threat.is_some(),
        subject: subject.is_some(),
    });
    let previous = agent.mode;
    if mode != previous {
        info!("[ARBITER] {:?} → {:?}", previous, mode);
        leave(agent, previous, ports);
        if mode == Mode::Flee {
            agent.flee_since = agent.ticks;
        }
    }
    agent.mode = mode;

    match mode {
        Mode::Flee => flee(agent, ports, now, &tuning),
        Mode::Combat => {
            if let Some(threat) = threat {
                agent
                    .engagement
                    .step(threat, &mut agent.motor, ports, &tuning, now);
            }
        }
        Mode::Guard => {
            if let Some(subject) = subject {
                agent.motor.steer(
                    ports.navigator,
                    Goal::Follow {
                        entity: subject.id,
                        range: tuning.guard_follow_range,
                    },
                );
            }
        }
        Mode::Idle => {
            if !errand::step(agent, ports, &tuning) {
                agent.motor.halt(ports.navigator);
            }
        }
    }
    mode
}

/// Resolve the guarded subject against this tick's snapshot. An invalid
/// subject is dropped; with `discover`, the nearest boss in sight takes over.
fn guarded_subject<'w>(agent: &mut Agent, world: &'w dyn WorldSession, discover: bool) -> Option<&'w Entity> {
    if let Some(identity) = agent.guarded.as_deref() {
        match world.by_identity(identity).filter(|s| s.is_usable()) {
            Some(subject) => return Some(subject),
            None => {
                info!("[GUARD] lost sight of {}", identity);
                agent.guarded = None;
            }
        }
    }
    if !discover {
        return None;
    }
    let origin = world.position()?;
    let (boss, _) = nearest(world.entities(), origin, |e, _| agent.bosses.is_boss(e))?;
    let identity = boss.identity()?;
    info!("[GUARD] 🛡️ found boss {}, guarding", identity);
    agent.guarded = Some(identity);
    Some(boss)
}

/// Run from the hostiles' centroid, every few ticks.
fn flee(agent: &mut Agent, ports: &Ports<'_>, now: Instant, tuning: &Tuning) {
    if (agent.ticks - agent.flee_since) % tuning.flee_every_ticks != 0 {
        return;
    }
    let world = ports.world;
    let Some(me) = world.position() else {
        return;
    };
    let hostiles = hostiles_within(world, &agent.targets, me, tuning.panic_radius);
    if hostiles.is_empty() {
        agent.motor.halt(ports.navigator);
        if world.food() <= tuning.hunger_limit {
            auto_eat::snack(&mut agent.vitals, ports, now, tuning);
        }
        return;
    }

    if let Some(point) = flee_point(me, &hostiles, tuning.flee_distance, &mut rand::thread_rng()) {
        agent
            .motor
            .steer(ports.navigator, Goal::Near { point, tolerance: 1.0 });
    }
    if !hostiles.iter().any(|p| p.distance_to(me) < tuning.danger_radius) {
        auto_eat::snack(&mut agent.vitals, ports, now, tuning);
    }
}
