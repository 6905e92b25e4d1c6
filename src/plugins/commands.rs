use crate::bot::Agent;
use crate::plugins::errand::Errand;
use crate::systems::combat::{self, CombatAction};
use crate::systems::vitals::{self, EatOutcome};
use crate::world::{BlockPos, Channel, EntityKind, Ports};
use chrono::{TimeDelta, Utc};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================
// COMMAND CHANNEL — Bosses talk, the guard listens
// ============================================================

const SET_CHEST_USAGE: &str = "set chest <x> <y> <z> <name>";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Continue,
    Eat,
    Guard(String),
    Ping,
    Status,
    Stop,
    SetChest { pos: BlockPos, name: String },
    Unload(String),
    Equip,
    Punch(String),
    Crit(String),
    Shoot(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command.")]
    Unknown,
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown set command. Available: chest")]
    UnknownSet,
}

pub fn parse(tokens: &[String]) -> Result<Command, CommandError> {
    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let command = match words.as_slice() {
        ["continue", ..] => Command::Continue,
        ["eat", ..] => Command::Eat,
        ["ping", ..] => Command::Ping,
        ["status", ..] => Command::Status,
        ["stop", ..] => Command::Stop,
        ["equip", ..] => Command::Equip,
        ["guard", name, ..] => Command::Guard(name.to_string()),
        ["guard"] => return Err(CommandError::Usage("guard <name>")),
        ["unload", name, ..] => Command::Unload(name.to_string()),
        ["unload"] => return Err(CommandError::Usage("unload <name>")),
        ["punch", name, ..] => Command::Punch(name.to_string()),
        ["punch"] => return Err(CommandError::Usage("punch <name>")),
        ["crit", name, ..] => Command::Crit(name.to_string()),
        ["crit"] => return Err(CommandError::Usage("crit <name>")),
        ["shoot", name, ..] => Command::Shoot(name.to_string()),
        ["shoot"] => return Err(CommandError::Usage("shoot <name>")),
        ["set", "chest", x, y, z, name] => {
            let coord = |s: &str| s.parse::<i32>().map_err(|_| CommandError::Usage(SET_CHEST_USAGE));
            Command::SetChest {
                pos: BlockPos::new(coord(*x)?, coord(*y)?, coord(*z)?),
                name: name.to_string(),
            }
        }
        ["set", "chest", ..] => return Err(CommandError::Usage(SET_CHEST_USAGE)),
        ["set", ..] => return Err(CommandError::UnknownSet),
        _ => return Err(CommandError::Unknown),
    };
    Ok(command)
}

/// Run one tokenized command. Only bosses and the supervisor are obeyed;
/// everyone else is ignored without a reply.
pub fn handle(
    agent: &mut Agent,
    ports: &Ports<'_>,
    tokens: &[String],
    from: &str,
    channel: &Channel,
    now: Instant,
) {
    if *channel != Channel::Supervisor && !agent.bosses.contains(from) {
        debug!("[CMD] ignoring {} from {}", tokens.join(" "), from);
        return;
    }
    match parse(tokens) {
        Ok(command) => {
            info!("[CMD] {} → {:?}", from, command);
            execute(agent, ports, command, channel, now);
        }
        Err(e) => {
            debug!("[CMD] rejected {:?}: {}", tokens, e);
            ports.outbox.say(channel, &e.to_string());
        }
    }
}

fn execute(agent: &mut Agent, ports: &Ports<'_>, command: Command, channel: &Channel, now: Instant) {
    let world = ports.world;
    let reply = |text: &str| ports.outbox.say(channel, text);

    match command {
        Command::Continue => {
            set_guarding(agent, true);
            agent.errand = None;
        }
        Command::Eat => match vitals::eat(world) {
            Ok(EatOutcome::Full) => reply("too full to eat"),
            Ok(EatOutcome::Ate { food, had }) => {
                reply(&format!("found {} {}", had, food));
                reply(&format!("ate 1 {}", food));
            }
            Ok(EatOutcome::OutOfFood) => reply("out of food"),
            Err(e) => reply(&format!("Error while eating: {}", e)),
        },
        Command::Guard(name) => {
            let player = world
                .entities()
                .iter()
                .find(|e| e.kind == EntityKind::Player && e.username.as_deref() == Some(name.as_str()));
            if player.is_none() {
                reply(&format!("Player \"{}\" does not exist.", name));
                return;
            }
            info!("[GUARD] 🛡️ now guarding {}", name);
            reply(&format!("Guarding {}.", name));
            agent.guarded = Some(name);
        }
        Command::Ping => reply("pong"),
        Command::Status => reply(&format!(
            "❤{} 🥕{} | {:?} | up {}",
            world.health(),
            world.food(),
            agent.mode,
            uptime(Utc::now() - agent.spawned_at)
        )),
        Command::Stop => {
            reply("Stopping.");
            agent.motor.halt(ports.navigator);
            set_guarding(agent, false);
            agent.errand = None;
        }
        Command::SetChest { pos, name } => match agent.chests.set(&name, pos) {
            Ok(()) => {
                reply(&format!("Chest '{}' set to {}", name, pos));
                reply("file saved");
            }
            Err(e) => {
                warn!("[CHESTS] {}", e);
                reply("Error saving file.");
            }
        },
        Command::Unload(name) => {
            let Some(chest) = agent.chests.get(&name) else {
                reply(&format!(
                    "Chest '{}' not found. Use '{}' to define it.",
                    name, SET_CHEST_USAGE
                ));
                return;
            };
            reply(&format!("Unloading to chest '{}'...", name));
            agent.errand = Some(Errand::unload(&name, chest, channel.clone(), agent.ticks));
        }
        Command::Equip => match combat::equip_best_weapon(world) {
            Ok(Some(weapon)) => debug!("[CMD] holding {}", weapon),
            Ok(None) => reply("No weapon to equip."),
            Err(e) => reply(&format!("Error while equipping: {}", e)),
        },
        Command::Punch(name) => {
            let Some(target) = world.find_named(&name) else {
                reply(&format!("Couldn't find {}.", name));
                return;
            };
            let tuning = agent.tuning.clone();
            if agent.engagement.strike(target, world, &tuning, now) == CombatAction::CoolingDown {
                debug!("[CMD] punch on {} skipped, weapon cooling down", name);
            }
        }
        Command::Crit(name) => {
            let Some(target) = world.find_named(&name) else {
                reply(&format!("Couldn't find {}.", name));
                return;
            };
            let action = agent
                .engagement
                .crit(target, world, &agent.tuning, now, agent.ticks);
            if action == CombatAction::CoolingDown {
                debug!("[CMD] crit on {} skipped, weapon cooling down", name);
            }
        }
        Command::Shoot(name) => {
            let Some(target) = world.find_named(&name) else {
                reply(&format!("Couldn't find {}.", name));
                return;
            };
            if !combat::can_shoot(world) {
                reply("No bow or arrows.");
                return;
            }
            agent.engagement.loose(target, ports, now);
        }
    }
}

/// While fleeing the flag is parked, so the command lands on the value
/// restored once the flight is over.
fn set_guarding(agent: &mut Agent, on: bool) {
    if agent.vitals.is_fleeing() {
        agent.guarding_before_flee = on;
    } else {
        agent.guarding = on;
    }
}

fn uptime(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{}h{:02}m{:02}s", secs / 3600, secs / 60 % 60, secs % 60)
}
