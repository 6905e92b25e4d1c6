use crate::bot::Agent;
use crate::config::Tuning;
use crate::world::{BlockPos, Channel, Goal, Ports};
use tracing::{info, warn};

/// A trip to a named chest to empty the inventory into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Errand {
    pub chest_name: String,
    pub chest: BlockPos,
    pub reply_to: Channel,
    pub started_tick: u64,
}

impl Errand {
    pub fn unload(chest_name: &str, chest: BlockPos, reply_to: Channel, tick: u64) -> Self {
        Self {
            chest_name: chest_name.to_string(),
            chest,
            reply_to,
            started_tick: tick,
        }
    }
}

/// Advance the errand by one tick. Returns false when there is none.
pub fn step(agent: &mut Agent, ports: &Ports<'_>, tuning: &Tuning) -> bool {
    let Some(errand) = agent.errand.as_ref() else {
        return false;
    };
    let world = ports.world;
    let target = errand.chest.center();
    let arrived = world
        .position()
        .is_some_and(|p| p.distance_to(target) <= tuning.chest_reach);

    if arrived {
        let Some(errand) = agent.errand.take() else {
            return false;
        };
        agent.motor.halt(ports.navigator);
        let reply = if world.inventory_is_empty() {
            "Inventory is empty.".to_string()
        } else {
            match world.deposit_all(errand.chest) {
                Ok(()) => {
                    info!("[ERRAND] 📦 unloaded into {} at {}", errand.chest_name, errand.chest);
                    format!("Unloaded all items into chest '{}'.", errand.chest_name)
                }
                Err(e) => {
                    warn!("[ERRAND] unloading into {} failed: {}", errand.chest_name, e);
                    format!("Error while unloading: {}", e)
                }
            }
        };
        ports.outbox.say(&errand.reply_to, &reply);
        return true;
    }

    if agent.ticks.saturating_sub(errand.started_tick) > tuning.errand_timeout_ticks {
        let Some(errand) = agent.errand.take() else {
            return false;
        };
        agent.motor.halt(ports.navigator);
        warn!("[ERRAND] gave up walking to {}", errand.chest_name);
        ports.outbox.say(
            &errand.reply_to,
            &format!("Could not reach chest '{}'.", errand.chest_name),
        );
        return true;
    }

    agent.motor.steer(
        ports.navigator,
        Goal::Near {
            point: target,
            tolerance: 1.0,
        },
    );
    true
}
