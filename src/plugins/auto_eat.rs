use crate::bot::Agent;
use crate::config::Tuning;
use crate::systems::vitals::{EatOutcome, VitalMonitor};
use crate::world::{Channel, Ports};
use std::time::Instant;
use tracing::debug;

/// Hunger check, every tick regardless of mode.
pub fn handle(agent: &mut Agent, ports: &Ports<'_>, now: Instant, tuning: &Tuning) {
    let food = ports.world.food();
    if let Some(level) = agent.vitals.hunger_alarm(food, tuning) {
        ports
            .outbox
            .say(&Channel::Supervisor, &format!("hunger has reached {}!", level));
    }
    if food <= tuning.hunger_limit {
        snack(&mut agent.vitals, ports, now, tuning);
    }
}

/// Eat something if the eat interval allows it.
pub fn snack(vitals: &mut VitalMonitor, ports: &Ports<'_>, now: Instant, tuning: &Tuning) {
    match vitals.eat_gated(ports.world, now, tuning) {
        Some(Ok(EatOutcome::OutOfFood)) => {
            if vitals.report_starving() {
                ports.outbox.say(&Channel::Supervisor, "out of food");
            }
        }
        Some(Err(e)) => debug!("[VITALS] could not eat: {}", e),
        Some(Ok(_)) | None => {}
    }
}
