use crate::config::Tuning;
use crate::systems::cooldown::CooldownGate;
use crate::world::WorldSession;
use std::time::Instant;
use tracing::info;

// ============================================================
// VITAL MONITOR — Stay alive first, be a hero second
// ============================================================

pub const MAX_FOOD: u32 = 20;

/// Food in order of preference. The first one present gets eaten.
pub const FOODS: [&str; 16] = [
    "golden_carrot",
    "cooked_beef",
    "cooked_porkchop",
    "cooked_mutton",
    "cooked_salmon",
    "cooked_chicken",
    "rabbit_stew",
    "mushroom_stew",
    "baked_potato",
    "bread",
    "cooked_cod",
    "cooked_rabbit",
    "pumpkin_pie",
    "apple",
    "carrot",
    "melon_slice",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalShift {
    Steady,
    EnteredFlee,
    ExitedFlee,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EatOutcome {
    Full,
    Ate { food: &'static str, had: u32 },
    OutOfFood,
}

#[derive(Debug, Clone, Default)]
pub struct VitalMonitor {
    fleeing: bool,
    last_alarm: Option<u32>,
    starving_reported: bool,
    eat_gate: CooldownGate,
}

impl VitalMonitor {
    pub fn is_fleeing(&self) -> bool {
        self.fleeing
    }

    /// Flee hysteresis: enter at or below the enter threshold, leave only
    /// once health is strictly above the exit threshold.
    pub fn update(&mut self, health: f32, tuning: &Tuning) -> VitalShift {
        if !self.fleeing && health <= tuning.flee_enter_health {
            self.fleeing = true;
            return VitalShift::EnteredFlee;
        }
        if self.fleeing && health > tuning.flee_exit_health {
            self.fleeing = false;
            return VitalShift::ExitedFlee;
        }
        VitalShift::Steady
    }

    /// Returns the food level the first time it is seen at or below the
    /// hunger limit; rearms once food climbs back above it.
    pub fn hunger_alarm(&mut self, food: u32, tuning: &Tuning) -> Option<u32> {
        if food > tuning.hunger_limit {
            self.last_alarm = None;
            self.starving_reported = false;
            return None;
        }
        if self.last_alarm == Some(food) {
            return None;
        }
        self.last_alarm = Some(food);
        Some(food)
    }

    /// True once per hunger episode, for the "out of food" notice.
    pub fn report_starving(&mut self) -> bool {
        !std::mem::replace(&mut self.starving_reported, true)
    }

    /// Eat unless an eat was already requested within the eat interval.
    pub fn eat_gated(
        &mut self,
        world: &dyn WorldSession,
        now: Instant,
        tuning: &Tuning,
    ) -> Option<anyhow::Result<EatOutcome>> {
        if world.food() >= MAX_FOOD || !self.eat_gate.try_fire(now, tuning.eat_interval) {
            return None;
        }
        Some(eat(world))
    }
}

/// Equip and consume the first food in preference order that is in the
/// inventory.
pub fn eat(world: &dyn WorldSession) -> anyhow::Result<EatOutcome> {
    if world.food() >= MAX_FOOD {
        return Ok(EatOutcome::Full);
    }
    let Some((food, had)) = FOODS
        .iter()
        .map(|&f| (f, world.count(f)))
        .find(|&(_, n)| n > 0)
    else {
        return Ok(EatOutcome::OutOfFood);
    };
    world.equip(food)?;
    world.consume()?;
    info!("[VITALS] 🍖 eating {} ({} left)", food, had - 1);
    Ok(EatOutcome::Ate { food, had })
}
