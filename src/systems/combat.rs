use crate::config::Tuning;
use crate::systems::cooldown::{CooldownGate, RangedGate, WeaponClass};
use crate::systems::motor::Motor;
use crate::systems::threat::Threat;
use crate::world::{Channel, Entity, Goal, Ports, WorldSession};
use std::time::Instant;
use tracing::{debug, info};

// ============================================================
// COMBAT — Bow from afar, blade up close
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatTactic {
    Archery, // Keep distance, loose arrows
    Melee,   // Close in and swing
}

impl CombatTactic {
    pub fn select(ranged_capable: bool, distance: f64, tuning: &Tuning) -> Self {
        if ranged_capable && distance > tuning.melee_engage_radius {
            CombatTactic::Archery
        } else {
            CombatTactic::Melee
        }
    }

    /// How close to trail the target while using this tactic
    pub fn follow_range(self, tuning: &Tuning) -> f64 {
        match self {
            CombatTactic::Archery => tuning.archery_follow_range,
            CombatTactic::Melee => tuning.melee_follow_range,
        }
    }
}

/// Melee weapons in order of preference.
pub const WEAPON_RACK: [&str; 10] = [
    "netherite_sword",
    "netherite_axe",
    "diamond_sword",
    "diamond_axe",
    "iron_sword",
    "iron_axe",
    "wooden_sword",
    "wooden_axe",
    "golden_sword",
    "golden_axe",
];

pub fn can_shoot(world: &dyn WorldSession) -> bool {
    world.count("bow") > 0 && world.count("arrow") > 0
}

pub fn best_weapon(world: &dyn WorldSession) -> Option<&'static str> {
    WEAPON_RACK.iter().copied().find(|w| world.count(w) > 0)
}

/// Put the best weapon in hand unless it is already there.
pub fn equip_best_weapon(world: &dyn WorldSession) -> anyhow::Result<Option<&'static str>> {
    let Some(weapon) = best_weapon(world) else {
        return Ok(None);
    };
    if world.held_item() != Some(weapon) {
        world.equip(weapon)?;
    }
    Ok(Some(weapon))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatAction {
    Loosed,
    BowBusy,
    Struck,
    Leaping,
    CoolingDown,
    Approaching,
    Skipped,
}

/// A critical hit waiting for its jump to peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCrit {
    target: u32,
    swing_at: u64,
}

/// Per-agent fighting state: who we are on, how, and the offensive gates.
#[derive(Debug, Clone)]
pub struct Engagement {
    target: Option<u32>,
    tactic: Option<CombatTactic>,
    crit: Option<PendingCrit>,
    pub strike: CooldownGate,
    pub ranged: RangedGate,
}

impl Engagement {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            target: None,
            tactic: None,
            crit: None,
            strike: CooldownGate::default(),
            ranged: RangedGate::new(tuning.shot_recovery),
        }
    }

    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn tactic(&self) -> Option<CombatTactic> {
        self.tactic
    }

    /// One combat tick against `threat`.
    pub fn step(
        &mut self,
        threat: Threat<'_>,
        motor: &mut Motor,
        ports: &Ports<'_>,
        tuning: &Tuning,
        now: Instant,
    ) -> CombatAction {
        let world = ports.world;
        let target = threat.entity;
        let tactic = CombatTactic::select(can_shoot(world), threat.distance, tuning);

        if tactic == CombatTactic::Melee && self.ranged.is_shooting() {
            debug!("[COMBAT] switching to melee, dropping the drawn bow");
            self.ranged.reset();
            ports.marksman.stand_down();
        }
        if self.target != Some(target.id) || self.tactic != Some(tactic) {
            info!(
                "[COMBAT] ⚔️ engaging {} with {:?} at {:.1}m",
                target.label(),
                tactic,
                threat.distance
            );
        }
        self.target = Some(target.id);
        self.tactic = Some(tactic);

        motor.steer(
            ports.navigator,
            Goal::Follow {
                entity: target.id,
                range: tactic.follow_range(tuning),
            },
        );

        match tactic {
            CombatTactic::Archery => self.loose(target, ports, now),
            CombatTactic::Melee => {
                if let Err(e) = equip_best_weapon(world) {
                    debug!("[COMBAT] could not equip weapon: {}", e);
                }
                if threat.distance < tuning.melee_strike_radius {
                    self.strike(target, world, tuning, now)
                } else {
                    CombatAction::Approaching
                }
            }
        }
    }

    /// Hit `target` if the held weapon has recovered since the last swing.
    pub fn strike(
        &mut self,
        target: &Entity,
        world: &dyn WorldSession,
        tuning: &Tuning,
        now: Instant,
    ) -> CombatAction {
        if !target.is_usable() {
            return CombatAction::Skipped;
        }
        let interval = WeaponClass::of(world.held_item()).interval(tuning);
        if !self.strike.try_fire(now, interval) {
            return CombatAction::CoolingDown;
        }
        if let Err(e) = world.attack(target) {
            debug!("[COMBAT] attack on {} failed: {}", target.label(), e);
        }
        CombatAction::Struck
    }

    /// Jump now and swing at `target` once the jump has peaked. Shares the
    /// melee cooldown with `strike`.
    pub fn crit(
        &mut self,
        target: &Entity,
        world: &dyn WorldSession,
        tuning: &Tuning,
        now: Instant,
        tick: u64,
    ) -> CombatAction {
        if !target.is_usable() {
            return CombatAction::Skipped;
        }
        let interval = WeaponClass::of(world.held_item()).interval(tuning);
        if self.crit.is_some() || !self.strike.ready(now, interval) {
            return CombatAction::CoolingDown;
        }
        if let Err(e) = world.set_jump(true) {
            debug!("[COMBAT] could not jump: {}", e);
            return CombatAction::Skipped;
        }
        self.crit = Some(PendingCrit {
            target: target.id,
            swing_at: tick + tuning.crit_jump_ticks,
        });
        CombatAction::Leaping
    }

    /// Swing a pending critical hit once its jump is over, then let go of
    /// jump. `None` while nothing is due.
    pub fn land_crit(
        &mut self,
        world: &dyn WorldSession,
        tuning: &Tuning,
        now: Instant,
        tick: u64,
    ) -> Option<CombatAction> {
        let pending = self.crit.filter(|c| tick >= c.swing_at)?;
        self.crit = None;
        let action = match world.entity(pending.target) {
            Some(target) => self.strike(target, world, tuning, now),
            None => CombatAction::Skipped,
        };
        if let Err(e) = world.set_jump(false) {
            debug!("[COMBAT] could not release jump: {}", e);
        }
        if action == CombatAction::Struck {
            info!("[COMBAT] 💥 critical hit on {}", pending.target);
        }
        Some(action)
    }

    pub fn drop_crit(&mut self) {
        self.crit = None;
    }

    /// Start one ranged attempt in the background. The shot guard travels
    /// with the task, so the bow is released however the attempt ends.
    pub fn loose(&mut self, target: &Entity, ports: &Ports<'_>, now: Instant) -> CombatAction {
        if !target.is_usable() {
            return CombatAction::Skipped;
        }
        let Some(guard) = self.ranged.try_begin(now) else {
            return CombatAction::BowBusy;
        };
        ports
            .outbox
            .say(&Channel::Supervisor, &format!("Shooting at {}!", target.label()));
        let shot = ports.marksman.shoot(target);
        let label = target.label().to_string();
        tokio::spawn(async move {
            match shot.await {
                Ok(()) => guard.finish(Instant::now()),
                Err(e) => debug!("[COMBAT] 🏹 shot at {} failed: {}", label, e),
            }
        });
        CombatAction::Loosed
    }

    /// Forget the current target; the arbiter clears movement alongside.
    pub fn disengage(&mut self) {
        if let Some(id) = self.target.take() {
            debug!("[COMBAT] disengaged from {}", id);
        }
        self.tactic = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Action, Rig, mob};
    use crate::world::{EntityKind, Vec3};
    use std::time::Duration;

    fn zombie_at(x: f64) -> Entity {
        mob(9, EntityKind::Hostile, Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_tactic_selection() {
        let tuning = Tuning::default();
        assert_eq!(CombatTactic::select(true, 10.0, &tuning), CombatTactic::Archery);
        assert_eq!(CombatTactic::select(true, 4.0, &tuning), CombatTactic::Melee);
        assert_eq!(CombatTactic::select(true, 6.0, &tuning), CombatTactic::Melee);
        assert_eq!(CombatTactic::select(false, 10.0, &tuning), CombatTactic::Melee);
    }

    #[test]
    fn test_weapon_rack_preference() {
        let mut rig = Rig::new(Vec3::ZERO);
        rig.world.inventory.insert("iron_axe".into(), 1);
        rig.world.inventory.insert("diamond_sword".into(), 1);
        assert_eq!(best_weapon(&rig.world), Some("diamond_sword"));

        rig.world.held = Some("diamond_sword".into());
        assert_eq!(equip_best_weapon(&rig.world).unwrap(), Some("diamond_sword"));
        assert!(rig.world.actions().is_empty());
    }

    #[test]
    fn test_melee_strike_respects_sword_cooldown() {
        let tuning = Tuning::default();
        let mut rig = Rig::new(Vec3::ZERO);
        rig.world.held = Some("iron_sword".into());
        rig.world.inventory.insert("iron_sword".into(), 1);
        let target = zombie_at(3.0);
        let mut engagement = Engagement::new(&tuning);
        let mut motor = Motor::default();
        let t0 = Instant::now();

        let threat = Threat { entity: &target, distance: 3.0 };
        let first = engagement.step(threat, &mut motor, &rig.ports(), &tuning, t0);
        let second = engagement.step(
            threat,
            &mut motor,
            &rig.ports(),
            &tuning,
            t0 + Duration::from_millis(200),
        );

        assert_eq!(first, CombatAction::Struck);
        assert_eq!(second, CombatAction::CoolingDown);
        assert_eq!(
            rig.world.actions().iter().filter(|a| matches!(a, Action::Attack(9))).count(),
            1
        );
        // Same target and tactic: one follow goal.
        assert_eq!(rig.navigator.calls().len(), 1);
    }

    #[test]
    fn test_melee_out_of_reach_approaches() {
        let tuning = Tuning::default();
        let rig = Rig::new(Vec3::ZERO);
        let target = zombie_at(5.5);
        let mut engagement = Engagement::new(&tuning);
        let mut motor = Motor::default();

        let action = engagement.step(
            Threat { entity: &target, distance: 5.5 },
            &mut motor,
            &rig.ports(),
            &tuning,
            Instant::now(),
        );
        assert_eq!(action, CombatAction::Approaching);
        assert_eq!(
            motor.current(),
            Some(&Goal::Follow { entity: 9, range: 4.0 })
        );
    }

    #[tokio::test]
    async fn test_archery_is_single_flight() {
        let tuning = Tuning::default();
        let mut rig = Rig::new(Vec3::ZERO);
        rig.world.inventory.insert("bow".into(), 1);
        rig.world.inventory.insert("arrow".into(), 16);
        rig.marksman.hold();
        let target = zombie_at(12.0);
        let mut engagement = Engagement::new(&tuning);
        let mut motor = Motor::default();
        let now = Instant::now();
        let threat = Threat { entity: &target, distance: 12.0 };

        let first = engagement.step(threat, &mut motor, &rig.ports(), &tuning, now);
        let second = engagement.step(threat, &mut motor, &rig.ports(), &tuning, now);

        assert_eq!(first, CombatAction::Loosed);
        assert_eq!(second, CombatAction::BowBusy);
        assert_eq!(rig.marksman.shots(), vec![9]);
        assert_eq!(
            motor.current(),
            Some(&Goal::Follow { entity: 9, range: 8.0 })
        );
        assert_eq!(
            rig.outbox.said(),
            vec![(Channel::Supervisor, "Shooting at zombie!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_completed_shot_releases_bow() {
        let tuning = Tuning::default();
        let mut rig = Rig::new(Vec3::ZERO);
        rig.world.inventory.insert("bow".into(), 1);
        rig.world.inventory.insert("arrow".into(), 16);
        let target = zombie_at(12.0);
        let mut engagement = Engagement::new(&tuning);
        let now = Instant::now();

        assert_eq!(engagement.loose(&target, &rig.ports(), now), CombatAction::Loosed);
        for _ in 0..100 {
            if !engagement.ranged.is_shooting() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!engagement.ranged.is_shooting());
    }

    #[tokio::test]
    async fn test_failed_shot_releases_bow() {
        let tuning = Tuning::default();
        let rig = Rig::new(Vec3::ZERO);
        rig.marksman.fail();
        let target = zombie_at(12.0);
        let mut engagement = Engagement::new(&tuning);
        let now = Instant::now();

        assert_eq!(engagement.loose(&target, &rig.ports(), now), CombatAction::Loosed);
        for _ in 0..100 {
            if !engagement.ranged.is_shooting() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!engagement.ranged.is_shooting());
        // No recovery after a miss: the bow is free straight away.
        assert_eq!(engagement.loose(&target, &rig.ports(), now), CombatAction::Loosed);
        assert_eq!(rig.marksman.shots(), vec![9, 9]);
    }

    #[test]
    fn test_crit_jumps_then_swings() {
        let tuning = Tuning::default();
        let mut rig = Rig::new(Vec3::ZERO);
        rig.world.held = Some("iron_sword".into());
        let target = zombie_at(3.0);
        rig.world.entities.push(target.clone());
        let mut engagement = Engagement::new(&tuning);
        let now = Instant::now();

        assert_eq!(
            engagement.crit(&target, &rig.world, &tuning, now, 0),
            CombatAction::Leaping
        );
        assert_eq!(
            engagement.crit(&target, &rig.world, &tuning, now, 1),
            CombatAction::CoolingDown
        );
        assert_eq!(engagement.land_crit(&rig.world, &tuning, now, 9), None);
        assert_eq!(rig.world.actions(), vec![Action::Jump(true)]);

        assert_eq!(
            engagement.land_crit(&rig.world, &tuning, now, 10),
            Some(CombatAction::Struck)
        );
        assert_eq!(
            rig.world.actions(),
            vec![Action::Jump(true), Action::Attack(9), Action::Jump(false)]
        );
        assert_eq!(engagement.land_crit(&rig.world, &tuning, now, 11), None);

        // The swing started the sword cooldown.
        assert_eq!(
            engagement.crit(&target, &rig.world, &tuning, now + Duration::from_millis(200), 12),
            CombatAction::CoolingDown
        );
    }

    #[test]
    fn test_crit_on_vanished_target_still_lands() {
        let tuning = Tuning::default();
        let rig = Rig::new(Vec3::ZERO);
        let target = zombie_at(3.0);
        let mut engagement = Engagement::new(&tuning);
        let now = Instant::now();

        engagement.crit(&target, &rig.world, &tuning, now, 0);
        assert_eq!(
            engagement.land_crit(&rig.world, &tuning, now, 10),
            Some(CombatAction::Skipped)
        );
        assert_eq!(
            rig.world.actions(),
            vec![Action::Jump(true), Action::Jump(false)]
        );
    }

    #[tokio::test]
    async fn test_switch_to_melee_resets_drawn_bow() {
        let tuning = Tuning::default();
        let mut rig = Rig::new(Vec3::ZERO);
        rig.world.inventory.insert("bow".into(), 1);
        rig.world.inventory.insert("arrow".into(), 16);
        rig.marksman.hold();
        let far = zombie_at(12.0);
        let near = zombie_at(3.0);
        let mut engagement = Engagement::new(&tuning);
        let mut motor = Motor::default();
        let now = Instant::now();

        engagement.step(Threat { entity: &far, distance: 12.0 }, &mut motor, &rig.ports(), &tuning, now);
        assert!(engagement.ranged.is_shooting());

        let action = engagement.step(Threat { entity: &near, distance: 3.0 }, &mut motor, &rig.ports(), &tuning, now);
        assert!(!engagement.ranged.is_shooting());
        assert_eq!(rig.marksman.stand_downs(), 1);
        assert_eq!(action, CombatAction::Struck);
        assert_eq!(engagement.tactic(), Some(CombatTactic::Melee));
        assert_eq!(
            motor.current(),
            Some(&Goal::Follow { entity: 9, range: 4.0 })
        );
    }
}
