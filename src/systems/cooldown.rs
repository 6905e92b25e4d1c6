use crate::config::Tuning;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// ============================================================
// COOLDOWN GATE — No spam clicking, one arrow at a time
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponClass {
    Unarmed,
    Sword,
    Axe,
}

impl WeaponClass {
    /// Classify whatever is in the main hand. Anything that is neither a
    /// sword nor an axe (pickaxes count as axes) swings like a fist.
    pub fn of(held: Option<&str>) -> Self {
        match held {
            Some(name) if name.contains("sword") => WeaponClass::Sword,
            Some(name) if name.contains("axe") => WeaponClass::Axe,
            _ => WeaponClass::Unarmed,
        }
    }

    pub fn interval(self, tuning: &Tuning) -> Duration {
        match self {
            WeaponClass::Unarmed => Duration::ZERO,
            WeaponClass::Sword => tuning.sword_cooldown,
            WeaponClass::Axe => tuning.axe_cooldown,
        }
    }
}

/// Minimum re-invocation interval for one action class.
#[derive(Debug, Clone, Default)]
pub struct CooldownGate {
    last: Option<Instant>,
}

impl CooldownGate {
    pub fn ready(&self, now: Instant, interval: Duration) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        }
    }

    /// Records the invocation and returns true when the interval has elapsed;
    /// otherwise leaves the gate untouched.
    pub fn try_fire(&mut self, now: Instant, interval: Duration) -> bool {
        if !self.ready(now, interval) {
            return false;
        }
        self.last = Some(now);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangedPhase {
    #[default]
    Idle,
    Drawing,
    Cooldown {
        until: Instant,
    },
}

#[derive(Debug, Default)]
struct RangedInner {
    phase: RangedPhase,
    // Bumped by every reset so a stale guard cannot clobber a newer shot.
    generation: u64,
}

/// Single-flight lifecycle of the ranged attack: Idle → Drawing → Cooldown → Idle.
#[derive(Debug, Clone)]
pub struct RangedGate {
    inner: Arc<Mutex<RangedInner>>,
    recovery: Duration,
}

impl RangedGate {
    pub fn new(recovery: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RangedInner::default())),
            recovery,
        }
    }

    pub fn phase(&self, now: Instant) -> RangedPhase {
        let mut inner = lock(&self.inner);
        settle(&mut inner, now);
        inner.phase
    }

    pub fn is_shooting(&self) -> bool {
        lock(&self.inner).phase == RangedPhase::Drawing
    }

    /// Claims the ranged action. `None` while a shot is drawing or the bow
    /// is still recovering.
    pub fn try_begin(&self, now: Instant) -> Option<ShotGuard> {
        let mut inner = lock(&self.inner);
        settle(&mut inner, now);
        if inner.phase != RangedPhase::Idle {
            return None;
        }
        inner.phase = RangedPhase::Drawing;
        Some(ShotGuard {
            inner: Arc::clone(&self.inner),
            generation: inner.generation,
            recovery: self.recovery,
            settled: false,
        })
    }

    /// Forces Idle, abandoning whatever shot is in flight.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.phase = RangedPhase::Idle;
        inner.generation += 1;
    }
}

fn lock(inner: &Mutex<RangedInner>) -> MutexGuard<'_, RangedInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn settle(inner: &mut RangedInner, now: Instant) {
    if let RangedPhase::Cooldown { until } = inner.phase {
        if now >= until {
            inner.phase = RangedPhase::Idle;
        }
    }
}

/// Held for the duration of one ranged attempt. Dropping it without
/// `finish` (error, panic, task abort) returns the gate to Idle.
#[derive(Debug)]
pub struct ShotGuard {
    inner: Arc<Mutex<RangedInner>>,
    generation: u64,
    recovery: Duration,
    settled: bool,
}

impl ShotGuard {
    /// Shot loosed; the bow recovers before the next attempt.
    pub fn finish(mut self, now: Instant) {
        let mut inner = lock(&self.inner);
        if inner.generation == self.generation && inner.phase == RangedPhase::Drawing {
            inner.phase = if self.recovery.is_zero() {
                RangedPhase::Idle
            } else {
                RangedPhase::Cooldown {
                    until: now + self.recovery,
                }
            };
        }
        drop(inner);
        self.settled = true;
    }
}

impl Drop for ShotGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = lock(&self.inner);
        if inner.generation == self.generation && inner.phase == RangedPhase::Drawing {
            inner.phase = RangedPhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sword_strikes_200ms_apart_fire_once() {
        let tuning = Tuning::default();
        let interval = WeaponClass::of(Some("iron_sword")).interval(&tuning);
        let mut gate = CooldownGate::default();
        let t0 = Instant::now();

        let fired = [t0, t0 + Duration::from_millis(200)]
            .into_iter()
            .filter(|&t| gate.try_fire(t, interval))
            .count();
        assert_eq!(fired, 1);
        assert!(gate.try_fire(t0 + Duration::from_millis(650), interval));
    }

    #[test]
    fn test_unarmed_never_waits() {
        let mut gate = CooldownGate::default();
        let t0 = Instant::now();
        let interval = WeaponClass::of(None).interval(&Tuning::default());
        assert!(gate.try_fire(t0, interval));
        assert!(gate.try_fire(t0, interval));
    }

    #[test]
    fn test_weapon_classes() {
        assert_eq!(WeaponClass::of(Some("diamond_sword")), WeaponClass::Sword);
        assert_eq!(WeaponClass::of(Some("netherite_axe")), WeaponClass::Axe);
        assert_eq!(WeaponClass::of(Some("bread")), WeaponClass::Unarmed);
        assert_eq!(WeaponClass::of(None), WeaponClass::Unarmed);
    }

    #[test]
    fn test_single_flight() {
        let gate = RangedGate::new(Duration::from_millis(2500));
        let now = Instant::now();
        let guard = gate.try_begin(now).expect("idle gate");
        assert!(gate.is_shooting());
        assert!(gate.try_begin(now).is_none());
        drop(guard);
    }

    #[test]
    fn test_finish_releases_into_cooldown() {
        let gate = RangedGate::new(Duration::from_millis(2500));
        let now = Instant::now();
        gate.try_begin(now).unwrap().finish(now);

        assert!(!gate.is_shooting());
        assert!(gate.try_begin(now + Duration::from_millis(100)).is_none());
        assert_eq!(
            gate.phase(now + Duration::from_millis(2500)),
            RangedPhase::Idle
        );
        assert!(gate.try_begin(now + Duration::from_millis(2500)).is_some());
    }

    #[test]
    fn test_abort_releases_lock() {
        let gate = RangedGate::new(Duration::from_millis(2500));
        let now = Instant::now();
        let guard = gate.try_begin(now).unwrap();
        drop(guard);
        assert!(!gate.is_shooting());
        assert_eq!(gate.phase(now), RangedPhase::Idle);
    }

    #[test]
    fn test_panic_inside_shot_releases_lock() {
        let gate = RangedGate::new(Duration::ZERO);
        let clone = gate.clone();
        let result = std::thread::spawn(move || {
            let _guard = clone.try_begin(Instant::now()).unwrap();
            panic!("bow snapped");
        })
        .join();
        assert!(result.is_err());
        assert!(!gate.is_shooting());
    }

    #[test]
    fn test_stale_guard_cannot_clobber_new_shot() {
        let gate = RangedGate::new(Duration::from_millis(2500));
        let now = Instant::now();
        let stale = gate.try_begin(now).unwrap();
        gate.reset();
        let fresh = gate.try_begin(now).unwrap();

        drop(stale);
        assert!(gate.is_shooting());
        drop(fresh);
        assert!(!gate.is_shooting());
    }
}
