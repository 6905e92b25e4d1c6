use crate::world::{Goal, Navigator};
use tracing::debug;

// ============================================================
// MOTOR SYSTEM — Owns the one movement goal the agent may hold
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct Motor {
    current: Option<Goal>,
    /// Total goals handed to the navigator (stats)
    pub goals_issued: u64,
}

impl Motor {
    pub fn current(&self) -> Option<&Goal> {
        self.current.as_ref()
    }

    /// Hand `goal` to the navigator unless it is already the active goal.
    /// Returns true when the navigator was actually asked.
    pub fn steer(&mut self, navigator: &dyn Navigator, goal: Goal) -> bool {
        if self.current.as_ref() == Some(&goal) {
            return false;
        }
        match navigator.set_goal(&goal) {
            Ok(()) => {
                debug!("[MOTOR] 🚶 new goal {:?}", goal);
                self.goals_issued += 1;
                self.current = Some(goal);
            }
            Err(e) => {
                // Retried on the next tick.
                debug!("[MOTOR] navigator rejected {:?}: {}", goal, e);
                self.current = None;
            }
        }
        true
    }

    /// Drop the active goal, if any.
    pub fn halt(&mut self, navigator: &dyn Navigator) {
        if self.current.take().is_none() {
            return;
        }
        if let Err(e) = navigator.clear() {
            debug!("[MOTOR] navigator failed to clear goal: {}", e);
        }
    }

    /// The navigator gave up on the active goal; the next steer reissues it.
    pub fn forget(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNavigator;
    use crate::world::Vec3;

    #[test]
    fn test_same_goal_not_reissued() {
        let nav = RecordingNavigator::default();
        let mut motor = Motor::default();
        let goal = Goal::Follow { entity: 4, range: 4.0 };

        assert!(motor.steer(&nav, goal.clone()));
        assert!(!motor.steer(&nav, goal.clone()));
        assert!(motor.steer(&nav, Goal::Follow { entity: 4, range: 8.0 }));
        assert_eq!(nav.calls().len(), 2);
    }

    #[test]
    fn test_halt_only_clears_held_goal() {
        let nav = RecordingNavigator::default();
        let mut motor = Motor::default();
        motor.halt(&nav);
        assert!(nav.calls().is_empty());

        motor.steer(&nav, Goal::Near { point: Vec3::ZERO, tolerance: 1.0 });
        motor.halt(&nav);
        assert_eq!(nav.calls().last(), Some(&None));
        assert!(motor.current().is_none());
    }

    #[test]
    fn test_rejected_goal_retried() {
        let nav = RecordingNavigator::default();
        nav.fail.set(true);
        let mut motor = Motor::default();
        let goal = Goal::Follow { entity: 1, range: 4.0 };

        motor.steer(&nav, goal.clone());
        assert!(motor.current().is_none());
        nav.fail.set(false);
        assert!(motor.steer(&nav, goal));
        assert_eq!(motor.goals_issued, 1);
    }

    #[test]
    fn test_forget_allows_reissue() {
        let nav = RecordingNavigator::default();
        let mut motor = Motor::default();
        let goal = Goal::Follow { entity: 1, range: 4.0 };
        motor.steer(&nav, goal.clone());
        motor.forget();
        assert!(motor.steer(&nav, goal));
    }
}
