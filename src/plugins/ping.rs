use crate::plugins::arbiter::Mode;
use crate::world::Outbox;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Heartbeat {
    pub last_beat: Instant,
    pub pings_answered: u64,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            last_beat: Instant::now(),
            pings_answered: 0,
        }
    }
}

/// Liveness line in the log every ten seconds of ticking.
pub fn tick(heartbeat: &mut Heartbeat, mode: Mode, now: Instant) -> bool {
    if now.saturating_duration_since(heartbeat.last_beat) < Duration::from_secs(10) {
        return false;
    }
    info!("[HEARTBEAT] Bot is alive. Mode: {:?}", mode);
    heartbeat.last_beat = now;
    true
}

/// The supervisor checks on us; answer so it does not restart the process.
pub fn answer(heartbeat: &mut Heartbeat, outbox: &dyn Outbox) {
    heartbeat.pings_answered += 1;
    outbox.pong();
}
