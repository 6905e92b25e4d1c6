use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub struct Config {
    pub bridge_host: String,
    pub bridge_port: u16,
    pub bot_name: String,
    pub boss_list: String,
    pub target_list: String,
    pub chests_file: String,
    pub shot_timeout: Duration,
    pub tuning: Tuning,
}

impl Config {
    pub fn load() -> Self {
        Self {
            bridge_host: env::var("WARDEN_BRIDGE").unwrap_or_else(|_| "127.0.0.1".to_string()),
            bridge_port: env_or("WARDEN_PORT", 25580),
            bot_name: env::var("BOT_NAME").unwrap_or_else(|_| "guard_0".to_string()),
            boss_list: env::var("BOSS_LIST").unwrap_or_else(|_| "boss-list.txt".to_string()),
            target_list: env::var("TARGET_LIST").unwrap_or_else(|_| "target-list.txt".to_string()),
            chests_file: env::var("CHESTS_FILE").unwrap_or_else(|_| "chests.json".to_string()),
            shot_timeout: env_millis("WARDEN_SHOT_TIMEOUT_MS", Duration::from_secs(5)),
            tuning: Tuning::from_env(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(env::var(key).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Durations are configured in whole milliseconds.
fn env_millis(key: &str, default: Duration) -> Duration {
    millis_or(env::var(key).ok().as_deref(), default)
}

fn millis_or(raw: Option<&str>, default: Duration) -> Duration {
    Duration::from_millis(parse_or(raw, default.as_millis() as u64))
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("flee exit threshold ({exit}) must be above the enter threshold ({enter})")]
    Hysteresis { enter: f32, exit: f32 },
    #[error("flee cadence must be at least one tick")]
    Cadence,
}

/// Every radius, threshold and interval the decision engine uses.
/// Distances are in blocks; one tick is 50 ms.
#[derive(Debug, Clone)]
pub struct Tuning {
    pub hunger_limit: u32,
    pub flee_enter_health: f32,
    pub flee_exit_health: f32,
    pub near_radius: f64,
    pub guard_radius: f64,
    pub attribution_radius: f64,
    pub melee_engage_radius: f64,
    pub melee_strike_radius: f64,
    pub archery_follow_range: f64,
    pub melee_follow_range: f64,
    pub guard_follow_range: f64,
    pub panic_radius: f64,
    pub danger_radius: f64,
    pub flee_distance: f64,
    pub flee_every_ticks: u64,
    pub sword_cooldown: Duration,
    pub axe_cooldown: Duration,
    pub shot_recovery: Duration,
    /// How long a critical hit holds jump before swinging.
    pub crit_jump_ticks: u64,
    pub eat_interval: Duration,
    pub chest_reach: f64,
    pub errand_timeout_ticks: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            hunger_limit: 5,
            flee_enter_health: 6.0,
            flee_exit_health: 15.0,
            near_radius: 8.0,
            guard_radius: 16.0,
            attribution_radius: 5.0,
            melee_engage_radius: 6.0,
            melee_strike_radius: 5.0,
            archery_follow_range: 8.0,
            melee_follow_range: 4.0,
            guard_follow_range: 4.0,
            panic_radius: 10.0,
            danger_radius: 5.0,
            flee_distance: 24.0,
            flee_every_ticks: 5,
            sword_cooldown: Duration::from_millis(650), // 13 ticks
            axe_cooldown: Duration::from_millis(1000),  // 20 ticks
            shot_recovery: Duration::from_millis(2500), // 50 ticks of bow draw
            crit_jump_ticks: 10,
            eat_interval: Duration::from_millis(2000),
            chest_reach: 2.0,
            errand_timeout_ticks: 600,
        }
    }
}

impl Tuning {
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            hunger_limit: env_or("WARDEN_HUNGER_LIMIT", base.hunger_limit),
            flee_enter_health: env_or("WARDEN_FLEE_ENTER", base.flee_enter_health),
            flee_exit_health: env_or("WARDEN_FLEE_EXIT", base.flee_exit_health),
            sword_cooldown: env_millis("WARDEN_SWORD_COOLDOWN_MS", base.sword_cooldown),
            axe_cooldown: env_millis("WARDEN_AXE_COOLDOWN_MS", base.axe_cooldown),
            shot_recovery: env_millis("WARDEN_SHOT_RECOVERY_MS", base.shot_recovery),
            ..base
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flee_exit_health <= self.flee_enter_health {
            return Err(ConfigError::Hysteresis {
                enter: self.flee_enter_health,
                exit: self.flee_exit_health,
            });
        }
        if self.flee_every_ticks == 0 {
            return Err(ConfigError::Cadence);
        }
        Ok(())
    }
}
