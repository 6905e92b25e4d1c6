pub mod combat;
pub mod cooldown;
pub mod flee;
pub mod motor;
pub mod targets;
pub mod threat;
pub mod vitals;
