pub mod arbiter;
pub mod auto_eat;
pub mod commands;
pub mod errand;
pub mod ping;
