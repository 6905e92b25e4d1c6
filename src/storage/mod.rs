pub mod locations;
pub mod rosters;
