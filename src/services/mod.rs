pub mod accumulator;
pub mod bucketer;
pub mod events;
pub mod intake;
pub mod leaderboard;
pub mod peaks;
pub mod refresh;
pub mod timeline;
