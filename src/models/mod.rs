pub mod event;
pub mod leaderboard;
pub mod samples;
pub mod score;
pub mod timeline;
