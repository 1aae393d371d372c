//! Chess club server: players, games played move by move, PGN archive
//! import and the background jobs around them.

pub mod config;
pub mod game;
pub mod import;
pub mod jobs;
pub mod monitoring;
pub mod notify;
pub mod persistence;
pub mod player;
pub mod session;
