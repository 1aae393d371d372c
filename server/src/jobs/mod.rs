//! Background and batch jobs that run outside of any single game.

mod pgn_import;
mod robot_recovery;

pub use pgn_import::PgnImportProcessor;
pub use robot_recovery::RobotRecoveryJob;
