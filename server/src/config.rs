//! Configuration for the chess club server
//!
//! Every setting is read from the environment with a built-in fallback:
//! - `CHESSCLUB_DATA_DIR`: data directory (else the platform data dir, else `./data`)
//! - `CHESSCLUB_DATABASE`: SQLite file (else `<data dir>/chessclub.db`)
//! - `CHESSCLUB_LOG_DIR`: enables daily log files in that directory
//! - `CHESSCLUB_ROBOT_RECOVERY_SECS`: robot recovery sweep interval
//! - `CHESSCLUB_ROBOT_RECOVERY_DELAY_SECS`: delay before the first sweep

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

const DEV_DATA_DIR: &str = "./data";
const DATABASE_FILE: &str = "chessclub.db";
const DEFAULT_ROBOT_RECOVERY_SECS: u64 = 3600;
const DEFAULT_ROBOT_RECOVERY_DELAY_SECS: u64 = 10;

/// Get the data directory for persistence.
///
/// Priority:
/// 1. CHESSCLUB_DATA_DIR env variable if set
/// 2. the platform data directory for the application
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHESSCLUB_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = ProjectDirs::from("org", "chessclub", "chessclub") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Path of the SQLite database file.
pub fn get_database_path() -> PathBuf {
    match std::env::var("CHESSCLUB_DATABASE") {
        Ok(path) => PathBuf::from(path),
        Err(_) => get_data_dir().join(DATABASE_FILE),
    }
}

/// Directory for rolling log files, if file logging is enabled.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("CHESSCLUB_LOG_DIR").ok().map(PathBuf::from)
}

fn duration_from_env(var: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(var)
        .ok()
        .and_then(|v| parse_secs(&v))
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

fn parse_secs(value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            tracing::warn!(value, "Ignoring invalid duration setting");
            None
        }
        Ok(secs) => Some(secs),
    }
}

/// All runtime settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub robot_recovery_interval: Duration,
    pub robot_recovery_delay: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            database_path: get_database_path(),
            log_dir: get_log_dir(),
            robot_recovery_interval: duration_from_env(
                "CHESSCLUB_ROBOT_RECOVERY_SECS",
                DEFAULT_ROBOT_RECOVERY_SECS,
            ),
            robot_recovery_delay: duration_from_env(
                "CHESSCLUB_ROBOT_RECOVERY_DELAY_SECS",
                DEFAULT_ROBOT_RECOVERY_DELAY_SECS,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir_fallback() {
        // Returns the env override when set, which is also correct.
        let dir = get_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("90"), Some(90));
        assert_eq!(parse_secs(" 15 "), Some(15));
        assert_eq!(parse_secs("0"), None);
        assert_eq!(parse_secs("soon"), None);
    }

    #[test]
    fn test_from_env_has_positive_intervals() {
        let config = ServerConfig::from_env();
        assert!(config.robot_recovery_interval > Duration::ZERO);
        assert!(config.robot_recovery_delay > Duration::ZERO);
        assert!(!config.database_path.as_os_str().is_empty());
    }
}
