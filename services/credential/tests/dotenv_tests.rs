//! Logging settings read from `.env`.
//!
//! Kept in its own test binary because it changes the working directory.

use credential_service::observability::{TracingConfig, LOG_FORMAT_ENV, LOG_LEVEL_ENV};
use std::fs;

#[test]
fn test_log_settings_come_from_dotenv() {
    let dir = std::env::temp_dir().join(format!("credential-dotenv-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(".env"), "LOG_LEVEL=debug\nLOG_FORMAT=json\n").unwrap();

    std::env::remove_var(LOG_LEVEL_ENV);
    std::env::remove_var(LOG_FORMAT_ENV);
    std::env::set_current_dir(&dir).unwrap();

    let config = TracingConfig::from_env();
    fs::remove_dir_all(&dir).ok();

    assert_eq!(config.log_level, "debug");
    assert!(config.json_output);
}
