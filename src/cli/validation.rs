//! Value parsers for CLI arguments

use std::fs;
use std::path::PathBuf;

use crate::models::kinds;

/// Upper bound on worker counts accepted from the command line
const MAX_WORKER_COUNT: i64 = 1000;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{path_str}'"));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{path_str}'"));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{path_str}': {e}")),
    }
}

/// Worker counts must be between 1 and 1000
pub fn validate_worker_count(count_str: &str) -> Result<i64, String> {
    let count: i64 = count_str
        .parse()
        .map_err(|_| format!("Worker count must be a positive number, got: '{count_str}'"))?;

    if !(1..=MAX_WORKER_COUNT).contains(&count) {
        return Err(format!(
            "Worker count must be between 1 and {MAX_WORKER_COUNT}, got: {count}"
        ));
    }

    Ok(count)
}

/// Accepts the notification types a notifier can register
pub fn validate_notification_type(kind: &str) -> Result<String, String> {
    let kind = kind.trim();
    if kinds::ALL.contains(&kind) {
        Ok(kind.to_string())
    } else {
        Err(format!(
            "Unknown notification type '{kind}', expected one of: {}",
            kinds::ALL.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_validation() {
        for valid in ["1", "25", "1000"] {
            assert!(validate_worker_count(valid).is_ok(), "{valid} should be valid");
        }
        for invalid in ["0", "-3", "1001", "many", ""] {
            assert!(validate_worker_count(invalid).is_err(), "{invalid} should be invalid");
        }
    }

    #[test]
    fn test_notification_type_validation() {
        assert_eq!(validate_notification_type("email").unwrap(), "email");
        assert_eq!(validate_notification_type(" pagerduty ").unwrap(), "pagerduty");
        assert!(validate_notification_type("slack").is_err());
        assert!(validate_notification_type("").is_err());
    }

    #[test]
    fn test_config_file_path_validation() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("relay.toml");
        fs::write(&file, "[foreman]\n").unwrap();

        assert!(validate_config_file_path(file.to_str().unwrap()).is_ok());
        assert!(validate_config_file_path(dir.path().to_str().unwrap()).is_err());
        assert!(validate_config_file_path("/definitely/not/here.toml").is_err());
    }
}
