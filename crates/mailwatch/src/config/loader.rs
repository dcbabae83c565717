use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::WatchConfig;
use crate::error::ConfigError;
use crate::secrets::has_secret_source;

pub const POLL_INTERVAL_ENV: &str = "MAILWATCH_POLL_INTERVAL";
pub const LISTEN_ADDR_ENV: &str = "MAILWATCH_LISTEN_ADDR";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<WatchConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<WatchConfig, ConfigError> {
    let config: WatchConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Applies `MAILWATCH_POLL_INTERVAL` and `MAILWATCH_LISTEN_ADDR` on top of a
/// loaded configuration, then re-validates it.
pub fn apply_env_overrides(config: &mut WatchConfig) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var(POLL_INTERVAL_ENV) {
        config.poll_interval_secs =
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: POLL_INTERVAL_ENV.to_string(),
                    value: value.clone(),
                })?;
    }

    if let Ok(value) = std::env::var(LISTEN_ADDR_ENV) {
        if !value.trim().is_empty() {
            config.listen_addr = value.trim().to_string();
        }
    }

    validate_config(config)
}

fn validate_config(config: &WatchConfig) -> Result<(), ConfigError> {
    if config.poll_interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "pollIntervalSecs must be greater than zero".to_string(),
        });
    }

    if config.window_size == 0 {
        return Err(ConfigError::Validation {
            message: "windowSize must be greater than zero".to_string(),
        });
    }

    if config.subscriber_buffer == 0 {
        return Err(ConfigError::Validation {
            message: "subscriberBuffer must be greater than zero".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for account in &config.accounts {
        let email = account.email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ConfigError::InvalidAccount {
                email: account.email.clone(),
                reason: "email address is malformed".to_string(),
            });
        }

        if !seen.insert(email) {
            return Err(ConfigError::InvalidAccount {
                email: account.email.clone(),
                reason: "email address is declared more than once".to_string(),
            });
        }

        if account.host.trim().is_empty() {
            return Err(ConfigError::InvalidAccount {
                email: account.email.clone(),
                reason: "host must not be empty".to_string(),
            });
        }

        if account.port == 0 {
            return Err(ConfigError::InvalidAccount {
                email: account.email.clone(),
                reason: "port must not be zero".to_string(),
            });
        }

        if !has_secret_source(
            account.password.as_deref(),
            account.password_file.as_deref(),
            account.password_env_var.as_deref(),
        ) {
            return Err(ConfigError::InvalidAccount {
                email: account.email.clone(),
                reason: "one of password, passwordFile or passwordEnvVar is required".to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Protocol;
    use serial_test::serial;

    const MINIMAL: &str = r#"{}"#;

    #[test]
    fn test_defaults() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.replay_limit, 50);
        assert_eq!(config.subscriber_buffer, 256);
        assert!(!config.accept_invalid_certs);
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn test_accounts_parse() {
        let config = load_config_from_str(
            r#"{
                "pollIntervalSecs": 30,
                "accounts": [
                    {"email": "a@x.com", "host": "imap.x.com", "port": 993,
                     "protocol": "IMAP", "password": "pw"},
                    {"email": "b@x.com", "host": "pop.x.com", "port": 995,
                     "protocol": "POP3", "active": false, "passwordEnvVar": "B_PW"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.accounts[0].protocol, Protocol::Imap);
        assert!(config.accounts[0].active);
        assert_eq!(config.accounts[1].protocol, Protocol::Pop3);
        assert!(!config.accounts[1].active);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = load_config_from_str(r#"{"pollIntervalSecs": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_zero_window_rejected() {
        let err = load_config_from_str(r#"{"windowSize": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let err = load_config_from_str(
            r#"{"accounts": [
                {"email": "a@x.com", "host": "h", "port": 993, "protocol": "IMAP", "password": "p"},
                {"email": "A@x.com", "host": "h", "port": 995, "protocol": "POP3", "password": "p"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAccount { .. }));
    }

    #[test]
    fn test_missing_secret_rejected() {
        let err = load_config_from_str(
            r#"{"accounts": [{"email": "a@x.com", "host": "h", "port": 993, "protocol": "IMAP"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAccount { .. }));
    }

    #[test]
    fn test_unknown_protocol_rejected() {
        let err = load_config_from_str(
            r#"{"accounts": [{"email": "a@x.com", "host": "h", "port": 25, "protocol": "SMTP", "password": "p"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let mut config = load_config_from_str(MINIMAL).unwrap();
        std::env::set_var(POLL_INTERVAL_ENV, "45");
        std::env::set_var(LISTEN_ADDR_ENV, "127.0.0.1:9000");
        apply_env_overrides(&mut config).unwrap();
        std::env::remove_var(POLL_INTERVAL_ENV);
        std::env::remove_var(LISTEN_ADDR_ENV);

        assert_eq!(config.poll_interval_secs, 45);
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    #[serial]
    fn test_invalid_env_interval() {
        let mut config = load_config_from_str(MINIMAL).unwrap();
        std::env::set_var(POLL_INTERVAL_ENV, "soon");
        let result = apply_env_overrides(&mut config);
        std::env::remove_var(POLL_INTERVAL_ENV);
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }
}
