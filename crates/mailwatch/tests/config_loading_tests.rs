//! Table-driven tests for configuration loading and validation.

use std::io::Write;

use mailwatch::config::load_config_from_str;
use mailwatch::{load_config, ConfigError, Protocol};

/// Represents a single config loading test case.
struct ConfigTestCase {
    name: &'static str,
    config_json: &'static str,
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "empty_object_uses_defaults",
        config_json: "{}",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "pollIntervalSecs": 30,
            "windowSize": 25,
            "replayLimit": 100,
            "subscriberBuffer": 64,
            "acceptInvalidCerts": true,
            "databasePath": "/tmp/mailwatch.db",
            "listenAddr": "127.0.0.1:9000",
            "accounts": [
                {
                    "email": "alice@example.com",
                    "host": "imap.example.com",
                    "port": 993,
                    "protocol": "IMAP",
                    "passwordEnvVar": "ALICE_PASSWORD"
                },
                {
                    "email": "bob@example.com",
                    "host": "pop.example.com",
                    "port": 995,
                    "protocol": "POP3",
                    "active": false,
                    "passwordFile": "~/.secrets/bob"
                }
            ]
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "invalid_json",
        config_json: "{ not json",
        should_succeed: false,
        expected_error: Some("parse"),
    },
    ConfigTestCase {
        name: "zero_subscriber_buffer",
        config_json: r#"{ "subscriberBuffer": 0 }"#,
        should_succeed: false,
        expected_error: Some("subscriberBuffer"),
    },
    ConfigTestCase {
        name: "port_zero",
        config_json: r#"{ "accounts": [
            { "email": "a@x.com", "host": "h", "port": 0, "protocol": "IMAP", "password": "pw" }
        ] }"#,
        should_succeed: false,
        expected_error: Some("port"),
    },
    ConfigTestCase {
        name: "empty_host",
        config_json: r#"{ "accounts": [
            { "email": "a@x.com", "host": " ", "port": 993, "protocol": "IMAP", "password": "pw" }
        ] }"#,
        should_succeed: false,
        expected_error: Some("host"),
    },
    ConfigTestCase {
        name: "duplicate_email_case_insensitive",
        config_json: r#"{ "accounts": [
            { "email": "a@x.com", "host": "h", "port": 993, "protocol": "IMAP", "password": "pw" },
            { "email": "A@X.COM", "host": "h", "port": 995, "protocol": "POP3", "password": "pw" }
        ] }"#,
        should_succeed: false,
        expected_error: Some("more than once"),
    },
];

#[test]
fn test_config_loading_table() {
    for case in CONFIG_TESTS {
        let result = load_config_from_str(case.config_json);

        if case.should_succeed {
            assert!(
                result.is_ok(),
                "case '{}' should succeed, got {:?}",
                case.name,
                result.err()
            );
        } else {
            let err = match result {
                Ok(_) => panic!("case '{}' should fail", case.name),
                Err(e) => e.to_string().to_lowercase(),
            };
            if let Some(expected) = case.expected_error {
                assert!(
                    err.contains(&expected.to_lowercase()),
                    "case '{}': error '{}' does not mention '{}'",
                    case.name,
                    err,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "pollIntervalSecs": 5, "accounts": [
            {{ "email": "a@x.com", "host": "imap.x.com", "port": 993, "protocol": "IMAP", "password": "pw" }}
        ] }}"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.poll_interval_secs, 5);
    assert_eq!(config.accounts[0].protocol, Protocol::Imap);
    assert!(config.accounts[0].active);
}

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/mailwatch.json").unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}
