//! Mailbox password lookup.
//!
//! A configured account names its password in one of three places. The first
//! non-empty one wins: an inline `password`, a `passwordFile` (mounted
//! secrets), or a `passwordEnvVar`.

use std::env::{self, VarError};
use std::fs;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("Account has no password, password file or password env var")]
    NoSourceProvided,

    #[error("Cannot read password file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Password env var '{name}' is not set")]
    EnvVarNotSet { name: String },

    #[error("Password env var '{name}' is not valid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Where a password comes from, after empty entries are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecretSource<'a> {
    Inline(&'a str),
    File(&'a str),
    EnvVar(&'a str),
}

impl<'a> SecretSource<'a> {
    fn pick(inline: Option<&'a str>, file: Option<&'a str>, env_var: Option<&'a str>) -> Option<Self> {
        let present = |value: Option<&'a str>| value.filter(|v| !v.is_empty());

        present(inline)
            .map(Self::Inline)
            .or_else(|| present(file).map(Self::File))
            .or_else(|| present(env_var).map(Self::EnvVar))
    }

    fn load(self) -> Result<SecretString, SecretError> {
        match self {
            Self::Inline(value) => Ok(SecretString::from(value.to_string())),
            Self::File(path) => {
                let path = expand_home(path);
                fs::read_to_string(&path)
                    .map(|content| SecretString::from(content.trim().to_string()))
                    .map_err(|source| SecretError::FileReadError { path, source })
            }
            Self::EnvVar(name) => match env::var(name) {
                Ok(value) => Ok(SecretString::from(value.trim().to_string())),
                Err(VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            },
        }
    }
}

/// Loads the password from the highest-priority non-empty source. File and
/// env var values have surrounding whitespace removed.
pub fn resolve_secret(
    inline: Option<&str>,
    file: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString, SecretError> {
    SecretSource::pick(inline, file, env_var)
        .ok_or(SecretError::NoSourceProvided)?
        .load()
}

/// True if any of the three sources is non-empty. Does not check that the
/// source can actually be read.
pub fn has_secret_source(inline: Option<&str>, file: Option<&str>, env_var: Option<&str>) -> bool {
    SecretSource::pick(inline, file, env_var).is_some()
}

/// `~` and `~/...` resolve against the home directory. Anything else is
/// returned as given.
fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{}", home.to_string_lossy(), rest),
        None => path.to_string(),
    }
}
