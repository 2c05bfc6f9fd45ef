//! Node configuration, populated from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use socialgraph_api::page::MAX_LIMIT;

/// A configuration variable was present but could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not valid: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration for a social-graph node.
///
/// All fields are populated from environment variables with sensible
/// defaults, so a node can be started with zero configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `SOCIAL_BIND` | `0.0.0.0:8080` | TCP socket address to listen on |
/// | `SOCIAL_DB` | (absent = in-memory) | Path to the SQLite database file |
/// | `SOCIAL_BUSY_TIMEOUT_MS` | `5000` | How long a write waits for another instance's lock |
/// | `SOCIAL_IDENTITY_HEADER` | `x-user-id` | Header carrying the authenticated user id |
/// | `SOCIAL_COLLAPSE_AUTH_ERRORS` | `false` | Report "not your request" as "not found" |
/// | `SOCIAL_PAGE_LIMIT_DEFAULT` | `20` | Page size when a list request has no `limit` |
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Socket address the server binds to.
    pub bind_addr: SocketAddr,

    /// Path to the SQLite database file.
    /// `None` means use an in-memory store (data is lost on restart).
    pub db_path: Option<String>,

    pub busy_timeout: Duration,

    /// Lower-case header name set by the upstream identity gateway.
    pub identity_header: String,

    pub collapse_authorization_errors: bool,

    /// Default list page size, within `[1, 100]`.
    pub default_page_limit: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: None,
            busy_timeout: Duration::from_millis(5000),
            identity_header: "x-user-id".into(),
            collapse_authorization_errors: false,
            default_page_limit: 20,
        }
    }
}

impl NodeConfig {
    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`NodeConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match lookup("SOCIAL_BIND") {
            Some(v) => parse("SOCIAL_BIND", v)?,
            None => defaults.bind_addr,
        };

        let busy_timeout = match lookup("SOCIAL_BUSY_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(parse("SOCIAL_BUSY_TIMEOUT_MS", v)?),
            None => defaults.busy_timeout,
        };

        let identity_header = match lookup("SOCIAL_IDENTITY_HEADER") {
            Some(v) => {
                let name = v.trim().to_ascii_lowercase();
                if axum::http::HeaderName::from_bytes(name.as_bytes()).is_err() {
                    return Err(invalid("SOCIAL_IDENTITY_HEADER", v, "not a valid header name"));
                }
                name
            }
            None => defaults.identity_header,
        };

        let collapse_authorization_errors = match lookup("SOCIAL_COLLAPSE_AUTH_ERRORS") {
            Some(v) => parse_bool("SOCIAL_COLLAPSE_AUTH_ERRORS", v)?,
            None => defaults.collapse_authorization_errors,
        };

        let default_page_limit = match lookup("SOCIAL_PAGE_LIMIT_DEFAULT") {
            Some(v) => {
                let limit: u32 = parse("SOCIAL_PAGE_LIMIT_DEFAULT", v.clone())?;
                if !(1..=MAX_LIMIT).contains(&limit) {
                    return Err(invalid(
                        "SOCIAL_PAGE_LIMIT_DEFAULT",
                        v,
                        &format!("must be between 1 and {MAX_LIMIT}"),
                    ));
                }
                limit
            }
            None => defaults.default_page_limit,
        };

        Ok(Self {
            bind_addr,
            db_path: lookup("SOCIAL_DB").filter(|p| !p.is_empty()),
            busy_timeout,
            identity_header,
            collapse_authorization_errors,
            default_page_limit,
        })
    }
}

fn invalid(var: &'static str, value: String, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value,
        reason: reason.to_string(),
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value.trim().parse() {
        Ok(v) => Ok(v),
        Err(e) => {
            let reason = e.to_string();
            Err(invalid(var, value, &reason))
        }
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}
