//! Operator configuration.
//!
//! Read once at startup from the environment. Every setting has a default, so
//! an empty environment yields a working configuration against the public
//! Camunda Cloud endpoints.

use std::time::Duration;

use thiserror::Error;

use crate::client::ApiConfig;
use crate::client::camunda_client::{DEFAULT_API_URL, DEFAULT_AUDIENCE, DEFAULT_LOGIN_URL};
use crate::controller::context::Intervals;

/// Invalid configuration value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Settings for the operator process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    pub api: ApiConfig,
    pub max_concurrent_reconciles: u16,
    pub intervals: Intervals,
    pub health_port: u16,
    /// Name of this pod, used as leader election holder and event instance.
    pub pod_name: Option<String>,
    /// Namespace holding the leader election lease.
    pub pod_namespace: String,
}

impl OperatorConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let api = ApiConfig {
            api_url: string("CAMUNDA_API_URL", DEFAULT_API_URL),
            login_url: string("CAMUNDA_LOGIN_URL", DEFAULT_LOGIN_URL),
            audience: string("CAMUNDA_AUDIENCE", DEFAULT_AUDIENCE),
            request_timeout: Duration::from_secs(number(
                &lookup,
                "CAMUNDA_REQUEST_TIMEOUT_SECS",
                30,
            )?),
        };

        Ok(Self {
            api,
            max_concurrent_reconciles: number(&lookup, "MAX_CONCURRENT_RECONCILES", 4)?,
            intervals: Intervals {
                poll: Duration::from_secs(number(&lookup, "POLL_INTERVAL_SECS", 60)?),
                wait: Duration::from_secs(number(&lookup, "WAIT_INTERVAL_SECS", 10)?),
            },
            health_port: number(&lookup, "HEALTH_PORT", 8080)?,
            pod_name: lookup("POD_NAME").filter(|v| !v.is_empty()),
            pod_namespace: string("POD_NAMESPACE", "default"),
        })
    }
}

fn number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = lookup(name).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
