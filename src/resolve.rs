//! Decides which base URL, API key and environment one invocation talks to.
//!
//! Three sources are consulted, first match wins:
//!
//! 1. `--base-url` and `--api-key` given together (requires `--env`)
//! 2. `FLAGOPS_BASE_URL` and `FLAGOPS_API_KEY` set together (requires `--env`)
//! 3. the config file entry for `--env` (or `default_env`), where each of the
//!    two fields can still be overridden on its own by a flag or variable
//!
//! Tiers 1 and 2 only ever apply as a pair and never read the config file.

use std::fmt;

use crate::config::{redact, ConfigStore};
use crate::error::ResolveError;

pub const BASE_URL_VAR: &str = "FLAGOPS_BASE_URL";
pub const API_KEY_VAR: &str = "FLAGOPS_API_KEY";

/// Connection values given explicitly on the command line.
#[derive(Clone, Default)]
pub struct ConnectionArgs {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub env: Option<String>,
}

impl fmt::Debug for ConnectionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionArgs")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(redact))
            .field("env", &self.env)
            .finish()
    }
}

/// Connection values taken from the process environment.
#[derive(Clone, Default)]
pub struct EnvInputs {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl fmt::Debug for EnvInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvInputs")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(redact))
            .finish()
    }
}

impl EnvInputs {
    pub fn from_process() -> Self {
        Self {
            base_url: std::env::var(BASE_URL_VAR).ok(),
            api_key: std::env::var(API_KEY_VAR).ok(),
        }
    }
}

/// A fully specified connection. Both `base_url` and `api_key` are non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub base_url: String,
    pub api_key: String,
    pub environment: String,
}

impl fmt::Debug for ResolvedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConnection")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("environment", &self.environment)
            .finish()
    }
}

/// Empty strings count as not given.
fn given(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Resolve a connection reading tier 2 from the process environment.
pub fn resolve(
    explicit: &ConnectionArgs,
    store: &ConfigStore,
) -> Result<ResolvedConnection, ResolveError> {
    resolve_with(explicit, &EnvInputs::from_process(), store)
}

pub fn resolve_with(
    explicit: &ConnectionArgs,
    process_env: &EnvInputs,
    store: &ConfigStore,
) -> Result<ResolvedConnection, ResolveError> {
    let env_name = given(&explicit.env);

    if let (Some(base_url), Some(api_key)) = (given(&explicit.base_url), given(&explicit.api_key))
    {
        tracing::debug!("using base URL and API key from command line");
        return direct_connection(base_url, api_key, env_name);
    }

    if let (Some(base_url), Some(api_key)) =
        (given(&process_env.base_url), given(&process_env.api_key))
    {
        tracing::debug!("using {} and {}", BASE_URL_VAR, API_KEY_VAR);
        return direct_connection(base_url, api_key, env_name);
    }

    let config = store.load()?;
    let environment = env_name.unwrap_or(&config.default_env).to_string();
    let stored = config
        .environments
        .get(&environment)
        .ok_or_else(|| ResolveError::EnvironmentNotFound(environment.clone()))?;

    let base_url = given(&explicit.base_url)
        .or_else(|| given(&process_env.base_url))
        .unwrap_or(&stored.base_url);
    let api_key = given(&explicit.api_key)
        .or_else(|| given(&process_env.api_key))
        .unwrap_or(&stored.api_key);

    if base_url.is_empty() || api_key.is_empty() {
        return Err(ResolveError::IncompleteConnection(environment));
    }

    tracing::debug!(
        env = %environment,
        path = %store.path().display(),
        "using config file environment"
    );
    Ok(ResolvedConnection {
        base_url: base_url.to_string(),
        api_key: api_key.to_string(),
        environment,
    })
}

fn direct_connection(
    base_url: &str,
    api_key: &str,
    env_name: Option<&str>,
) -> Result<ResolvedConnection, ResolveError> {
    let environment = env_name.ok_or(ResolveError::MissingEnvironment)?;
    Ok(ResolvedConnection {
        base_url: base_url.to_string(),
        api_key: api_key.to_string(),
        environment: environment.to_string(),
    })
}
