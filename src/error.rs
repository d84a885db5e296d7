use std::path::PathBuf;

/// Failures reading, writing or addressing the persisted config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory; set FLAGOPS_CONFIG")]
    NoHomeDir,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("invalid config key '{0}', expected <environment>.<field>")]
    InvalidKeyPath(String),

    #[error("unknown config field '{0}', expected base_url or api_key")]
    UnknownField(String),

    #[error("environment '{0}' not found in config")]
    EnvironmentNotFound(String),
}

/// Failures turning command inputs into a connection. Always raised before
/// any network call.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("an environment name is required (--env) when base URL and API key are given directly")]
    MissingEnvironment,

    #[error("environment '{0}' not found in config")]
    EnvironmentNotFound(String),

    #[error("environment '{0}' has no base URL or API key configured")]
    IncompleteConnection(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Local validation failures for records and overrides. Always raised
/// before the current record is fetched.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid flag key '{0}'")]
    InvalidKey(String),

    #[error("rollout must be between 0 and 100, got {0}")]
    RolloutOutOfRange(i64),

    #[error("invalid config JSON: {0}")]
    InvalidConfigJson(#[source] serde_json::Error),

    #[error("config must be a JSON object")]
    ConfigNotObject,

    #[error("invalid variants JSON: {0}")]
    InvalidVariantsJson(#[source] serde_json::Error),

    #[error("invalid variant: {0}")]
    InvalidVariant(String),

    #[error("variant weights add up to {0}, must not exceed 100")]
    VariantWeightsExceed(u32),

    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("nothing to update, pass at least one field")]
    NothingToUpdate,
}

/// Failures talking to the remote flag service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL '{0}', expected an http or https URL")]
    InvalidBaseUrl(String),

    #[error("remote error ({status}): {body}")]
    Remote { status: u16, body: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Top-level error for flag operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("flag '{key}' not found in environment '{environment}'")]
    FlagNotFound { key: String, environment: String },

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid import file {path}: {source}")]
    ImportFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{failed} of {total} records failed to import")]
    ImportFailed { failed: usize, total: usize },
}
