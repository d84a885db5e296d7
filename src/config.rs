use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment used when the config file does not name one.
pub const DEFAULT_ENV: &str = "prod";

/// Overrides the config file location.
pub const CONFIG_PATH_VAR: &str = "FLAGOPS_CONFIG";

/// Contents of `~/.flagops/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedConfig {
    #[serde(default = "default_env")]
    pub default_env: String,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvConfig>,
}

/// Connection details stored for one environment. Either field may be empty
/// on disk; completeness is checked when a connection is resolved.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// Leaf names addressable through `<environment>.<field>` paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    BaseUrl,
    ApiKey,
}

impl FromStr for ConfigField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base_url" => Ok(ConfigField::BaseUrl),
            "api_key" => Ok(ConfigField::ApiKey),
            other => Err(ConfigError::UnknownField(other.to_string())),
        }
    }
}

fn default_env() -> String {
    DEFAULT_ENV.to_string()
}

impl Default for PersistedConfig {
    fn default() -> Self {
        Self {
            default_env: default_env(),
            environments: BTreeMap::new(),
        }
    }
}

/// Split `dev.base_url` into its environment and field. Exactly two
/// non-empty segments are accepted.
fn parse_key_path(path: &str) -> Result<(&str, ConfigField), ConfigError> {
    let mut parts = path.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(env), Some(field), None) if !env.is_empty() && !field.is_empty() => {
            Ok((env, field.parse()?))
        }
        _ => Err(ConfigError::InvalidKeyPath(path.to_string())),
    }
}

impl PersistedConfig {
    /// Read a single value, e.g. `get("dev.base_url")`.
    pub fn get(&self, path: &str) -> Result<&str, ConfigError> {
        let (env, field) = parse_key_path(path)?;
        let entry = self
            .environments
            .get(env)
            .ok_or_else(|| ConfigError::EnvironmentNotFound(env.to_string()))?;
        Ok(match field {
            ConfigField::BaseUrl => &entry.base_url,
            ConfigField::ApiKey => &entry.api_key,
        })
    }

    /// Write a single value, creating the environment if it does not exist.
    pub fn set(&mut self, path: &str, value: &str) -> Result<(), ConfigError> {
        let (env, field) = parse_key_path(path)?;
        let entry = self.environments.entry(env.to_string()).or_default();
        match field {
            ConfigField::BaseUrl => entry.base_url = value.to_string(),
            ConfigField::ApiKey => entry.api_key = value.to_string(),
        }
        Ok(())
    }

    /// Make `env` the environment used when none is given.
    pub fn set_default_env(&mut self, env: &str) -> Result<(), ConfigError> {
        if !self.environments.contains_key(env) {
            return Err(ConfigError::EnvironmentNotFound(env.to_string()));
        }
        self.default_env = env.to_string();
        Ok(())
    }

    pub fn remove_env(&mut self, env: &str) -> Result<EnvConfig, ConfigError> {
        self.environments
            .remove(env)
            .ok_or_else(|| ConfigError::EnvironmentNotFound(env.to_string()))
    }
}

/// Handle on the config file. Holds only the path; every `load` reads the
/// file again.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.flagops/config.yaml`. Callers that honor `FLAGOPS_CONFIG` check it
    /// before falling back to this.
    pub fn default_location() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::new(home.join(".flagops").join("config.yaml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config. A missing file yields the default config.
    pub fn load(&self) -> Result<PersistedConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "config file not found, using defaults");
                return Ok(PersistedConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(PersistedConfig::default());
        }

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the config, creating the parent directory if needed. The
    /// directory is owner-only (0700) and the file owner read/write (0600).
    pub fn save(&self, config: &PersistedConfig) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(config).map_err(ConfigError::Serialize)?;
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(write_err)?;
                restrict_permissions(dir, 0o700).map_err(write_err)?;
            }
        }

        let mut file = open_private(&self.path).map_err(write_err)?;
        file.write_all(content.as_bytes()).map_err(write_err)?;
        // An existing file keeps its old mode through open(), so tighten it.
        restrict_permissions(&self.path, 0o600).map_err(write_err)?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Mask an API key for display, keeping the last four characters.
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::new(dir.path().join("flagops").join("config.yaml"))
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = store_in(&dir).load().unwrap();
        assert_eq!(cfg.default_env, "prod");
        assert!(cfg.environments.is_empty());
    }

    #[test]
    fn test_load_empty_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "\n").unwrap();
        assert_eq!(
            ConfigStore::new(&path).load().unwrap(),
            PersistedConfig::default()
        );
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "default_env: [unclosed\n").unwrap();
        let err = ConfigStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_reads_yaml_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            r#"default_env: staging
environments:
  staging:
    base_url: https://staging.flags.example.com
    api_key: sk_staging
  dev:
    base_url: http://localhost:8080
"#,
        )
        .unwrap();
        let cfg = ConfigStore::new(&path).load().unwrap();
        assert_eq!(cfg.default_env, "staging");
        assert_eq!(
            cfg.environments["staging"].base_url,
            "https://staging.flags.example.com"
        );
        assert_eq!(cfg.environments["dev"].api_key, "");
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut cfg = PersistedConfig::default();
        cfg.set("prod.base_url", "https://flags.example.com").unwrap();
        cfg.set("prod.api_key", "sk_live_123").unwrap();
        cfg.set("dev.base_url", "http://localhost:8080").unwrap();
        cfg.set("dev.api_key", "sk_dev").unwrap();
        cfg.set_default_env("dev").unwrap();

        store.save(&cfg).unwrap();
        assert_eq!(store.load().unwrap(), cfg);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&PersistedConfig::default()).unwrap();

        let file_mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let dir_mode = fs::metadata(store.path().parent().unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[test]
    fn test_set_creates_missing_environment() {
        let mut cfg = PersistedConfig::default();
        cfg.set("dev.base_url", "http://x").unwrap();
        assert_eq!(cfg.get("dev.base_url").unwrap(), "http://x");
        assert_eq!(cfg.get("dev.api_key").unwrap(), "");
    }

    #[test]
    fn test_get_missing_environment() {
        let cfg = PersistedConfig::default();
        assert!(matches!(
            cfg.get("dev.base_url"),
            Err(ConfigError::EnvironmentNotFound(env)) if env == "dev"
        ));
    }

    #[test]
    fn test_unknown_field() {
        let mut cfg = PersistedConfig::default();
        assert!(matches!(
            cfg.set("dev.token", "x"),
            Err(ConfigError::UnknownField(f)) if f == "token"
        ));
        assert!(cfg.environments.is_empty());
        assert!(matches!(
            cfg.get("dev.url"),
            Err(ConfigError::UnknownField(_))
        ));
    }

    #[test]
    fn test_invalid_key_paths() {
        let cfg = PersistedConfig::default();
        for path in ["dev", "dev.", ".base_url", "a.b.base_url", ""] {
            assert!(
                matches!(cfg.get(path), Err(ConfigError::InvalidKeyPath(_))),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_set_default_env_requires_existing() {
        let mut cfg = PersistedConfig::default();
        assert!(cfg.set_default_env("dev").is_err());
        cfg.set("dev.api_key", "k").unwrap();
        cfg.set_default_env("dev").unwrap();
        assert_eq!(cfg.default_env, "dev");
    }

    #[test]
    fn test_remove_env() {
        let mut cfg = PersistedConfig::default();
        cfg.set("dev.api_key", "k").unwrap();
        assert_eq!(cfg.remove_env("dev").unwrap().api_key, "k");
        assert!(matches!(
            cfg.remove_env("dev"),
            Err(ConfigError::EnvironmentNotFound(_))
        ));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact(""), "");
        assert_eq!(redact("abc"), "****");
        assert_eq!(redact("sk_live_1234"), "****1234");
        let cfg = EnvConfig {
            base_url: "http://x".into(),
            api_key: "sk_live_1234".into(),
        };
        assert!(!format!("{:?}", cfg).contains("sk_live"));
    }
}
