//! Configuration types and loading
//!
//! The file is a map keyed by provider name. YAML by default, TOML when the
//! path ends in `.toml`.
//!
//! Key resolution order per provider:
//! 1. `<PROVIDER>_API_KEYS` env var (comma-separated)
//! 2. `api_keys` in the file (string or list)
//! 3. `api_keys_file` (one key per line, `#` comments)

use common::Secret;
use key_pool::TargetKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub providers: BTreeMap<String, ProviderConfig>,
}

/// One provider entry
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, rename = "api_keys")]
    inline_keys: Option<KeySpec>,
    #[serde(default)]
    pub api_keys_file: Option<PathBuf>,
    pub model: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Resolved keys, in rotation order
    #[serde(skip)]
    pub api_keys: Vec<Secret<String>>,
}

/// `api_keys` as written in the file: a single key or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum KeySpec {
    One(String),
    Many(Vec<String>),
}

impl KeySpec {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeySpec::One(key) => vec![key],
            KeySpec::Many(keys) => keys,
        }
    }
}

impl fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = match self {
            KeySpec::One(_) => 1,
            KeySpec::Many(keys) => keys.len(),
        };
        write!(f, "[{count} key(s) REDACTED]")
    }
}

fn default_timeout() -> u64 {
    60
}

impl Config {
    /// Load and validate configuration, resolving every provider's keys.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };

        if config.providers.is_empty() {
            return Err(common::Error::Config("no providers configured".into()));
        }

        for (name, provider) in config.providers.iter_mut() {
            provider.resolve(name)?;
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("configs/config.yaml")
    }

    /// Providers to run: all of them in name order, or the named ones in the
    /// order given. Unknown names are an error.
    pub fn select<'a>(
        &'a self,
        names: &[String],
    ) -> common::Result<Vec<(&'a str, &'a ProviderConfig)>> {
        if names.is_empty() {
            return Ok(self
                .providers
                .iter()
                .map(|(name, provider)| (name.as_str(), provider))
                .collect());
        }
        names
            .iter()
            .map(|name| {
                self.providers
                    .get_key_value(name)
                    .map(|(name, provider)| (name.as_str(), provider))
                    .ok_or_else(|| {
                        common::Error::Config(format!("provider {name:?} not found in config"))
                    })
            })
            .collect()
    }
}

/// Env var holding comma-separated keys for `provider`.
pub fn keys_env_var(provider: &str) -> String {
    format!("{}_API_KEYS", provider.to_ascii_uppercase().replace('-', "_"))
}

impl ProviderConfig {
    /// Validate the entry and resolve its keys.
    fn resolve(&mut self, name: &str) -> common::Result<()> {
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name}: base_url must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(common::Error::Config(format!(
                "{name}: timeout_secs must be greater than 0"
            )));
        }

        if self.model.trim().is_empty() {
            return Err(common::Error::Config(format!("{name}: model must not be empty")));
        }

        self.target_kind(name)?;

        let env_var = keys_env_var(name);
        let env_keys = std::env::var(&env_var)
            .ok()
            .filter(|value| !value.trim().is_empty());
        let keys = if let Some(value) = env_keys {
            split_keys(value.split(','))
        } else if let Some(inline) = self.inline_keys.take() {
            split_keys(inline.into_vec().iter().map(String::as_str))
        } else if let Some(ref key_file) = self.api_keys_file {
            let contents = std::fs::read_to_string(key_file).map_err(|e| {
                common::Error::Config(format!(
                    "{name}: failed to read api_keys_file {}: {e}",
                    key_file.display()
                ))
            })?;
            split_keys(contents.lines().filter(|line| !line.trim_start().starts_with('#')))
        } else {
            Vec::new()
        };

        if keys.is_empty() {
            return Err(common::Error::Config(format!(
                "{name}: no API keys (set {env_var}, api_keys or api_keys_file)"
            )));
        }
        self.api_keys = keys;
        Ok(())
    }

    /// Target shape: explicit `target`, else inferred from the provider name.
    pub fn target_kind(&self, name: &str) -> common::Result<TargetKind> {
        let raw = match self.target.as_deref() {
            Some(target) => target,
            None => match name {
                "litellm" | "completion" => "callable",
                _ => "client",
            },
        };
        raw.parse()
            .map_err(|e: key_pool::Error| common::Error::Config(format!("{name}: {e}")))
    }
}

fn split_keys<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<Secret<String>> {
    raw.map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| Secret::new(key.to_owned()))
        .collect()
}
