//! Layered configuration loading
//!
//! Priority, lowest first: built-in defaults, the TOML file, `SUBPROXY_*`
//! environment variables (`__` separates sections, e.g.
//! `SUBPROXY_REMOTE__USERNAME`), then the `OPENSUBTITLES_USERNAME` and
//! `OPENSUBTITLES_PASSWORD` aliases.

use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;
use subtitle_proxy_core::{ProxyConfig, SecureString};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "SUBPROXY_";

/// Credential aliases applied after every other layer
pub const USERNAME_ALIAS: &str = "OPENSUBTITLES_USERNAME";
pub const PASSWORD_ALIAS: &str = "OPENSUBTITLES_PASSWORD";

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_path(),
            explicit: false,
        }
    }

    /// Create a ConfigManager reading a specific file, which must exist
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            explicit: true,
        }
    }

    /// Use `path` when given, the default location otherwise
    pub fn from_override(path: Option<PathBuf>) -> Self {
        path.map_or_else(Self::new, Self::with_path)
    }

    /// Get the configuration file path
    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load and validate the effective configuration
    pub fn load(&self) -> Result<ProxyConfig> {
        let config = self.load_with(|name| std::env::var(name).ok())?;
        config
            .validate()
            .context("Invalid configuration")?;
        Ok(config)
    }

    /// Load with credential aliases resolved through `lookup`
    fn load_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<ProxyConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(ProxyConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        } else if self.explicit {
            anyhow::bail!(
                "Configuration file not found: {}",
                self.config_path.display()
            );
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: ProxyConfig = figment
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", self.config_path.display()))?;
        apply_credential_aliases(&mut config, lookup);
        Ok(config)
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let value = Self::as_toml(&self.load()?)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        scalar_to_string(current)
            .ok_or_else(|| anyhow::anyhow!("Value at '{}' is not a simple type", key))
    }

    /// List all effective configuration values, sorted by key
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let value = Self::as_toml(&self.load()?)?;

        let mut items = Vec::new();
        Self::collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }

    /// Render through serde so the password is masked
    fn as_toml(config: &ProxyConfig) -> Result<toml::Value> {
        let rendered = toml::to_string(config).context("Failed to render configuration")?;
        Ok(toml::from_str(&rendered)?)
    }

    /// Recursively collect all key-value pairs from TOML
    fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
        if let toml::Value::Table(table) = value {
            for (key, val) in table {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                Self::collect_values(val, new_prefix, items);
            }
        } else if let Some(rendered) = scalar_to_string(value) {
            items.push((prefix, rendered));
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Override the credentials from the alias variables when set
///
/// Applied outside figment so numeric-looking passwords stay strings.
fn apply_credential_aliases(config: &mut ProxyConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(username) = lookup(USERNAME_ALIAS).filter(|v| !v.is_empty()) {
        config.remote.username = username;
    }
    if let Some(password) = lookup(PASSWORD_ALIAS).filter(|v| !v.is_empty()) {
        config.remote.password = SecureString::new(password);
    }
}
