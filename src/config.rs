//! Layered configuration loading (§2a, §6).
//!
//! `event_store` and `allow_action` are **not** loaded from file: they are
//! supplied programmatically by the host at construction time (a trait
//! object and a closure respectively), consistent with keeping them a
//! first-class constructor input rather than a compile-time extension point.

use config::{Config as ConfigTree, ConfigError, Environment, File};
use nostr_sdk::prelude::*;
use serde::Deserialize;
use std::path::Path;

const ENVIRONMENT_PREFIX: &str = "GROUPS_RELAY";
const CONFIG_SEPARATOR: &str = "__";

fn default_ref_window_size() -> usize {
    50
}

fn default_too_old_secs() -> u64 {
    60
}

fn default_group_creator_default_role() -> String {
    "admin".to_string()
}

fn default_roles() -> Vec<String> {
    vec!["admin".to_string(), "member".to_string()]
}

/// The engine's file/env-resolvable settings (§6). Secret key is carried as
/// hex in configuration the same way the relay's own identity key is, and
/// turned into [`Keys`] by [`GroupEngineSettings::relay_keys`].
#[derive(Debug, Deserialize, Clone)]
pub struct GroupEngineSettings {
    pub domain: String,
    pub secret_key: String,
    #[serde(default = "default_roles")]
    pub default_roles: Vec<String>,
    #[serde(default = "default_group_creator_default_role")]
    pub group_creator_default_role: String,
    #[serde(default)]
    pub allow_private_groups: bool,
    #[serde(default = "default_ref_window_size")]
    pub ref_window_size: usize,
    #[serde(default = "default_too_old_secs")]
    pub too_old_secs: u64,
}

impl GroupEngineSettings {
    pub fn relay_keys(&self) -> Result<Keys, anyhow::Error> {
        let secret_key = SecretKey::from_hex(&self.secret_key)?;
        Ok(Keys::new(secret_key))
    }

    pub fn too_old(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.too_old_secs)
    }
}

/// Layered loader: `settings.yml` -> `settings.{environment}.yml` ->
/// `settings.local.yml` -> environment variables (prefix
/// `GROUPS_RELAY__`), each layer overriding the previous.
#[derive(Debug, Clone)]
pub struct Config {
    config: ConfigTree,
}

impl Config {
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let environment =
            std::env::var(format!("{ENVIRONMENT_PREFIX}{CONFIG_SEPARATOR}ENVIRONMENT"))
                .unwrap_or_else(|_| "development".into());

        let config_dir = config_dir.as_ref();
        let default_config = config_dir.join("settings.yml");
        let env_config = config_dir.join(format!("settings.{environment}.yml"));
        let local_config = config_dir.join("settings.local.yml");

        let config = ConfigTree::builder()
            .add_source(File::from(default_config))
            .add_source(File::from(env_config).required(false))
            .add_source(File::from(local_config).required(false))
            .add_source(
                Environment::with_prefix(ENVIRONMENT_PREFIX)
                    .separator(CONFIG_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        Ok(Config { config })
    }

    pub fn get_settings(&self) -> Result<GroupEngineSettings, ConfigError> {
        self.config.get("group_engine")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        assert_eq!(default_ref_window_size(), 50);
        assert_eq!(default_too_old_secs(), 60);
        assert_eq!(default_group_creator_default_role(), "admin");
    }
}
