use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub service_url: String,
    pub anon_key: String,
    pub posts_table: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:54321".into(),
            anon_key: String::new(),
            posts_table: "blogs".into(),
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    /// Replaces the service url, applying the same checks as the loader.
    pub fn override_service_url(&mut self, raw: &str) -> Result<(), SettingsError> {
        self.service_url = normalize_service_url(raw)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid service url '{url}': {source}")]
    InvalidServiceUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("service url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("posts table name must not be empty")]
    EmptyTable,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Defaults, then the optional TOML file at `path`, then environment variables.
pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let file_cfg = toml::from_str::<HashMap<String, String>>(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        apply_file(&mut settings, &file_cfg);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings.service_url = normalize_service_url(&settings.service_url)?;
    if settings.posts_table.trim().is_empty() {
        return Err(SettingsError::EmptyTable.into());
    }

    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("service_url") {
        settings.service_url = v.clone();
    }
    if let Some(v) = file_cfg.get("anon_key") {
        settings.anon_key = v.clone();
    }
    if let Some(v) = file_cfg.get("posts_table") {
        settings.posts_table = v.clone();
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("SUPABASE_URL") {
        settings.service_url = v;
    }
    if let Some(v) = var("APP__SERVICE_URL") {
        settings.service_url = v;
    }

    if let Some(v) = var("SUPABASE_ANON_KEY") {
        settings.anon_key = v;
    }
    if let Some(v) = var("APP__ANON_KEY") {
        settings.anon_key = v;
    }

    if let Some(v) = var("APP__POSTS_TABLE") {
        settings.posts_table = v;
    }

    if let Some(v) = var("RUST_LOG") {
        settings.log_filter = v;
    }
}

fn normalize_service_url(raw: &str) -> Result<String, SettingsError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|source| SettingsError::InvalidServiceUrl {
        url: trimmed.to_string(),
        source,
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SettingsError::UnsupportedScheme(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
