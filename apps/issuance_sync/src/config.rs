use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use client_core::{RateNormalizer, RetryPolicy, SyncOptions};
use shared::{codec::parse_address, constants::BLOCKS_PER_YEAR, domain::Address};
use tracing::warn;

pub const SETTINGS_FILE: &str = "issuance.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub gateway_url: String,
    pub database_url: String,
    pub app_address: Option<String>,
    pub blocks_per_year: u64,
    pub checkpoint_every: u64,
    pub retry_initial_ms: u64,
    pub retry_factor: u32,
    pub retry_max: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            gateway_url: "http://127.0.0.1:8545".into(),
            database_url: "sqlite://./data/issuance.db".into(),
            app_address: None,
            blocks_per_year: BLOCKS_PER_YEAR,
            checkpoint_every: SyncOptions::default().checkpoint_every,
            retry_initial_ms: retry.initial_delay.as_millis() as u64,
            retry_factor: retry.increase_factor,
            retry_max: retry.max_retries,
        }
    }
}

impl Settings {
    /// Overlay keys from a flat `issuance.toml` table of strings and integers.
    pub fn apply_file(&mut self, raw: &str) {
        let file_cfg = match raw.parse::<toml::Table>() {
            Ok(table) => table,
            Err(err) => {
                warn!("ignoring {SETTINGS_FILE}: {err}");
                return;
            }
        };
        let file_cfg: HashMap<String, String> = file_cfg
            .into_iter()
            .filter_map(|(key, value)| match value {
                toml::Value::String(v) => Some((key, v)),
                toml::Value::Integer(v) => Some((key, v.to_string())),
                other => {
                    warn!(key = %key, "ignoring {SETTINGS_FILE} value of type {}", other.type_str());
                    None
                }
            })
            .collect();
        let lookup = |key: &str| file_cfg.get(key).cloned();
        if let Some(v) = lookup("gateway_url") {
            self.gateway_url = v;
        }
        if let Some(v) = lookup("database_url") {
            self.database_url = v;
        }
        if let Some(v) = lookup("app_address") {
            self.app_address = Some(v);
        }
        self.apply_numeric(lookup);
    }

    /// Overlay environment variables; `APP__*` wins over the bare names.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("GATEWAY_URL") {
            self.gateway_url = v;
        }
        if let Some(v) = lookup("APP__GATEWAY_URL") {
            self.gateway_url = v;
        }

        if let Some(v) = lookup("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("APP__DATABASE_URL") {
            self.database_url = v;
        }

        if let Some(v) = lookup("APP_ADDRESS") {
            self.app_address = Some(v);
        }
        if let Some(v) = lookup("APP__APP_ADDRESS") {
            self.app_address = Some(v);
        }

        self.apply_numeric(|key| lookup(&format!("APP__{}", key.to_ascii_uppercase())));
    }

    fn apply_numeric(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(v) = parsed("blocks_per_year").filter(|v| *v > 0) {
            self.blocks_per_year = v;
        }
        if let Some(v) = parsed("checkpoint_every").filter(|v| *v > 0) {
            self.checkpoint_every = v;
        }
        if let Some(v) = parsed("retry_initial_ms") {
            self.retry_initial_ms = v;
        }
        if let Some(v) = parsed("retry_factor").and_then(|v| u32::try_from(v).ok()) {
            self.retry_factor = v;
        }
        if let Some(v) = parsed("retry_max").and_then(|v| u32::try_from(v).ok()) {
            self.retry_max = v;
        }
    }

    pub fn app_address(&self) -> anyhow::Result<Address> {
        let raw = self
            .app_address
            .as_deref()
            .ok_or_else(|| anyhow!("no app address configured (set APP_ADDRESS or --app-address)"))?;
        parse_address(raw).with_context(|| format!("invalid app address '{raw}'"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.retry_initial_ms),
            increase_factor: self.retry_factor,
            max_retries: self.retry_max,
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            retry: self.retry_policy(),
            checkpoint_every: self.checkpoint_every,
        }
    }

    pub fn normalizer(&self) -> RateNormalizer {
        RateNormalizer::with_blocks_per_year(self.blocks_per_year)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file(&raw);
    }
    settings.apply_env(env);
    settings
}

pub fn prepare_database_url(raw_database_url: &str) -> anyhow::Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    if let Some(parent) = storage::sqlite_path(&database_url)
        .as_deref()
        .and_then(Path::parent)
    {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create parent directory '{}' for database url '{database_url}'",
                parent.display()
            )
        })?;
    }
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        if has_drive_prefix(path) {
            return format!("sqlite:{}", path.replace('\\', "/"));
        }
        return raw_database_url.to_string();
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    let path = raw_database_url
        .strip_prefix("sqlite:")
        .unwrap_or(raw_database_url)
        .replace('\\', "/");
    if has_drive_prefix(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
