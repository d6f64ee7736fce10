use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_BASE_URL;
use crate::model::SortOrder;

const DEFAULT_ENV_PREFIX: &str = "READABLE";
const APP_DIR: &str = "readable-tui";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            headers: BTreeMap::new(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("readable-tui/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_notice_ttl", with = "humantime_serde")]
    pub notice_ttl: Duration,
    #[serde(default = "default_tick_rate", with = "humantime_serde")]
    pub tick_rate: Duration,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::default(),
            author: default_author(),
            notice_ttl: default_notice_ttl(),
            tick_rate: default_tick_rate(),
        }
    }
}

fn default_author() -> String {
    env::var("USER")
        .ok()
        .filter(|user| !user.trim().is_empty())
        .unwrap_or_else(|| "anonymous".into())
}

fn default_notice_ttl() -> Duration {
    Duration::from_secs(6)
}

fn default_tick_rate() -> Duration {
    Duration::from_millis(120)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file: default_log_file(),
        }
    }
}

fn default_level() -> String {
    "info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR).join("readable-tui.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        } else {
            tracing::debug!(path = %path.display(), "config file missing, using defaults");
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Layers `other` over `base`. Fields still at their default in `other`
/// leave `base` untouched.
fn merge_config(mut base: Config, other: Config) -> Config {
    let defaults = Config::default();

    if !other.api.base_url.is_empty() && other.api.base_url != defaults.api.base_url {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.user_agent.is_empty() && other.api.user_agent != defaults.api.user_agent {
        base.api.user_agent = other.api.user_agent;
    }
    if other.api.timeout != defaults.api.timeout {
        base.api.timeout = other.api.timeout;
    }
    base.api.headers.extend(other.api.headers);

    if other.ui.sort_order != defaults.ui.sort_order {
        base.ui.sort_order = other.ui.sort_order;
    }
    if !other.ui.author.is_empty() && other.ui.author != defaults.ui.author {
        base.ui.author = other.ui.author;
    }
    if other.ui.notice_ttl != defaults.ui.notice_ttl {
        base.ui.notice_ttl = other.ui.notice_ttl;
    }
    if !other.ui.tick_rate.is_zero() && other.ui.tick_rate != defaults.ui.tick_rate {
        base.ui.tick_rate = other.ui.tick_rate;
    }

    if !other.logging.level.is_empty() && other.logging.level != defaults.logging.level {
        base.logging.level = other.logging.level;
    }
    // an explicit `file: ~` differs from the default path and turns file logging off
    if other.logging.file != defaults.logging.file {
        base.logging.file = other.logging.file;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    let mut cfg = Config::default();
    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "api.headers" => {
            // name=value pairs separated by commas
            for pair in value.split(',') {
                if let Some((name, val)) = pair.split_once('=') {
                    let name = name.trim();
                    if !name.is_empty() {
                        cfg.api.headers.insert(name.to_string(), val.trim().to_string());
                    }
                }
            }
        }
        "ui.sort_order" => match value.parse::<SortOrder>() {
            Ok(order) => cfg.ui.sort_order = order,
            Err(err) => tracing::warn!(%value, error = %err, "ignoring sort order override"),
        },
        "ui.author" => cfg.ui.author = value,
        "ui.notice_ttl" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.notice_ttl = duration;
            }
        }
        "ui.tick_rate" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.ui.tick_rate = duration;
            }
        }
        "logging.level" => cfg.logging.level = value,
        "logging.file" => {
            let value = value.trim();
            cfg.logging.file = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(path: PathBuf, prefix: &str) -> LoadOptions {
        LoadOptions {
            config_file: Some(path),
            env_prefix: Some(prefix.into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(isolated(dir.path().join("missing.yaml"), "READABLE_T1")).unwrap();
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api.timeout, Duration::from_secs(20));
        assert_eq!(cfg.ui.sort_order, SortOrder::VoteScore);
        assert_eq!(cfg.ui.notice_ttl, Duration::from_secs(6));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api:\n  base_url: http://board.test:4000\n  timeout: 5s\n  headers:\n    Authorization: token\nui:\n  sort_order: timestamp\n  author: thingone\n",
        )
        .unwrap();

        let cfg = load(isolated(path, "READABLE_T2")).unwrap();
        assert_eq!(cfg.api.base_url, "http://board.test:4000");
        assert_eq!(cfg.api.timeout, Duration::from_secs(5));
        assert_eq!(
            cfg.api.headers.get("Authorization").map(String::as_str),
            Some("token")
        );
        assert_eq!(cfg.ui.sort_order, SortOrder::Timestamp);
        assert_eq!(cfg.ui.author, "thingone");
        assert_eq!(cfg.ui.tick_rate, Duration::from_millis(120));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "api: [not, a, map").unwrap();
        let err = load(isolated(path, "READABLE_T3")).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "api:\n  timeout: 5s\nui:\n  sort_order: timestamp\n").unwrap();

        env::set_var("READABLE_T4_UI__SORT_ORDER", "voteScore");
        env::set_var("READABLE_T4_API__BASE_URL", "http://env.test");
        env::set_var("READABLE_T4_UI__NOTICE_TTL", "2s");
        let cfg = load(isolated(path, "READABLE_T4")).unwrap();
        env::remove_var("READABLE_T4_UI__SORT_ORDER");
        env::remove_var("READABLE_T4_API__BASE_URL");
        env::remove_var("READABLE_T4_UI__NOTICE_TTL");

        assert_eq!(cfg.api.base_url, "http://env.test");
        assert_eq!(cfg.api.timeout, Duration::from_secs(5));
        assert_eq!(cfg.ui.notice_ttl, Duration::from_secs(2));
        // an env value equal to the default cannot undo a file setting
        assert_eq!(cfg.ui.sort_order, SortOrder::Timestamp);
    }

    #[test]
    fn null_log_file_turns_logging_off() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "logging:\n  level: debug\n  file: ~\n").unwrap();

        let cfg = load(isolated(path.clone(), "READABLE_T5")).unwrap();
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.file, None);

        env::set_var("READABLE_T6_LOGGING__FILE", "");
        let cfg = load(isolated(dir.path().join("missing.yaml"), "READABLE_T6")).unwrap();
        env::remove_var("READABLE_T6_LOGGING__FILE");
        if Config::default().logging.file.is_some() {
            assert_eq!(cfg.logging.file, None);
        }
    }

    #[test]
    fn env_headers_parse_pairs() {
        let mut cfg = Config::default();
        apply_env_value(&mut cfg, "api.headers", "Authorization=abc, X-Trace = 1,bogus".into());
        assert_eq!(cfg.api.headers.len(), 2);
        assert_eq!(cfg.api.headers.get("X-Trace").map(String::as_str), Some("1"));
    }
}
