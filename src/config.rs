use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::apod::APOD_FEED_URL;
use crate::gallery::DEFAULT_GALLERY_SIZE;

const DEFAULT_ENV_PREFIX: &str = "APOD_TUI";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_feed_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            user_agent: default_user_agent(),
            timeout: default_feed_timeout(),
        }
    }
}

fn default_feed_url() -> String {
    APOD_FEED_URL.to_string()
}

fn default_user_agent() -> String {
    format!("apod-tui/{}", crate::VERSION)
}

fn default_feed_timeout() -> Duration {
    Duration::from_secs(20)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryConfig {
    #[serde(default = "default_gallery_size")]
    pub size: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            size: default_gallery_size(),
        }
    }
}

fn default_gallery_size() -> usize {
    DEFAULT_GALLERY_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_thumbnails")]
    pub thumbnails: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            thumbnails: default_thumbnails(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

fn default_thumbnails() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_video_command")]
    pub video_command: Vec<String>,
    #[serde(default = "default_video_detach")]
    pub video_detach: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            video_command: default_video_command(),
            video_detach: default_video_detach(),
        }
    }
}

fn default_video_command() -> Vec<String> {
    vec!["mpv".into(), "%URL%".into()]
}

fn default_video_detach() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("apod-tui").join("apod-tui.log"))
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
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.feed.url.trim().is_empty() {
        base.feed.url = other.feed.url;
    }
    if !other.feed.user_agent.trim().is_empty() {
        base.feed.user_agent = other.feed.user_agent;
    }
    if !other.feed.timeout.is_zero() {
        base.feed.timeout = other.feed.timeout;
    }

    if other.gallery.size != 0 {
        base.gallery.size = other.gallery.size;
    }

    if !other.ui.theme.is_empty() {
        base.ui.theme = other.ui.theme;
    }
    base.ui.thumbnails = other.ui.thumbnails;

    if !other.player.video_command.is_empty() {
        base.player.video_command = other.player.video_command;
    }
    base.player.video_detach = other.player.video_detach;

    if !other.logging.level.trim().is_empty() {
        base.logging.level = other.logging.level;
    }
    if other.logging.file.is_some() {
        base.logging.file = other.logging.file;
    }

    base
}

/// Overrides from `<PREFIX>_<SECTION>__<KEY>` variables. Values that don't
/// parse are ignored.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "feed.url" => cfg.feed.url = value,
        "feed.user_agent" => cfg.feed.user_agent = value,
        "feed.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.timeout = duration;
            }
        }
        "gallery.size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                if parsed > 0 {
                    cfg.gallery.size = parsed;
                }
            }
        }
        "ui.theme" => cfg.ui.theme = value,
        "ui.thumbnails" => cfg.ui.thumbnails = truthy(&value),
        "player.video_command" => {
            cfg.player.video_command = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "player.video_detach" => cfg.player.video_detach = truthy(&value),
        "logging.level" => cfg.logging.level = value,
        "logging.file" => cfg.logging.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("apod-tui").join("config.yaml"))
}
