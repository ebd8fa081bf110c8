use crate::template::{parse_template, TemplateError, DEFAULT_TEMPLATE};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PHOTO_LABEL: &str = "Foto";
pub const DEFAULT_VIDEO_LABEL: &str = "Film";
pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid template: {0}")]
    Template(#[from] TemplateError),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("geocoder timeout must be at least one second")]
    ZeroTimeout,
}

/// What goes into `{label}` once a place is known.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationStyle {
    /// Full provider display name with separators flattened.
    #[default]
    Display,
    /// City, then county, then the display name.
    City,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub user_agent: String,
    pub language: Option<String>,
    pub timeout_secs: u64,
    pub pacing_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
            user_agent: concat!("media-renamer/", env!("CARGO_PKG_VERSION")).to_string(),
            language: None,
            timeout_secs: 10,
            pacing_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub template: String,
    pub pad_date_components: bool,
    pub photo_label: String,
    pub video_label: String,
    pub location_style: LocationStyle,
    pub recursive_default: bool,
    pub include_hidden_default: bool,
    pub max_filename_len: usize,
    pub geocoder: GeocoderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            pad_date_components: false,
            photo_label: DEFAULT_PHOTO_LABEL.to_string(),
            video_label: DEFAULT_VIDEO_LABEL.to_string(),
            location_style: LocationStyle::Display,
            recursive_default: false,
            include_hidden_default: true,
            max_filename_len: 240,
            geocoder: GeocoderConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_template(&self.template)?;
        if self.photo_label.trim().is_empty() {
            return Err(ConfigError::Empty("photo_label"));
        }
        if self.video_label.trim().is_empty() {
            return Err(ConfigError::Empty("video_label"));
        }
        if self.geocoder.enabled {
            if self.geocoder.endpoint.trim().is_empty() {
                return Err(ConfigError::Empty("geocoder.endpoint"));
            }
            if self.geocoder.user_agent.trim().is_empty() {
                return Err(ConfigError::Empty("geocoder.user_agent"));
            }
            if self.geocoder.timeout_secs == 0 {
                return Err(ConfigError::ZeroTimeout);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
    pub undo_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("org", "media-renamer", "media-renamer")
        .context("could not determine the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        undo_path: config_dir.join("undo-last.json"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

/// Missing file means defaults; a present file must parse and validate.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("cannot parse config file: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config file: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    save_config_to(config, &paths.config_path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(config).context("cannot serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("cannot write config file: {}", path.display()))?;
    Ok(())
}
