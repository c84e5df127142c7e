use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::{CacheSettings, LoadingPolicy, DEFAULT_PREFETCH_PAGES};
use crate::list::DEFAULT_PER_PAGE;

/// Environment variable holding the API bearer token.
pub const TOKEN_ENV: &str = "SKILLADM_API_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the admin backend, e.g. https://admin.example.com/api
  pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
  /// Seconds before cached data is considered stale
  pub stale_time_secs: u64,
  pub prefetch_pages: u32,
  pub per_page: u32,
  pub loading_policy: LoadingPolicy,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: 300,
      prefetch_pages: DEFAULT_PREFETCH_PAGES,
      per_page: DEFAULT_PER_PAGE,
      loading_policy: LoadingPolicy::default(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./skilladm.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/skilladm/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/skilladm/config.yaml\n\
         See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("skilladm.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("skilladm").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  pub fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    if config.api.url.trim().is_empty() {
      return Err(eyre!("api.url must not be empty in {}", path.display()));
    }
    Ok(config)
  }

  /// Get the API token from the environment, if one is set.
  pub fn get_api_token() -> Option<String> {
    std::env::var(TOKEN_ENV)
      .ok()
      .filter(|token| !token.trim().is_empty())
  }

  pub fn cache_settings(&self) -> CacheSettings {
    // chrono caps durations at i64::MAX milliseconds
    let secs = self.cache.stale_time_secs.min(i64::MAX as u64 / 1000) as i64;
    CacheSettings {
      stale_time: Duration::seconds(secs),
      prefetch_pages: self.cache.prefetch_pages,
      loading_policy: self.cache.loading_policy,
    }
  }
}
