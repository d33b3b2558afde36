use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::DEFAULT_CACHE_PATH;
use crate::error::DashError;

/// Bounds on the two fetch tunables; together they cap the worst case at
/// `max_pages` upstream requests.
pub const PER_PAGE_RANGE: (u32, u32) = (10, 200);
pub const MAX_PAGES_RANGE: (u32, u32) = (1, 50);

pub const DEFAULT_PER_PAGE: u32 = 50;
pub const DEFAULT_MAX_PAGES: u32 = 4;

const CONFIG_FILE: &str = "rundash.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default)]
    pub cache_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub per_page: u32,
    pub max_pages: u32,
    pub cache_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            cache_path: DEFAULT_CACHE_PATH.to_string(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `rundash.json` when present; an explicit path must exist. The
    /// absent default file just yields the built-in settings.
    pub fn resolve(path: Option<&str>) -> Result<Settings, DashError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| DashError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DashError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> Settings {
        Settings {
            per_page: clamp_tunable("per_page", config.per_page, DEFAULT_PER_PAGE, PER_PAGE_RANGE),
            max_pages: clamp_tunable(
                "max_pages",
                config.max_pages,
                DEFAULT_MAX_PAGES,
                MAX_PAGES_RANGE,
            ),
            cache_path: config
                .cache_path
                .unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string()),
        }
    }
}

fn clamp_tunable(name: &str, value: Option<u32>, default: u32, (min, max): (u32, u32)) -> u32 {
    let Some(value) = value else {
        return default;
    };
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(name, value, clamped, "config value out of range, clamped");
    }
    clamped
}
