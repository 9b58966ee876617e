use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{Context, OptionExt, Result, eyre};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::query::SortSpec;
use crate::services::spotify::api::DEFAULT_API_BASE;
use crate::sync::SyncPlaylistSpec;

const APP_DIR: &str = "library-sync";

const DEFAULT_CONFIG: &str = r#"# Entity library exported as JSON (entity ID -> fields)
library = "~/Music/library.json"

# Remote user that owns created playlists
owner_id = "your-user-id"

[rate_limit]
max_concurrent_calls = 4
min_interval = "100ms"
call_timeout = "10s"

[sync]
concurrency = 1
max_conflict_retries = 3

[[playlists]]
name = "Most played house"
filters = [{ kind = "text", field = "genres", value = "house", mode = "union" }]
sort = ["scrobbles", "DESC"]
limit = 50
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    library: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    pub owner_id: String,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub playlists: Vec<SyncPlaylistSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,
    #[serde(default = "default_min_interval", with = "humantime_duration")]
    pub min_interval: Duration,
    #[serde(default = "default_call_timeout", with = "humantime_duration")]
    pub call_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: default_max_concurrent_calls(),
            min_interval: default_min_interval(),
            call_timeout: default_call_timeout(),
        }
    }
}

fn default_max_concurrent_calls() -> usize {
    4
}

fn default_min_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Playlists reconciled at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_max_conflict_retries() -> usize {
    3
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort: Option<SortSpec>,
}

/// Durations written the humantime way: "150ms", "10s", "1m 30s".
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(D::Error::custom)
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config location: `<config dir>/library-sync/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join(APP_DIR).join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or_eyre("Config file not found")?;
        Self::from_file(&config_path)
    }

    /// Writes the starter config to the default location unless one exists.
    pub fn create_default() -> Result<PathBuf> {
        let config_path = Self::config_path().ok_or_eyre("No config directory available")?;
        Self::create_default_at(&config_path)?;
        Ok(config_path)
    }

    fn create_default_at(path: &Path) -> Result<()> {
        if path.exists() {
            log::info!("Config already exists at: {}", path.display());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }
        std::fs::write(path, DEFAULT_CONFIG)
            .context(format!("Failed to write config file: {}", path.display()))?;
        log::info!("Wrote default config to: {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for spec in &self.playlists {
            if spec.name.trim().is_empty() {
                return Err(eyre!("Playlist names must not be empty"));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(eyre!("Playlist '{}' is defined more than once", spec.name));
            }
        }
        if self.rate_limit.max_concurrent_calls == 0 {
            return Err(eyre!("rate_limit.max_concurrent_calls must be at least 1"));
        }
        Ok(())
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn library_path(&self) -> PathBuf {
        Self::expand_path(&self.library)
    }

    /// Configured database path, or `<data dir>/library-sync/sync.db`.
    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) => Self::expand_path(path),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("sync.db"),
        }
    }

    /// API base URL, with the trailing slash `Url::join` needs.
    pub fn api_base(&self) -> Result<Url> {
        let mut base = self.spotify.api_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base).context(format!("Invalid spotify.api_base: {}", self.spotify.api_base))
    }

    pub fn playlist(&self, name: &str) -> Option<&SyncPlaylistSpec> {
        self.playlists.iter().find(|spec| spec.name == name)
    }
}
