use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Loaded from the config file, then overridden by env vars and CLI args.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub giphy: GiphyConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub favorites: FavoritesConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load config from the default location, or defaults if there is none
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `<config dir>/grippy/config.toml` (XDG on Linux, AppData on Windows)
    pub fn config_path() -> crate::Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| crate::Error::Config("Could not find config directory".into()))?
            .join("grippy")
            .join("config.toml"))
    }

    /// `<data dir>/grippy`, home of the local database, session and logs
    pub fn data_dir() -> crate::Result<PathBuf> {
        Ok(dirs::data_dir()
            .ok_or_else(|| crate::Error::Config("Could not find data directory".into()))?
            .join("grippy"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiphyConfig {
    /// Get one at https://developers.giphy.com/dashboard/
    pub api_key: Option<String>,

    #[serde(default = "default_giphy_url")]
    pub api_url: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_giphy_url() -> String {
    "https://api.giphy.com".to_string()
}

fn default_page_size() -> u32 {
    crate::models::DEFAULT_PAGE_SIZE
}

impl Default for GiphyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_giphy_url(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Firebase,
}

impl std::str::FromStr for BackendKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "firebase" => Ok(BackendKind::Firebase),
            other => Err(crate::Error::Config(format!("Unknown backend '{}'", other))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Firebase => write!(f, "firebase"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    #[serde(default)]
    pub local: LocalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FirebaseConfig {
    /// Web API key from the Firebase console
    pub api_key: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Defaults to `<data dir>/grippy/grippy.db`
    pub db_path: Option<PathBuf>,

    #[serde(default = "default_session_days")]
    pub session_days: u32,
}

fn default_session_days() -> u32 {
    30
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            session_days: default_session_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before live input triggers a search
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoritesConfig {
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_list_limit() -> usize {
    crate::models::DEFAULT_LIST_LIMIT
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            list_limit: default_list_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_mouse")]
    pub mouse_enabled: bool,
}

fn default_mouse() -> bool {
    false
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            mouse_enabled: default_mouse(),
        }
    }
}
