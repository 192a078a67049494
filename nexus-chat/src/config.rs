// Configuration loading and parsing (nexus.toml, session.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::protocol::BackendKind;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },

    #[error("failed to create message store directory {path}: {message}")]
    StoreDirError { path: PathBuf, message: String },

    #[error("no data directory available for the message store; set store.path")]
    NoDataDir,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub widget: WidgetConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Address the relay binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// URL the widget connects to.
    pub fn server_url(&self) -> String {
        format!("ws://{}:{}", self.server.host, self.server.port)
    }

    /// History rows served on `select_messages`; `None` means all.
    pub fn history_limit(&self) -> Option<usize> {
        match self.widget.history_limit {
            0 => None,
            n => Some(n),
        }
    }
}

/// Raw deserialization target for nexus.toml.
#[derive(Debug, Clone, Deserialize)]
struct NexusFile {
    server: ServerConfig,
    #[serde(default)]
    store: StoreConfig,
    widget: WidgetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// SQLite file for the messages table. Empty means the platform data
    /// directory.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    pub backend: BackendKind,
    #[serde(default)]
    pub history_limit: usize,
}

// ---------------------------------------------------------------------------
// session.toml
// ---------------------------------------------------------------------------

/// The signed-in user, as handed over by the external auth service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/nexus.toml` and (optionally)
/// `config/session.toml` relative to `base_dir`. Does not copy defaults.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let nexus_path = config_dir.join("nexus.toml");
    let nexus_text = read_file(&nexus_path)?;
    let nexus: NexusFile = toml::from_str(&nexus_text).map_err(|e| ConfigError::ParseError {
        path: nexus_path.clone(),
        source: e,
    })?;

    let session_path = config_dir.join("session.toml");
    let session = if session_path.exists() {
        let text = read_file(&session_path)?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: session_path.clone(),
            source: e,
        })?
    } else {
        SessionConfig::default()
    };

    let config = Config {
        server: nexus.server,
        store: nexus.store,
        widget: nexus.widget,
        session,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy files from `defaults/` into `config/` unless they already exist.
/// Returns the files that were copied. `.example` files are skipped.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

/// Where the message store lives: `store.path` if set, otherwise
/// `<data dir>/nexus.db`. Creates the parent directory.
pub fn resolve_store_path(config: &StoreConfig) -> Result<PathBuf, ConfigError> {
    let path = if config.path.trim().is_empty() {
        let dirs = ProjectDirs::from("dev", "nexus", "nexus-chat").ok_or(ConfigError::NoDataDir)?;
        dirs.data_dir().join("nexus.db")
    } else {
        PathBuf::from(&config.path)
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::StoreDirError {
            path: parent.to_path_buf(),
            message: e.to_string(),
        })?;
    }
    Ok(path)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.host.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.host".into(),
            message: "must not be empty".into(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError {
            field: "server.port".into(),
            message: "must be greater than 0".into(),
        });
    }

    if let Some(user_id) = &config.session.user_id {
        if user_id.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: "session.user_id".into(),
                message: "must not be blank when present".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
