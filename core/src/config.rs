use crate::errors::{GeminiError, GeminiResult};
use crate::types::{DEFAULT_SPECIALIST_MODEL, DEFAULT_TUTOR_MODEL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used under `~/.config`
pub const APP_NAME: &str = "ai-tutor";

/// Configuration struct for Gemini API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    /// Model used by the orchestrator for classification and general answers
    pub model_name: Option<String>,
    /// Model used by the subject specialists
    pub specialist_model_name: Option<String>,
    /// Upper bound on the length of generated answers; the service default when unset
    pub max_output_tokens: Option<i32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: Some(DEFAULT_TUTOR_MODEL.to_string()),
            specialist_model_name: Some(DEFAULT_SPECIALIST_MODEL.to_string()),
            max_output_tokens: None,
        }
    }
}

impl GeminiConfig {
    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            specialist_model_name: other
                .specialist_model_name
                .clone()
                .or_else(|| self.specialist_model_name.clone()),
            max_output_tokens: other.max_output_tokens.or(self.max_output_tokens),
        }
    }
}

/// Session store settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection URL of the durable key/value backend
    pub redis_url: String,
    /// Timeout of the start-up probe that decides between durable and in-memory storage
    pub connect_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            connect_timeout_ms: 2000,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// HTTP transport settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub http_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Unified configuration for the tutor daemon
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TutorConfig {
    pub environment: String,
    pub gemini: GeminiConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            gemini: GeminiConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl TutorConfig {
    /// Load the file at `path` (or the default location), then apply `.env` and
    /// process environment overrides.
    pub fn load(path: Option<&Path>) -> GeminiResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => get_default_config_file(APP_NAME)?,
        };
        let mut config = Self::load_from_file(&path)?;

        // A missing .env file is fine
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(GeminiError::ConfigError(format!(
                    "Failed to read .env file: {}",
                    e
                )));
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> GeminiResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> GeminiResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            GeminiError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        // Ensure the directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GeminiError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            GeminiError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Overlay values found through `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let from_env = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            model_name: get("GEMINI_MODEL"),
            specialist_model_name: get("GEMINI_SPECIALIST_MODEL"),
            max_output_tokens: get("GEMINI_MAX_OUTPUT_TOKENS").and_then(|v| v.trim().parse().ok()),
        };
        self.gemini = self.gemini.merge(&from_env);

        if let Some(url) = get("REDIS_URL") {
            self.store.redis_url = url;
        }
        if let Some(environment) = get("ENVIRONMENT") {
            self.environment = environment;
        }
        if let Some(addr) = get("TUTOR_HTTP_ADDR") {
            self.server.http_addr = addr;
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> GeminiResult<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        GeminiError::ConfigError("Could not determine home directory".to_string())
    })?;

    let config_dir = home_dir.join(".config").join(app_name);

    Ok(config_dir)
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> GeminiResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
