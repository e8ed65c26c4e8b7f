use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::image_data::DEFAULT_MAX_DIMENSION;
use crate::query::AiAutoGeneratedField;

/// Top-level configuration.
///
/// Controls which AI services to use and which fields are generated
/// automatically once an image is available.
///
/// # Loading
///
/// ```rust,no_run
/// use ai_image_queries::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.ai_services.openai.api_key = "sk-...".into();
/// config.ai_services.openai.enabled = true;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AI service configurations (OpenAI, Gemini, Cloudflare).
    pub ai_services: AiServices,
    /// Order in which AI services are tried (failover chain).
    pub service_order: Vec<String>,
    /// Which fields to generate and how the image is prepared.
    #[serde(default)]
    pub queries: QueryConfig,
}

/// Configuration for all available AI services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiServices {
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
    pub cloudflare: CloudflareConfig,
}

/// OpenAI service configuration (GPT-4o-mini, GPT-4o, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub enabled: bool,
}

/// Google Gemini service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub enabled: bool,
}

/// Cloudflare Workers AI service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    pub account_id: String,
    pub api_token: String,
    pub model: String,
    pub enabled: bool,
}

/// Query behavior.
///
/// # Example
///
/// ```rust
/// use ai_image_queries::config::QueryConfig;
/// use ai_image_queries::query::AiAutoGeneratedField;
///
/// let queries = QueryConfig {
///     auto_generate: vec![AiAutoGeneratedField::Title, AiAutoGeneratedField::Tags],
///     max_dimension: 768,
/// };
/// assert_eq!(queries.auto_generate.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Fields requested automatically once an image is available.
    pub auto_generate: Vec<AiAutoGeneratedField>,
    /// Longest edge, in pixels, of the image sent to AI services.
    pub max_dimension: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            auto_generate: AiAutoGeneratedField::ALL.to_vec(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ai_services: AiServices {
                openai: OpenAiConfig {
                    api_key: String::new(),
                    model: "gpt-4o-mini".to_string(),
                    enabled: true,
                },
                gemini: GeminiConfig {
                    api_key: String::new(),
                    model: "gemini-2.0-flash".to_string(),
                    enabled: false,
                },
                cloudflare: CloudflareConfig {
                    account_id: String::new(),
                    api_token: String::new(),
                    model: "@cf/llava-hf/llava-1.5-7b-hf".to_string(),
                    enabled: false,
                },
            },
            service_order: vec![
                "openai".to_string(),
                "gemini".to_string(),
                "cloudflare".to_string(),
            ],
            queries: QueryConfig::default(),
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Get the ordered list of enabled AI services.
    pub fn enabled_services(&self) -> Vec<String> {
        self.service_order
            .iter()
            .filter(|name| match name.as_str() {
                "openai" => self.ai_services.openai.enabled,
                "gemini" => self.ai_services.gemini.enabled,
                "cloudflare" => self.ai_services.cloudflare.enabled,
                other => {
                    log::warn!("Unknown AI service in service_order: {other}");
                    false
                }
            })
            .cloned()
            .collect()
    }
}
