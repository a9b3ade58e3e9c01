//! Configuration management for Augur.
//!
//! This module handles loading and merging configuration from multiple sources,
//! lowest precedence first:
//! - Built-in defaults (the demo setup)
//! - Config file (`augur.yaml` in the current directory, or an explicit path)
//! - Environment variables
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::telemetry::{self, TelemetryConfig, PROJECT_NAME_ENV};

/// Config file looked up in the current directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "augur.yaml";

/// Default hosted model, as `<provider>/<model>`.
pub const DEFAULT_MODEL: &str = "openai/gpt-4.1-nano";

/// Providers the LLM factory knows how to build.
///
/// Must match the names accepted by `augur_llm::ProviderType::parse`;
/// `augur-llm` tests the two against each other.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "ollama", "ollama_chat"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// Language-model settings
    pub lm: LmConfig,

    /// Trace export settings
    pub telemetry: TelemetryConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Language-model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmConfig {
    /// Model identifier, `<provider>/<model>`
    pub model: String,

    /// Explicit API key (takes precedence over `api_key_env`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Custom provider base URL
    pub api_base: Option<String>,

    /// Answer identical requests from the in-memory cache
    pub cache: bool,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_env: None,
            api_base: None,
            cache: false,
            temperature: 0.0,
            max_tokens: 4000,
        }
    }
}

impl LmConfig {
    /// Provider prefix of the model identifier (`openai` when absent).
    pub fn provider(&self) -> &str {
        match self.model.split_once('/') {
            Some((provider, _)) => provider,
            None => "openai",
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    lm: Option<LmSection>,
    telemetry: Option<TelemetrySection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LmSection {
    model: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
    #[serde(rename = "apiBase")]
    api_base: Option<String>,
    cache: Option<bool>,
    temperature: Option<f32>,
    #[serde(rename = "maxTokens")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TelemetrySection {
    enabled: Option<bool>,
    endpoint: Option<String>,
    #[serde(rename = "projectName")]
    project_name: Option<String>,
    batch: Option<bool>,
    #[serde(rename = "autoInstrument")]
    auto_instrument: Option<bool>,
    verbose: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            lm: LmConfig::default(),
            telemetry: TelemetryConfig::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `AUGUR_CONFIG`: Path to config file
    /// - `AUGUR_MODEL`: Model identifier (`<provider>/<model>`)
    /// - `AUGUR_API_KEY`: API key for the model provider
    /// - `OPENAI_API_BASE` / `OPENAI_BASE_URL`: OpenAI-compatible base URL
    /// - `PROJECT_NAME`: Project label for trace export
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use augur_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None).expect("Failed to load config");
    /// println!("Model: {}", config.lm.model);
    /// ```
    pub fn load(config_file: Option<PathBuf>) -> AppResult<Self> {
        let lookup = |key: &str| std::env::var(key).ok();

        let config_file = config_file.or_else(|| lookup("AUGUR_CONFIG").map(PathBuf::from));
        let config_path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Some(path)
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                path.exists().then_some(path)
            }
        };

        let mut config = Self::default();
        if let Some(path) = config_path {
            config = config.merge_yaml(&path)?;
        }

        Ok(config.apply_env(lookup))
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut result = self.merge_yaml_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        result.config_file = Some(path.to_path_buf());

        Ok(result)
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(lm) = config_file.lm {
            if let Some(model) = lm.model {
                result.lm.model = model;
            }
            if lm.api_key_env.is_some() {
                result.lm.api_key_env = lm.api_key_env;
            }
            if lm.api_base.is_some() {
                result.lm.api_base = lm.api_base;
            }
            if let Some(cache) = lm.cache {
                result.lm.cache = cache;
            }
            if let Some(temperature) = lm.temperature {
                result.lm.temperature = temperature;
            }
            if let Some(max_tokens) = lm.max_tokens {
                result.lm.max_tokens = max_tokens;
            }
        }

        if let Some(t) = config_file.telemetry {
            if let Some(enabled) = t.enabled {
                result.telemetry.enabled = enabled;
            }
            if let Some(endpoint) = t.endpoint {
                result.telemetry.endpoint = endpoint;
            }
            if let Some(project_name) = t.project_name {
                result.telemetry.project_name = project_name;
            }
            if let Some(batch) = t.batch {
                result.telemetry.batch = batch;
            }
            if let Some(auto_instrument) = t.auto_instrument {
                result.telemetry.auto_instrument = auto_instrument;
            }
            if let Some(verbose) = t.verbose {
                result.telemetry.verbose = verbose;
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply environment variables, read through `lookup`.
    ///
    /// An unset `PROJECT_NAME` keeps the configured label, which defaults to
    /// `dspy-demo`.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("AUGUR_MODEL") {
            self.lm.model = model;
        }

        if let Some(api_key) = lookup("AUGUR_API_KEY") {
            self.lm.api_key = Some(api_key);
        }

        if self.lm.provider() == "openai" {
            if let Some(base) = lookup("OPENAI_API_BASE").or_else(|| lookup("OPENAI_BASE_URL")) {
                self.lm.api_base = Some(base);
            }
        }

        if let Some(project_name) = lookup(PROJECT_NAME_ENV) {
            self.telemetry.project_name = telemetry::resolve_project_name(Some(project_name));
        }

        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    pub fn with_overrides(
        mut self,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        no_telemetry: bool,
    ) -> Self {
        if let Some(model) = model {
            self.lm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if no_telemetry {
            self.telemetry.enabled = false;
        }

        self
    }

    /// Resolve the API key for the configured provider.
    ///
    /// Order: explicit key, the configured `api_key_env`, then the
    /// provider's conventional variable (`OPENAI_API_KEY`).
    pub fn resolve_api_key<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref key) = self.lm.api_key {
            return Some(key.clone());
        }

        if let Some(ref env_var) = self.lm.api_key_env {
            if let Some(key) = lookup(env_var) {
                return Some(key);
            }
        }

        match self.lm.provider() {
            "openai" => lookup("OPENAI_API_KEY"),
            _ => None,
        }
    }

    /// Validate configuration for the active provider.
    pub fn validate<F>(&self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = self.lm.provider();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "openai" && self.resolve_api_key(lookup).is_none() {
            let env_var = self.lm.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        Ok(())
    }
}
