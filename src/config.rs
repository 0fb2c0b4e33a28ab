use crate::judge::{PromptPreset, PromptTemplate};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub otr: OtrConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct OtrConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Cutoff used by `score` when --k is not given
    #[serde(default = "default_k")]
    pub default_k: usize,
}

impl Default for OtrConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_k: default_k(),
        }
    }
}

/// Relevance judge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Built-in prompt: "verbose" or "concise"
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Custom template file with {query} and {document}; overrides `prompt`
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub lenient_json: bool,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
            prompt: default_prompt(),
            prompt_file: None,
            concurrency: default_concurrency(),
            lenient_json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_k() -> usize {
    10
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    crate::judge::openai::DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_prompt() -> String {
    "verbose".to_string()
}

fn default_concurrency() -> usize {
    1
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in OTR_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (defaults are used if absent)
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        match std::env::var("OTR_CONFIG") {
            Ok(path) => Self::load_from(Path::new(&path)),
            Err(_) => {
                let path = PathBuf::from("config.toml");
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    let config = Config::default();
                    config.validate()?;
                    Ok(config)
                }
            }
        }
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// The API key is not checked here; it is only needed by commands that
    /// call the completion API (see [`JudgeConfig::api_key`]).
    fn validate(&self) -> Result<()> {
        if self.judge.provider != "openai" {
            anyhow::bail!(
                "judge.provider '{}' is not supported (expected \"openai\")",
                self.judge.provider
            );
        }

        if self.judge.model.trim().is_empty() {
            anyhow::bail!("judge.model must not be empty");
        }

        url::Url::parse(&self.judge.base_url).with_context(|| {
            format!("judge.base_url is not a valid URL: {}", self.judge.base_url)
        })?;

        if !(0.0..=2.0).contains(&self.judge.temperature) {
            anyhow::bail!("judge.temperature must be between 0.0 and 2.0");
        }

        if self.judge.timeout_secs == 0 {
            anyhow::bail!("judge.timeout_secs must be greater than 0");
        }

        if self.judge.concurrency == 0 {
            anyhow::bail!("judge.concurrency must be greater than 0");
        }

        if self.judge.prompt_file.is_none() {
            self.judge
                .prompt
                .parse::<PromptPreset>()
                .map_err(|e| anyhow::anyhow!("judge.prompt: {}", e))?;
        }

        if self.otr.default_k == 0 {
            anyhow::bail!("otr.default_k must be greater than 0");
        }

        Ok(())
    }
}

impl JudgeConfig {
    /// Read the API key from the environment variable named by `api_key_env`
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env).with_context(|| {
            format!(
                "Environment variable {} not set. Set it in your .env file or as an \
                 environment variable with your API key.",
                self.api_key_env
            )
        })
    }

    /// Prompt template: `prompt_file` if set, otherwise the named preset
    pub fn template(&self) -> Result<PromptTemplate> {
        match &self.prompt_file {
            Some(path) => Ok(PromptTemplate::from_file(path)?),
            None => Ok(PromptTemplate::preset(self.prompt.parse()?)),
        }
    }
}
