//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. agri-agent.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::history::DEFAULT_MAX_MESSAGES;
use crate::Error;

/// Default config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "agri-agent.toml";

/// LLM configuration (OpenAI-compatible endpoint, LM Studio by default)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key sent as bearer token
    #[serde(default = "default_api_key")]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the chat-completion service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Overall request timeout in seconds (unset = no timeout)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins (e.g., ["http://localhost:5173"])
    /// If empty, any origin is allowed
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            allowed_origins: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Directory holding one JSON file per session
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Persistence cap, applied after every turn
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Number of recent messages included in each prompt
    #[serde(default = "default_history_window")]
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_messages: default_max_messages(),
            window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Location used when a request doesn't name one
    #[serde(default = "default_location")]
    pub default_location: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            default_location: default_location(),
        }
    }
}

/// Main configuration for agri-agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

fn default_api_key() -> String {
    "lm-studio".to_string()
}

fn default_model() -> String {
    "qwen2.5-7b-instruct".to_string()
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_temperature() -> f32 {
    0.4
}

fn default_api_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_max_messages() -> usize {
    DEFAULT_MAX_MESSAGES
}

fn default_history_window() -> usize {
    10
}

fn default_location() -> String {
    "India".to_string()
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next(); // '{' を消費

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換され、
    /// その後に環境変数による上書きが適用されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;

        // 既存の環境変数で上書き（環境変数が優先）
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Parse configuration from TOML text (env placeholders are expanded first)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./agri-agent.toml` があればそれを使い、
    /// 見つからない場合は環境変数とデフォルト値のみ
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Ok(Self::from_env())
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        // LLM 設定の上書き
        if let Some(model) = non_empty_var("LM_MODEL") {
            self.llm.model = model;
        }
        if let Some(base_url) = non_empty_var("LM_STUDIO_BASE_URL") {
            self.llm.base_url = base_url;
        }
        if let Some(api_key) = non_empty_var("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(temperature) = parsed_var("LLM_TEMPERATURE") {
            self.llm.temperature = temperature;
        }
        if let Some(secs) = parsed_var("LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = Some(secs);
        }

        // API 設定の上書き
        if let Some(port) = parsed_var("API_PORT") {
            self.api.port = port;
        }
        if let Some(origins) = non_empty_var("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        // 履歴設定の上書き
        if let Some(dir) = non_empty_var("HISTORY_DATA_DIR") {
            self.history.data_dir = PathBuf::from(dir);
        }
        if let Some(max) = parsed_var("HISTORY_MAX_MESSAGES") {
            self.history.max_messages = max;
        }
        if let Some(window) = parsed_var("HISTORY_WINDOW") {
            self.history.window = window;
        }

        if let Some(location) = non_empty_var("DEFAULT_LOCATION") {
            self.prompt.default_location = location;
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    non_empty_var(name).and_then(|v| v.parse().ok())
}
