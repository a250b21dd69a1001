//! Configuration management for the quiz benchmark
//!
//! Loads provider, generation, judge and output settings from a TOML file and
//! provides runtime access.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Model provider connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_name")]
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Requests per minute
    #[serde(default = "default_rpm")]
    pub rpm: u32,
    /// Tokens per minute
    #[serde(default = "default_tpm")]
    pub tpm: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            rpm: default_rpm(),
            tpm: default_tpm(),
        }
    }
}

/// Generation parameters sent with every question. Unset fields are omitted
/// from the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Structured output request, e.g. `{ type = "json_object" }`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
    /// Extra provider-specific fields merged into the request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_body: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            seed: None,
            stop: None,
            response_format: None,
            extra_body: None,
        }
    }
}

/// Benchmark execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Models to run when none are given on the command line
    #[serde(default)]
    pub models: Vec<String>,
    /// Test names (file stems) to run when none are given on the command line
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default = "default_tests_dir")]
    pub tests_dir: String,
    /// Questions of one test in flight at once
    #[serde(default = "default_parallel_requests")]
    pub parallel_requests: usize,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            tests: Vec::new(),
            tests_dir: default_tests_dir(),
            parallel_requests: default_parallel_requests(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// What the model-backed judge answers when it cannot reach a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeFailureMode {
    /// Treat the answer as not equivalent
    #[default]
    Reject,
    /// Fall back to fuzzy similarity at `fallback_threshold`
    Similarity,
}

/// Semantic judge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Use a model as judge for text compared by "model"; otherwise the
    /// similarity stand-in is used
    #[serde(default)]
    pub enabled: bool,
    /// Judge model id; defaults to the model under test
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_judge_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub on_failure: JudgeFailureMode,
    #[serde(default = "default_judge_threshold")]
    pub fallback_threshold: u8,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: None,
            timeout_ms: default_judge_timeout_ms(),
            on_failure: JudgeFailureMode::Reject,
            fallback_threshold: default_judge_threshold(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Append-only run ledger, one JSON record per (model, test)
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
    #[serde(default = "default_true")]
    pub write_transcripts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            ledger_file: default_ledger_file(),
            write_transcripts: true,
        }
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_provider_name() -> String { "openrouter".to_string() }
fn default_base_url() -> String { "https://openrouter.ai/api/v1".to_string() }
fn default_api_key_env() -> String { "OPENROUTER_API_KEY".to_string() }
fn default_rpm() -> u32 { 60 }
fn default_tpm() -> u32 { 100_000 }
fn default_temperature() -> Option<f32> { Some(0.2) }
fn default_tests_dir() -> String { "tests".to_string() }
fn default_parallel_requests() -> usize { 1 }
fn default_retry_count() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 1000 }
fn default_max_retry_delay_ms() -> u64 { 60_000 }
fn default_timeout_ms() -> u64 { 120_000 }
fn default_judge_timeout_ms() -> u64 { 60_000 }
fn default_judge_threshold() -> u8 { grader::FALLBACK_JUDGE_THRESHOLD }
fn default_output_dir() -> String { "result".to_string() }
fn default_ledger_file() -> String { "report.jsonl".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = [
            "config/quiz-bench.toml",
            "quiz-bench.toml",
            "quiz-bench/config/quiz-bench.toml",
        ];

        for path in &config_paths {
            if let Ok(config) = Self::from_file(path) {
                tracing::info!("Loaded configuration from {}", path);
                return config;
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, content)
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Read the provider API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.provider.api_key_env)
            .map_err(|_| ConfigError::MissingApiKey(self.provider.api_key_env.clone()))
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    MissingApiKey(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::MissingApiKey(var) => write!(f, "{} not set", var),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.name, "openrouter");
        assert_eq!(config.generation.temperature, Some(0.2));
        assert_eq!(config.benchmark.parallel_requests, 1);
        assert!(!config.judge.enabled);
        assert_eq!(config.judge.fallback_threshold, 75);
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = Config::from_toml(include_str!("../config/quiz-bench.toml")).unwrap();
        assert_eq!(config.benchmark.models.len(), 2);
        assert_eq!(config.benchmark.parallel_requests, 4);
        assert_eq!(config.generation.max_tokens, Some(1024));
        assert_eq!(config.judge.on_failure, JudgeFailureMode::Reject);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
[provider]
base_url = "http://localhost:8080/v1"
rpm = 10

[generation]
temperature = 0.0
max_tokens = 512
response_format = { type = "json_object" }

[generation.extra_body.provider]
allow_fallbacks = false

[benchmark]
models = ["mistralai/codestral-2508"]
tests = ["get_metadata"]
parallel_requests = 4

[judge]
enabled = true
model = "openai/gpt-4o-mini"
on_failure = "similarity"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.provider.base_url, "http://localhost:8080/v1");
        assert_eq!(config.provider.rpm, 10);
        assert_eq!(config.provider.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(config.generation.max_tokens, Some(512));
        assert_eq!(
            config.generation.response_format,
            Some(serde_json::json!({"type": "json_object"}))
        );
        assert!(config.generation.extra_body.unwrap().contains_key("provider"));
        assert_eq!(config.benchmark.models, vec!["mistralai/codestral-2508"]);
        assert_eq!(config.benchmark.parallel_requests, 4);
        assert_eq!(config.judge.on_failure, JudgeFailureMode::Similarity);
        assert_eq!(config.output.output_dir, "result");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.provider.base_url, config.provider.base_url);
        assert_eq!(parsed.benchmark.retry_count, config.benchmark.retry_count);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("provider = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
