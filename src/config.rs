use crate::error::Result;
use crate::ml::models::TrainingConfig;
use crate::ml::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Environment variable naming an extra configuration file
pub const CONFIG_PATH_ENV: &str = "MP_CONFIG_PATH";

const DEFAULT_CONFIG_PATH: &str = "config/local.toml";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Model and dataset locations
    pub model: ModelConfig,

    /// Training run configuration
    #[serde(default)]
    #[validate(nested)]
    pub training: TrainingConfig,

    /// Recommendation advisor configuration
    #[serde(default)]
    #[validate(nested)]
    pub recommendations: RecommendationsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and the environment.
    ///
    /// The file is `path` when given, else `$MP_CONFIG_PATH`, else `config/local.toml`
    /// if it exists. Environment variables use the `MP_` prefix and `__` between
    /// sections, e.g. `MP_SERVER__HTTP_PORT=9000`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let explicit = path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());
        let required = explicit.is_some();
        let config_path = explicit.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let config: Config = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file
            .add_source(config::File::with_name(&config_path).required(required))
            // Override with environment variables (prefix: MP_)
            .add_source(
                config::Environment::with_prefix("MP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    #[validate(range(min = 1))]
    pub http_port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Persisted model artifact
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,

    /// Training dataset (CSV with header row)
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Optional JSON training report written next to the artifact
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Declared feature schema; the artifact must match it when set
    #[serde(default)]
    pub schema: Option<FeatureSchema>,
}

impl ModelConfig {
    /// Schema used for training: the declared one, else the AI4I sensor readings
    pub fn training_schema(&self) -> FeatureSchema {
        self.schema.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendationsConfig {
    /// Ask the chat-completions endpoint when an API key is available
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// OpenAI-compatible chat completions URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model requested from the endpoint
    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1))]
    pub max_tokens: u32,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl RecommendationsConfig {
    /// Bearer token from the configured environment variable, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("models/maintenance_model.bin")
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/ai4i2020.csv")
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_model() -> String {
    "mixtral-8x7b-32768".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1200
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::ml::models::ModelType;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    /// Serializes tests that load configuration, since the loader reads the environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 8080);
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_llm_model(), "mixtral-8x7b-32768");
        assert_eq!(default_max_tokens(), 1200);
        assert!(default_true());
    }

    #[test]
    fn test_embedded_defaults() {
        let _env = env_lock();
        let file = write_config("");
        let config = Config::load(file.path().to_str()).unwrap();

        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.training.model_type, ModelType::RandomForest);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.recommendations.timeout_secs, 30);
        assert!(config.model.schema.is_none());
        assert_eq!(config.model.training_schema(), FeatureSchema::ai4i());
    }

    #[test]
    fn test_file_overrides() {
        let _env = env_lock();
        let file = write_config(
            r#"
[server]
http_port = 9100

[training]
model_type = "decision_tree"
n_trees = 7

[model]
artifact_path = "/tmp/model.bin"

[model.schema]
label_column = "Machine failure"

[[model.schema.features]]
key = "torque"
column = "Torque [Nm]"
label = "Torque"
unit = "Nm"
"#,
        );

        let config = Config::load(file.path().to_str()).unwrap();

        assert_eq!(config.server.http_port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.training.model_type, ModelType::DecisionTree);
        assert_eq!(config.training.n_trees, 7);
        assert_eq!(config.model.artifact_path, PathBuf::from("/tmp/model.bin"));

        let schema = config.model.schema.unwrap();
        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["torque"]);
    }

    #[test]
    fn test_environment_overrides() {
        let _env = env_lock();
        let file = write_config("[server]\nhttp_port = 9100\n");

        std::env::set_var("MP_SERVER__HTTP_PORT", "9123");
        std::env::set_var("MP_TRAINING__MODEL_TYPE", "decision_tree");
        let loaded = Config::load(file.path().to_str());
        std::env::remove_var("MP_SERVER__HTTP_PORT");
        std::env::remove_var("MP_TRAINING__MODEL_TYPE");

        let config = loaded.unwrap();
        assert_eq!(config.server.http_port, 9123);
        assert_eq!(config.training.model_type, ModelType::DecisionTree);
        assert_eq!(config.training.n_trees, 100);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let _env = env_lock();
        let file = write_config("[training]\ntest_size = 0.9\n");
        let err = Config::load(file.path().to_str()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_missing_explicit_file_rejected() {
        let _env = env_lock();
        assert!(Config::load(Some("/nonexistent/maintenance.toml")).is_err());
    }
}
