// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) for the learning
// service:
// - HTTP server binding and CORS origins
// - Storage backend (in-memory or PostgreSQL)
// - Critic LLM provider
// - Learning constants (baseline, exploration, decay, evolution thresholds)
// - Critic evaluation storage
// - Logging and metrics exposition

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::repository::{PostgresConfig, StorageBackend};
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "ruya.ai/v1";
pub const KIND: &str = "LearningServiceConfig";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfigManifest {
    /// API version (must be "ruya.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "LearningServiceConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: ServiceConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfigSpec {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub llm: LLMConfig,

    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub critic: CriticConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,

    /// CORS origins; "*" allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: DatabaseBackend,

    /// Connection URL (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProviderKind {
    Ollama,
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: LLMProviderKind,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Reference success rate stamped on new metrics rows
    #[serde(default = "default_baseline")]
    pub baseline_performance: f64,

    /// Exploration rate of newly initialised learning states
    #[serde(default = "default_exploration_rate")]
    pub default_exploration_rate: f64,

    /// Multiplier applied to a pattern that was used and failed
    #[serde(default = "default_failure_decay")]
    pub failure_decay: f64,

    #[serde(default = "default_evolution_min_success_rate")]
    pub evolution_min_success_rate: f64,

    #[serde(default = "default_evolution_pattern_limit")]
    pub evolution_pattern_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticConfig {
    #[serde(default = "default_evaluations_dir")]
    pub evaluations_dir: PathBuf,

    #[serde(default = "default_sample_limit")]
    pub default_sample_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Prometheus exporter port; disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_backend() -> DatabaseBackend {
    DatabaseBackend::InMemory
}

fn default_max_connections() -> u32 {
    5
}

fn default_llm_provider() -> LLMProviderKind {
    LLMProviderKind::Ollama
}

fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "ministral-3:3b".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_baseline() -> f64 {
    crate::domain::metrics::DEFAULT_BASELINE_PERFORMANCE
}

fn default_exploration_rate() -> f64 {
    0.1
}

fn default_failure_decay() -> f64 {
    0.8
}

fn default_evolution_min_success_rate() -> f64 {
    0.7
}

fn default_evolution_pattern_limit() -> usize {
    10
}

fn default_evaluations_dir() -> PathBuf {
    PathBuf::from("./data/evaluations")
}

fn default_sample_limit() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            timeout_seconds: default_llm_timeout(),
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            baseline_performance: default_baseline(),
            default_exploration_rate: default_exploration_rate(),
            failure_decay: default_failure_decay(),
            evolution_min_success_rate: default_evolution_min_success_rate(),
            evolution_pattern_limit: default_evolution_pattern_limit(),
        }
    }
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            evaluations_dir: default_evaluations_dir(),
            default_sample_limit: default_sample_limit(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_port: None,
        }
    }
}

impl Default for ServiceConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "ruya-learning".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ServiceConfigSpec::default(),
        }
    }
}

/// Resolves `env:VAR_NAME` references; other values are returned as-is.
/// An unset variable resolves to `None`.
pub fn resolve_env_value(raw: &str) -> Option<String> {
    match raw.strip_prefix("env:") {
        Some(var) => std::env::var(var.trim()).ok().filter(|v| !v.is_empty()),
        None => Some(raw.to_string()),
    }
}

impl ServiceConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. RUYA_CONFIG_PATH environment variable
    /// 2. ./ruya-config.yaml (working directory)
    /// 3. ~/.ruya/config.yaml (user home)
    /// 4. /etc/ruya/config.yaml (system, Unix) or C:\ProgramData\Ruya\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("RUYA_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./ruya-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".ruya").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/ruya/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Ruya\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RUYA_DATABASE_URL") {
            tracing::info!("Environment override: RUYA_DATABASE_URL");
            self.spec.database.url = Some(url);
        }
        if let Ok(endpoint) = std::env::var("OLLAMA_BASE_URL") {
            tracing::info!("Environment override: OLLAMA_BASE_URL={}", endpoint);
            self.spec.llm.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            tracing::info!("Environment override: OLLAMA_MODEL={}", model);
            self.spec.llm.model = model;
        }
        if let Ok(key) = std::env::var("RUYA_LLM_API_KEY") {
            tracing::info!("Environment override: RUYA_LLM_API_KEY");
            self.spec.llm.api_key = Some(key);
        }
    }

    /// Database URL with `env:` references resolved.
    pub fn database_url(&self) -> Option<String> {
        self.spec.database.url.as_deref().and_then(resolve_env_value)
    }

    /// LLM API key with `env:` references resolved.
    pub fn llm_api_key(&self) -> Option<String> {
        self.spec.llm.api_key.as_deref().and_then(resolve_env_value)
    }

    /// Storage backend selected by `spec.database`, URL resolved.
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.database.backend {
            DatabaseBackend::InMemory => Ok(StorageBackend::InMemory),
            DatabaseBackend::Postgres => {
                let connection_string = self.database_url().ok_or_else(|| {
                    anyhow::anyhow!("spec.database.url is unset or names an unset environment variable")
                })?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string,
                    max_connections: self.spec.database.max_connections,
                }))
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.trim().is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let learning = &self.spec.learning;
        for (name, value) in [
            ("baseline_performance", learning.baseline_performance),
            ("default_exploration_rate", learning.default_exploration_rate),
            ("failure_decay", learning.failure_decay),
            ("evolution_min_success_rate", learning.evolution_min_success_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("spec.learning.{} must be between 0.0 and 1.0, got {}", name, value);
            }
        }

        if self.spec.llm.timeout_seconds == 0 {
            anyhow::bail!("spec.llm.timeout_seconds must be positive");
        }

        if self.spec.llm.endpoint.trim().is_empty() {
            anyhow::bail!("spec.llm.endpoint cannot be empty");
        }

        if self.spec.database.backend == DatabaseBackend::Postgres && self.spec.database.url.is_none() {
            anyhow::bail!("spec.database.url is required for the postgres backend");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = ServiceConfigManifest::default();
        assert_eq!(manifest.api_version, "ruya.ai/v1");
        assert_eq!(manifest.kind, "LearningServiceConfig");
        assert_eq!(manifest.spec.server.port, 8000);
        assert_eq!(manifest.spec.database.backend, DatabaseBackend::InMemory);
        assert_eq!(manifest.spec.llm.model, "ministral-3:3b");
        assert_eq!(manifest.spec.learning.failure_decay, 0.8);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: ruya.ai/v1
kind: LearningServiceConfig
metadata:
  name: staging
spec:
  server:
    port: 9100
  database:
    backend: postgres
    url: "env:DATABASE_URL"
  learning:
    default_exploration_rate: 0.25
"#;
        let manifest = ServiceConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.server.port, 9100);
        assert_eq!(manifest.spec.server.bind_address, "127.0.0.1");
        assert_eq!(manifest.spec.database.backend, DatabaseBackend::Postgres);
        assert_eq!(manifest.spec.learning.default_exploration_rate, 0.25);
        assert_eq!(manifest.spec.learning.baseline_performance, 0.5);
        assert_eq!(manifest.spec.critic.default_sample_limit, 10);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ruya-config.yaml");

        let mut manifest = ServiceConfigManifest::default();
        manifest.spec.llm.provider = LLMProviderKind::OpenAI;
        manifest.spec.observability.metrics_port = Some(9091);
        manifest.to_yaml_file(&path).unwrap();

        let loaded = ServiceConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.spec.llm.provider, LLMProviderKind::OpenAI);
        assert_eq!(loaded.spec.observability.metrics_port, Some(9091));
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let result = ServiceConfigManifest::load_or_default(Some(PathBuf::from("/nonexistent/ruya.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut manifest = ServiceConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.learning.default_exploration_rate = 1.5;
        assert!(manifest.validate().is_err());
        manifest.spec.learning.default_exploration_rate = 0.1;

        manifest.spec.llm.timeout_seconds = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.llm.timeout_seconds = 120;

        manifest.spec.database.backend = DatabaseBackend::Postgres;
        assert!(manifest.validate().is_err());
        manifest.spec.database.url = Some("postgres://localhost/ruya".to_string());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_literal_values_resolve_unchanged() {
        assert_eq!(
            resolve_env_value("postgres://localhost/ruya").as_deref(),
            Some("postgres://localhost/ruya")
        );
        assert_eq!(resolve_env_value("env:RUYA_TEST_SURELY_UNSET_VARIABLE"), None);
    }

    #[test]
    fn test_storage_backend_resolution() {
        let mut manifest = ServiceConfigManifest::default();
        assert!(matches!(manifest.storage_backend().unwrap(), StorageBackend::InMemory));

        manifest.spec.database.backend = DatabaseBackend::Postgres;
        manifest.spec.database.url = Some("env:RUYA_TEST_SURELY_UNSET_VARIABLE".to_string());
        assert!(manifest.storage_backend().is_err());

        manifest.spec.database.url = Some("postgres://localhost/ruya".to_string());
        manifest.spec.database.max_connections = 12;
        match manifest.storage_backend().unwrap() {
            StorageBackend::PostgreSQL(config) => {
                assert_eq!(config.connection_string, "postgres://localhost/ruya");
                assert_eq!(config.max_connections, 12);
            }
            other => panic!("unexpected backend: {:?}", other),
        }
    }
}
