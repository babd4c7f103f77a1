use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Backend the API forwards to
    pub backend: BackendConfig,
    /// Global server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the backend API (e.g., "http://127.0.0.1:8000")
    pub base_url: String,
    /// Token sent in the `apitoken` header, if set
    #[serde(default)]
    pub api_token: Option<String>,
    /// Extra headers sent with every backend request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Backend request timeout in seconds
    #[serde(default = "default_backend_timeout")]
    pub timeout: u64,
    /// Maximum idle connections kept per host
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Server-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// CORS configuration
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    /// Request logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Global timeout in seconds
    #[serde(default = "default_global_timeout")]
    pub timeout: u64,
    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cors: None,
            logging: LoggingConfig::default(),
            timeout: default_global_timeout(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Allowed origins (e.g., ["https://example.com", "*"])
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// Whether to allow credentials
    #[serde(default)]
    pub allow_credentials: bool,
    /// Max age for preflight cache in seconds
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

/// Request logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log the size of request bodies
    #[serde(default)]
    pub log_request_body: bool,
    /// Log the size of response bodies
    #[serde(default)]
    pub log_response_body: bool,
    /// Log headers
    #[serde(default = "default_true")]
    pub log_headers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_request_body: false,
            log_response_body: false,
            log_headers: true,
        }
    }
}

fn default_backend_timeout() -> u64 {
    300
}

fn default_max_connections() -> usize {
    10
}

fn default_global_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10 MB
}

fn default_cors_methods() -> Vec<String> {
    vec!["GET".to_string(), "POST".to_string(), "OPTIONS".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text, expanding `${env:...}` placeholders first
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let interpolated = crate::env_interpolation::interpolate_yaml_string(content);
        let config: Config = serde_yaml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Load configuration with environment-specific overrides
    /// E.g., config.yaml + config.dev.yaml when ENV=dev
    pub fn from_yaml_with_env(base_path: &str) -> anyhow::Result<Self> {
        let mut config = Self::from_yaml_file(base_path)?;

        if let Ok(env) = std::env::var("ENV") {
            let env_path = base_path.replace(".yaml", &format!(".{}.yaml", env));
            if std::path::Path::new(&env_path).exists() {
                tracing::info!("Loading environment-specific config: {}", env_path);
                let env_config = Self::from_yaml_file(&env_path)?;
                config = Self::merge_configs(config, env_config);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Merge two configurations, with override taking precedence
    fn merge_configs(base: Config, override_cfg: Config) -> Config {
        let mut headers = base.backend.headers;
        headers.extend(override_cfg.backend.headers);

        Config {
            backend: BackendConfig {
                base_url: override_cfg.backend.base_url,
                api_token: override_cfg.backend.api_token.or(base.backend.api_token),
                headers,
                timeout: override_cfg.backend.timeout,
                max_connections: override_cfg.backend.max_connections,
            },
            server: if override_cfg.server.cors.is_some() {
                override_cfg.server
            } else {
                ServerConfig {
                    cors: base.server.cors,
                    ..override_cfg.server
                }
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let base_url = &self.backend.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!(
                "backend.base_url must be an http(s) URL, got: {}",
                base_url
            );
        }
        if self.server.max_body_size == 0 {
            anyhow::bail!("server.max_body_size must be greater than zero");
        }
        Ok(())
    }
}
