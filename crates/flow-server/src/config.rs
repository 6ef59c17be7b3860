//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration
///
/// Read from an optional `flow-sentinel.toml` in the working directory,
/// overridden by `FLOW_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// ONNX maintenance model; rule-based predictions when unset
    #[serde(default)]
    pub model_path: Option<String>,

    /// Expected hex SHA-256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Load the reference network into an empty store on startup
    #[serde(default = "default_seed_mock_data")]
    pub seed_mock_data: bool,

    /// Origins allowed by CORS (comma separated in the environment)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_port() -> u16 {
    8000
}

fn default_seed_mock_data() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            model_path: None,
            model_sha256: None,
            seed_mock_data: default_seed_mock_data(),
            cors_origins: default_cors_origins(),
            log_format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(config::Environment::with_prefix("FLOW"))
    }

    fn load_from(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("flow-sentinel").required(false))
            .add_source(
                env.try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn pretty_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("pretty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("FLOW").source(Some(source))
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::load_from(env(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert!(config.model_path.is_none());
        assert!(config.seed_mock_data);
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.pretty_logs());
    }

    #[test]
    fn test_environment_overrides() {
        let config = ServerConfig::load_from(env(&[
            ("FLOW_PORT", "9100"),
            ("FLOW_MODEL_PATH", "/models/maintenance.onnx"),
            ("FLOW_SEED_MOCK_DATA", "false"),
            ("FLOW_CORS_ORIGINS", "https://a.example,https://b.example"),
            ("FLOW_LOG_FORMAT", "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.model_path.as_deref(), Some("/models/maintenance.onnx"));
        assert!(!config.seed_mock_data);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(config.pretty_logs());
    }
}
