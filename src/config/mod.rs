//! Configuration module for the Chatterbox gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use chatterbox_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

use crate::core::output::OutputNaming;
use crate::core::tts::ModelConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_OUTPUT_DIR: &str = "generated";
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 500;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT_GENERATIONS: usize = 1;
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

/// TLS configuration for HTTPS
#[derive(Debug, Clone, PartialEq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all settings needed to run the gateway:
/// - Server address, TLS and the static UI directory
/// - Speech model backend
/// - Request limits for generation
/// - Output directory, naming and retention
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Directory holding `index.html` and its assets
    pub static_dir: PathBuf,

    // Speech model
    pub model: ModelConfig,

    // Generation limits
    /// Maximum text length in characters
    /// Default: 500
    pub max_text_length: usize,
    /// Maximum size of an uploaded voice reference
    /// Default: 10 MiB
    pub max_upload_bytes: usize,
    /// Model calls allowed to run at once
    /// Default: 1
    pub max_concurrent_generations: usize,
    /// Where voice references are written while a request runs
    /// Default: None (system temp dir)
    pub upload_dir: Option<PathBuf>,

    // Output files
    pub output_dir: PathBuf,
    pub output_naming: OutputNaming,
    /// Age after which generated files are deleted
    /// Default: None (keep forever)
    pub output_retention_seconds: Option<u64>,
    pub output_sweep_interval_seconds: u64,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            model: ModelConfig::default(),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_concurrent_generations: DEFAULT_MAX_CONCURRENT_GENERATIONS,
            upload_dir: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_naming: OutputNaming::Unique,
            output_retention_seconds: None,
            output_sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: DEFAULT_RATE_LIMIT_RPS,
            rate_limit_burst_size: DEFAULT_RATE_LIMIT_BURST,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// Values come from the process environment (including anything `main`
    /// loaded from `.env`), falling back to defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is loaded in main.rs before this runs
        let yaml_config = yaml::YamlConfig::from_file(path)?;

        let config = merge::merge_config(Some(yaml_config))?;

        validation::validate(&config)?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Retention window for generated files, when enabled.
    pub fn output_retention(&self) -> Option<Duration> {
        self.output_retention_seconds.map(Duration::from_secs)
    }

    pub fn output_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.output_sweep_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::{ModelBackend, ModelDevice};
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "STATIC_DIR",
        "MODEL_BACKEND",
        "MODEL_URL",
        "MODEL_API_KEY",
        "MODEL_COMMAND",
        "MODEL_ARGS",
        "MODEL_DEVICE",
        "MODEL_SAMPLE_RATE",
        "MODEL_TIMEOUT_SECONDS",
        "MAX_TEXT_LENGTH",
        "MAX_UPLOAD_BYTES",
        "MAX_CONCURRENT_GENERATIONS",
        "UPLOAD_DIR",
        "OUTPUT_DIR",
        "OUTPUT_NAMING",
        "OUTPUT_RETENTION_SECONDS",
        "OUTPUT_SWEEP_INTERVAL_SECONDS",
        "CORS_ALLOWED_ORIGINS",
        "RATE_LIMIT_REQUESTS_PER_SECOND",
        "RATE_LIMIT_BURST_SIZE",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            for key in ENV_VARS {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_address() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            ..Default::default()
        };
        assert_eq!(config.address(), "127.0.0.1:5000");
        assert!(!config.is_tls_enabled());
    }

    #[test]
    fn test_retention_durations() {
        let config = ServerConfig {
            output_retention_seconds: Some(90),
            ..Default::default()
        };
        assert_eq!(config.output_retention(), Some(Duration::from_secs(90)));
        assert_eq!(config.output_sweep_interval(), Duration::from_secs(60));
        assert_eq!(ServerConfig::default().output_retention(), None);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert_eq!(config.max_text_length, 500);
        assert_eq!(config.model.backend, ModelBackend::None);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_values() {
        cleanup_env_vars();

        unsafe {
            env::set_var("PORT", "5000");
            env::set_var("MODEL_BACKEND", "command");
            env::set_var("MODEL_COMMAND", "python3");
            env::set_var("MODEL_ARGS", "generate.py --fp16");
            env::set_var("MODEL_DEVICE", "cuda");
            env::set_var("OUTPUT_NAMING", "shared");
            env::set_var("OUTPUT_RETENTION_SECONDS", "3600");
            env::set_var("MAX_CONCURRENT_GENERATIONS", "4");
        }

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.model.backend, ModelBackend::Command);
        assert_eq!(config.model.command.as_deref(), Some("python3"));
        assert_eq!(config.model.args, vec!["generate.py", "--fp16"]);
        assert_eq!(config.model.device, ModelDevice::Cuda);
        assert_eq!(config.output_naming, OutputNaming::Shared);
        assert_eq!(config.output_retention_seconds, Some(3600));
        assert_eq!(config.max_concurrent_generations, 4);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        cleanup_env_vars();

        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let result = ServerConfig::from_env();
        assert!(result.unwrap_err().to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_backend() {
        cleanup_env_vars();

        unsafe {
            env::set_var("MODEL_BACKEND", "pytorch");
        }

        let result = ServerConfig::from_env();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Unsupported model backend")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_device() {
        cleanup_env_vars();

        unsafe {
            env::set_var("MODEL_DEVICE", "tpu");
        }

        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("Unsupported model device: tpu"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_remote_requires_url() {
        cleanup_env_vars();

        unsafe {
            env::set_var("MODEL_BACKEND", "remote");
        }

        let result = ServerConfig::from_env();
        assert!(result.unwrap_err().to_string().contains("MODEL_URL"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_only() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8081

model:
  backend: remote
  url: "http://127.0.0.1:9000"
  api_key: "yaml-model-key"

output:
  dir: "/tmp/chatterbox-out"
  naming: shared
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8081);
        assert_eq!(config.model.backend, ModelBackend::Remote);
        assert_eq!(config.model.url.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(
            config.model.api_key.as_ref().map(|k| k.expose()),
            Some("yaml-model-key")
        );
        assert_eq!(config.output_dir, PathBuf::from("/tmp/chatterbox-out"));
        assert_eq!(config.output_naming, OutputNaming::Shared);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"

generation:
  max_text_length: 800
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "10.0.0.1");
            env::set_var("PORT", "7000");
            env::set_var("MAX_TEXT_LENGTH", "100");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_text_length, 800);
        // ENV value where YAML is silent
        assert_eq!(config.port, 7000);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = ServerConfig::from_file(&config_path);

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_tls_partial_is_rejected() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(
            &config_path,
            r#"
server:
  tls:
    cert_path: "/etc/tls/cert.pem"
"#,
        )
        .unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(result.unwrap_err().to_string().contains("key_path"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_tls_combines_with_env() {
        cleanup_env_vars();

        unsafe {
            env::set_var("TLS_KEY_PATH", "/etc/tls/key.pem");
        }

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(
            &config_path,
            r#"
server:
  tls:
    cert_path: "/etc/tls/cert.pem"
"#,
        )
        .unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();
        assert_eq!(
            config.tls,
            Some(TlsConfig {
                cert_path: PathBuf::from("/etc/tls/cert.pem"),
                key_path: PathBuf::from("/etc/tls/key.pem"),
            })
        );

        cleanup_env_vars();
    }
}
