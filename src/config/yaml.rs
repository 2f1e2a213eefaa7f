use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///   static_dir: "static"
///   tls:
///     cert_path: "/etc/tls/cert.pem"
///     key_path: "/etc/tls/key.pem"
///
/// model:
///   backend: remote
///   url: "http://127.0.0.1:9000"
///   api_key: "your-model-service-key"
///   device: cuda
///   sample_rate: 24000
///   timeout_seconds: 300
///
/// generation:
///   max_text_length: 500
///   max_upload_bytes: 10485760
///   max_concurrent: 1
///   upload_dir: "/var/tmp/chatterbox-uploads"
///
/// output:
///   dir: "generated"
///   naming: unique
///   retention_seconds: 3600
///   sweep_interval_seconds: 60
///
/// security:
///   cors_allowed_origins: "https://example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub model: Option<ModelYaml>,
    pub generation: Option<GenerationYaml>,
    pub output: Option<OutputYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub static_dir: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    /// Set to `false` to ignore TLS settings inherited from the environment
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Speech model configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ModelYaml {
    /// "none", "remote" or "command"
    pub backend: Option<String>,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub command: Option<String>,
    /// Replaces MODEL_ARGS when present
    pub args: Option<Vec<String>>,
    /// "cpu", "cuda" or "mps"
    pub device: Option<String>,
    pub sample_rate: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Request limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GenerationYaml {
    pub max_text_length: Option<usize>,
    pub max_upload_bytes: Option<usize>,
    pub max_concurrent: Option<usize>,
    pub upload_dir: Option<String>,
}

/// Output file configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutputYaml {
    pub dir: Option<String>,
    /// "unique" or "shared"
    pub naming: Option<String>,
    pub retention_seconds: Option<u64>,
    pub sweep_interval_seconds: Option<u64>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
