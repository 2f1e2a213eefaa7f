//! Environment variable loading.

use std::error::Error;
use std::path::PathBuf;

use super::ServerConfig;
use super::utils::{env_var, parse_env, split_args};
use crate::core::output::OutputNaming;
use crate::core::tts::{ApiKey, ModelBackend, ModelDevice};

/// TLS paths as given by the environment. Either may be completed by YAML,
/// so pairing happens during the merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TlsPaths {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Build a configuration from environment variables over defaults.
///
/// The returned config has no TLS section; the raw paths are returned
/// alongside it.
pub(crate) fn load_from_env() -> Result<(ServerConfig, TlsPaths), Box<dyn Error>> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse_env("PORT")? {
        config.port = port;
    }
    if let Some(dir) = env_var("STATIC_DIR") {
        config.static_dir = PathBuf::from(dir);
    }

    let model = &mut config.model;
    if let Some(backend) = env_var("MODEL_BACKEND") {
        model.backend = ModelBackend::parse(&backend)?;
    }
    model.url = env_var("MODEL_URL");
    model.api_key = env_var("MODEL_API_KEY").map(ApiKey::new);
    model.command = env_var("MODEL_COMMAND");
    if let Some(args) = env_var("MODEL_ARGS") {
        model.args = split_args(&args);
    }
    if let Some(device) = env_var("MODEL_DEVICE") {
        model.device = ModelDevice::parse(&device)?;
    }
    if let Some(rate) = parse_env("MODEL_SAMPLE_RATE")? {
        model.sample_rate = rate;
    }
    if let Some(timeout) = parse_env("MODEL_TIMEOUT_SECONDS")? {
        model.timeout_seconds = timeout;
    }

    if let Some(max) = parse_env("MAX_TEXT_LENGTH")? {
        config.max_text_length = max;
    }
    if let Some(max) = parse_env("MAX_UPLOAD_BYTES")? {
        config.max_upload_bytes = max;
    }
    if let Some(max) = parse_env("MAX_CONCURRENT_GENERATIONS")? {
        config.max_concurrent_generations = max;
    }
    config.upload_dir = env_var("UPLOAD_DIR").map(PathBuf::from);

    if let Some(dir) = env_var("OUTPUT_DIR") {
        config.output_dir = PathBuf::from(dir);
    }
    if let Some(naming) = env_var("OUTPUT_NAMING") {
        config.output_naming = OutputNaming::parse(&naming)?;
    }
    config.output_retention_seconds = parse_env("OUTPUT_RETENTION_SECONDS")?;
    if let Some(interval) = parse_env("OUTPUT_SWEEP_INTERVAL_SECONDS")? {
        config.output_sweep_interval_seconds = interval;
    }

    config.cors_allowed_origins = env_var("CORS_ALLOWED_ORIGINS");
    if let Some(rps) = parse_env("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = parse_env("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }

    let tls = TlsPaths {
        cert_path: env_var("TLS_CERT_PATH"),
        key_path: env_var("TLS_KEY_PATH"),
    };

    Ok((config, tls))
}
