//! Configuration validation logic.

use std::error::Error;

use super::ServerConfig;
use crate::core::tts::remote::parse_base_url;
use crate::core::tts::{ModelBackend, ModelConfig};

/// Validate a merged configuration.
pub(crate) fn validate(config: &ServerConfig) -> Result<(), Box<dyn Error>> {
    validate_model(&config.model)?;
    validate_limits(config)?;
    Ok(())
}

/// Check the selected backend has what it needs to start.
pub(crate) fn validate_model(model: &ModelConfig) -> Result<(), Box<dyn Error>> {
    match model.backend {
        ModelBackend::None => {}
        ModelBackend::Remote => {
            let url = model
                .url
                .as_deref()
                .ok_or("Remote model backend requires model.url (MODEL_URL)")?;
            parse_base_url(url).map_err(|e| e.to_string())?;
        }
        ModelBackend::Command => {
            let has_program = model
                .command
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty());
            if !has_program {
                return Err("Command model backend requires model.command (MODEL_COMMAND)".into());
            }
        }
    }

    if model.sample_rate == 0 {
        return Err("model.sample_rate must be greater than zero".into());
    }
    if model.timeout_seconds == 0 {
        return Err("model.timeout_seconds must be greater than zero".into());
    }
    Ok(())
}

fn validate_limits(config: &ServerConfig) -> Result<(), Box<dyn Error>> {
    let non_zero = [
        ("generation.max_text_length", config.max_text_length as u64),
        ("generation.max_upload_bytes", config.max_upload_bytes as u64),
        (
            "generation.max_concurrent",
            config.max_concurrent_generations as u64,
        ),
        (
            "output.sweep_interval_seconds",
            config.output_sweep_interval_seconds,
        ),
        (
            "security.rate_limit_requests_per_second",
            config.rate_limit_requests_per_second as u64,
        ),
        (
            "security.rate_limit_burst_size",
            config.rate_limit_burst_size as u64,
        ),
    ];

    for (name, value) in non_zero {
        if value == 0 {
            return Err(format!("{name} must be greater than zero").into());
        }
    }
    Ok(())
}
