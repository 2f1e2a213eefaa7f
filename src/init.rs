//! Pre-flight checks for the `chatterbox-gateway check` CLI command.
//!
//! The command validates the merged configuration, builds the configured
//! speech model backend, probes it, and makes sure the static, upload and
//! output directories are usable, so that a broken deployment fails before it
//! starts serving.
//!
//! ```text
//! $ MODEL_BACKEND=remote MODEL_URL=http://127.0.0.1:9000 chatterbox-gateway check
//! ```

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::output::OutputStore;
use crate::core::tts::create_speech_model;

/// Run all pre-flight checks against `config`.
pub async fn run(config: &ServerConfig) -> Result<()> {
    let output = OutputStore::new(config.output_dir.clone(), config.output_naming);
    output.ensure_dir().await.with_context(|| {
        format!(
            "Output directory {} is not usable",
            config.output_dir.display()
        )
    })?;
    info!("Output directory ready: {}", output.dir().display());

    if let Some(upload_dir) = &config.upload_dir {
        if !upload_dir.is_dir() {
            return Err(anyhow!(
                "Upload directory {} does not exist; requests with an audio prompt would fail",
                upload_dir.display()
            ));
        }
        info!("Upload directory ready: {}", upload_dir.display());
    }

    if config.static_dir.join("index.html").is_file() {
        info!("Static UI found in {}", config.static_dir.display());
    } else {
        warn!(
            "No index.html in {}; GET / will return 404",
            config.static_dir.display()
        );
    }

    let model = create_speech_model(&config.model)
        .map_err(|e| anyhow!("Error loading model: {e}"))?
        .ok_or_else(|| {
            anyhow!("No speech model configured. Set MODEL_BACKEND (remote or command) or model.backend in the config file")
        })?;

    model
        .health_check()
        .await
        .map_err(|e| anyhow!("Speech model health check failed: {e}"))?;

    info!(
        "Speech model {} backend is healthy ({} Hz, device {})",
        config.model.backend,
        model.sample_rate(),
        model.device()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_without_model_fails() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            output_dir: dir.path().join("out"),
            static_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let err = run(&config).await.unwrap_err();
        assert!(err.to_string().contains("No speech model configured"));
        // The output directory is still prepared
        assert!(dir.path().join("out").is_dir());
    }

    #[tokio::test]
    async fn test_run_with_missing_upload_dir_fails() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            output_dir: dir.path().join("out"),
            static_dir: dir.path().to_path_buf(),
            upload_dir: Some(dir.path().join("missing-uploads")),
            ..Default::default()
        };

        let err = run(&config).await.unwrap_err();
        assert!(err.to_string().contains("missing-uploads"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_command_backend() {
        let dir = TempDir::new().unwrap();
        let mut config = ServerConfig {
            output_dir: dir.path().join("out"),
            static_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        config.model.backend = crate::core::tts::ModelBackend::Command;
        config.model.command = Some("true".to_string());
        config.upload_dir = Some(dir.path().to_path_buf());

        assert!(run(&config).await.is_ok());
    }
}
