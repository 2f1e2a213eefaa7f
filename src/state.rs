use std::sync::Arc;

use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::core::output::OutputStore;
use crate::core::tts::{SharedSpeechModel, create_speech_model};

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// `None` when no backend is configured or it failed to build
    pub model: Option<SharedSpeechModel>,
    pub output: Arc<OutputStore>,
    /// Bounds how many model calls run at once
    generation_permits: Semaphore,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// A model that fails to initialise is logged and left unset so the
    /// server still starts and reports the failure per request.
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        let model = match create_speech_model(&config.model) {
            Ok(Some(model)) => {
                info!(
                    "Speech model ready: {} backend on {}",
                    config.model.backend, config.model.device
                );
                Some(model)
            }
            Ok(None) => {
                warn!("No speech model configured; generation requests will fail");
                None
            }
            Err(e) => {
                error!("Error loading model: {e}");
                None
            }
        };

        Self::with_model(config, model).await
    }

    /// Build state around an already constructed model.
    pub async fn with_model(config: ServerConfig, model: Option<SharedSpeechModel>) -> Arc<Self> {
        let output = OutputStore::new(config.output_dir.clone(), config.output_naming);
        if let Err(e) = output.ensure_dir().await {
            error!(
                "Failed to create output directory {}: {e}",
                output.dir().display()
            );
        }

        let permits = config.max_concurrent_generations.max(1);

        Arc::new(Self {
            config,
            model,
            output: Arc::new(output),
            generation_permits: Semaphore::new(permits),
        })
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Wait for a free generation slot.
    pub async fn acquire_generation_permit(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.generation_permits.acquire().await
    }

    pub fn available_generation_permits(&self) -> usize {
        self.generation_permits.available_permits()
    }
}
