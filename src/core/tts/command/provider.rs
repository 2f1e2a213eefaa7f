use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tracing::debug;

use crate::core::audio::decode_wav;
use crate::core::tts::base::{
    GenerationRequest, ModelConfig, ModelDevice, ModelError, ModelResult, SpeechModel, Waveform,
};

/// Speech model run as a local program, once per request.
///
/// The program receives the configured leading arguments followed by
/// `--text <text> --output <wav path> --exaggeration <f> --temperature <f>
/// --cfg-weight <f> --device <device> [--audio-prompt <path>]` and must write
/// a WAV file to the output path before exiting with status 0.
#[derive(Debug)]
pub struct CommandSpeechModel {
    program: String,
    args: Vec<String>,
    device: ModelDevice,
    sample_rate: u32,
    timeout_seconds: u64,
}

impl CommandSpeechModel {
    pub fn new(config: &ModelConfig) -> ModelResult<Self> {
        let program = config
            .command
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                ModelError::InvalidConfiguration(
                    "command backend requires model.command".to_string(),
                )
            })?;

        Ok(Self {
            program: program.to_string(),
            args: config.args.clone(),
            device: config.device,
            sample_rate: config.sample_rate,
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Arguments appended after the configured ones.
    fn generation_args(&self, request: &GenerationRequest, output: &std::path::Path) -> Vec<String> {
        let params = &request.params;
        let mut args = vec![
            "--text".to_string(),
            request.text.clone(),
            "--output".to_string(),
            output.display().to_string(),
            "--exaggeration".to_string(),
            params.exaggeration.to_string(),
            "--temperature".to_string(),
            params.temperature.to_string(),
            "--cfg-weight".to_string(),
            params.cfg_weight.to_string(),
            "--device".to_string(),
            self.device.as_str().to_string(),
        ];
        if let Some(prompt) = &request.audio_prompt_path {
            args.push("--audio-prompt".to_string());
            args.push(prompt.display().to_string());
        }
        args
    }
}

#[async_trait]
impl SpeechModel for CommandSpeechModel {
    async fn generate(&self, request: &GenerationRequest) -> ModelResult<Waveform> {
        let output = tempfile::Builder::new()
            .prefix("tts-output-")
            .suffix(".wav")
            .tempfile()?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(self.generation_args(request, output.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running model command {}", self.program);

        let run = tokio::time::timeout(Duration::from_secs(self.timeout_seconds), command.output());
        let result = match run.await {
            Ok(result) => result,
            Err(_) => return Err(ModelError::Timeout(self.timeout_seconds)),
        };
        let process_output = result.map_err(|e| {
            ModelError::ConnectionFailed(format!("failed to start {}: {e}", self.program))
        })?;

        if !process_output.status.success() {
            return Err(ModelError::ProcessFailed {
                code: process_output.status.code(),
                stderr: String::from_utf8_lossy(&process_output.stderr)
                    .trim()
                    .to_string(),
            });
        }

        let data = tokio::fs::read(output.path()).await?;
        if data.is_empty() {
            return Err(ModelError::EmptyOutput);
        }
        let waveform = decode_wav(&data)?;
        if waveform.is_empty() {
            return Err(ModelError::EmptyOutput);
        }
        Ok(waveform)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn device(&self) -> ModelDevice {
        self.device
    }

    fn get_model_info(&self) -> serde_json::Value {
        json!({
            "backend": "command",
            "program": self.program,
            "device": self.device.as_str(),
            "sample_rate": self.sample_rate,
            "timeout_seconds": self.timeout_seconds,
        })
    }
}
