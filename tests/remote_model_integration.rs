//! Remote backend tests against a mocked model service.
//!
//! Verifies the multipart wire format, error mapping and health probes of
//! `RemoteSpeechModel`, plus one full gateway round trip through it.

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatterbox_gateway::core::tts::{
    ApiKey, GenerationParams, GenerationRequest, ModelBackend, ModelConfig, ModelDevice,
    ModelError, RemoteSpeechModel, SpeechModel, Waveform,
};
use chatterbox_gateway::{ServerConfig, encode_wav, routes, state::AppState};

fn remote_config(url: &str) -> ModelConfig {
    ModelConfig {
        backend: ModelBackend::Remote,
        url: Some(url.to_string()),
        timeout_seconds: 5,
        ..Default::default()
    }
}

fn wav_reply() -> ResponseTemplate {
    let wav = encode_wav(&Waveform::new(vec![0.0, 0.5, -0.5, 0.25], 24000)).unwrap();
    ResponseTemplate::new(200)
        .insert_header("content-type", "audio/wav")
        .set_body_bytes(wav)
}

fn request(text: &str) -> GenerationRequest {
    GenerationRequest {
        text: text.to_string(),
        audio_prompt_path: None,
        params: GenerationParams::default(),
    }
}

#[tokio::test]
async fn test_generate_decodes_wav_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_string_contains("Hello there"))
        .and(body_string_contains("name=\"cfg_weight\""))
        .and(body_string_contains("cpu"))
        .respond_with(wav_reply())
        .expect(1)
        .mount(&server)
        .await;

    let model = RemoteSpeechModel::new(&remote_config(&server.uri())).unwrap();
    let waveform = model.generate(&request("Hello there")).await.unwrap();

    assert_eq!(waveform.sample_rate, 24000);
    assert_eq!(waveform.samples.len(), 4);
}

#[tokio::test]
async fn test_generate_sends_audio_prompt() {
    let server = MockServer::start().await;
    // The WAV bytes make the body invalid UTF-8, so inspect it after the fact
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(wav_reply())
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let prompt = dir.path().join("voice.wav");
    std::fs::write(
        &prompt,
        encode_wav(&Waveform::new(vec![0.1; 64], 16000)).unwrap(),
    )
    .unwrap();

    let model = RemoteSpeechModel::new(&remote_config(&server.uri())).unwrap();
    let mut generation = request("Clone me");
    generation.audio_prompt_path = Some(prompt);

    assert!(model.generate(&generation).await.is_ok());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("name=\"audio_prompt\""));
    assert!(body.contains("filename=\"audio_prompt.wav\""));
    assert!(body.to_ascii_lowercase().contains("content-type: audio/wav"));
    assert!(body.contains("Clone me"));
}

#[tokio::test]
async fn test_generate_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(wav_reply())
        .expect(1)
        .mount(&server)
        .await;

    let mut config = remote_config(&server.uri());
    config.api_key = Some(ApiKey::new("secret-token"));
    let model = RemoteSpeechModel::new(&config).unwrap();

    assert!(model.generate(&request("Authorized")).await.is_ok());
}

#[tokio::test]
async fn test_generate_maps_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("  model crashed  "))
        .mount(&server)
        .await;

    let model = RemoteSpeechModel::new(&remote_config(&server.uri())).unwrap();
    match model.generate(&request("Hello")).await {
        Err(ModelError::RequestFailed { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "model crashed");
        }
        other => panic!("Expected RequestFailed, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_rejects_non_wav_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not audio"))
        .mount(&server)
        .await;

    let model = RemoteSpeechModel::new(&remote_config(&server.uri())).unwrap();
    assert!(matches!(
        model.generate(&request("Hello")).await,
        Err(ModelError::InvalidAudio(_))
    ));
}

#[tokio::test]
async fn test_generate_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(wav_reply().set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut config = remote_config(&server.uri());
    config.timeout_seconds = 1;
    let model = RemoteSpeechModel::new(&config).unwrap();

    assert!(matches!(
        model.generate(&request("Slow")).await,
        Err(ModelError::Timeout(1))
    ));
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let model = RemoteSpeechModel::new(&remote_config(&server.uri())).unwrap();
    assert!(model.health_check().await.is_ok());
}

#[tokio::test]
async fn test_health_check_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let model = RemoteSpeechModel::new(&remote_config(&server.uri())).unwrap();
    assert!(matches!(
        model.health_check().await,
        Err(ModelError::RequestFailed { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_gateway_round_trip_through_remote_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts/generate"))
        .and(body_string_contains("cuda"))
        .respond_with(wav_reply())
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut model_config = remote_config(&format!("{}/tts", server.uri()));
    model_config.device = ModelDevice::Cuda;
    let config = ServerConfig {
        static_dir: dir.path().join("static"),
        output_dir: dir.path().join("generated"),
        model: model_config,
        ..Default::default()
    };

    let state = AppState::new(config).await;
    assert!(state.is_model_loaded());
    let app = routes::create_router(Arc::clone(&state));

    let request = Request::builder()
        .method("POST")
        .uri("/generate_audio")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("text=Through+the+wire&temperature=0.6"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), 200);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    let file = json["audio_file_path"].as_str().unwrap();
    assert!(dir.path().join("generated").join(&file[1..]).is_file());
}
