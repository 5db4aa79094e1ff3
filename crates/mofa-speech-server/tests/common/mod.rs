//! Shared helpers for `mofa-speech-server` HTTP tests.
//!
//! Declared with `mod common;` in each test file.

use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use mofa_speech::config::{ProbeKind, SpeechConfig};
use mofa_speech::coordinator::ModelCoordinator;
use mofa_speech_server::backend::build_coordinator;
use mofa_speech_server::server::build_router;
use mofa_speech_server::state::AppState;

pub const BOUNDARY: &str = "mofa-speech-test-boundary";

/// Simulated backend with near-instant loads and a small upload cap.
pub fn test_config() -> SpeechConfig {
    let mut config = SpeechConfig::default();
    config.monitor.probe = ProbeKind::Simulated;
    config.simulated.stt_load_latency_ms = 1;
    config.simulated.tts_load_latency_ms = 1;
    config.server.max_upload_bytes = 256 * 1024;
    config
}

pub fn test_app(config: SpeechConfig) -> (Router, Arc<ModelCoordinator>) {
    let coordinator = Arc::new(build_coordinator(&config));
    let state = AppState::new(
        coordinator.clone(),
        config.models.clone(),
        config.server.max_upload_bytes,
    );
    (build_router(state), coordinator)
}

/// Mono 16 kHz silence of the given length.
pub fn wav_bytes(seconds: f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buf, spec).unwrap();
        for _ in 0..(seconds * 16_000.0) as u32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf.into_inner()
}

/// Hand-built `multipart/form-data` body.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: audio/wav\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn transcription_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/audio/transcriptions")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn speech_request(json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/audio/speech")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}
