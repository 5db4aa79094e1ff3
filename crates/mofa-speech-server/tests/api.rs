//! HTTP-level tests for the speech API, driven through
//! `tower::ServiceExt::oneshot` against the real router and the simulated
//! backend.

mod common;

use axum::http::{StatusCode, header};
use mofa_speech::types::{LifecycleState, ModelFamily};
use serde_json::json;
use tower::ServiceExt;

use common::{
    body_bytes, body_json, get, multipart_body, speech_request, test_app, test_config,
    transcription_request, wav_bytes,
};

const VOICE: &str = "UklGRgAAAABXQVZF"; // base64 of a truncated RIFF header

// ─────────────────────────────────────────────────────────────────────────────
// § 1  Service endpoints
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_lists_endpoints() {
    let (app, _) = test_app(test_config());
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "mofa-speech-server");
    assert_eq!(body["endpoints"]["speech"], "/v1/audio/speech");
}

#[tokio::test]
async fn health_reports_idle_slot_and_device() {
    let (app, _) = test_app(test_config());
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"]["model_type"], "none");
    assert_eq!(body["model"]["status"], "idle");
    assert_eq!(body["gpu"]["total_memory_mb"], 4096.0);
    assert_eq!(body["gpu"]["used_memory_mb"], 0.0);
}

#[tokio::test]
async fn health_is_unhealthy_after_failed_switch() {
    let mut config = test_config();
    // TTS cannot fit on the device
    config.simulated.tts_footprint_bytes = 8 << 30;
    let (app, coordinator) = test_app(config);

    let response = app
        .clone()
        .oneshot(speech_request(json!({ "input": "hi", "voice": VOICE })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "model_loading_failed");
    assert_eq!(coordinator.current_status().lifecycle, LifecycleState::Failed);

    let body = body_json(app.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["model"]["status"], "failed");
}

#[tokio::test]
async fn models_lists_configured_ids() {
    let (app, _) = test_app(test_config());
    let body = body_json(app.oneshot(get("/v1/models")).await.unwrap()).await;
    assert_eq!(body["object"], "list");
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["qwen3-asr-0.6b", "indextts-2"]);
}

#[tokio::test]
async fn metrics_track_switches() {
    let (app, _) = test_app(test_config());

    let upload = multipart_body(&[], Some(("a.wav", &wav_bytes(0.5))));
    let response = app
        .clone()
        .oneshot(transcription_request(upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .clone()
        .oneshot(speech_request(json!({ "input": "hello", "voice": VOICE })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(app.oneshot(get("/metrics")).await.unwrap()).await;
    assert_eq!(body["model"]["current_type"], "tts");
    assert_eq!(body["model"]["current_status"], "resident");
    assert_eq!(body["performance"]["total_loads"], 2);
    assert_eq!(body["performance"]["total_unloads"], 1);
    assert_eq!(body["gpu"]["backend"], "simulated");
    assert_eq!(body["memory_leak_detection"]["leak_detected"], false);
}

// ─────────────────────────────────────────────────────────────────────────────
// § 2  Transcriptions
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn transcription_json() {
    let (app, coordinator) = test_app(test_config());
    let upload = multipart_body(
        &[("model", "qwen3-asr-0.6b")],
        Some(("clip.wav", &wav_bytes(1.0))),
    );

    let response = app.oneshot(transcription_request(upload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["text"].as_str().unwrap().starts_with("simulated transcription"));
    assert!(coordinator.current_status().is_resident(ModelFamily::Stt));
}

#[tokio::test]
async fn transcription_text_format() {
    let (app, _) = test_app(test_config());
    let upload = multipart_body(
        &[("response_format", "text")],
        Some(("clip.wav", &wav_bytes(0.5))),
    );

    let response = app.oneshot(transcription_request(upload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.starts_with("simulated transcription"));
}

#[tokio::test]
async fn transcription_verbose_json_with_timestamps() {
    let (app, _) = test_app(test_config());
    let upload = multipart_body(
        &[
            ("response_format", "verbose_json"),
            ("language", "de"),
            ("timestamp_granularities", "word,segment"),
        ],
        Some(("clip.wav", &wav_bytes(2.0))),
    );

    let body = body_json(app.oneshot(transcription_request(upload)).await.unwrap()).await;
    assert_eq!(body["task"], "transcribe");
    assert_eq!(body["language"], "de");
    assert_eq!(body["duration"], 2.0);
    assert_eq!(body["segments"].as_array().unwrap().len(), 1);
    assert!(!body["words"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn transcription_validation_errors() {
    let cases: Vec<(Vec<(&str, &str)>, &str, &str)> = vec![
        (vec![("model", "whisper-1")], "model", "invalid_model"),
        (vec![("response_format", "srt")], "response_format", "unsupported_format"),
        (vec![("response_format", "xml")], "response_format", "invalid_format"),
        (vec![("temperature", "1.5")], "temperature", "invalid_value"),
        (vec![("language", "english")], "language", "invalid_language"),
    ];

    for (fields, param, code) in cases {
        let (app, coordinator) = test_app(test_config());
        let upload = multipart_body(&fields, Some(("clip.wav", &wav_bytes(0.1))));
        let response = app.oneshot(transcription_request(upload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "case {code}");
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["param"], param);
        assert_eq!(body["error"]["code"], code);
        // rejected before any model switch
        assert_eq!(coordinator.current_status().lifecycle, LifecycleState::Idle);
    }
}

#[tokio::test]
async fn transcription_requires_file() {
    let (app, _) = test_app(test_config());
    let upload = multipart_body(&[("model", "qwen3-asr")], None);
    let response = app.oneshot(transcription_request(upload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "missing_file");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let (app, coordinator) = test_app(test_config());
    // 300 KiB against a 256 KiB cap
    let upload = multipart_body(&[], Some(("big.wav", &vec![0u8; 300 * 1024])));
    let response = app.oneshot(transcription_request(upload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "file_too_large");
    assert_eq!(coordinator.current_status().lifecycle, LifecycleState::Idle);
}

// ─────────────────────────────────────────────────────────────────────────────
// § 3  Speech
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn speech_returns_wav_attachment() {
    let (app, coordinator) = test_app(test_config());
    let response = app
        .oneshot(speech_request(json!({
            "model": "indextts-2",
            "input": "Hello from the speech server",
            "voice": VOICE,
            "response_format": "wav",
            "speed": 1.5,
            "emotion": { "mode": "text", "text": "cheerful", "alpha": 0.6 },
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"speech.wav\""
    );
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..4], b"RIFF");
    assert!(coordinator.current_status().is_resident(ModelFamily::Tts));
}

#[tokio::test]
async fn speech_validation_errors() {
    let long_input = "a".repeat(4097);
    let cases = vec![
        (json!({ "model": "tts-1", "input": "hi", "voice": VOICE }), "model", "invalid_model"),
        (json!({ "input": "   ", "voice": VOICE }), "input", "invalid_value"),
        (json!({ "input": long_input, "voice": VOICE }), "input", "text_too_long"),
        (json!({ "input": "hi" }), "voice", "missing_voice"),
        (json!({ "input": "hi", "voice": "%%%" }), "voice", "invalid_voice"),
        (
            json!({ "input": "hi", "voice": VOICE, "response_format": "aac" }),
            "response_format",
            "invalid_format",
        ),
        (json!({ "input": "hi", "voice": VOICE, "speed": 5.0 }), "speed", "invalid_value"),
    ];

    for (payload, param, code) in cases {
        let (app, coordinator) = test_app(test_config());
        let response = app.oneshot(speech_request(payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "case {code}");
        let body = body_json(response).await;
        assert_eq!(body["error"]["param"], param);
        assert_eq!(body["error"]["code"], code);
        assert_eq!(coordinator.current_status().lifecycle, LifecycleState::Idle);
    }
}

#[tokio::test]
async fn speech_malformed_json_uses_error_envelope() {
    let (app, _) = test_app(test_config());
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/audio/speech")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_json");
}

#[tokio::test]
async fn unsupported_output_format_on_simulated_backend() {
    let (app, _) = test_app(test_config());
    let response = app
        .oneshot(speech_request(json!({
            "input": "hi",
            "voice": VOICE,
            "response_format": "mp3",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unsupported_format");
}

// ─────────────────────────────────────────────────────────────────────────────
// § 4  Switching across endpoints
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn alternating_requests_switch_the_slot() {
    let (app, coordinator) = test_app(test_config());

    let upload = multipart_body(&[], Some(("a.wav", &wav_bytes(0.2))));
    let response = app
        .clone()
        .oneshot(transcription_request(upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stt_generation = coordinator.current_status().generation;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(speech_request(json!({ "input": "hello", "voice": VOICE })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let status = coordinator.current_status();
    assert_eq!(status.family, ModelFamily::Tts);
    assert_eq!(status.model_label.as_deref(), Some("indextts-2"));
    // one unload + one load after the STT residency, none for the repeat
    assert_eq!(status.generation, stt_generation + 2);

    let stats = coordinator.monitor().performance_stats();
    assert_eq!(stats.total_loads, 2);
    assert_eq!(stats.total_unloads, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mixed_requests_all_succeed() {
    let (app, coordinator) = test_app(test_config());
    let audio = wav_bytes(0.1);

    let tasks: Vec<_> = (0..40)
        .map(|i| {
            let app = app.clone();
            let request = if i % 2 == 0 {
                transcription_request(multipart_body(&[], Some(("a.wav", &audio))))
            } else {
                speech_request(json!({ "input": "hello", "voice": VOICE }))
            };
            tokio::spawn(async move { app.oneshot(request).await.unwrap().status() })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }
    let status = coordinator.current_status();
    assert_eq!(status.lifecycle, LifecycleState::Resident);
}
