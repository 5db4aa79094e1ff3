//! OpenAI-compatible audio endpoints
//!
//! POST /v1/audio/transcriptions - multipart upload, speech-to-text
//! POST /v1/audio/speech         - JSON body, text-to-speech with voice cloning

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartError, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use mofa_speech::adapter::{
    EmotionConfig, SpeechRequest, TimestampGranularity, Transcription, TranscriptionRequest,
    TranscriptionSegment, TranscriptionWord,
};
use mofa_speech::types::ModelFamily;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{self, TranscriptionFormat};

/// Parsed multipart form of a transcription request
#[derive(Debug, Default)]
struct TranscriptionForm {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    model: Option<String>,
    language: Option<String>,
    prompt: Option<String>,
    response_format: Option<String>,
    temperature: Option<String>,
    timestamp_granularities: Vec<String>,
}

impl TranscriptionForm {
    async fn read(mut multipart: Multipart, max_upload_bytes: u64) -> ApiResult<Self> {
        let mut form = TranscriptionForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max_upload_bytes))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                form.file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_upload_bytes))?;
                form.file = Some(bytes.to_vec());
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_upload_bytes))?;
            let value = value.trim().to_string();
            if value.is_empty() {
                continue;
            }
            match name.as_str() {
                "model" => form.model = Some(value),
                "language" => form.language = Some(value),
                "prompt" => form.prompt = Some(value),
                "response_format" => form.response_format = Some(value),
                "temperature" => form.temperature = Some(value),
                // accepts both repeated `timestamp_granularities[]` fields
                // and a single comma-separated value
                "timestamp_granularities" | "timestamp_granularities[]" => form
                    .timestamp_granularities
                    .extend(value.split(',').map(|g| g.trim().to_string())),
                _ => {}
            }
        }
        Ok(form)
    }
}

fn multipart_error(err: MultipartError, max_upload_bytes: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::BodyTooLarge {
            max: max_upload_bytes,
        }
    } else {
        ApiError::invalid("file", "invalid_multipart", err.body_text())
    }
}

/// `verbose_json` response body
#[derive(Debug, Serialize)]
struct VerboseTranscription {
    task: &'static str,
    language: String,
    duration: f64,
    text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    segments: Vec<TranscriptionSegment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    words: Vec<TranscriptionWord>,
}

fn render_transcription(result: Transcription, format: TranscriptionFormat) -> Response {
    match format {
        TranscriptionFormat::Text => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            result.text,
        )
            .into_response(),
        TranscriptionFormat::Json => Json(json!({ "text": result.text })).into_response(),
        TranscriptionFormat::VerboseJson => Json(VerboseTranscription {
            task: "transcribe",
            language: result.language.unwrap_or_else(|| "unknown".to_string()),
            duration: result.duration_secs,
            text: result.text,
            segments: result.segments,
            words: result.words,
        })
        .into_response(),
    }
}

/// POST /v1/audio/transcriptions
pub async fn create_transcription(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let request_id = Uuid::new_v4();
    let form = TranscriptionForm::read(multipart, state.max_upload_bytes).await?;

    let model = form.model.unwrap_or_else(|| state.models.stt.id.clone());
    validation::check_model(&state.models.stt, &model)?;
    let format =
        TranscriptionFormat::parse(form.response_format.as_deref().unwrap_or("json"))?;
    let temperature = match form.temperature.as_deref() {
        Some(raw) => raw.parse::<f32>().map_err(|_| {
            ApiError::invalid(
                "temperature",
                "invalid_value",
                format!("Invalid temperature: {raw}"),
            )
        })?,
        None => 0.0,
    };
    validation::check_temperature(temperature)?;
    if let Some(language) = &form.language {
        validation::check_language(language)?;
    }
    let timestamp_granularities = form
        .timestamp_granularities
        .iter()
        .map(|g| {
            g.parse::<TimestampGranularity>()
                .map_err(|msg| ApiError::invalid("timestamp_granularities", "invalid_value", msg))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let audio = form
        .file
        .ok_or_else(|| ApiError::invalid("file", "missing_file", "An audio file is required"))?;
    validation::check_upload_size(audio.len() as u64, state.max_upload_bytes)?;
    if audio.is_empty() {
        return Err(ApiError::invalid(
            "file",
            "invalid_audio",
            "Invalid audio file: upload is empty",
        ));
    }

    info!(
        request_id = %request_id,
        model = %model,
        format = ?format,
        bytes = audio.len(),
        "transcription request"
    );

    // Pins STT until inference returns; a switch to TTS waits for it.
    let lease = state.coordinator.acquire_lease(ModelFamily::Stt).await?;
    let started = Instant::now();
    let result = lease
        .transcribe(TranscriptionRequest {
            audio,
            file_name: form.file_name,
            language: form.language,
            prompt: form.prompt,
            temperature,
            timestamp_granularities,
        })
        .await?;
    info!(
        request_id = %request_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "transcription completed"
    );

    Ok(render_transcription(result, format))
}

fn default_speech_format() -> String {
    "wav".to_string()
}

fn default_speed() -> f32 {
    1.0
}

/// Request body for POST /v1/audio/speech
#[derive(Debug, Deserialize)]
pub struct SpeechBody {
    #[serde(default)]
    pub model: Option<String>,
    pub input: String,
    /// Base64 reference audio for voice cloning
    #[serde(default)]
    pub voice: String,
    #[serde(default = "default_speech_format")]
    pub response_format: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default)]
    pub emotion: Option<EmotionConfig>,
}

/// POST /v1/audio/speech
pub async fn create_speech(
    State(state): State<AppState>,
    body: Result<Json<SpeechBody>, JsonRejection>,
) -> ApiResult<Response> {
    let request_id = Uuid::new_v4();
    let Json(body) =
        body.map_err(|e| ApiError::invalid("body", "invalid_json", e.body_text()))?;

    let model = body.model.unwrap_or_else(|| state.models.tts.id.clone());
    validation::check_model(&state.models.tts, &model)?;
    validation::check_input(&body.input)?;
    let voice_reference = validation::decode_voice(&body.voice)?;
    let format = validation::parse_speech_format(&body.response_format)?;
    validation::check_speed(body.speed)?;

    info!(
        request_id = %request_id,
        model = %model,
        format = %format,
        text_length = body.input.chars().count(),
        "speech synthesis request"
    );

    let lease = state.coordinator.acquire_lease(ModelFamily::Tts).await?;
    let started = Instant::now();
    let audio = lease
        .synthesize(SpeechRequest {
            input: body.input,
            voice_reference,
            format,
            speed: body.speed,
            emotion: body.emotion,
        })
        .await?;
    info!(
        request_id = %request_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        output_bytes = audio.bytes.len(),
        "speech synthesis completed"
    );

    let disposition = format!("attachment; filename=\"speech.{}\"", audio.format);
    Ok((
        [
            (header::CONTENT_TYPE, audio.format.media_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        audio.bytes,
    )
        .into_response())
}

/// Build the audio router sub-tree
pub fn audio_router() -> Router<AppState> {
    Router::new()
        .route("/v1/audio/transcriptions", post(create_transcription))
        .route("/v1/audio/speech", post(create_speech))
}
