//! Request validation for the audio endpoints.
//!
//! Checks run before the coordinator is touched, so a bad request never
//! triggers a model switch.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mofa_speech::adapter::AudioFormat;
use mofa_speech::config::ModelEntry;

use crate::error::{ApiError, ApiResult};

pub const MAX_INPUT_CHARS: usize = 4096;
pub const MIN_SPEED: f32 = 0.25;
pub const MAX_SPEED: f32 = 4.0;

/// How a transcription is rendered back to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionFormat {
    Json,
    Text,
    VerboseJson,
}

impl TranscriptionFormat {
    pub fn parse(value: &str) -> ApiResult<Self> {
        match value {
            "json" => Ok(TranscriptionFormat::Json),
            "text" => Ok(TranscriptionFormat::Text),
            "verbose_json" => Ok(TranscriptionFormat::VerboseJson),
            "srt" | "vtt" => Err(ApiError::invalid(
                "response_format",
                "unsupported_format",
                format!("response_format '{value}' is not supported by this server"),
            )),
            other => Err(ApiError::invalid(
                "response_format",
                "invalid_format",
                format!(
                    "Invalid response_format: {other}. Supported formats: json, text, verbose_json"
                ),
            )),
        }
    }
}

pub fn check_model(entry: &ModelEntry, model: &str) -> ApiResult<()> {
    if entry.accepts(model) {
        return Ok(());
    }
    Err(ApiError::invalid(
        "model",
        "invalid_model",
        format!(
            "Invalid model: {model}. Supported models: {}",
            entry.accepted_ids().join(", ")
        ),
    ))
}

pub fn check_temperature(temperature: f32) -> ApiResult<()> {
    if (0.0..=1.0).contains(&temperature) {
        Ok(())
    } else {
        Err(ApiError::invalid(
            "temperature",
            "invalid_value",
            format!("Invalid temperature: {temperature}. Must be between 0.0 and 1.0"),
        ))
    }
}

/// ISO-639-1 codes are two characters
pub fn check_language(language: &str) -> ApiResult<()> {
    if language.chars().count() == 2 {
        Ok(())
    } else {
        Err(ApiError::invalid(
            "language",
            "invalid_language",
            format!("Invalid language code: {language}. Must be ISO-639-1 format (2 chars)"),
        ))
    }
}

pub fn check_upload_size(size: u64, max: u64) -> ApiResult<()> {
    if size > max {
        Err(ApiError::FileTooLarge { size, max })
    } else {
        Ok(())
    }
}

pub fn check_input(input: &str) -> ApiResult<()> {
    if input.trim().is_empty() {
        return Err(ApiError::invalid(
            "input",
            "invalid_value",
            "Input text cannot be empty",
        ));
    }
    let chars = input.chars().count();
    if chars > MAX_INPUT_CHARS {
        return Err(ApiError::invalid(
            "input",
            "text_too_long",
            format!("Input text too long: {chars} chars. Maximum is {MAX_INPUT_CHARS} chars"),
        ));
    }
    Ok(())
}

/// Decode the base64 voice reference. A `data:...;base64,` prefix is
/// tolerated.
pub fn decode_voice(voice: &str) -> ApiResult<Vec<u8>> {
    let trimmed = voice.trim();
    if trimmed.is_empty() {
        return Err(ApiError::invalid(
            "voice",
            "missing_voice",
            "Voice reference is required",
        ));
    }
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => trimmed,
    };
    STANDARD.decode(payload).map_err(|e| {
        ApiError::invalid(
            "voice",
            "invalid_voice",
            format!("Voice reference is not valid base64: {e}"),
        )
    })
}

pub fn parse_speech_format(value: &str) -> ApiResult<AudioFormat> {
    value.parse::<AudioFormat>().map_err(|_| {
        ApiError::invalid(
            "response_format",
            "invalid_format",
            format!("Invalid response_format: {value}. Supported formats: wav, mp3, flac, opus"),
        )
    })
}

pub fn check_speed(speed: f32) -> ApiResult<()> {
    if (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(())
    } else {
        Err(ApiError::invalid(
            "speed",
            "invalid_value",
            format!("Invalid speed: {speed}. Must be between {MIN_SPEED} and {MAX_SPEED}"),
        ))
    }
}
