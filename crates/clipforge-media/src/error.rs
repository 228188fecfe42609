//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
///
/// Pipeline-stage variants carry the offending input so the failure can be
/// reported with which locator or file triggered it.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Normalization failed for {input}: {message}")]
    Normalization { input: String, message: String },

    #[error("Splicing failed: {0}")]
    Splicing(String),

    #[error("Audio mix failed: {0}")]
    AudioMix(String),

    #[error("Quote rendering failed: {0}")]
    QuoteRender(String),

    #[error("Pipeline timed out after {0} seconds")]
    Timeout(u64),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a fetch failure error for a locator.
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a normalization failure error for an input.
    pub fn normalization(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Normalization {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a splicing failure error.
    pub fn splicing(message: impl Into<String>) -> Self {
        Self::Splicing(message.into())
    }

    /// Create an audio mix failure error.
    pub fn audio_mix(message: impl Into<String>) -> Self {
        Self::AudioMix(message.into())
    }

    /// Create a quote rendering failure error.
    pub fn quote_render(message: impl Into<String>) -> Self {
        Self::QuoteRender(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
