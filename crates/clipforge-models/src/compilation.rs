//! Compilation request and result types.

use serde::{Deserialize, Serialize};
use url::Url;
use validator::{Validate, ValidationError};

use crate::format::FormatMode;

/// Maximum number of source videos per compilation.
pub const MAX_SOURCE_VIDEOS: usize = 10;

/// Request to compile N source videos into one short-form video.
///
/// Order of `video_urls` is significant: it determines splice order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompilationRequest {
    /// Source video locators, in splice order (1..=10).
    #[validate(
        length(min = 1, max = 10, message = "video_urls must contain 1 to 10 entries"),
        custom(function = validate_locators)
    )]
    pub video_urls: Vec<String>,

    /// Optional background audio locator.
    #[validate(custom(function = validate_optional_locator))]
    #[serde(default)]
    pub audio_url: Option<String>,

    /// Output format mode.
    #[serde(default)]
    pub format_mode: FormatMode,

    /// Whether to apply the dark moody grade after splicing.
    #[serde(default)]
    pub apply_moody_effect: bool,

    /// Strength of the moody grade (0.0 = passthrough, 1.0 = maximum).
    #[validate(range(min = 0.0, max = 1.0, message = "moody_intensity must be within [0, 1]"))]
    #[serde(default = "default_moody_intensity")]
    pub moody_intensity: f64,

    /// Volume applied to the clips' native audio.
    #[validate(range(
        min = 0.0,
        max = 1.0,
        message = "video_audio_volume must be within [0, 1]"
    ))]
    #[serde(default = "default_video_audio_volume")]
    pub video_audio_volume: f64,

    /// Volume applied to the background track.
    #[validate(range(
        min = 0.0,
        max = 1.0,
        message = "background_music_volume must be within [0, 1]"
    ))]
    #[serde(default = "default_background_music_volume")]
    pub background_music_volume: f64,
}

fn default_moody_intensity() -> f64 {
    0.7
}

fn default_video_audio_volume() -> f64 {
    0.8
}

fn default_background_music_volume() -> f64 {
    0.3
}

fn validate_locators(urls: &[String]) -> Result<(), ValidationError> {
    for url in urls {
        validate_locator(url)?;
    }
    Ok(())
}

fn validate_optional_locator(url: &str) -> Result<(), ValidationError> {
    validate_locator(url)
}

fn validate_locator(url: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(url).map_err(|_| ValidationError::new("invalid_url"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::new("unsupported_url_scheme"));
    }
    Ok(())
}

/// Public location of a finished artifact.
///
/// Immutable once produced; `public_id` is the storage key reported by the
/// upload collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationResult {
    pub url: String,
    pub public_id: String,
}

/// Request to render a styled quote image.
///
/// The text may contain `{word}` markers for bold spans and literal `\n`
/// sequences for line breaks.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CompilationRequest {
        serde_json::from_value(serde_json::json!({
            "video_urls": ["https://cdn.example.com/a.mp4", "https://cdn.example.com/b.mp4"]
        }))
        .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let req = valid_request();
        assert_eq!(req.format_mode, FormatMode::Vertical);
        assert!(!req.apply_moody_effect);
        assert!((req.moody_intensity - 0.7).abs() < f64::EPSILON);
        assert!((req.video_audio_volume - 0.8).abs() < f64::EPSILON);
        assert!((req.background_music_volume - 0.3).abs() < f64::EPSILON);
        assert!(req.audio_url.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_video_urls_rejected() {
        let mut req = valid_request();
        req.video_urls.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_too_many_video_urls_rejected() {
        let mut req = valid_request();
        req.video_urls = (0..MAX_SOURCE_VIDEOS + 1)
            .map(|i| format!("https://cdn.example.com/{}.mp4", i))
            .collect();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_max_video_urls_accepted() {
        let mut req = valid_request();
        req.video_urls = (0..MAX_SOURCE_VIDEOS)
            .map(|i| format!("https://cdn.example.com/{}.mp4", i))
            .collect();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_volume_rejected() {
        let mut req = valid_request();
        req.video_audio_volume = 1.5;
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.moody_intensity = -0.1;
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.background_music_volume = 2.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_non_http_locator_rejected() {
        let mut req = valid_request();
        req.video_urls = vec!["file:///etc/passwd".to_string()];
        assert!(req.validate().is_err());

        let mut req = valid_request();
        req.video_urls = vec!["not a url".to_string()];
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_bad_audio_url_rejected() {
        let mut req = valid_request();
        req.audio_url = Some("ftp://example.com/track.mp3".to_string());
        assert!(req.validate().is_err());
    }
}
