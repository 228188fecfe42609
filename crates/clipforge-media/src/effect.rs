//! Moody color grading.
//!
//! An optional single-pass grade applied to the spliced timeline: desaturate,
//! darken, lift contrast, and push shadows toward blue. Intensity scales each
//! term linearly, and zero intensity skips the render entirely so the timeline
//! is never re-encoded for nothing.

use std::path::{Path, PathBuf};

use clipforge_models::EncodingConfig;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Build the grading filter chain for the given intensity.
///
/// At full intensity: saturation 0.2, brightness -0.25, contrast 1.35, and a
/// 0.12 blue shadow shift.
fn moody_filter(intensity: f64) -> String {
    let saturation = 1.0 - 0.8 * intensity;
    let brightness = -0.25 * intensity;
    let contrast = 1.0 + 0.35 * intensity;
    let blue_shadows = 0.12 * intensity;

    format!(
        "eq=saturation={:.3}:brightness={:.3}:contrast={:.3},colorbalance=bs={:.3}",
        saturation, brightness, contrast, blue_shadows
    )
}

/// Apply the moody grade to a timeline.
///
/// Zero intensity is a passthrough: the input path is returned untouched and
/// no encode happens.
pub async fn apply_moody_effect(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
    intensity: f64,
    encoding: &EncodingConfig,
) -> MediaResult<PathBuf> {
    if !(0.0..=1.0).contains(&intensity) {
        return Err(MediaError::internal(format!(
            "moody intensity {} outside 0..=1",
            intensity
        )));
    }

    if intensity == 0.0 {
        debug!("Moody intensity is zero, skipping grade");
        return Ok(input.to_path_buf());
    }

    let filter = moody_filter(intensity);
    debug!("Applying moody grade: {}", filter);

    let cmd = FfmpegCommand::new(output)
        .input(input)
        .video_filter(filter)
        .video_codec(&encoding.codec)
        .preset(&encoding.preset)
        .crf(encoding.crf)
        // Audio is untouched by the grade
        .output_arg("-c:a")
        .output_arg("copy");

    runner.run(&cmd).await?;

    info!(
        "Applied moody grade at intensity {:.2} -> {}",
        intensity,
        output.display()
    );

    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_at_full_intensity() {
        let filter = moody_filter(1.0);
        assert!(filter.contains("saturation=0.200"));
        assert!(filter.contains("brightness=-0.250"));
        assert!(filter.contains("contrast=1.350"));
        assert!(filter.contains("colorbalance=bs=0.120"));
    }

    #[test]
    fn test_filter_scales_linearly() {
        let filter = moody_filter(0.5);
        assert!(filter.contains("saturation=0.600"));
        assert!(filter.contains("brightness=-0.125"));
        assert!(filter.contains("contrast=1.175"));
        assert!(filter.contains("bs=0.060"));
    }

    #[tokio::test]
    async fn test_zero_intensity_is_passthrough() {
        let runner = FfmpegRunner::new();
        let input = Path::new("/scratch/spliced.mp4");
        let output = Path::new("/scratch/moody.mp4");
        let encoding = EncodingConfig::default();

        // No ffmpeg invocation happens, so missing files are fine here
        let result = apply_moody_effect(&runner, input, output, 0.0, &encoding)
            .await
            .unwrap();
        assert_eq!(result, input);
    }

    #[tokio::test]
    async fn test_out_of_range_intensity_rejected() {
        let runner = FfmpegRunner::new();
        let encoding = EncodingConfig::default();
        let err = apply_moody_effect(
            &runner,
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            1.5,
            &encoding,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("outside"));
    }
}
