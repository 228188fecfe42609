//! Background music mixing.
//!
//! Lays a music bed under the spliced timeline: the bed loops to cover the
//! full video (or is truncated if longer), each track gets its own gain, and
//! a soft limiter catches the summed peaks. The video stream is copied
//! through untouched.

use std::path::{Path, PathBuf};

use clipforge_models::{EncodingConfig, AUDIO_SAMPLE_RATE};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_audio;

/// Limiter ceiling, roughly -1 dBFS.
const LIMITER_CEILING: f64 = 0.891;

/// Build the two-track mix graph.
fn mix_filter(video_volume: f64, music_volume: f64) -> String {
    format!(
        "[0:a]volume={:.3}[va];\
         [1:a]volume={:.3},aresample={}[ma];\
         [va][ma]amix=inputs=2:duration=first:normalize=0,alimiter=limit={:.3}[aout]",
        video_volume, music_volume, AUDIO_SAMPLE_RATE, LIMITER_CEILING
    )
}

/// Mix a background music bed under the timeline.
///
/// `video_duration` bounds the output; the bed loops indefinitely on the
/// input side and the `-t` cap plus `duration=first` truncate it.
pub async fn mix_background_audio(
    runner: &FfmpegRunner,
    video: &Path,
    music: &Path,
    output: &Path,
    video_duration: f64,
    video_volume: f64,
    music_volume: f64,
    encoding: &EncodingConfig,
) -> MediaResult<PathBuf> {
    // Fail early with a clear message if the bed has no decodable audio
    let bed = probe_audio(music).await?;
    debug!(
        "Mixing {:.2}s music bed under {:.2}s timeline (video gain {:.2}, music gain {:.2})",
        bed.duration, video_duration, video_volume, music_volume
    );

    let cmd = FfmpegCommand::new(output)
        .input(video)
        // Loop the bed; output duration caps it
        .input_with_args(music.to_string_lossy(), ["-stream_loop", "-1"])
        .filter_complex(mix_filter(video_volume, music_volume))
        .map("0:v:0")
        .map("[aout]")
        .output_arg("-c:v")
        .output_arg("copy")
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate)
        .output_arg("-ar")
        .output_arg(AUDIO_SAMPLE_RATE.to_string())
        .output_duration(video_duration);

    runner.run(&cmd).await.map_err(|e| match e {
        MediaError::FfmpegFailed { stderr, .. } => MediaError::audio_mix(format!(
            "background mix failed: {}",
            stderr.unwrap_or_default()
        )),
        other => other,
    })?;

    info!("Mixed background audio -> {}", output.display());
    Ok(output.to_path_buf())
}

/// Apply the clip-audio gain when no music bed is present.
///
/// Video is stream-copied; only the audio re-encodes.
pub async fn adjust_timeline_volume(
    runner: &FfmpegRunner,
    video: &Path,
    output: &Path,
    video_volume: f64,
    encoding: &EncodingConfig,
) -> MediaResult<PathBuf> {
    debug!("Applying timeline gain {:.2}", video_volume);

    let cmd = FfmpegCommand::new(output)
        .input(video)
        .audio_filter(format!("volume={:.3}", video_volume))
        .output_arg("-c:v")
        .output_arg("copy")
        .audio_codec(&encoding.audio_codec)
        .audio_bitrate(&encoding.audio_bitrate);

    runner.run(&cmd).await.map_err(|e| match e {
        MediaError::FfmpegFailed { stderr, .. } => MediaError::audio_mix(format!(
            "volume pass failed: {}",
            stderr.unwrap_or_default()
        )),
        other => other,
    })?;

    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_filter_gains() {
        let filter = mix_filter(0.8, 0.3);
        assert!(filter.contains("[0:a]volume=0.800[va]"));
        assert!(filter.contains("[1:a]volume=0.300"));
        assert!(filter.contains("aresample=44100"));
    }

    #[test]
    fn test_mix_filter_sums_without_renormalizing() {
        let filter = mix_filter(1.0, 1.0);
        // amix must not halve both tracks; the limiter guards the sum instead
        assert!(filter.contains("amix=inputs=2:duration=first:normalize=0"));
        assert!(filter.contains("alimiter=limit=0.891"));
        assert!(filter.ends_with("[aout]"));
    }
}
